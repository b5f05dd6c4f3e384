//! Entry point for the web server.
//!
//! Loads the map, then serves the JSON API until interrupted.

use actix_web::{App, HttpServer, middleware::Logger, web};
use clap::Parser;
use log::info;
use santa_web::{AppState, config::Args, routes};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let template = args.load_game()?;

    let state = web::Data::new(AppState::with_sessions(template, args.session_store()));

    info!(
        "Santa's Delivery Run listening on http://{}:{}",
        args.host, args.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::config)
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await?;

    Ok(())
}
