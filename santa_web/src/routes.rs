//! HTTP routes: the browser page and its JSON API.
//!
//! | method | path             | action                                  |
//! |--------|------------------|-----------------------------------------|
//! | GET    | `/`              | the playable page                       |
//! | GET    | `/static/app.js` | script driving the page                 |
//! | GET    | `/api/state`     | current game, created if the session has none |
//! | POST   | `/api/new`       | replace the session's game with a fresh one   |
//! | POST   | `/api/move`      | move Santa, body `{"direction": "n"}`         |

use actix_web::{HttpRequest, HttpResponse, cookie::Cookie, http::header::ContentType, web};
use log::{debug, info};
use santa_core::{SantaGame, game::CellKind};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    session::{is_valid_session_id, new_session_id},
};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "santa_session";

const INDEX_HTML: &str = include_str!("../static/index.html");
const APP_JS: &str = include_str!("../static/app.js");

/// Everything the browser needs to draw the game.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePayload {
    pub board: Vec<Vec<CellKind>>,
    pub status: String,
    pub is_won: bool,
    pub is_lost: bool,
    pub moves: u32,
    pub max_moves: u32,
    pub remaining_moves: u32,
    pub bag: u32,
    pub delivered: u32,
    pub wins_at: u32,
    /// Open directions as lowercase letters, matching the move request body.
    pub available_moves: Vec<String>,
    pub history: Vec<String>,
    pub message: String,
}

impl GamePayload {
    pub fn new(game: &SantaGame, message: impl Into<String>) -> Self {
        GamePayload {
            board: game.board_cells(),
            status: game.status().to_string(),
            is_won: game.is_won(),
            is_lost: game.is_lost(),
            moves: game.moves(),
            max_moves: game.max_moves(),
            remaining_moves: game.remaining_moves(),
            bag: game.bag(),
            delivered: game.delivered(),
            wins_at: game.wins_at(),
            available_moves: game
                .available_moves()
                .into_iter()
                .map(|d| d.letter().to_ascii_lowercase().to_string())
                .collect(),
            history: game.history().to_vec(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MoveRequest {
    #[serde(default)]
    direction: String,
}

/// The caller's session id, and whether it was just issued.
struct Session {
    id: String,
    is_new: bool,
}

impl Session {
    /// Reuses the cookie's id only if it looks like one we issued.
    fn from_request(req: &HttpRequest) -> Self {
        match req.cookie(SESSION_COOKIE) {
            Some(cookie) if is_valid_session_id(cookie.value()) => Session {
                id: cookie.value().to_string(),
                is_new: false,
            },
            _ => {
                let id = new_session_id();
                debug!("issuing session {id}");
                Session { id, is_new: true }
            }
        }
    }

    fn respond(self, payload: GamePayload) -> HttpResponse {
        let mut response = HttpResponse::Ok();
        if self.is_new {
            response.cookie(
                Cookie::build(SESSION_COOKIE, self.id)
                    .path("/")
                    .http_only(true)
                    .finish(),
            );
        }
        response.json(payload)
    }
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

async fn app_js() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/javascript; charset=utf-8")
        .body(APP_JS)
}

async fn state(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    let session = Session::from_request(&req);
    let payload = data
        .sessions
        .with_game(&session.id, &data.template, |game| {
            let message = if game.moves() > 0 {
                "Welcome back!"
            } else {
                "Use the controls to start moving."
            };
            GamePayload::new(game, message)
        });
    session.respond(payload)
}

async fn new_game(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    let session = Session::from_request(&req);
    let game = data.template.clone();
    data.sessions.replace(&session.id, &game);
    info!("session {} started a new game", session.id);
    session.respond(GamePayload::new(&game, "New game started! 🎁"))
}

async fn make_move(req: HttpRequest, body: web::Bytes, data: web::Data<AppState>) -> HttpResponse {
    let session = Session::from_request(&req);
    let request: MoveRequest = serde_json::from_slice(&body).unwrap_or_default();

    let payload = data
        .sessions
        .with_game(&session.id, &data.template, |game| {
            let outcome = game.move_santa(&request.direction);
            if game.is_over() {
                info!("session {} finished: {}", session.id, game.status());
            }
            GamePayload::new(game, outcome.to_string())
        });
    session.respond(payload)
}

/// Configure the application's HTTP routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/static/app.js").route(web::get().to(app_js)))
        .service(web::resource("/api/state").route(web::get().to(state)))
        .service(web::resource("/api/new").route(web::post().to(new_game)))
        .service(web::resource("/api/move").route(web::post().to(make_move)));
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, http::header, test};
    use serde_json::{Value, json};

    use super::*;
    use crate::session::SessionStore;

    fn app_state() -> web::Data<AppState> {
        web::Data::new(AppState::new(SantaGame::default()))
    }

    /// A cookie carrying a well-formed session id built from one hex digit.
    fn session_cookie(digit: char) -> Cookie<'static> {
        Cookie::new(SESSION_COOKIE, digit.to_string().repeat(32))
    }

    macro_rules! service {
        ($data:expr) => {
            test::init_service(App::new().app_data($data.clone()).configure(config)).await
        };
    }

    #[actix_web::test]
    async fn index_serves_the_page() {
        let app = service!(app_state());

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert!(content_type.is_some_and(|ct| ct.starts_with("text/html")));
        let body = test::read_body(resp).await;
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains("<div id=\"board\">"));
        assert!(html.contains("/static/app.js"));

        let req = test::TestRequest::get().uri("/static/app.js").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let js = std::str::from_utf8(&body).unwrap();
        assert!(js.contains("/api/move"));
        assert!(js.contains("/api/new"));
        assert!(js.contains("/api/state"));
    }

    #[actix_web::test]
    async fn state_creates_a_game_and_issues_a_cookie() {
        let data = app_state();
        let app = service!(data);

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/state").to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.into_owned());
        assert!(cookie.is_some_and(|c| is_valid_session_id(c.value())));

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Use the controls to start moving.");
        assert_eq!(body["moves"], 0);
        assert_eq!(body["maxMoves"], 28);
        assert_eq!(body["remainingMoves"], 28);
        assert_eq!(body["winsAt"], 3);
        assert_eq!(body["isWon"], false);
        assert_eq!(body["isLost"], false);
        assert_eq!(body["availableMoves"], json!(["s", "e"]));
        assert_eq!(body["board"].as_array().map(Vec::len), Some(8));
        assert_eq!(body["board"][1][1], "santa");
        assert_eq!(body["board"][0][0], "wall");
        assert_eq!(data.sessions.len(), 1);
    }

    #[actix_web::test]
    async fn malformed_session_ids_are_replaced() {
        let data = app_state();
        let app = service!(data);
        let huge = "a".repeat(1 << 20);

        for bad in ["abc123", huge.as_str(), "ZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZ"] {
            let req = test::TestRequest::get()
                .uri("/api/state")
                .cookie(Cookie::new(SESSION_COOKIE, bad.to_string()))
                .to_request();
            let resp = test::call_service(&app, req).await;
            let issued = resp
                .response()
                .cookies()
                .find(|c| c.name() == SESSION_COOKIE)
                .map(|c| c.value().to_string());
            assert!(issued.is_some_and(|id| is_valid_session_id(&id)));
            assert!(data.sessions.snapshot_json(bad).is_none());
        }
        assert_eq!(data.sessions.len(), 3);
    }

    #[actix_web::test]
    async fn cookieless_requests_stay_within_capacity() {
        let data = web::Data::new(AppState::with_sessions(
            SantaGame::default(),
            SessionStore::new(5, std::time::Duration::from_secs(60)),
        ));
        let app = service!(data);

        for _ in 0..50 {
            test::call_service(&app, test::TestRequest::get().uri("/api/state").to_request())
                .await;
        }
        assert_eq!(data.sessions.len(), 5);
    }

    #[actix_web::test]
    async fn moves_persist_for_the_same_cookie() {
        let data = app_state();
        let app = service!(data);
        let session = session_cookie('a');

        for _ in 0..3 {
            let req = test::TestRequest::post()
                .uri("/api/move")
                .cookie(session.clone())
                .set_json(json!({ "direction": "e" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.response().cookies().next().is_none());
        }

        let req = test::TestRequest::get()
            .uri("/api/state")
            .cookie(session.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["moves"], 3);
        assert_eq!(body["bag"], 1);
        assert_eq!(body["message"], "Welcome back!");
        assert_eq!(body["history"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["history"][2], "Moved E. Picked up a gift.");
    }

    #[actix_web::test]
    async fn blocked_and_garbled_moves_only_add_history() {
        let data = app_state();
        let app = service!(data);
        let session = session_cookie('b');

        let req = test::TestRequest::post()
            .uri("/api/move")
            .cookie(session.clone())
            .set_json(json!({ "direction": "N" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "A snowbank blocks the path! Try: S, E");
        assert_eq!(body["moves"], 0);

        let req = test::TestRequest::post()
            .uri("/api/move")
            .cookie(session.clone())
            .set_payload("not json")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Unknown direction. Use N, S, E, or W.");
        assert_eq!(body["moves"], 0);
        assert_eq!(body["history"].as_array().map(Vec::len), Some(2));
    }

    #[actix_web::test]
    async fn new_game_resets_the_session() {
        let data = app_state();
        let app = service!(data);
        let session = session_cookie('c');

        let req = test::TestRequest::post()
            .uri("/api/move")
            .cookie(session.clone())
            .set_json(json!({ "direction": "s" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/new")
            .cookie(session.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "New game started! 🎁");
        assert_eq!(body["moves"], 0);
        assert_eq!(body["history"], json!([]));

        let stored = data.sessions.snapshot_json(session.value()).unwrap();
        assert_eq!(SantaGame::from_json(&stored).unwrap().moves(), 0);
    }

    #[actix_web::test]
    async fn corrupt_stored_snapshot_starts_over() {
        let data = app_state();
        let session = session_cookie('d');
        data.sessions
            .insert_json(session.value(), "{\"grid\": 7}".to_string());
        let app = service!(data);

        let req = test::TestRequest::get()
            .uri("/api/state")
            .cookie(session.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["moves"], 0);
        assert_eq!(body["delivered"], 0);
    }

    #[actix_web::test]
    async fn winning_run_over_http() {
        let data = app_state();
        let app = service!(data);
        let session = session_cookie('e');
        let route = "e e e e e e w w w w w w s s s e e e e e s s w w w w w";

        let mut last = Value::Null;
        for step in route.split(' ') {
            let req = test::TestRequest::post()
                .uri("/api/move")
                .cookie(session.clone())
                .set_json(json!({ "direction": step }))
                .to_request();
            last = test::call_and_read_body_json(&app, req).await;
        }

        assert_eq!(last["isWon"], true);
        assert_eq!(last["isLost"], false);
        assert_eq!(last["delivered"], 3);
        assert_eq!(last["status"], "Victory! Every house received a gift. 🎄");
    }
}
