use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use santa_core::{DEFAULT_LAYOUT, DEFAULT_MAX_MOVES, SantaGame, game::CellKind};
use std::{
    io::{self, Stdout},
    path::PathBuf,
};

mod command;
mod plain;

#[derive(Parser, Debug)]
#[command(version, about = "Santa's Delivery Run", long_about = None)]
struct Args {
    /// Map file to load
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Moves Santa may make before the night ends
    #[arg(long, default_value_t = DEFAULT_MAX_MOVES)]
    max_moves: u32,

    /// Use a line-by-line prompt instead of the full-screen board
    #[arg(long)]
    plain: bool,
}

const GAME_OVER_PROMPT: &str = "Press 'r' to play again or 'q' to quit.";

struct App {
    /// The game being played.
    game: SantaGame,
    /// Fresh copy of the game for restarts.
    initial: SantaGame,
    /// Outcome of the last key press.
    message: String,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(game: SantaGame) -> Self {
        App {
            initial: game.clone(),
            game,
            message: "Use the arrow keys or N/S/E/W to start moving.".to_string(),
            should_quit: false,
        }
    }

    fn on_key(&mut self, code: KeyCode) {
        let direction = match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('r') => {
                self.game = self.initial.clone();
                self.message = "New game started! 🎁".to_string();
                return;
            }
            // The board freezes on the final state until restart or quit.
            _ if self.game.is_over() => return,
            KeyCode::Up | KeyCode::Char('n') => santa_core::Direction::North,
            KeyCode::Down | KeyCode::Char('s') => santa_core::Direction::South,
            KeyCode::Left | KeyCode::Char('w') => santa_core::Direction::West,
            KeyCode::Right | KeyCode::Char('e') => santa_core::Direction::East,
            _ => return,
        };
        self.message = self.game.move_direction(direction).to_string();
        if self.game.is_over() {
            self.message.push_str(" ");
            self.message.push_str(GAME_OVER_PROMPT);
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    let layout = match &args.map {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read map file {}", path.display()))?,
        None => DEFAULT_LAYOUT.to_string(),
    };
    let mut game = SantaGame::new(&layout, args.max_moves).context("Failed to load map")?;

    if args.plain {
        let stdin = io::stdin();
        plain::run(&mut game, stdin.lock(), &mut io::stdout())?;
        return Ok(());
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    let mut app = App::new(game);
    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal state even if the loop failed
    restore_terminal(&mut terminal)?;
    result?;

    println!("{}", app.game.status());
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.on_key(key.code);
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55), // Area for the map
            Constraint::Percentage(35), // Area for status and history
            Constraint::Percentage(10), // Area for help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &app.game);

    let info_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main_layout[1]);
    render_status(frame, info_layout[0], app);
    render_history(frame, info_layout[1], &app.game);

    let help = if app.game.is_over() {
        GAME_OVER_PROMPT
    } else {
        "Arrows or N/S/E/W move, 'r' restarts, 'q' or 'Esc' quits."
    };
    let help_text = Paragraph::new(help)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn cell_span(kind: CellKind) -> Span<'static> {
    match kind {
        CellKind::Santa => Span::styled("S", Style::default().fg(Color::Red).bold()),
        CellKind::Gift => Span::styled("G", Style::default().fg(Color::Yellow)),
        CellKind::House => Span::styled("H", Style::default().fg(Color::Green)),
        CellKind::Wall => Span::styled("#", Style::default().fg(Color::DarkGray)),
        CellKind::Path => Span::raw(" "),
    }
}

/// Renders the board onto the frame.
fn render_map(frame: &mut Frame, area: Rect, game: &SantaGame) {
    let board = game.render();
    let lines: Vec<Line> = board
        .rows()
        .map(|row| Line::from(row.iter().map(|kind| cell_span(*kind)).collect::<Vec<_>>()))
        .collect();

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("North Pole").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let game = &app.game;
    let status_style = if game.is_won() {
        Style::default().fg(Color::Green).bold()
    } else if game.is_lost() {
        Style::default().fg(Color::Red).bold()
    } else {
        Style::default()
    };

    let lines = vec![
        Line::from(Span::styled(game.status().to_string(), status_style)),
        Line::from(format!(
            "Moves: {}/{}  Bag: {}  Delivered: {}/{}",
            game.moves(),
            game.max_moves(),
            game.bag(),
            game.delivered(),
            game.wins_at()
        )),
        Line::from(""),
        Line::from(app.message.as_str()),
    ];

    let status = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}

fn render_history(frame: &mut Frame, area: Rect, game: &SantaGame) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = game
        .history()
        .iter()
        .rev()
        .take(visible)
        .map(|entry| ListItem::new(entry.as_str()))
        .collect();

    let history =
        List::new(items).block(Block::default().borders(Borders::ALL).title("History"));
    frame.render_widget(history, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_drive_the_game() {
        let mut app = App::new(SantaGame::default());
        app.on_key(KeyCode::Right);
        app.on_key(KeyCode::Char('e'));
        app.on_key(KeyCode::Right);
        assert_eq!(app.game.bag(), 1);
        assert_eq!(app.message, "Moved E. Picked up a gift.");

        app.on_key(KeyCode::Up);
        assert!(app.message.contains("snowbank"));
        assert_eq!(app.game.moves(), 3);
    }

    #[test]
    fn restart_and_quit() {
        let mut app = App::new(SantaGame::default());
        app.on_key(KeyCode::Down);
        app.on_key(KeyCode::Char('r'));
        assert_eq!(app.message, "New game started! 🎁");
        assert_eq!(app.game.moves(), 0);
        assert!(app.game.history().is_empty());
        assert!(!app.should_quit);

        app.on_key(KeyCode::Char('x'));
        assert!(!app.should_quit);
        app.on_key(KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn finished_game_waits_for_restart_or_quit() {
        let mut app = App::new(SantaGame::new("SG.\n..H", 2).unwrap());
        app.on_key(KeyCode::Right);
        app.on_key(KeyCode::Down);
        assert!(app.game.is_lost());
        assert!(app.message.ends_with(GAME_OVER_PROMPT));

        let history = app.game.history().len();
        app.on_key(KeyCode::Right);
        app.on_key(KeyCode::Char('n'));
        assert_eq!(app.game.history().len(), history);
        assert!(app.message.ends_with(GAME_OVER_PROMPT));
        assert!(!app.should_quit);

        app.on_key(KeyCode::Char('r'));
        assert!(!app.game.is_over());
        app.on_key(KeyCode::Right);
        assert_eq!(app.game.bag(), 1);
    }
}
