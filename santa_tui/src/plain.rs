//! Line-by-line prompt mode for terminals without full-screen support.

use std::io::{self, BufRead, Write};

use santa_core::SantaGame;

use crate::command::Command;

const PROMPT: &str = "Enter move (N, S, E, W, LOOK, STATUS, QUIT): ";

fn print_map<W: Write>(game: &SantaGame, out: &mut W) -> io::Result<()> {
    writeln!(out, "Current map:")?;
    writeln!(out, "{}", game.render_text())?;
    writeln!(out, "{}", game.status())
}

fn print_intro<W: Write>(game: &SantaGame, out: &mut W) -> io::Result<()> {
    writeln!(out, "🎅 Welcome to Santa's Delivery Run!")?;
    writeln!(
        out,
        "Collect all gifts and deliver them to every house before you run out of moves."
    )?;
    writeln!(out, "{}", SantaGame::help_text())?;
    writeln!(out)?;
    print_map(game, out)
}

/// Runs the prompt loop until the game ends, the player quits or input runs dry.
pub fn run<R: BufRead, W: Write>(game: &mut SantaGame, input: R, out: &mut W) -> io::Result<()> {
    print_intro(game, out)?;

    let mut lines = input.lines();
    while !game.is_over() {
        write!(out, "\n{PROMPT}")?;
        out.flush()?;

        let Some(line) = lines.next().transpose()? else {
            writeln!(out)?;
            writeln!(out, "Thanks for playing! Goodbye.")?;
            return Ok(());
        };

        match Command::parse(&line) {
            Command::Quit => {
                writeln!(out, "Thanks for playing! Goodbye.")?;
                return Ok(());
            }
            Command::Look => print_map(game, out)?,
            Command::Status => writeln!(out, "{}", game.status())?,
            Command::Move(direction) => {
                let outcome = game.move_direction(direction);
                writeln!(out, "{outcome}")?;
                print_map(game, out)?;
            }
            Command::Unknown => {
                writeln!(out, "Sorry, I don't know that command. Try N, S, E, or W.")?
            }
        }
    }

    writeln!(out, "{}", game.status())
}
