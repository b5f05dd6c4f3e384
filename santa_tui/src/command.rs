use santa_core::Direction;

/// A word typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Look,
    Status,
    Quit,
    Unknown,
}

impl Command {
    /// Parses one line of input; case and surrounding whitespace are ignored.
    pub fn parse(input: &str) -> Command {
        let word = input.trim().to_ascii_lowercase();
        match word.as_str() {
            "q" | "quit" => Command::Quit,
            "l" | "look" => Command::Look,
            "status" => Command::Status,
            other => other.parse().map(Command::Move).unwrap_or(Command::Unknown),
        }
    }
}
