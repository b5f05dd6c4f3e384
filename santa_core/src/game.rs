use std::{collections::HashSet, fmt};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    Direction, Position, join_directions,
    layout::{CellType, DEFAULT_LAYOUT, DEFAULT_MAX_MOVES, Layout, LayoutError, parse_layout},
    map::Grid,
};

/// What a rendered board shows at one cell.
///
/// Precedence when several apply: Santa, gift, house, wall, path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Santa,
    Gift,
    House,
    Wall,
    Path,
}

impl CellKind {
    pub fn marker(self) -> char {
        match self {
            CellKind::Santa => 'S',
            CellKind::Gift => 'G',
            CellKind::House => 'H',
            CellKind::Wall => '#',
            CellKind::Path => '.',
        }
    }
}

/// Represents the outcome of a single move attempt.
///
/// `Display` yields the message recorded in the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Santa moved; `delivered` is the number of gifts dropped at a house, if any.
    Moved {
        direction: Direction,
        picked_up: bool,
        delivered: Option<u32>,
    },
    /// Wall or edge in the way. Lists the directions open from the unchanged position.
    Blocked { open_paths: Vec<Direction> },
    UnknownDirection,
    /// The game already ended.
    GameOver,
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveOutcome::Moved {
                direction,
                picked_up,
                delivered,
            } => {
                write!(f, "Moved {direction}.")?;
                if *picked_up {
                    write!(f, " Picked up a gift.")?;
                }
                if let Some(count) = delivered {
                    write!(f, " Delivered {count} gift(s)!")?;
                }
                Ok(())
            }
            MoveOutcome::Blocked { open_paths } if open_paths.is_empty() => {
                write!(f, "A snowbank blocks the path! No paths open.")
            }
            MoveOutcome::Blocked { open_paths } => {
                write!(
                    f,
                    "A snowbank blocks the path! Try: {}",
                    join_directions(open_paths)
                )
            }
            MoveOutcome::UnknownDirection => write!(f, "Unknown direction. Use N, S, E, or W."),
            MoveOutcome::GameOver => {
                write!(f, "The night is over. Start a new game to keep delivering.")
            }
        }
    }
}

/// Progress report derived from the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Won,
    Lost,
    InProgress {
        bag: u32,
        delivered: u32,
        wins_at: u32,
        moves_left: u32,
        open_paths: Vec<Direction>,
    },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Won => write!(f, "Victory! Every house received a gift. 🎄"),
            Status::Lost => write!(f, "The night ended before Santa finished deliveries."),
            Status::InProgress {
                bag,
                delivered,
                wins_at,
                moves_left,
                open_paths,
            } => {
                let paths = if open_paths.is_empty() {
                    "None".to_string()
                } else {
                    join_directions(open_paths)
                };
                write!(
                    f,
                    "Bag: {bag} | Delivered: {delivered}/{wins_at} | Moves left: {moves_left} | Open paths: {paths}"
                )
            }
        }
    }
}

/// Stateful model that tracks the progress of one delivery run.
#[derive(Debug, Clone)]
pub struct SantaGame {
    pub(crate) terrain: Grid<CellType>,
    pub(crate) santa: Position,
    pub(crate) gifts: HashSet<Position>,
    pub(crate) houses: HashSet<Position>,
    pub(crate) bag: u32,
    pub(crate) delivered: u32,
    pub(crate) moves: u32,
    pub(crate) max_moves: u32,
    pub(crate) wins_at: u32,
    pub(crate) history: Vec<String>,
}

impl Default for SantaGame {
    fn default() -> Self {
        Self::new(DEFAULT_LAYOUT, DEFAULT_MAX_MOVES).expect("default layout is valid")
    }
}

impl SantaGame {
    /// Creates a game from layout text with the given move budget.
    pub fn new(layout: &str, max_moves: u32) -> Result<Self, LayoutError> {
        let layout = parse_layout(layout)?;
        Self::from_layout(layout, max_moves)
    }

    /// Creates a game from an already parsed layout.
    pub fn from_layout(layout: Layout, max_moves: u32) -> Result<Self, LayoutError> {
        if max_moves == 0 {
            return Err(LayoutError::ZeroMoveBudget);
        }
        let Layout {
            terrain,
            start,
            mut gifts,
            houses,
        } = layout;

        let wins_at = gifts.len() as u32;
        // A gift under the start marker can't coexist with Santa.
        let bag = u32::from(gifts.remove(&start));

        Ok(SantaGame {
            terrain,
            santa: start,
            gifts,
            houses,
            bag,
            delivered: 0,
            moves: 0,
            max_moves,
            wins_at,
            history: Vec::new(),
        })
    }

    pub fn santa(&self) -> Position {
        self.santa
    }

    pub fn bag(&self) -> u32 {
        self.bag
    }

    pub fn delivered(&self) -> u32 {
        self.delivered
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn max_moves(&self) -> u32 {
        self.max_moves
    }

    /// Total gifts on the map when the game began.
    pub fn wins_at(&self) -> u32 {
        self.wins_at
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn gifts(&self) -> &HashSet<Position> {
        &self.gifts
    }

    pub fn houses(&self) -> &HashSet<Position> {
        &self.houses
    }

    pub fn terrain(&self) -> &Grid<CellType> {
        &self.terrain
    }

    pub fn remaining_moves(&self) -> u32 {
        self.max_moves.saturating_sub(self.moves)
    }

    pub fn is_won(&self) -> bool {
        self.gifts.is_empty() && self.bag == 0
    }

    pub fn is_lost(&self) -> bool {
        self.moves >= self.max_moves && !self.is_won()
    }

    pub fn is_over(&self) -> bool {
        self.is_won() || self.is_lost()
    }

    fn is_walkable(&self, pos: Position) -> bool {
        matches!(self.terrain.get(pos), Some(CellType::Open))
    }

    fn target(&self, direction: Direction) -> Option<Position> {
        self.santa
            .step(direction)
            .filter(|pos| self.is_walkable(*pos))
    }

    /// Directions that lead to an open cell from Santa's current position.
    pub fn available_moves(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|d| self.target(*d).is_some())
            .collect()
    }

    /// Attempts a move from a typed direction word such as `"e"` or `"north"`.
    ///
    /// Words that don't name a direction produce [`MoveOutcome::UnknownDirection`].
    pub fn move_santa(&mut self, input: &str) -> MoveOutcome {
        match input.parse::<Direction>() {
            Ok(direction) => self.move_direction(direction),
            Err(_) => self.record(MoveOutcome::UnknownDirection),
        }
    }

    /// Attempts to move Santa one cell, collecting and delivering on arrival.
    pub fn move_direction(&mut self, direction: Direction) -> MoveOutcome {
        if self.is_over() {
            return self.record(MoveOutcome::GameOver);
        }

        let Some(target) = self.target(direction) else {
            trace!("move {direction} blocked at {:?}", self.santa);
            let open_paths = self.available_moves();
            return self.record(MoveOutcome::Blocked { open_paths });
        };

        self.santa = target;
        self.moves = self.moves.saturating_add(1);

        let picked_up = self.gifts.remove(&target);
        if picked_up {
            self.bag = self.bag.saturating_add(1);
        }

        let delivered = if self.houses.contains(&target) && self.bag > 0 {
            let count = self.bag;
            self.delivered = self.delivered.saturating_add(count);
            self.bag = 0;
            Some(count)
        } else {
            None
        };

        debug!(
            "santa moved {direction} to {:?} (moves {}/{}, bag {}, delivered {})",
            target, self.moves, self.max_moves, self.bag, self.delivered
        );

        self.record(MoveOutcome::Moved {
            direction,
            picked_up,
            delivered,
        })
    }

    fn record(&mut self, outcome: MoveOutcome) -> MoveOutcome {
        self.history.push(outcome.to_string());
        outcome
    }

    pub fn status(&self) -> Status {
        if self.is_won() {
            Status::Won
        } else if self.is_lost() {
            Status::Lost
        } else {
            Status::InProgress {
                bag: self.bag,
                delivered: self.delivered,
                wins_at: self.wins_at,
                moves_left: self.remaining_moves(),
                open_paths: self.available_moves(),
            }
        }
    }

    fn cell_kind(&self, pos: Position, cell: CellType) -> CellKind {
        if pos == self.santa {
            CellKind::Santa
        } else if self.gifts.contains(&pos) {
            CellKind::Gift
        } else if self.houses.contains(&pos) {
            CellKind::House
        } else if cell == CellType::Wall {
            CellKind::Wall
        } else {
            CellKind::Path
        }
    }

    /// Classifies every cell of the board for display.
    pub fn render(&self) -> Grid<CellKind> {
        self.terrain.map(|pos, cell| self.cell_kind(pos, *cell))
    }

    /// The rendered board as nested rows, for UI payloads.
    pub fn board_cells(&self) -> Vec<Vec<CellKind>> {
        self.render().to_rows()
    }

    /// Printable version of the current map using layout markers.
    pub fn render_text(&self) -> String {
        self.render()
            .rows()
            .map(|row| row.iter().map(|kind| kind.marker()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn help_text() -> &'static str {
        "Commands: N, S, E, W to move. LOOK to view the map, STATUS for progress, and QUIT to exit."
    }
}
