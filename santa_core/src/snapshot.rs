//! Plain-data snapshot of a game, for storing outside the process.
//!
//! The JSON layout is stable: field names match what earlier releases wrote,
//! coordinate sets are unordered `[row, col]` pairs, and `version` defaults to
//! 1 when absent. [`SantaGame::from_snapshot`] validates everything before a
//! game is rebuilt.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    game::SantaGame,
    layout::{CellType, LayoutError, terrain_from_rows},
    map::Grid,
};

pub const SNAPSHOT_VERSION: u32 = 1;

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Errors raised while restoring a game from a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON for a game: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("snapshot grid is invalid: {0}")]
    Grid(#[source] LayoutError),
    #[error("snapshot has a zero move budget")]
    ZeroMoveBudget,
    #[error("{what} at ({row}, {col}) is outside the grid or inside a wall")]
    NotWalkable {
        what: &'static str,
        row: usize,
        col: usize,
    },
    #[error("({row}, {col}) is both a gift and a house")]
    GiftOnHouse { row: usize, col: usize },
    #[error("gift at ({row}, {col}) is under Santa")]
    GiftUnderSanta { row: usize, col: usize },
    #[error("grid row {row} is blank or contains whitespace")]
    BlankRow { row: usize },
    #[error(
        "gift counts don't add up: {delivered} delivered + {bag} carried + {on_map} on the map != {wins_at}"
    )]
    GiftCountMismatch {
        delivered: u32,
        bag: u32,
        on_map: usize,
        wins_at: u32,
    },
    #[error("{moves} moves taken exceeds the budget of {max_moves}")]
    MovesOverBudget { moves: u32, max_moves: u32 },
}

/// Every piece of game state as plain serializable data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    pub max_moves: u32,
    pub grid: Vec<String>,
    pub santa_pos: (usize, usize),
    pub bag: u32,
    pub delivered: u32,
    pub moves: u32,
    pub history: Vec<String>,
    pub gifts: Vec<(usize, usize)>,
    pub houses: Vec<(usize, usize)>,
    #[serde(default, alias = "_wins_at", skip_serializing_if = "Option::is_none")]
    pub wins_at: Option<u32>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn sorted_pairs(set: &HashSet<Position>) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize)> = set.iter().map(|p| (*p).into()).collect();
    pairs.sort_unstable();
    pairs
}

/// Snapshot rows are written verbatim, so unlike layout files they must not
/// need trimming.
fn snapshot_terrain(rows: &[String]) -> Result<Grid<CellType>, SnapshotError> {
    if let Some(row) = rows
        .iter()
        .position(|line| line.is_empty() || line.chars().any(char::is_whitespace))
    {
        return Err(SnapshotError::BlankRow { row });
    }
    terrain_from_rows(rows).map_err(SnapshotError::Grid)
}

fn walkable_set(
    terrain: &Grid<CellType>,
    pairs: &[(usize, usize)],
    what: &'static str,
) -> Result<HashSet<Position>, SnapshotError> {
    pairs
        .iter()
        .map(|&pair| {
            let pos = Position::from(pair);
            check_walkable(terrain, pos, what).map(|_| pos)
        })
        .collect()
}

fn check_walkable(
    terrain: &Grid<CellType>,
    pos: Position,
    what: &'static str,
) -> Result<(), SnapshotError> {
    match terrain.get(pos) {
        Some(CellType::Open) => Ok(()),
        _ => Err(SnapshotError::NotWalkable {
            what,
            row: pos.row,
            col: pos.col,
        }),
    }
}

impl SantaGame {
    /// Captures the complete state of the game.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            max_moves: self.max_moves,
            grid: self
                .terrain
                .rows()
                .map(|row| row.iter().map(|cell| cell.marker()).collect())
                .collect(),
            santa_pos: self.santa.into(),
            bag: self.bag,
            delivered: self.delivered,
            moves: self.moves,
            history: self.history.clone(),
            gifts: sorted_pairs(&self.gifts),
            houses: sorted_pairs(&self.houses),
            wins_at: Some(self.wins_at),
        }
    }

    /// Rebuilds a game from a snapshot, rejecting anything that breaks the
    /// game's invariants.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        if snapshot.max_moves == 0 {
            return Err(SnapshotError::ZeroMoveBudget);
        }
        if snapshot.moves > snapshot.max_moves {
            return Err(SnapshotError::MovesOverBudget {
                moves: snapshot.moves,
                max_moves: snapshot.max_moves,
            });
        }

        let terrain = snapshot_terrain(&snapshot.grid)?;

        let santa = Position::from(snapshot.santa_pos);
        check_walkable(&terrain, santa, "santa")?;
        let gifts = walkable_set(&terrain, &snapshot.gifts, "gift")?;
        let houses = walkable_set(&terrain, &snapshot.houses, "house")?;

        if let Some(pos) = gifts.intersection(&houses).next() {
            return Err(SnapshotError::GiftOnHouse {
                row: pos.row,
                col: pos.col,
            });
        }
        if gifts.contains(&santa) {
            return Err(SnapshotError::GiftUnderSanta {
                row: santa.row,
                col: santa.col,
            });
        }

        // Every gift is delivered, carried or still on the map.
        let mismatch = || SnapshotError::GiftCountMismatch {
            delivered: snapshot.delivered,
            bag: snapshot.bag,
            on_map: gifts.len(),
            wins_at: snapshot.wins_at.unwrap_or(0),
        };
        let total = u32::try_from(gifts.len())
            .ok()
            .and_then(|on_map| on_map.checked_add(snapshot.bag))
            .and_then(|sum| sum.checked_add(snapshot.delivered))
            .ok_or_else(mismatch)?;
        let wins_at = snapshot.wins_at.unwrap_or(total);
        if wins_at != total {
            return Err(mismatch());
        }

        Ok(SantaGame {
            terrain,
            santa,
            gifts,
            houses,
            bag: snapshot.bag,
            delivered: snapshot.delivered,
            moves: snapshot.moves,
            max_moves: snapshot.max_moves,
            wins_at,
            history: snapshot.history,
        })
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        self.snapshot().to_json()
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Self::from_snapshot(Snapshot::from_json(json)?)
    }
}
