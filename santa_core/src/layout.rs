//! Parsing of textual map layouts.
//!
//! A layout is a rectangle of single-character markers:
//!
//! | char | meaning                     |
//! |------|-----------------------------|
//! | `#`  | wall                        |
//! | `.`  | open floor                  |
//! | `S`  | Santa's start (open floor)  |
//! | `G`  | gift (open floor)           |
//! | `H`  | house (open floor)          |

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    map::{Grid, GridError},
};

/// The map every new game uses unless another layout is supplied.
pub const DEFAULT_LAYOUT: &str = "\
#########
#S..G..H#
#...#...#
#..#....#
#G....H.#
#...#...#
#H..G...#
#########";

/// Move budget for a new game.
pub const DEFAULT_MAX_MOVES: u32 = 28;

/// Represents the static type of a cell in the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Open,
    Wall,
}

impl CellType {
    /// Terrain for a layout marker, ignoring what else the marker places.
    pub fn from_marker(marker: char) -> Option<CellType> {
        match marker {
            '#' => Some(CellType::Wall),
            '.' | 'S' | 'G' | 'H' => Some(CellType::Open),
            _ => None,
        }
    }

    pub fn marker(self) -> char {
        match self {
            CellType::Open => '.',
            CellType::Wall => '#',
        }
    }
}

/// Errors raised while turning text into a playable map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Layout is empty.")]
    Empty,
    #[error(transparent)]
    Shape(#[from] GridError),
    #[error("Unknown map marker '{marker}' at position ({row}, {col}).")]
    UnknownMarker { marker: char, row: usize, col: usize },
    #[error("Santa start position 'S' is required on the grid.")]
    MissingStart,
    #[error("Multiple start positions ('S') found.")]
    MultipleStarts,
    #[error("Move budget must be at least 1.")]
    ZeroMoveBudget,
}

/// Everything a layout places on the map.
#[derive(Debug, Clone)]
pub struct Layout {
    pub terrain: Grid<CellType>,
    pub start: Position,
    pub gifts: HashSet<Position>,
    pub houses: HashSet<Position>,
}

/// Splits layout text into rows of characters.
///
/// Surrounding whitespace on each line and blank lines at either end are dropped.
fn layout_rows<S: AsRef<str>>(lines: impl IntoIterator<Item = S>) -> Vec<Vec<char>> {
    let mut rows: Vec<Vec<char>> = lines
        .into_iter()
        .map(|line| line.as_ref().trim().chars().collect())
        .collect();
    while rows.last().is_some_and(Vec::is_empty) {
        rows.pop();
    }
    let leading = rows.iter().take_while(|r| r.is_empty()).count();
    rows.drain(..leading);
    rows
}

/// Builds terrain only from marker rows, ignoring start/gift/house placement.
pub fn terrain_from_rows<S: AsRef<str>>(
    lines: impl IntoIterator<Item = S>,
) -> Result<Grid<CellType>, LayoutError> {
    let rows = layout_rows(lines);
    if rows.is_empty() {
        return Err(LayoutError::Empty);
    }

    let mut cells = Vec::with_capacity(rows.len());
    for (row, markers) in rows.into_iter().enumerate() {
        let mut line = Vec::with_capacity(markers.len());
        for (col, marker) in markers.into_iter().enumerate() {
            let cell = CellType::from_marker(marker)
                .ok_or(LayoutError::UnknownMarker { marker, row, col })?;
            line.push(cell);
        }
        cells.push(line);
    }
    Ok(Grid::from_rows(cells)?)
}

/// Parses a full layout: terrain plus the start, gift and house markers.
pub fn parse_layout(text: &str) -> Result<Layout, LayoutError> {
    let terrain = terrain_from_rows(text.lines())?;

    let mut start = None;
    let mut gifts = HashSet::new();
    let mut houses = HashSet::new();

    for (row, markers) in layout_rows(text.lines()).into_iter().enumerate() {
        for (col, marker) in markers.into_iter().enumerate() {
            let pos = Position::new(row, col);
            match marker {
                'S' => {
                    if start.is_some() {
                        return Err(LayoutError::MultipleStarts);
                    }
                    start = Some(pos);
                }
                'G' => {
                    gifts.insert(pos);
                }
                'H' => {
                    houses.insert(pos);
                }
                _ => {}
            }
        }
    }

    let start = start.ok_or(LayoutError::MissingStart)?;

    Ok(Layout {
        terrain,
        start,
        gifts,
        houses,
    })
}
