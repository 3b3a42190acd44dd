use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A grid coordinate, 0-indexed. Ordered by `x`, then `y`.
///
/// Deserializes from the `"x,y"` text used on the command line, or from
/// `{x, y}` fields as written in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "CellRepr")]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Cell { x, y }
    }

    pub fn manhattan(&self, other: Cell) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl From<(usize, usize)> for Cell {
    fn from((x, y): (usize, usize)) -> Self {
        Cell { x, y }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CellRepr {
    Text(String),
    Fields { x: usize, y: usize },
}

impl TryFrom<CellRepr> for Cell {
    type Error = String;

    fn try_from(repr: CellRepr) -> Result<Self, Self::Error> {
        match repr {
            CellRepr::Text(text) => text.parse(),
            CellRepr::Fields { x, y } => Ok(Cell { x, y }),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl FromStr for Cell {
    type Err = String;

    // Accepts "x,y", optionally wrapped in parentheses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (x, y) = trimmed
            .split_once(',')
            .ok_or_else(|| format!("expected \"x,y\", got {s:?}"))?;
        let x = x
            .trim()
            .parse::<usize>()
            .map_err(|err| format!("invalid x coordinate in {s:?}: {err}"))?;
        let y = y
            .trim()
            .parse::<usize>()
            .map_err(|err| format!("invalid y coordinate in {s:?}: {err}"))?;
        Ok(Cell { x, y })
    }
}

/// Cells of a path. The search hands them out goal-first.
pub type Path = Vec<Cell>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Uninitialized,
    Running,
    Succeeded,
    Failed,
}

impl SearchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchStatus::Succeeded | SearchStatus::Failed)
    }
}

/// Per-cell classification handed to whatever draws the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Free,
    Obstacle,
    Start,
    Goal,
    // Search-derived markers, only produced by the session layer.
    Frontier,
    Searched,
    Path,
}

impl CellKind {
    pub(crate) fn symbol(&self) -> char {
        match self {
            CellKind::Free => '.',
            CellKind::Obstacle => '@',
            CellKind::Start => 'S',
            CellKind::Goal => 'G',
            CellKind::Frontier => 'o',
            CellKind::Searched => 'x',
            CellKind::Path => '*',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_str() {
        assert_eq!("3,4".parse::<Cell>().unwrap(), Cell::new(3, 4));
        assert_eq!(" (0, 12) ".parse::<Cell>().unwrap(), Cell::new(0, 12));
        assert!("3".parse::<Cell>().is_err());
        assert!("a,1".parse::<Cell>().is_err());
        assert!("-1,1".parse::<Cell>().is_err());
    }

    #[test]
    fn test_cell_ordering_is_lexicographic() {
        let mut cells = vec![Cell::new(1, 0), Cell::new(0, 2), Cell::new(0, 1)];
        cells.sort();
        assert_eq!(cells, vec![Cell::new(0, 1), Cell::new(0, 2), Cell::new(1, 0)]);
    }

    #[test]
    fn test_terminal_status() {
        assert!(!SearchStatus::Uninitialized.is_terminal());
        assert!(!SearchStatus::Running.is_terminal());
        assert!(SearchStatus::Succeeded.is_terminal());
        assert!(SearchStatus::Failed.is_terminal());
    }
}
