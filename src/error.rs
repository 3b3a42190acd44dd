use thiserror::Error;

use crate::common::Cell;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Grid size must be at least 2, got {0}")]
    InvalidSize(usize),

    #[error("Obstacle fraction must lie within [0, 1], got {0}")]
    InvalidObstacleFraction(f64),

    #[error("Cell {cell} is outside the {width}x{height} grid")]
    OutOfBounds {
        cell: Cell,
        width: usize,
        height: usize,
    },

    #[error("Cell {0} is already taken by the other endpoint")]
    EndpointCollision(Cell),

    #[error("Malformed map: {0}")]
    MapFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GridResult<T> = Result<T, GridError>;
