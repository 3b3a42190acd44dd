pub mod common;
pub mod config;
pub mod error;
pub mod grid;
pub mod search;
pub mod session;
pub mod stat;

pub use common::{Cell, CellKind, Path, SearchStatus};
pub use error::{GridError, GridResult};
pub use grid::{Grid, ObstacleFill};
pub use search::{heuristic, IncrementalAStar};
pub use session::{Command, SearchReport, Session};
