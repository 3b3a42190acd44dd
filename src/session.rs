use std::fs::File;
use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::common::{Cell, CellKind, Path, SearchStatus};
use crate::error::GridResult;
use crate::grid::Grid;
use crate::search::IncrementalAStar;
use crate::stat::Stats;

/// Driver inputs, one per user action of an interactive front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start or pause continuous searching.
    ToggleRun,
    /// Perform a single expansion.
    Step,
    Reset,
    MoveStart(Cell),
    MoveGoal(Cell),
}

/// Owns one grid and one search and runs the control loop around them.
#[derive(Debug, Clone)]
pub struct Session {
    grid: Grid,
    search: IncrementalAStar,
    running: bool,
    initialized: bool,
    path: Path,
}

impl Session {
    pub fn new(grid: Grid) -> Self {
        Session {
            grid,
            search: IncrementalAStar::new(),
            running: false,
            initialized: false,
            path: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn search(&self) -> &IncrementalAStar {
        &self.search
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Path to the last examined cell, goal-first. Empty after a reset.
    pub fn path(&self) -> &[Cell] {
        &self.path
    }

    /// Relocation errors are returned before anything changes.
    pub fn apply(&mut self, command: Command) -> GridResult<()> {
        debug!("apply {command:?}");
        match command {
            Command::ToggleRun => self.running = !self.running,
            Command::Step => self.step_once(),
            Command::Reset => self.reset(),
            Command::MoveStart(cell) => {
                self.grid.move_start(cell)?;
                self.reset();
            }
            Command::MoveGoal(cell) => {
                self.grid.move_goal(cell)?;
                self.reset();
            }
        }
        Ok(())
    }

    fn step_once(&mut self) {
        if !self.initialized {
            self.search.reset(&self.grid);
            self.initialized = true;
        }
        self.search.step(&self.grid);
        self.path = self.search.current_path();
    }

    fn reset(&mut self) {
        self.running = false;
        self.search.reset(&self.grid);
        self.initialized = true;
        self.path.clear();
    }

    /// One iteration of the run loop. Does nothing while paused.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.initialized {
            self.search.reset(&self.grid);
            self.initialized = true;
        } else if self.search.status().is_terminal() {
            info!("search finished: {:?}", self.search.status());
            self.running = false;
            // The next run starts a fresh search.
            self.initialized = false;
        } else {
            self.search.step(&self.grid);
            self.path = self.search.current_path();
        }
    }

    /// Headless batch mode: runs a fresh search until it terminates or
    /// `max_steps` expansions have been attempted.
    #[instrument(skip_all, name = "run", fields(start = %self.grid.start(), goal = %self.grid.goal()), level = "debug")]
    pub fn run(&mut self, max_steps: Option<usize>) -> SearchStatus {
        self.reset();
        self.running = true;

        while self.running {
            if let Some(limit) = max_steps {
                if self.search.stats().steps >= limit && !self.search.status().is_terminal() {
                    info!("step limit {limit} reached, pausing search");
                    self.running = false;
                    break;
                }
            }
            self.tick();
        }

        self.search.status()
    }

    /// Grid classification with the search state drawn on top.
    pub fn classify(&self, cell: Cell) -> CellKind {
        match self.grid.classify(cell) {
            CellKind::Free if self.path.contains(&cell) => CellKind::Path,
            CellKind::Free if self.search.is_closed(cell) => CellKind::Searched,
            CellKind::Free if self.search.is_open(cell) => CellKind::Frontier,
            kind => kind,
        }
    }

    /// One line of symbols per grid row.
    pub fn snapshot(&self) -> String {
        let mut out = String::with_capacity((self.grid.width() + 1) * self.grid.height());
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                out.push(self.classify(Cell::new(x, y)).symbol());
            }
            out.push('\n');
        }
        out
    }

    pub fn report(&self) -> SearchReport {
        let mut path = self.path.clone();
        path.reverse();
        let cost = (self.search.status() == SearchStatus::Succeeded)
            .then(|| path.len().saturating_sub(1));
        SearchReport {
            status: self.search.status(),
            start: self.grid.start(),
            goal: self.grid.goal(),
            width: self.grid.width(),
            height: self.grid.height(),
            obstacles: self.grid.obstacle_count(),
            cost,
            path,
            stats: self.search.stats().clone(),
        }
    }
}

/// Outcome of a search, path in start-to-goal order.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub status: SearchStatus,
    pub start: Cell,
    pub goal: Cell,
    pub width: usize,
    pub height: usize,
    pub obstacles: usize,
    pub cost: Option<usize>,
    pub path: Path,
    pub stats: Stats,
}

impl SearchReport {
    /// Writes JSON for `.json` paths and YAML otherwise.
    pub fn write_to_file(&self, path: &str) -> Result<()> {
        let file = File::create(path).with_context(|| format!("cannot create {path}"))?;
        let mut writer = io::BufWriter::new(file);
        let data = if path.ends_with(".json") {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)?
        };
        writer.write_all(data.as_bytes())?;
        writer.flush()?;

        Ok(())
    }
}
