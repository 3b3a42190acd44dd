use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use ordered_float::OrderedFloat;
use tracing::{debug, info, instrument, trace};

use crate::common::{Cell, Path, SearchStatus};
use crate::grid::Grid;
use crate::stat::Stats;

// Open list key. The derived ordering is the expansion priority: lowest f,
// then lowest g, then lowest cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    f_score: OrderedFloat<f64>,
    g_score: OrderedFloat<f64>,
    cell: Cell,
}

/// Straight-line distance between two cells.
///
/// Never overestimates the 4-connected unit cost, but is looser than the
/// Manhattan distance, so more cells get expanded than strictly necessary.
pub fn heuristic(a: Cell, b: Cell) -> f64 {
    let dx = b.x as f64 - a.x as f64;
    let dy = b.y as f64 - a.y as f64;
    (dx * dx + dy * dy).sqrt()
}

/// A* search that advances by exactly one expansion per [`step`] call, so the
/// caller can inspect the open list, closed list and scores in between.
///
/// The grid is not borrowed between calls; [`reset`] copies the endpoints and
/// [`step`] reads obstacles live, so the obstacle layout must not change while
/// the search is running.
///
/// [`step`]: IncrementalAStar::step
/// [`reset`]: IncrementalAStar::reset
#[derive(Debug, Clone)]
pub struct IncrementalAStar {
    start: Cell,
    goal: Cell,
    open: BTreeSet<OpenEntry>,
    closed: BTreeSet<Cell>,
    came_from: HashMap<Cell, Cell>,
    g_score: HashMap<Cell, f64>,
    f_score: HashMap<Cell, f64>,
    current: Option<Cell>,
    status: SearchStatus,
    stats: Stats,
}

impl Default for IncrementalAStar {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalAStar {
    pub fn new() -> Self {
        IncrementalAStar {
            start: Cell::new(0, 0),
            goal: Cell::new(0, 0),
            open: BTreeSet::new(),
            closed: BTreeSet::new(),
            came_from: HashMap::new(),
            g_score: HashMap::new(),
            f_score: HashMap::new(),
            current: None,
            status: SearchStatus::Uninitialized,
            stats: Stats::default(),
        }
    }

    /// Starts a fresh search from the grid's current endpoints, dropping any
    /// progress made so far.
    #[instrument(skip_all, name = "reset", fields(start = %grid.start(), goal = %grid.goal()), level = "debug")]
    pub fn reset(&mut self, grid: &Grid) {
        self.start = grid.start();
        self.goal = grid.goal();

        self.open.clear();
        self.closed.clear();
        self.came_from.clear();
        self.g_score.clear();
        self.f_score.clear();

        let start_f = heuristic(self.start, self.goal);
        self.g_score.insert(self.start, 0.0);
        self.f_score.insert(self.start, start_f);
        self.open.insert(OpenEntry {
            f_score: OrderedFloat(start_f),
            g_score: OrderedFloat(0.0),
            cell: self.start,
        });

        self.current = None;
        self.status = SearchStatus::Running;
        self.stats = Stats {
            max_open_size: 1,
            ..Stats::default()
        };
        debug!("search initialized");
    }

    /// Performs one expansion, or detects termination, and returns the
    /// resulting status. Once the search has finished this is a no-op.
    pub fn step(&mut self, grid: &Grid) -> SearchStatus {
        match self.status {
            SearchStatus::Uninitialized => {
                debug!("step requested before reset, ignoring");
                return self.status;
            }
            SearchStatus::Succeeded | SearchStatus::Failed => {
                info!("Finished: {:?}", self.status);
                return self.status;
            }
            SearchStatus::Running => {}
        }

        let step_start_time = Instant::now();
        self.stats.steps += 1;
        self.expand(grid);
        self.stats.time_us += step_start_time.elapsed().as_micros() as u64;

        self.status
    }

    fn expand(&mut self, grid: &Grid) {
        let Some(&best) = self.open.first() else {
            debug!("open list exhausted, no path from {} to {}", self.start, self.goal);
            self.status = SearchStatus::Failed;
            return;
        };

        let current = best.cell;
        self.current = Some(current);

        if current == self.goal {
            info!("reached goal {current} with cost {}", best.g_score);
            self.status = SearchStatus::Succeeded;
            return;
        }

        trace!("expand node: {current} g {} f {}", best.g_score, best.f_score);
        self.open.remove(&best);
        self.closed.insert(current);
        self.stats.expanded_nodes += 1;

        // Uniform grid: every move costs 1.
        let tentative_g_score = best.g_score.into_inner() + 1.0;

        for neighbor in grid.neighbors4(current) {
            if self.closed.contains(&neighbor) {
                continue;
            }

            // Any scored cell outside the closed list is on the open list.
            match self.g_score.get(&neighbor) {
                None => {}
                Some(&known_g_score) if tentative_g_score >= known_g_score => continue,
                Some(&known_g_score) => {
                    let known_f_score = self
                        .f_score
                        .get(&neighbor)
                        .copied()
                        .unwrap_or(f64::INFINITY);
                    self.open.remove(&OpenEntry {
                        f_score: OrderedFloat(known_f_score),
                        g_score: OrderedFloat(known_g_score),
                        cell: neighbor,
                    });
                }
            }

            let f_score = tentative_g_score + heuristic(neighbor, self.goal);
            self.came_from.insert(neighbor, current);
            self.g_score.insert(neighbor, tentative_g_score);
            self.f_score.insert(neighbor, f_score);
            self.open.insert(OpenEntry {
                f_score: OrderedFloat(f_score),
                g_score: OrderedFloat(tentative_g_score),
                cell: neighbor,
            });
            trace!("open {neighbor} g {tentative_g_score} f {f_score}");
        }

        self.stats.max_open_size = self.stats.max_open_size.max(self.open.len());
    }

    /// Follows predecessors from `from` back to the start. The result is in
    /// goal-to-start order; a cell without a predecessor yields `[from]`.
    pub fn reconstruct_path(&self, from: Cell) -> Path {
        let mut path = vec![from];
        let mut node = from;
        while let Some(&prev) = self.came_from.get(&node) {
            path.push(prev);
            node = prev;
        }
        path
    }

    /// Best known path to the most recently examined cell, goal-first.
    pub fn current_path(&self) -> Path {
        self.current
            .map(|cell| self.reconstruct_path(cell))
            .unwrap_or_default()
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn current(&self) -> Option<Cell> {
        self.current
    }

    /// Endpoints captured by the last reset.
    pub fn start(&self) -> Option<Cell> {
        (self.status != SearchStatus::Uninitialized).then_some(self.start)
    }

    pub fn goal(&self) -> Option<Cell> {
        (self.status != SearchStatus::Uninitialized).then_some(self.goal)
    }

    /// Open cells, best candidate first.
    pub fn open(&self) -> impl Iterator<Item = Cell> + '_ {
        self.open.iter().map(|entry| entry.cell)
    }

    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    pub fn is_open(&self, cell: Cell) -> bool {
        self.g_score.contains_key(&cell) && !self.closed.contains(&cell)
    }

    pub fn closed(&self) -> impl Iterator<Item = Cell> + '_ {
        self.closed.iter().copied()
    }

    pub fn closed_len(&self) -> usize {
        self.closed.len()
    }

    pub fn is_closed(&self, cell: Cell) -> bool {
        self.closed.contains(&cell)
    }

    /// `None` means no route to `cell` is known yet (an infinite cost).
    pub fn g_score(&self, cell: Cell) -> Option<f64> {
        self.g_score.get(&cell).copied()
    }

    pub fn f_score(&self, cell: Cell) -> Option<f64> {
        self.f_score.get(&cell).copied()
    }

    pub fn came_from(&self, cell: Cell) -> Option<Cell> {
        self.came_from.get(&cell).copied()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}
