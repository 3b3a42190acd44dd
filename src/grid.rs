use std::fs::File;
use std::io::{BufRead, BufReader};

use rand::prelude::*;
use tracing::{debug, warn};

use crate::common::{Cell, CellKind};
use crate::error::{GridError, GridResult};

/// How many obstacles were asked for at construction and how many fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleFill {
    pub requested: usize,
    pub placed: usize,
}

impl ObstacleFill {
    pub fn is_clamped(&self) -> bool {
        self.placed < self.requested
    }
}

/// Uniform grid with blocked cells and the two search endpoints.
///
/// Start and goal are always in bounds, distinct and passable: placing an
/// endpoint on an obstacle clears that obstacle.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    obstacles: Vec<Vec<bool>>, // indexed [y][x]
    start: Cell,
    goal: Cell,
    fill: ObstacleFill,
}

impl Grid {
    /// Builds a `size`x`size` grid with start at the top-left corner, goal at the
    /// bottom-right one, and `floor(obstacle_fraction * size²)` obstacles drawn
    /// without replacement from the remaining cells.
    ///
    /// Requests beyond the `size² - 2` free cells are clamped; see
    /// [`Grid::obstacle_fill`].
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        obstacle_fraction: f64,
        rng: &mut R,
    ) -> GridResult<Self> {
        if size < 2 {
            return Err(GridError::InvalidSize(size));
        }
        if !(0.0..=1.0).contains(&obstacle_fraction) {
            return Err(GridError::InvalidObstacleFraction(obstacle_fraction));
        }

        let mut grid = Grid::empty(size, size);

        let requested = (obstacle_fraction * (size * size) as f64).floor() as usize;
        let mut free_cells: Vec<Cell> = grid
            .cells()
            .filter(|&cell| cell != grid.start && cell != grid.goal)
            .collect();
        let placed = requested.min(free_cells.len());
        if placed < requested {
            warn!("Requested {requested} obstacles but only {placed} free cells exist, clamping");
        }

        free_cells.shuffle(rng);
        for cell in free_cells.into_iter().take(placed) {
            grid.obstacles[cell.y][cell.x] = true;
        }
        grid.fill = ObstacleFill { requested, placed };

        debug!("Generated {size}x{size} grid with {placed} obstacles");
        Ok(grid)
    }

    fn empty(width: usize, height: usize) -> Self {
        Grid {
            width,
            height,
            obstacles: vec![vec![false; width]; height],
            start: Cell::new(0, 0),
            goal: Cell::new(width - 1, height - 1),
            fill: ObstacleFill {
                requested: 0,
                placed: 0,
            },
        }
    }

    pub fn from_file(path: &str) -> GridResult<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
        Self::parse_map(lines.iter().map(String::as_str))
    }

    /// Parses an octile map: `type`, `height`, `width` and `map` header lines
    /// followed by one row of tiles per line.
    pub fn from_map_str(map: &str) -> GridResult<Self> {
        Self::parse_map(map.lines())
    }

    fn parse_map<'a>(lines: impl Iterator<Item = &'a str>) -> GridResult<Self> {
        let mut lines = lines.filter(|line| !line.trim().is_empty());

        let _type = lines
            .next()
            .ok_or_else(|| GridError::MapFormat("missing type line".to_string()))?;
        let height = parse_header(lines.next(), "height")?;
        let width = parse_header(lines.next(), "width")?;
        match lines.next().map(str::trim) {
            Some("map") => {}
            other => {
                return Err(GridError::MapFormat(format!(
                    "expected \"map\" line, got {other:?}"
                )))
            }
        }
        match width.checked_mul(height) {
            Some(cells) if cells >= 2 => {}
            Some(_) => return Err(GridError::InvalidSize(width.max(height))),
            None => {
                return Err(GridError::MapFormat(format!(
                    "{width}x{height} grid is too large"
                )))
            }
        }

        // Rows are collected before anything is sized from the header.
        let mut obstacles = Vec::new();
        for (y, line) in lines.take(height).enumerate() {
            let row = line.trim_end();
            if row.chars().count() != width {
                return Err(GridError::MapFormat(format!(
                    "row {y} has {} tiles, expected {width}",
                    row.chars().count()
                )));
            }
            let tiles = row
                .chars()
                .enumerate()
                .map(|(x, ch)| match ch {
                    '.' | 'G' | 'S' => Ok(false),
                    '@' | 'O' | 'T' | 'W' => Ok(true),
                    _ => Err(GridError::MapFormat(format!(
                        "unknown tile {ch:?} at ({x}, {y})"
                    ))),
                })
                .collect::<GridResult<Vec<bool>>>()?;
            obstacles.push(tiles);
        }
        if obstacles.len() != height {
            return Err(GridError::MapFormat(format!(
                "expected {height} rows, found {}",
                obstacles.len()
            )));
        }

        let mut grid = Grid {
            width,
            height,
            obstacles,
            start: Cell::new(0, 0),
            goal: Cell::new(width - 1, height - 1),
            fill: ObstacleFill {
                requested: 0,
                placed: 0,
            },
        };

        // Endpoints win over whatever the file put under them.
        grid.obstacles[grid.start.y][grid.start.x] = false;
        grid.obstacles[grid.goal.y][grid.goal.x] = false;
        let placed = grid.obstacle_count();
        grid.fill = ObstacleFill {
            requested: placed,
            placed,
        };

        debug!("Loaded {width}x{height} map with {placed} obstacles");
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn obstacle_fill(&self) -> ObstacleFill {
        self.fill
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles
            .iter()
            .map(|row| row.iter().filter(|&&blocked| blocked).count())
            .sum()
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Out-of-bounds cells count as obstacles.
    pub fn is_obstacle(&self, cell: Cell) -> bool {
        !self.in_bounds(cell) || self.obstacles[cell.y][cell.x]
    }

    pub fn classify(&self, cell: Cell) -> CellKind {
        if cell == self.start {
            CellKind::Start
        } else if cell == self.goal {
            CellKind::Goal
        } else if self.is_obstacle(cell) {
            CellKind::Obstacle
        } else {
            CellKind::Free
        }
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Cell::new(x, y)))
    }

    /// Passable orthogonal neighbours, always in the order +x, -x, +y, -y.
    pub fn neighbors4(&self, cell: Cell) -> Vec<Cell> {
        let directions: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
        let mut neighbors = Vec::with_capacity(4);

        for &(dx, dy) in &directions {
            let (Some(x), Some(y)) = (
                cell.x.checked_add_signed(dx),
                cell.y.checked_add_signed(dy),
            ) else {
                continue;
            };
            let next = Cell::new(x, y);
            if !self.is_obstacle(next) {
                neighbors.push(next);
            }
        }

        neighbors
    }

    pub fn move_start(&mut self, cell: Cell) -> GridResult<()> {
        self.check_endpoint(cell, self.goal)?;
        debug!("Move start {} -> {cell}", self.start);
        self.obstacles[cell.y][cell.x] = false;
        self.start = cell;
        Ok(())
    }

    pub fn move_goal(&mut self, cell: Cell) -> GridResult<()> {
        self.check_endpoint(cell, self.start)?;
        debug!("Move goal {} -> {cell}", self.goal);
        self.obstacles[cell.y][cell.x] = false;
        self.goal = cell;
        Ok(())
    }

    /// Places both endpoints at once, so they may trade places. Either both
    /// move or neither does.
    pub fn set_endpoints(&mut self, start: Cell, goal: Cell) -> GridResult<()> {
        for cell in [start, goal] {
            if !self.in_bounds(cell) {
                return Err(GridError::OutOfBounds {
                    cell,
                    width: self.width,
                    height: self.height,
                });
            }
        }
        if start == goal {
            return Err(GridError::EndpointCollision(goal));
        }

        debug!("Set endpoints start {start} goal {goal}");
        self.obstacles[start.y][start.x] = false;
        self.obstacles[goal.y][goal.x] = false;
        self.start = start;
        self.goal = goal;
        Ok(())
    }

    fn check_endpoint(&self, cell: Cell, other: Cell) -> GridResult<()> {
        if !self.in_bounds(cell) {
            return Err(GridError::OutOfBounds {
                cell,
                width: self.width,
                height: self.height,
            });
        }
        if cell == other {
            return Err(GridError::EndpointCollision(cell));
        }
        Ok(())
    }
}

fn parse_header(line: Option<&str>, key: &str) -> GridResult<usize> {
    let line = line.ok_or_else(|| GridError::MapFormat(format!("missing {key} line")))?;
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(name), Some(value)) if name == key => value
            .parse::<usize>()
            .map_err(|err| GridError::MapFormat(format!("invalid {key} {value:?}: {err}"))),
        _ => Err(GridError::MapFormat(format!(
            "expected \"{key} <n>\", got {line:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_grid_places_endpoints_and_obstacles() {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = Grid::new(10, 0.3, &mut rng).unwrap();

        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 10);
        assert_eq!(grid.start(), Cell::new(0, 0));
        assert_eq!(grid.goal(), Cell::new(9, 9));
        assert_eq!(grid.obstacle_count(), 30);
        assert!(!grid.obstacle_fill().is_clamped());
        assert!(!grid.is_obstacle(grid.start()));
        assert!(!grid.is_obstacle(grid.goal()));
    }

    #[test]
    fn test_new_grid_is_reproducible_from_seed() {
        let a = Grid::new(12, 0.25, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = Grid::new(12, 0.25, &mut StdRng::seed_from_u64(3)).unwrap();
        let blocked_a: Vec<Cell> = a.cells().filter(|&c| a.is_obstacle(c)).collect();
        let blocked_b: Vec<Cell> = b.cells().filter(|&c| b.is_obstacle(c)).collect();
        assert_eq!(blocked_a, blocked_b);
    }

    #[test]
    fn test_new_grid_clamps_overfull_request() {
        let mut rng = StdRng::seed_from_u64(0);
        let grid = Grid::new(3, 1.0, &mut rng).unwrap();

        let fill = grid.obstacle_fill();
        assert_eq!(fill.requested, 9);
        assert_eq!(fill.placed, 7);
        assert!(fill.is_clamped());
        assert_eq!(grid.obstacle_count(), 7);
        assert!(grid.neighbors4(grid.start()).is_empty());
    }

    #[test]
    fn test_new_grid_rejects_bad_arguments() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            Grid::new(1, 0.0, &mut rng),
            Err(GridError::InvalidSize(1))
        ));
        assert!(matches!(
            Grid::new(5, 1.5, &mut rng),
            Err(GridError::InvalidObstacleFraction(_))
        ));
        assert!(matches!(
            Grid::new(5, f64::NAN, &mut rng),
            Err(GridError::InvalidObstacleFraction(_))
        ));
    }

    #[test]
    fn test_read_map() {
        let grid = Grid::from_file("map_file/test/enclosed.map").unwrap();

        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.obstacle_count(), 3);
        assert!(!grid.is_obstacle(Cell::new(0, 0)));
        assert!(grid.is_obstacle(Cell::new(1, 1)));
        assert!(grid.is_obstacle(Cell::new(2, 1)));
        assert!(grid.is_obstacle(Cell::new(1, 2)));
        assert!(grid.neighbors4(grid.goal()).is_empty());
    }

    #[test]
    fn test_map_endpoints_clear_obstacles() {
        let grid = Grid::from_map_str("type octile\nheight 2\nwidth 3\nmap\n@..\n..@\n").unwrap();
        assert_eq!(grid.goal(), Cell::new(2, 1));
        assert_eq!(grid.obstacle_count(), 0);
    }

    #[test]
    fn test_map_format_errors() {
        assert!(matches!(
            Grid::from_map_str("type octile\nheight 2\nwidth 3\nmap\n...\n"),
            Err(GridError::MapFormat(_))
        ));
        assert!(matches!(
            Grid::from_map_str("type octile\nheight 1\nwidth 3\nmap\n.x.\n"),
            Err(GridError::MapFormat(_))
        ));
        assert!(matches!(
            Grid::from_map_str("type octile\nwidth 3\nheight 1\nmap\n...\n"),
            Err(GridError::MapFormat(_))
        ));
        assert!(matches!(
            Grid::from_file("map_file/test/does-not-exist.map"),
            Err(GridError::Io(_))
        ));
    }

    #[test]
    fn test_neighbors_order_and_bounds() {
        let grid = Grid::from_map_str("type octile\nheight 3\nwidth 3\nmap\n...\n...\n...\n").unwrap();

        assert_eq!(
            grid.neighbors4(Cell::new(1, 1)),
            vec![
                Cell::new(2, 1),
                Cell::new(0, 1),
                Cell::new(1, 2),
                Cell::new(1, 0)
            ]
        );
        assert_eq!(
            grid.neighbors4(Cell::new(0, 0)),
            vec![Cell::new(1, 0), Cell::new(0, 1)]
        );
        assert!(grid.is_obstacle(Cell::new(3, 0)));
        assert!(grid.is_obstacle(Cell::new(0, 3)));
    }

    #[test]
    fn test_neighbors_skip_obstacles() {
        let grid = Grid::from_map_str("type octile\nheight 3\nwidth 3\nmap\n.@.\n...\n.@.\n").unwrap();
        assert_eq!(
            grid.neighbors4(Cell::new(1, 1)),
            vec![Cell::new(2, 1), Cell::new(0, 1)]
        );
    }

    #[test]
    fn test_move_endpoint_clears_obstacle() {
        let mut grid = Grid::from_map_str("type octile\nheight 3\nwidth 3\nmap\n...\n.@.\n...\n").unwrap();

        grid.move_start(Cell::new(1, 1)).unwrap();
        assert_eq!(grid.start(), Cell::new(1, 1));
        assert!(!grid.is_obstacle(Cell::new(1, 1)));
        assert_eq!(grid.classify(Cell::new(1, 1)), CellKind::Start);
        // The old start is an ordinary free cell again.
        assert_eq!(grid.classify(Cell::new(0, 0)), CellKind::Free);

        grid.move_goal(Cell::new(0, 2)).unwrap();
        assert_eq!(grid.classify(Cell::new(0, 2)), CellKind::Goal);
        assert_eq!(grid.classify(Cell::new(2, 2)), CellKind::Free);
    }

    #[test]
    fn test_move_endpoint_rejections_leave_grid_unchanged() {
        let mut grid = Grid::from_map_str("type octile\nheight 3\nwidth 3\nmap\n...\n...\n...\n").unwrap();

        assert!(matches!(
            grid.move_start(Cell::new(3, 0)),
            Err(GridError::OutOfBounds { .. })
        ));
        assert!(matches!(
            grid.move_goal(Cell::new(0, 7)),
            Err(GridError::OutOfBounds { .. })
        ));
        assert!(matches!(
            grid.move_start(Cell::new(2, 2)),
            Err(GridError::EndpointCollision(_))
        ));
        assert!(matches!(
            grid.move_goal(Cell::new(0, 0)),
            Err(GridError::EndpointCollision(_))
        ));
        assert_eq!(grid.start(), Cell::new(0, 0));
        assert_eq!(grid.goal(), Cell::new(2, 2));
    }

    #[test]
    fn test_set_endpoints_swaps_and_clears() {
        let mut grid = Grid::from_map_str("type octile\nheight 3\nwidth 3\nmap\n...\n.@.\n...\n").unwrap();

        grid.set_endpoints(Cell::new(2, 2), Cell::new(0, 0)).unwrap();
        assert_eq!(grid.start(), Cell::new(2, 2));
        assert_eq!(grid.goal(), Cell::new(0, 0));

        grid.set_endpoints(Cell::new(1, 1), Cell::new(2, 2)).unwrap();
        assert_eq!(grid.start(), Cell::new(1, 1));
        assert!(!grid.is_obstacle(Cell::new(1, 1)));
        assert_eq!(grid.classify(Cell::new(0, 0)), CellKind::Free);
    }

    #[test]
    fn test_set_endpoints_rejections_leave_grid_unchanged() {
        let mut grid = Grid::from_map_str("type octile\nheight 3\nwidth 3\nmap\n...\n.@.\n...\n").unwrap();

        assert!(matches!(
            grid.set_endpoints(Cell::new(1, 1), Cell::new(3, 3)),
            Err(GridError::OutOfBounds { .. })
        ));
        assert!(matches!(
            grid.set_endpoints(Cell::new(1, 1), Cell::new(1, 1)),
            Err(GridError::EndpointCollision(_))
        ));
        assert_eq!(grid.start(), Cell::new(0, 0));
        assert_eq!(grid.goal(), Cell::new(2, 2));
        assert!(grid.is_obstacle(Cell::new(1, 1)));
    }

    #[test]
    fn test_oversized_map_header_rejected() {
        assert!(matches!(
            Grid::from_map_str("type octile\nheight 4294967296\nwidth 4294967296\nmap\n...\n"),
            Err(GridError::MapFormat(_))
        ));
        // Fits in usize, but the rows are not there.
        assert!(matches!(
            Grid::from_map_str("type octile\nheight 100000\nwidth 100000\nmap\n...\n"),
            Err(GridError::MapFormat(_))
        ));
        assert!(matches!(
            Grid::from_map_str(&format!("type octile\nheight {0}\nwidth {0}\nmap\n", usize::MAX)),
            Err(GridError::MapFormat(_))
        ));
    }
}
