use anyhow::{anyhow, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use crate::common::Cell;
use crate::grid::Grid;

#[derive(Parser, Debug)]
#[command(
    name = "A* Stepper",
    about = "Step-by-step A* search over a grid with random obstacles.",
    version = "0.1"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Side length of the square grid")]
    pub size: Option<usize>,

    #[arg(long, help = "Fraction of cells turned into obstacles, within [0, 1]")]
    pub obstacle_fraction: Option<f64>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Load the obstacle layout from an octile map file instead")]
    pub map_path: Option<String>,

    #[arg(long, help = "Start cell as x,y (same form in the YAML config)")]
    pub start: Option<Cell>,

    #[arg(long, help = "Goal cell as x,y (same form in the YAML config)")]
    pub goal: Option<Cell>,

    #[arg(long, help = "Stop after this many search steps")]
    pub max_steps: Option<usize>,

    #[arg(long, help = "Write the search report here (.json or YAML)")]
    pub output_path: Option<String>,

    #[arg(long, help = "Log filter directive", default_value = "info")]
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub size: usize,
    pub obstacle_fraction: f64,
    pub seed: u64,
    pub map_path: Option<String>,
    pub start: Option<Cell>,
    pub goal: Option<Cell>,
    pub max_steps: Option<usize>,
    pub output_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            size: 20,
            obstacle_fraction: 0.3,
            seed: 0,
            map_path: None,
            start: None,
            goal: None,
            max_steps: None,
            output_path: None,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(size) = cli.size {
            self.size = size;
        }
        if let Some(obstacle_fraction) = cli.obstacle_fraction {
            self.obstacle_fraction = obstacle_fraction;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if cli.map_path.is_some() {
            self.map_path = cli.map_path.clone();
        }
        if cli.start.is_some() {
            self.start = cli.start;
        }
        if cli.goal.is_some() {
            self.goal = cli.goal;
        }
        if cli.max_steps.is_some() {
            self.max_steps = cli.max_steps;
        }
        if cli.output_path.is_some() {
            self.output_path = cli.output_path.clone();
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        // A map file brings its own dimensions and obstacles.
        if self.map_path.is_none() {
            if self.size < 2 {
                return Err(anyhow!("Grid size must be at least 2, got {}", self.size));
            }
            if !(0.0..=1.0).contains(&self.obstacle_fraction) {
                return Err(anyhow!(
                    "Obstacle fraction must lie within [0, 1], got {}",
                    self.obstacle_fraction
                ));
            }
        }

        if self.max_steps == Some(0) {
            return Err(anyhow!("Step limit must be positive"));
        }

        if let (Some(start), Some(goal)) = (self.start, self.goal) {
            if start == goal {
                return Err(anyhow!("Start and goal must differ, both are {start}"));
            }
        }
        Ok(())
    }

    /// Loads or generates the grid and places the configured endpoints.
    pub fn build_grid(&self) -> anyhow::Result<Grid> {
        let mut grid = match &self.map_path {
            Some(map_path) => Grid::from_file(map_path)
                .with_context(|| format!("error loading map: {map_path}"))?,
            None => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                Grid::new(self.size, self.obstacle_fraction, &mut rng)?
            }
        };

        if self.start.is_some() || self.goal.is_some() {
            let start = self.start.unwrap_or(grid.start());
            let goal = self.goal.unwrap_or(grid.goal());
            grid.set_endpoints(start, goal)?;
        }

        Ok(grid)
    }
}
