use astar_stepper::config::{Cli, Config};
use astar_stepper::session::Session;
use astar_stepper::SearchStatus;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_filter))
        .init();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)
            .with_context(|| format!("cannot read config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let grid = config.build_grid()?;
    let fill = grid.obstacle_fill();
    if fill.is_clamped() {
        warn!(
            "Only {} of {} requested obstacles fit on the grid",
            fill.placed, fill.requested
        );
    }
    info!(
        "Grid {}x{} with {} obstacles, start {} goal {}",
        grid.width(),
        grid.height(),
        grid.obstacle_count(),
        grid.start(),
        grid.goal()
    );

    let mut session = Session::new(grid);
    let status = session.run(config.max_steps);
    session.search().stats().print();

    let report = session.report();
    match status {
        SearchStatus::Succeeded => info!("path cost {:?}: {:?}", report.cost, report.path),
        SearchStatus::Failed => info!("no path from {} to {}", report.start, report.goal),
        _ => info!("search paused after {} steps", report.stats.steps),
    }
    debug!("final state:\n{}", session.snapshot());

    if let Some(output_path) = config.output_path.as_ref() {
        report.write_to_file(output_path)?;
        info!("report written to {output_path}");
    }

    Ok(())
}
