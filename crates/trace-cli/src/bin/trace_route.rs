//! Route every trace of a board and print the result.
//!
//! Boards come from a scenario file or are generated at random. Router settings are read
//! from `TRACE_*` environment variables unless the scenario carries its own.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use trace_cli::{random_scenario, render_text, RandomBoard, RunSummary, Scenario};
use trace_core::RouterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One line per trace
    Text,
    /// Full run summary as JSON
    Json,
}

/// Orthogonal trace router
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Append the occupancy grid as ASCII art
    #[arg(long, global = true)]
    ascii: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route a board described in a JSON scenario file
    Route {
        /// Scenario file
        scenario: PathBuf,
    },
    /// Generate a random board and route it
    Random {
        /// Board width in cells
        #[arg(long, default_value_t = 60)]
        width: i32,

        /// Board height in cells
        #[arg(long, default_value_t = 40)]
        height: i32,

        /// Number of traces
        #[arg(long, default_value_t = 20)]
        traces: usize,

        /// Number of rectangular obstacles
        #[arg(long, default_value_t = 8)]
        obstacles: usize,

        /// Seed for a reproducible board
        #[arg(long)]
        seed: Option<u64>,

        /// Write the generated scenario here before routing
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("trace_core=info".parse()?)
        .add_directive("trace_cli=info".parse()?);
    let fmt = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };
    tracing_subscriber::registry().with(fmt).with(filter).init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json)?;

    let config = RouterConfig::from_env();
    config.validate()?;

    let scenario = match &args.command {
        Command::Route { scenario } => Scenario::load(scenario)?,
        Command::Random {
            width,
            height,
            traces,
            obstacles,
            seed,
            save,
        } => {
            let seed = seed.unwrap_or_else(rand::random);
            tracing::info!(seed, width, height, traces, obstacles, "generating random board");
            let board = RandomBoard {
                width: *width,
                height: *height,
                traces: *traces,
                obstacles: *obstacles,
            };
            let scenario = random_scenario(&board, &config, &mut StdRng::seed_from_u64(seed));
            if let Some(path) = save {
                scenario.save(path)?;
                tracing::info!(path = %path.display(), "scenario saved");
            }
            scenario
        }
    };

    let board = scenario.build(config)?;
    let report = board.scheduler.route_all()?;
    let summary = RunSummary::collect(&board, report, args.ascii)?;

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&summary)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if !summary.report.is_clean() {
        std::process::exit(2);
    }
    Ok(())
}
