use chrono::Local;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use floorplan_ga::config::{ProblemConfig, RunConfig};
use floorplan_ga::context::EvolutionContext;
use floorplan_ga::demo_data::{run_config, DemoVariant};
use floorplan_ga::entrance::EntranceProblem;
use floorplan_ga::error::LayoutResult;
use floorplan_ga::export::{LayoutRecord, LayoutReport};
use floorplan_ga::genetic_optimizer::ProgressLogger;
use floorplan_ga::runner::{load_boundary, run};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Evolve retail floor layouts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the optimizer and write the best layout as JSON
    Run(RunArgs),
    /// Check a configuration without running it
    Validate(SourceArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// JSON run configuration
    #[arg(short, long, conflicts_with = "demo", required_unless_present = "demo")]
    config: Option<PathBuf>,

    /// Use a built-in mall configuration
    #[arg(long, value_enum)]
    demo: Option<DemoVariant>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    generations: Option<usize>,

    #[arg(long)]
    population: Option<usize>,

    /// Defaults to a timestamped file in the working directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write per-generation statistics as CSV
    #[arg(long)]
    history: Option<PathBuf>,

    /// Log progress every N generations (0 disables)
    #[arg(long, default_value_t = 10)]
    log_every: usize,
}

fn load(source: &SourceArgs) -> LayoutResult<RunConfig> {
    match (&source.config, source.demo) {
        (Some(path), _) => {
            info!("📂 Loading configuration: {}", path.display());
            RunConfig::load_from_file(path)
        }
        (None, Some(variant)) => Ok(run_config(variant)),
        // clap requires one of the two
        (None, None) => Ok(run_config(DemoVariant::Assignment)),
    }
}

fn validate(source: &SourceArgs) -> LayoutResult<()> {
    let config = load(source)?;
    config.validate()?;

    if let ProblemConfig::Entrance(entrance) = &config.problem {
        let mut ctx = config
            .seed
            .map_or_else(EvolutionContext::from_entropy, EvolutionContext::seeded);
        let (points, clusters) = load_boundary(entrance, &mut ctx)?;
        EntranceProblem::new(entrance.clone(), points, clusters)?;
    }

    println!(
        "{} {} configuration is valid",
        "✔".green().bold(),
        config.problem.name()
    );
    Ok(())
}

fn print_summary(report: &LayoutReport) {
    let status = if report.usable {
        "usable".green().bold()
    } else {
        "UNUSABLE".red().bold()
    };
    println!(
        "{} - {} layout, fitness {:.4} ({:?}), seed {}",
        format!("Generation {:3}", report.generations).bold().red(),
        report.variant,
        report.fitness,
        report.direction,
        report.seed,
    );
    if let Some(best_seen) = report.best_seen_fitness {
        println!("  best seen in any generation: {:.4}", best_seen);
    }

    match &report.layout {
        LayoutRecord::Assignment { floors, .. } => {
            for floor in floors {
                println!(
                    "  {} ({}/{}): {}",
                    format!("Floor {}", floor.floor).bold(),
                    floor.usage,
                    floor.capacity,
                    floor.stores.join(", ")
                );
            }
        }
        LayoutRecord::Placement { stores, breakdown, .. } => {
            for store in stores {
                println!(
                    "  #{:<2} ({:6.2}, {:6.2}) {:5.2} x {:5.2} {}",
                    store.slot,
                    store.x,
                    store.y,
                    store.width,
                    store.height,
                    store.category.as_deref().unwrap_or("-")
                );
            }
            println!(
                "  overlaps: {}, deadends: {}",
                breakdown.overlapping_pairs, breakdown.deadends
            );
        }
        LayoutRecord::Entrance {
            entries,
            lower_bound,
            ..
        } => {
            for entry in entries {
                println!(
                    "  entry {:<2} at ({}, {}), {:.2} from its centroid",
                    entry.entry, entry.x, entry.y, entry.distance
                );
            }
            println!("  lower bound: {:.4}", lower_bound);
        }
    }
    println!("  {}", status);
}

fn execute(args: &RunArgs) -> LayoutResult<bool> {
    let mut config = load(&args.source)?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(generations) = args.generations {
        config.ga.generations = generations;
    }
    if let Some(population) = args.population {
        config.ga.population_size = population;
    }

    let mut logger = ProgressLogger {
        every: args.log_every,
    };
    let report = run(&config, &mut logger)?;
    print_summary(&report);

    let output = args.output.clone().unwrap_or_else(|| {
        let date_str = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        PathBuf::from(format!("layout_{}_{}.json", report.variant, date_str))
    });
    report.write_json(&output)?;
    info!("💾 Report written to {}", output.display());

    if let Some(history) = &args.history {
        report.write_history_csv(history)?;
        info!("💾 History written to {}", history.display());
    }

    Ok(report.usable)
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let outcome = match &cli.command {
        Commands::Run(args) => execute(args),
        Commands::Validate(source) => validate(source).map(|_| true),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
