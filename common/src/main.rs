use anyhow::Context;
use clap::Parser;
use hazard_sweeper::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hazard-sweeper")]
#[command(about = "Plays a hazard grid using only sound deductions")]
struct Cli {
    /// basic, single-point, sat-dnf or sat-cnf (P1..P4 also accepted)
    #[arg(long, default_value = "sat-cnf")]
    strategy: Strategy,

    /// Text layout file: one row per line, `t` for a hazard, `.` for a safe cell
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Grid size for a random layout
    #[arg(long, default_value_t = 8)]
    size: usize,

    /// Hazard count for a random layout
    #[arg(long, default_value_t = 10)]
    hazards: usize,

    /// Seed for a random layout
    #[arg(long)]
    seed: Option<u64>,

    /// Keep playing after probing a hazard
    #[arg(long)]
    tolerate_hazards: bool,

    /// Wall-clock limit per oracle cycle, in milliseconds
    #[arg(long)]
    oracle_budget_ms: Option<u64>,

    /// Log every move
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // --- 1. Initialization ---
    let layout = match &cli.layout {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading layout {}", path.display()))?
            .parse::<Layout>()?,
        None => {
            let mut rng = match cli.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let keep_clear = default_openings(cli.size, cli.strategy);
            Layout::random(cli.size, cli.hazards, &keep_clear, &mut rng)?
        }
    };

    let mut config = EpisodeConfig::new(cli.strategy);
    if cli.tolerate_hazards {
        config = config.with_hazard_policy(HazardPolicy::Tolerated);
    }
    if let Some(ms) = cli.oracle_budget_ms {
        config = config.with_oracle_budget(Duration::from_millis(ms));
    }

    println!("--- Hazard Sweeper ---");
    println!(
        "Agent {} plays a {size}x{size} grid",
        cli.strategy,
        size = layout.size()
    );
    print_layout(&layout);
    println!("Start!");

    // --- 2. Episode ---
    let mut agent = Agent::new(layout, config)?;
    let outcome = agent.run()?;

    // --- 3. Final Result ---
    println!("Final map");
    println!("{}", agent.board());
    println!("Result: {}", outcome);
    if agent.exposures() > 0 {
        println!("Hazards exposed: {}", agent.exposures());
    }

    Ok(())
}

fn print_layout(layout: &Layout) {
    let size = layout.size();

    print!("   ");
    for x in 0..size {
        print!("{:^3}", x);
    }
    println!("\n  +{}", "---".repeat(size));

    for y in 0..size {
        print!("{:^2}|", y);
        for x in 0..size {
            let point = Point { x, y };
            let display = if layout.is_hazard(point) {
                " t ".to_string()
            } else {
                format!(" {} ", layout.hint_at(point))
            };
            print!("{}", display);
        }
        println!();
    }
    println!();
}
