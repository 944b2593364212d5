use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use craftevo::config::{AppConfig, ConfigManager};
use craftevo::engines::evaluation::CommandTrialExecutor;
use craftevo::engines::evolution::LineageRecord;
use craftevo::services::EvolutionRunner;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "craftevo")]
#[command(about = "Self-play evolution of craft configuration documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run generations until interrupted or the generation limit is reached
    Run {
        /// TOML configuration file (CRAFTEVO__* environment variables override it)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Stop after this many generations
        #[arg(long)]
        generations: Option<usize>,
        /// Continue an existing run by id instead of starting a new one
        #[arg(long)]
        resume: Option<String>,
    },
    /// Print a lineage record
    Inspect {
        lineage: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write the default configuration to a TOML file
    InitConfig { path: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            generations,
            resume,
        } => run(config, generations, resume),
        Commands::Inspect { lineage, json } => inspect(lineage, json),
        Commands::InitConfig { path } => {
            ConfigManager::new()
                .save_to_file(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

fn run(config_path: Option<PathBuf>, generations: Option<usize>, resume: Option<String>) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => AppConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };
    if generations.is_some() {
        config.evolution.max_generations = generations;
    }

    let executor = CommandTrialExecutor::new(&config.trial)?;
    let mut runner = EvolutionRunner::new(config, Box::new(executor))?;
    match &resume {
        Some(run_id) => runner.resume(run_id)?,
        None => runner.start()?,
    }
    println!("Evolution {} started", runner.run_id());

    let interrupts = interrupt_signal();
    loop {
        while let Some(update) = runner.poll_progress() {
            println!("  {}", update.message);
        }
        if interrupts.try_recv().is_ok() && runner.stop() {
            println!("Interrupted, stopping evolution {}", runner.run_id());
        }
        if !runner.is_running() {
            break;
        }
        thread::sleep(Duration::from_millis(200));
    }
    while let Some(update) = runner.poll_progress() {
        println!("  {}", update.message);
    }

    let summary = runner.wait().map_err(|e| anyhow!("evolution {} failed: {}", runner.run_id(), e))?;
    println!(
        "Evolution {} finished after {} generation(s){}",
        summary.run_id,
        summary.generations,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    if let Some(seed) = summary.last_seed {
        println!("Latest seed: {}", seed);
    }
    Ok(())
}

/// Ctrl-C notifications, delivered from a signal thread
fn interrupt_signal() -> Receiver<()> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::warn!("Ctrl-C handling unavailable: {}", e);
                return;
            }
        };
        runtime.block_on(async {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
    });
    rx
}

fn inspect(path: PathBuf, json: bool) -> Result<()> {
    let record = LineageRecord::load(&path).with_context(|| format!("reading {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("Evolution {}", record.evolution_id);
    println!("  next group: {}, next variant: {}", record.current_group_id, record.next_variant_id);
    for group in &record.groups {
        println!(
            "Group {} (seed {}, reference {}): {} variant(s)",
            group.id,
            group.seed_name,
            group.reference_name,
            group.variants.len()
        );
        for variant in &group.variants {
            for part in &variant.mutated_parts {
                println!(
                    "    {} {}/{} {}: {} -> {}",
                    variant.name, part.part_id, part.module_id, part.param_name, part.reference_value, part.value
                );
            }
        }
        if let Some(result) = record.results.iter().find(|r| r.group_id == group.id) {
            println!("  {} -> {}", result.outcome.as_str(), result.next_seed);
        }
    }
    for result in record.results.iter().filter(|r| record.group(r.group_id).is_none()) {
        println!(
            "Group {} {}: {}",
            result.group_id,
            result.outcome.as_str(),
            result.anomaly.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
