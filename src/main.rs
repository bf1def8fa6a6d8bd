//! Thor Judge: run and inspect stow-task episodes.
//!
//! Provides subcommands:
//!
//! - `run`      -- Collect episodes with a random policy and save the records
//! - `objects`  -- List the candidate object types
//! - `task`     -- Print the stage table

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use thor_judge::config::{Arch, EpisodeConfig};
use thor_judge::env::mock::MockSimulator;
use thor_judge::env::thor::ThorSimulator;
use thor_judge::env::AnySimulator;
use thor_judge::episode::Episode;
use thor_judge::trajectory::{self, RandomPolicy, RolloutCollector};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Thor Judge: episode controller for the stow task
#[derive(Parser)]
#[command(name = "thor-judge", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-process mock room instead of a live simulator.
    #[arg(long, global = true, default_value_t = false)]
    mock: bool,

    /// Worker rank, added to the configured seed.
    #[arg(long, global = true)]
    rank: Option<u64>,

    /// Override the simulator platform.
    #[arg(long, global = true)]
    arch: Option<Arch>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect episodes with a random policy.
    Run {
        /// Scenes to run, one episode each.
        #[arg(long, num_args = 1.., default_value = "FloorPlan1")]
        scene: Vec<String>,

        /// Truncate episodes after this many steps.
        #[arg(long, default_value_t = 200)]
        max_steps: usize,

        /// Path to save the episode records.
        #[arg(long, default_value = "data/episodes.json")]
        output: PathBuf,

        /// Replay the last episode with this pause (seconds) between actions.
        #[arg(long)]
        replay_delay: Option<f64>,
    },

    /// List the candidate object types.
    Objects,

    /// Print the stage table of the configured task.
    Task,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EpisodeConfig::from_file(path)?,
        None => EpisodeConfig::default(),
    };
    if let Some(rank) = cli.rank {
        config.rank = rank;
    }
    if let Some(arch) = cli.arch {
        config.simulator.arch = arch;
    }

    match cli.command {
        Commands::Run {
            scene,
            max_steps,
            output,
            replay_delay,
        } => cmd_run(&config, cli.mock, &scene, max_steps, &output, replay_delay).await,
        Commands::Objects => cmd_objects(&config),
        Commands::Task => cmd_task(&config),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config: &EpisodeConfig,
    mock: bool,
    scenes: &[String],
    max_steps: usize,
    output: &PathBuf,
    replay_delay: Option<f64>,
) -> Result<()> {
    tracing::info!(episodes = scenes.len(), max_steps, "Collecting episodes");

    let mut episode = Episode::new(config, create_simulator(config, mock))?;
    let mut policy = RandomPolicy::new(episode.seed());
    let collector = RolloutCollector::new(max_steps);

    let records = collector.collect(&mut episode, &mut policy, scenes).await?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(
        path = %output.display(),
        count = records.len(),
        success_rate = format!("{:.2}%", trajectory::success_rate(&records) * 100.0),
        mean_reward = trajectory::mean_reward(&records),
        "Saved episode records"
    );

    if let Some(delay) = replay_delay {
        let delay = Duration::try_from_secs_f64(delay).context("invalid replay delay")?;
        episode.replay(delay).await?;
    }

    Ok(())
}

fn cmd_objects(config: &EpisodeConfig) -> Result<()> {
    let episode = Episode::new(config, MockSimulator::new())?;

    if episode.objects().is_empty() {
        println!("No object lists configured.");
        return Ok(());
    }
    println!("Candidate object types ({}):", episode.objects().len());
    for object in episode.objects() {
        println!("  {object}");
    }
    Ok(())
}

fn cmd_task(config: &EpisodeConfig) -> Result<()> {
    config.task.validate()?;
    let task = &config.task;

    println!("Target: {} -> {}", task.pickup_target, task.container_target);
    println!(
        "Rewards: step {}, failed {}, process {}",
        config.rewards.step_penalty,
        config.rewards.failed_action_penalty,
        config.rewards.process_reward
    );
    println!();

    for (i, stage) in task.stages.iter().enumerate() {
        println!(
            "  {}. {} [{}] on {}",
            i + 1,
            stage.name,
            stage.action,
            task.target_type(stage.target)
        );
        println!("     requires: {:?}", stage.requires);
        println!("     sets: {:?}  clears: {:?}", stage.sets, stage.clears);
        if let Some(fallback) = &stage.fallback {
            println!(
                "     fallback: requires {:?}, clears {:?}",
                fallback.requires, fallback.clears
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Simulator construction
// ---------------------------------------------------------------------------

fn create_simulator(config: &EpisodeConfig, mock: bool) -> AnySimulator {
    if mock {
        tracing::info!("Using mock simulator");
        AnySimulator::Mock(MockSimulator::new())
    } else {
        tracing::info!(url = %config.simulator.server_url, "Using live simulator");
        AnySimulator::Thor(ThorSimulator::new(
            config.simulator.clone(),
            config.effective_seed(),
        ))
    }
}
