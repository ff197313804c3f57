use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use duelnet::config::TrainingConfig;
use duelnet::environment::{CatchConfig, Environment, ScreenCatch};
use duelnet::network::DuelingNetwork;
use duelnet::runner::EpisodeRunner;
use duelnet::trainer::Trainer;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(
    name = "duelnet-train",
    about = "Dueling double DQN training on the ScreenCatch pixel game"
)]
struct Args {
    /// JSON training config; unset fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    episodes: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Environment steps before the first optimize step
    #[arg(long)]
    learn_start: Option<u64>,
    #[arg(long, default_value = "5")]
    lives: u32,
    /// Directory for periodic checkpoints and the metrics file
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
    /// Checkpoint to resume networks, optimizer and counters from
    #[arg(long)]
    resume: Option<PathBuf>,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrainingConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    if let Some(episodes) = args.episodes {
        config.num_episodes = episodes;
    }
    if let Some(learn_start) = args.learn_start {
        config.learn_start = learn_start;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate().context("Invalid training config")?;

    let catch = CatchConfig { lives: args.lives, ..CatchConfig::default() };
    let env = ScreenCatch::new(catch, config.seed.unwrap_or(0)).context("Failed to create environment")?;
    let online = DuelingNetwork::new(config.state_shape(), env.action_space_size(), &config.network)
        .context("Failed to build network")?;
    info!(
        parameters = online.num_parameters(),
        input = ?config.state_shape(),
        actions = env.action_space_size(),
        "network ready"
    );

    let mut trainer = Trainer::new(online, config.clone()).context("Failed to create trainer")?;
    if let Some(path) = &args.resume {
        trainer
            .load_checkpoint(path)
            .with_context(|| format!("Failed to resume from {}", path.display()))?;
    }

    let mut runner = EpisodeRunner::new(env, config.preprocessing, trainer);
    if let Some(dir) = &args.checkpoint_dir {
        runner = runner
            .with_checkpoint_dir(dir)
            .with_context(|| format!("Failed to create checkpoint dir: {}", dir.display()))?;
    }

    let summary = runner.run(config.num_episodes).context("Training failed")?;
    info!(
        episodes = summary.episodes,
        steps = summary.total_steps,
        optimize_steps = summary.optimize_steps,
        target_syncs = summary.target_syncs,
        truncated = summary.truncated_episodes,
        mean_score = summary.recent_mean_reward.unwrap_or(0.0),
        "training finished"
    );
    Ok(())
}
