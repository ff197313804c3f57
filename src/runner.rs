use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::agent::TrainableEstimator;
use crate::environment::Environment;
use crate::error::Result;
use crate::metrics::{tail_mean, MetricsTracker};
use crate::preprocessing::Preprocessor;
use crate::trainer::{EpisodeStats, Trainer};

/// Outcome of [`EpisodeRunner::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub episodes: usize,
    pub total_steps: u64,
    pub truncated_episodes: usize,
    /// Mean raw reward of the last `summary_interval` completed episodes
    pub recent_mean_reward: Option<f32>,
    pub optimize_steps: u64,
    pub target_syncs: u64,
}

/// Drives a trainer through repeated episodes of one environment.
pub struct EpisodeRunner<E, P, N> {
    env: E,
    preprocessor: P,
    trainer: Trainer<N>,
    metrics: MetricsTracker,
    checkpoint_dir: Option<PathBuf>,
}

impl<E, P, N> EpisodeRunner<E, P, N>
where
    E: Environment,
    P: Preprocessor,
    N: TrainableEstimator + Clone + Serialize + DeserializeOwned,
{
    pub fn new(env: E, preprocessor: P, trainer: Trainer<N>) -> Self {
        EpisodeRunner {
            env,
            preprocessor,
            trainer,
            metrics: MetricsTracker::default(),
            checkpoint_dir: None,
        }
    }

    /// Save checkpoints and metrics under `dir`, creating it if needed.
    pub fn with_checkpoint_dir<D: AsRef<Path>>(mut self, dir: D) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        self.checkpoint_dir = Some(dir.as_ref().to_path_buf());
        Ok(self)
    }

    pub fn trainer(&self) -> &Trainer<N> {
        &self.trainer
    }

    pub fn trainer_mut(&mut self) -> &mut Trainer<N> {
        &mut self.trainer
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn into_trainer(self) -> Trainer<N> {
        self.trainer
    }

    /// Path of the checkpoint written after `episodes_done` episodes
    pub fn checkpoint_path(&self, episodes_done: usize) -> Option<PathBuf> {
        self.checkpoint_dir
            .as_ref()
            .map(|dir| dir.join(format!("checkpoint_{:06}.bin", episodes_done)))
    }

    pub fn run(&mut self, num_episodes: usize) -> Result<RunSummary> {
        for _ in 0..num_episodes {
            let stats = self.trainer.run_episode(&mut self.env, &self.preprocessor)?;
            self.record(&stats);
            self.report(&stats);
            self.maybe_checkpoint()?;
        }

        if let Some(dir) = &self.checkpoint_dir {
            self.metrics.save(dir.join("metrics.json"))?;
        }

        let state = self.trainer.state();
        let summary_window = self.trainer.config().summary_interval;
        Ok(RunSummary {
            episodes: state.episodes_done,
            total_steps: state.steps_done,
            truncated_episodes: self.metrics.metrics().truncated_episodes,
            recent_mean_reward: tail_mean(state.episode_rewards.iter().copied(), state.episode_rewards.len(), summary_window),
            optimize_steps: state.optimize_steps,
            target_syncs: state.target_syncs,
        })
    }

    fn record(&mut self, stats: &EpisodeStats) {
        for &loss in &stats.losses {
            self.metrics.record_loss(loss);
        }
        self.metrics.record_episode(stats.reward, stats.steps, stats.epsilon, stats.truncated);
    }

    fn report(&self, stats: &EpisodeStats) {
        let state = self.trainer.state();
        let config = self.trainer.config();
        let rewards = &state.episode_rewards;
        let finished = stats.episode + 1;

        if finished % config.report_interval == 0 {
            let window = config.report_interval;
            info!(
                episode = finished,
                mean_score = tail_mean(rewards.iter().copied(), rewards.len(), window).unwrap_or(0.0),
                "{} ep. mean score",
                window
            );
        }
        if finished % config.summary_interval == 0 {
            info!(
                episode = finished,
                epsilon = state.epsilon,
                steps_done = state.steps_done,
                mean_score = tail_mean(rewards.iter().copied(), rewards.len(), config.summary_interval).unwrap_or(0.0),
                mean_loss = self.metrics.avg_loss(config.summary_interval).unwrap_or(0.0),
                "training summary"
            );
        }
    }

    fn maybe_checkpoint(&self) -> Result<()> {
        let episodes_done = self.trainer.state().episodes_done;
        if episodes_done % self.trainer.config().checkpoint_every != 0 {
            return Ok(());
        }
        if let Some(path) = self.checkpoint_path(episodes_done) {
            self.trainer.save_checkpoint(&path)?;
        }
        Ok(())
    }
}
