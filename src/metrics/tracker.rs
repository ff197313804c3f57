use std::collections::VecDeque;
use std::path::Path;
use serde::{Serialize, Deserialize};

/// Stores training metrics over time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Loss of each optimize step
    pub losses: VecDeque<f32>,

    /// Raw reward sum per episode, truncated episodes included
    pub episode_rewards: VecDeque<f32>,

    /// Environment steps per episode
    pub episode_lengths: VecDeque<usize>,

    /// Epsilon in effect at the end of each episode
    pub epsilons: VecDeque<f32>,

    /// Episodes stopped by the step cap
    pub truncated_episodes: usize,

    pub episode_count: usize,
    pub total_steps: u64,
}

/// Tracks metrics during training, keeping at most `history_size` entries
/// per series.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,
}

fn push_bounded<T>(series: &mut VecDeque<T>, value: T, history_size: usize) {
    if series.len() >= history_size {
        series.pop_front();
    }
    series.push_back(value);
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        MetricsTracker {
            metrics: TrainingMetrics::default(),
            history_size: history_size.max(1),
        }
    }

    /// Record a training loss
    pub fn record_loss(&mut self, loss: f32) {
        push_bounded(&mut self.metrics.losses, loss, self.history_size);
    }

    /// Record a finished episode
    pub fn record_episode(&mut self, reward: f32, length: usize, epsilon: f32, truncated: bool) {
        push_bounded(&mut self.metrics.episode_rewards, reward, self.history_size);
        push_bounded(&mut self.metrics.episode_lengths, length, self.history_size);
        push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
        if truncated {
            self.metrics.truncated_episodes += 1;
        }
        self.metrics.episode_count += 1;
        self.metrics.total_steps += length as u64;
    }

    /// Get a reference to the metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn episode_count(&self) -> usize {
        self.metrics.episode_count
    }

    /// Get recent average loss
    pub fn avg_loss(&self, window: usize) -> Option<f32> {
        tail_mean(self.metrics.losses.iter().copied(), self.metrics.losses.len(), window)
    }

    /// Get recent average episode reward
    pub fn avg_episode_reward(&self, window: usize) -> Option<f32> {
        tail_mean(self.metrics.episode_rewards.iter().copied(), self.metrics.episode_rewards.len(), window)
    }

    /// Save metrics as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::error::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.metrics)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Load metrics from file
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> crate::error::Result<()> {
        let data = std::fs::read_to_string(path)?;
        self.metrics = serde_json::from_str(&data)?;
        Ok(())
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(10_000)
    }
}

/// Mean of the last `window` values of a series of length `len`.
pub fn tail_mean<I>(values: I, len: usize, window: usize) -> Option<f32>
where
    I: DoubleEndedIterator<Item = f32>,
{
    let n = window.min(len);
    if n == 0 {
        return None;
    }
    let sum: f32 = values.rev().take(n).sum();
    Some(sum / n as f32)
}
