//! Training hyperparameters.
//!
//! Every field has a default, so a JSON file only needs the values it changes:
//!
//! ```json
//! { "num_episodes": 50, "learn_start": 1000, "seed": 7 }
//! ```

use serde::{Serialize, Deserialize};
use std::path::Path;

use crate::agent::EpsilonSchedule;
use crate::error::{DuelnetError, Result};
use crate::network::NetworkConfig;
use crate::optimizer::GradientClipper;
use crate::preprocessing::FramePreprocessor;

/// Where per-step frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObservationSource {
    /// `env.render()` after every reset and step
    #[default]
    Render,
    /// The observation returned by `reset` and `step`
    Step,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub num_episodes: usize,
    pub batch_size: usize,
    pub gamma: f32,
    pub learning_rate: f32,
    pub adam_beta1: f32,
    pub adam_beta2: f32,
    pub adam_epsilon: f32,
    pub memory_capacity: usize,
    /// Frames per stacked state
    pub frame_stack: usize,
    /// Environment steps between optimize steps
    pub optimize_every: u64,
    /// Environment steps between target synchronizations
    pub target_update: u64,
    /// Environment steps before the first optimize step
    pub learn_start: u64,
    pub epsilon: EpsilonSchedule,
    pub max_episode_steps: usize,
    pub huber_delta: f32,
    pub gradient_clip: GradientClipper,
    pub seed: Option<u64>,
    pub observation_source: ObservationSource,
    pub preprocessing: FramePreprocessor,
    pub network: NetworkConfig,
    /// Episodes between short-window score reports
    pub report_interval: usize,
    /// Episodes between long-window summaries
    pub summary_interval: usize,
    /// Episodes between checkpoints, when a checkpoint directory is set
    pub checkpoint_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            num_episodes: 200,
            batch_size: 32,
            gamma: 0.99,
            learning_rate: 1e-5,
            adam_beta1: 0.9,
            adam_beta2: 0.999,
            adam_epsilon: 1e-8,
            memory_capacity: 200_000,
            frame_stack: 4,
            optimize_every: 4,
            target_update: 10_000,
            learn_start: 50_000,
            epsilon: EpsilonSchedule::default(),
            max_episode_steps: 18_000,
            huber_delta: 1.0,
            gradient_clip: GradientClipper::default(),
            seed: None,
            observation_source: ObservationSource::default(),
            preprocessing: FramePreprocessor::atari(),
            network: NetworkConfig::default(),
            report_interval: 10,
            summary_interval: 100,
            checkpoint_every: 100,
        }
    }
}

fn ensure(condition: bool, name: &str, reason: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(DuelnetError::invalid_parameter(name, reason))
    }
}

impl TrainingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TrainingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `(K, H, W)` of the stacked states fed to the network
    pub fn state_shape(&self) -> (usize, usize, usize) {
        (self.frame_stack, self.preprocessing.height, self.preprocessing.width)
    }

    pub fn validate(&self) -> Result<()> {
        ensure(self.num_episodes >= 1, "num_episodes", "must be at least 1")?;
        ensure(self.batch_size >= 1, "batch_size", "must be at least 1")?;
        ensure(self.memory_capacity >= 1, "memory_capacity", "must be at least 1")?;
        ensure(self.batch_size <= self.memory_capacity, "batch_size", "cannot exceed memory_capacity")?;
        ensure(self.frame_stack >= 1, "frame_stack", "must be at least 1")?;
        ensure(self.optimize_every >= 1, "optimize_every", "must be at least 1")?;
        ensure(self.target_update >= 1, "target_update", "must be at least 1")?;
        ensure(self.max_episode_steps >= 1, "max_episode_steps", "must be at least 1")?;
        ensure(self.report_interval >= 1, "report_interval", "must be at least 1")?;
        ensure(self.summary_interval >= 1, "summary_interval", "must be at least 1")?;
        ensure(self.checkpoint_every >= 1, "checkpoint_every", "must be at least 1")?;
        ensure((0.0..=1.0).contains(&self.gamma), "gamma", "must lie in [0, 1]")?;
        ensure(self.learning_rate > 0.0, "learning_rate", "must be positive")?;
        ensure(self.huber_delta > 0.0, "huber_delta", "must be positive")?;
        self.preprocessing.validate()?;

        let (start, end) = (self.epsilon.start(), self.epsilon.end());
        ensure(
            (0.0..=1.0).contains(&end) && (0.0..=1.0).contains(&start) && end <= start,
            "epsilon",
            "requires 0 <= end <= start <= 1",
        )?;
        if let EpsilonSchedule::Exponential { decay, .. } = self.epsilon {
            ensure(decay > 0.0, "epsilon.decay", "must be positive")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrainingConfig::default();
        config.validate().unwrap();
        assert_eq!(config.state_shape(), (4, 84, 84));
        assert_eq!(config.memory_capacity, 200_000);
        assert_eq!(config.target_update, 10_000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = TrainingConfig::from_json_str(r#"{ "num_episodes": 5, "seed": 11 }"#).unwrap();
        assert_eq!(config.num_episodes, 5);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.observation_source, ObservationSource::Render);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TrainingConfig::from_json_str(r#"{ "gamma": 1.5 }"#).is_err());
        assert!(TrainingConfig::from_json_str(r#"{ "batch_size": 64, "memory_capacity": 10 }"#).is_err());

        let config = TrainingConfig {
            epsilon: EpsilonSchedule::Linear { start: 0.1, end: 0.5, steps: 10 },
            ..TrainingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_crop_rejected() {
        for json in [
            r#"{ "preprocessing": { "crop": [50, 40], "height": 84, "width": 84 } }"#,
            r#"{ "preprocessing": { "crop": [40, 40], "height": 84, "width": 84 } }"#,
        ] {
            assert!(matches!(
                TrainingConfig::from_json_str(json),
                Err(DuelnetError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = TrainingConfig { learn_start: 10, ..TrainingConfig::default() };
        config.to_json_file(&path).unwrap();
        assert_eq!(TrainingConfig::from_json_file(&path).unwrap(), config);
    }
}
