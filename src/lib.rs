//! # duelnet - Dueling Double DQN for Pixel Games
//!
//! duelnet trains an agent to play a video game from its screen. States are
//! stacks of the last few preprocessed frames, values come from a dueling
//! convolutional Q-network, and learning follows double DQN with a uniform
//! replay buffer and a periodically synchronized target network.
//!
//! ## Key Features
//!
//! - **Dueling network**: convolutional feature stack split into value and
//!   advantage streams, trained with hand-written backpropagation on `ndarray`
//! - **Double DQN**: the online network picks the next action, the target
//!   network scores it; terminal transitions never bootstrap
//! - **Life-aware transitions**: losing a life ends the bootstrapping chain
//!   without ending the episode
//! - **Checkpoints**: networks, optimizer moments and counters in one bincode file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelnet::config::TrainingConfig;
//! use duelnet::environment::{CatchConfig, Environment, ScreenCatch};
//! use duelnet::network::DuelingNetwork;
//! use duelnet::preprocessing::FramePreprocessor;
//! use duelnet::runner::EpisodeRunner;
//! use duelnet::trainer::Trainer;
//!
//! let config = TrainingConfig::default();
//! let env = ScreenCatch::new(CatchConfig::default(), 0).unwrap();
//! let online = DuelingNetwork::new(config.state_shape(), env.action_space_size(), &config.network).unwrap();
//!
//! let trainer = Trainer::new(online, config.clone()).unwrap();
//! let mut runner = EpisodeRunner::new(env, FramePreprocessor::atari(), trainer);
//! let summary = runner.run(config.num_episodes).unwrap();
//! println!("mean score: {:?}", summary.recent_mean_reward);
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (ReLU, Linear)
//! - [`agent`] - Estimator traits, epsilon schedules and action selection
//! - [`config`] - Training hyperparameters
//! - [`environment`] - Environment contract and the `ScreenCatch` game
//! - [`error`] - Error types and result handling
//! - [`frame_stack`] - Stacked-frame state representation
//! - [`layers`] - Dense and convolutional layers
//! - [`loss`] - Loss functions for training
//! - [`metrics`] - Training metrics and tracking
//! - [`network`] - The dueling Q-network
//! - [`optimizer`] - Optimization algorithms and gradient clipping
//! - [`preprocessing`] - Screen to frame conversion
//! - [`replay_buffer`] - Experience replay
//! - [`runner`] - Multi-episode driver with reporting and checkpoints
//! - [`trainer`] - Optimize step, target sync and the episode loop
//! - [`types`] - Frames, states and transitions

pub mod activations;
pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod frame_stack;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod preprocessing;
pub mod replay_buffer;
pub mod runner;
pub mod trainer;
pub mod types;

#[cfg(test)]
mod tests;
