//! # Agent Module
//!
//! The pieces of a value-based agent that sit around the network:
//!
//! - `traits`: the `ValueEstimator` / `TrainableEstimator` contract the
//!   online and target networks implement
//! - `exploration`: epsilon schedules driven by the global step counter
//! - `selector`: epsilon-greedy action selection over the online estimator
//!
//! ```rust,no_run
//! use duelnet::agent::{ActionSelector, EpsilonSchedule};
//! use duelnet::network::{DuelingNetwork, NetworkConfig};
//!
//! let online = DuelingNetwork::new((4, 84, 84), 4, &NetworkConfig::default()).unwrap();
//! let schedule = EpsilonSchedule::default();
//! let mut selector = ActionSelector::new(4, Some(7));
//!
//! let action = selector.select(&online, None, schedule.value(0)).unwrap();
//! assert!(action < 4);
//! ```

pub mod exploration;
pub mod selector;
pub mod traits;

pub use exploration::EpsilonSchedule;
pub use selector::{argmax, ActionSelector};
pub use traits::{TrainableEstimator, ValueEstimator};
