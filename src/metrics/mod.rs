pub mod tracker;

pub use tracker::{tail_mean, MetricsTracker, TrainingMetrics};
