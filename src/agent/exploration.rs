use serde::{Serialize, Deserialize};

/// Exploration rate as a function of total environment steps.
///
/// Every variant is non-increasing in the step count and stays within
/// `[end, start]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EpsilonSchedule {
    /// `end + (start - end) * exp(-steps / decay)`
    Exponential { start: f32, end: f32, decay: f32 },

    /// Straight line from `start` to `end` over `steps`, flat afterwards
    Linear { start: f32, end: f32, steps: u64 },

    Constant(f32),
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        EpsilonSchedule::Exponential { start: 1.0, end: 0.1, decay: 1_000_000.0 }
    }
}

impl EpsilonSchedule {
    pub fn value(&self, steps_done: u64) -> f32 {
        match *self {
            EpsilonSchedule::Exponential { start, end, decay } => {
                let decayed = (-(steps_done as f64) / f64::from(decay)).exp() as f32;
                (end + (start - end) * decayed).clamp(end.min(start), start.max(end))
            }
            EpsilonSchedule::Linear { start, end, steps } => {
                if steps == 0 || steps_done >= steps {
                    return end;
                }
                let progress = steps_done as f32 / steps as f32;
                (start + (end - start) * progress).clamp(end.min(start), start.max(end))
            }
            EpsilonSchedule::Constant(epsilon) => epsilon,
        }
    }

    pub fn start(&self) -> f32 {
        match *self {
            EpsilonSchedule::Exponential { start, .. } | EpsilonSchedule::Linear { start, .. } => start,
            EpsilonSchedule::Constant(epsilon) => epsilon,
        }
    }

    pub fn end(&self) -> f32 {
        match *self {
            EpsilonSchedule::Exponential { end, .. } | EpsilonSchedule::Linear { end, .. } => end,
            EpsilonSchedule::Constant(epsilon) => epsilon,
        }
    }
}
