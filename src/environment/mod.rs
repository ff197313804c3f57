//! Game environment contract and a built-in pixel game.

pub mod catch;

pub use catch::{CatchConfig, ScreenCatch};

use crate::error::Result;
use crate::types::{Action, RgbFrame};

/// Auxiliary information returned with every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepInfo {
    /// Lives left after the step
    pub lives: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: RgbFrame,
    pub reward: f32,
    pub done: bool,
    pub info: StepInfo,
}

/// An episodic game with a discrete action space and RGB screens.
pub trait Environment {
    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Result<RgbFrame>;

    fn step(&mut self, action: Action) -> Result<StepOutcome>;

    fn action_space_size(&self) -> usize;

    /// Lives currently left; right after `reset` this is the starting count.
    fn lives(&self) -> u32;

    /// Current screen as RGB.
    fn render(&self) -> Result<RgbFrame>;
}
