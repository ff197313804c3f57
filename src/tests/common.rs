use ndarray::{Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::TrainingConfig;
use crate::environment::{Environment, StepInfo, StepOutcome};
use crate::error::{DuelnetError, Result};
use crate::network::{ConvSpec, DuelingNetwork, NetworkConfig};
use crate::preprocessing::FramePreprocessor;
use crate::types::{Action, NextState, RgbFrame, StackedState, Transition};

pub const NUM_ACTIONS: usize = 3;

pub fn small_network_config() -> NetworkConfig {
    NetworkConfig {
        conv_layers: vec![ConvSpec::new(4, 3, 1), ConvSpec::new(4, 2, 2)],
        input_scale: 1.0 / 255.0,
    }
}

/// `(2, 8, 8)` inputs, 3 actions
pub fn small_network(seed: u64) -> DuelingNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    DuelingNetwork::new_with_rng((2, 8, 8), NUM_ACTIONS, &small_network_config(), &mut rng).unwrap()
}

/// Config matching `small_network` with training and syncing switched off.
pub fn small_config() -> TrainingConfig {
    TrainingConfig {
        batch_size: 2,
        memory_capacity: 100,
        frame_stack: 2,
        learn_start: 1_000_000,
        target_update: 1_000_000,
        max_episode_steps: 1_000,
        seed: Some(3),
        preprocessing: FramePreprocessor { crop: None, height: 8, width: 8 },
        network: small_network_config(),
        ..TrainingConfig::default()
    }
}

pub fn state(value: u8) -> StackedState {
    Array3::from_elem((2, 8, 8), value)
}

pub fn transition(id: u8) -> Transition {
    Transition::new(state(id), usize::from(id) % NUM_ACTIONS, NextState::Present(state(id.wrapping_add(1))), f32::from(id))
}

/// Environment that replays a fixed list of `(reward, lives, done)` steps and
/// then continues with zero-reward steps forever.
pub struct ScriptedEnv {
    script: Vec<(f32, u32, bool)>,
    start_lives: u32,
    lives: u32,
    cursor: usize,
    action_space: usize,
    pub actions: Vec<Action>,
}

impl ScriptedEnv {
    pub fn new(start_lives: u32, script: Vec<(f32, u32, bool)>) -> Self {
        ScriptedEnv { script, start_lives, lives: start_lives, cursor: 0, action_space: NUM_ACTIONS, actions: Vec::new() }
    }

    /// Report a different action count than the network expects
    pub fn with_action_space(mut self, action_space: usize) -> Self {
        self.action_space = action_space;
        self
    }
}

impl Environment for ScriptedEnv {
    fn reset(&mut self) -> Result<RgbFrame> {
        self.cursor = 0;
        self.lives = self.start_lives;
        self.actions.clear();
        self.render()
    }

    fn step(&mut self, action: Action) -> Result<StepOutcome> {
        if action >= NUM_ACTIONS {
            return Err(DuelnetError::InvalidAction { action, max_actions: NUM_ACTIONS });
        }
        self.actions.push(action);
        let (reward, lives, done) = self.script.get(self.cursor).copied().unwrap_or((0.0, self.lives, false));
        self.cursor += 1;
        self.lives = lives;
        Ok(StepOutcome {
            observation: self.render()?,
            reward,
            done,
            info: StepInfo { lives },
        })
    }

    fn action_space_size(&self) -> usize {
        self.action_space
    }

    fn lives(&self) -> u32 {
        self.lives
    }

    /// Grey screen whose brightness encodes the step count
    fn render(&self) -> Result<RgbFrame> {
        let mut screen = Array3::zeros((8, 8, 3));
        let level = (self.cursor * 10).min(255) as u8;
        for mut channel in screen.axis_iter_mut(Axis(2)) {
            channel.fill(level);
        }
        Ok(screen)
    }
}
