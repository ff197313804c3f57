//! Double-DQN training: transition bookkeeping, the optimize step, target
//! synchronization and checkpoints.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::agent::{argmax, ActionSelector, TrainableEstimator, ValueEstimator};
use crate::config::{ObservationSource, TrainingConfig};
use crate::environment::Environment;
use crate::error::{DuelnetError, Result};
use crate::frame_stack::FrameStack;
use crate::loss::{HuberLoss, Loss};
use crate::optimizer::{Adam, GradientClipper, Optimizer, OptimizerWrapper};
use crate::preprocessing::Preprocessor;
use crate::replay_buffer::ReplayBuffer;
use crate::types::{NextState, RgbFrame, Transition, TransitionBatch};

/// Counters carried across episodes and checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainerState {
    /// Environment steps over the whole run
    pub steps_done: u64,
    pub episodes_done: usize,
    pub optimize_steps: u64,
    pub target_syncs: u64,
    /// Epsilon used for the most recent action
    pub epsilon: f32,
    /// Raw reward sums of episodes that ended in the environment
    pub episode_rewards: Vec<f32>,
}

/// Summary of one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStats {
    /// Zero-based episode index
    pub episode: usize,
    pub reward: f32,
    pub steps: usize,
    /// Stopped by the step cap rather than by the environment
    pub truncated: bool,
    pub epsilon: f32,
    pub lives_lost: u32,
    /// Losses of the optimize steps taken during the episode
    pub losses: Vec<f32>,
}

impl EpisodeStats {
    pub fn mean_loss(&self) -> Option<f32> {
        if self.losses.is_empty() {
            None
        } else {
            Some(self.losses.iter().sum::<f32>() / self.losses.len() as f32)
        }
    }
}

/// TD targets `r + gamma * Q_target(s', argmax_a Q_online(s', a))`.
///
/// Entries whose next state is terminal get exactly `r`: neither network is
/// consulted for them.
pub fn compute_td_targets<N: ValueEstimator>(
    online: &N,
    target: &N,
    batch: &TransitionBatch,
    gamma: f32,
) -> Result<Array1<f32>> {
    let mut next_values = Array1::<f32>::zeros(batch.len());

    if let Some(next_states) = &batch.next_states {
        let online_values = online.evaluate(next_states.view())?;
        let target_values = target.evaluate(next_states.view())?;

        let present = batch
            .non_terminal_mask
            .iter()
            .enumerate()
            .filter(|(_, present)| **present)
            .map(|(index, _)| index);
        for (row, index) in present.enumerate() {
            let best = argmax(online_values.row(row));
            next_values[index] = target_values[[row, best]];
        }
    }

    Ok(&batch.rewards + &(next_values * gamma))
}

#[derive(Serialize)]
struct CheckpointRef<'a, N> {
    online: &'a N,
    target: &'a N,
    optimizer: &'a OptimizerWrapper,
    state: &'a TrainerState,
}

#[derive(Deserialize)]
struct Checkpoint<N> {
    online: N,
    target: N,
    optimizer: OptimizerWrapper,
    state: TrainerState,
}

pub struct Trainer<N> {
    online: N,
    target: N,
    optimizer: OptimizerWrapper,
    clipper: GradientClipper,
    loss: HuberLoss,
    memory: ReplayBuffer,
    frames: FrameStack,
    selector: ActionSelector,
    rng: StdRng,
    config: TrainingConfig,
    state: TrainerState,
}

impl<N: TrainableEstimator + Clone> Trainer<N> {
    /// The target network starts as a copy of `online`.
    pub fn new(online: N, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        if online.input_shape() != config.state_shape() {
            return Err(DuelnetError::dimension_mismatch(
                format!("network input {:?}", config.state_shape()),
                format!("{:?}", online.input_shape()),
            ));
        }

        let target = online.clone();
        let optimizer = OptimizerWrapper::Adam(Adam::new(config.adam_beta1, config.adam_beta2, config.adam_epsilon));
        let memory = ReplayBuffer::new(config.memory_capacity)?;
        let frames = FrameStack::new(config.frame_stack)?;
        let selector = ActionSelector::new(online.num_actions(), config.seed);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let state = TrainerState { epsilon: config.epsilon.start(), ..TrainerState::default() };

        Ok(Trainer {
            online,
            target,
            optimizer,
            clipper: config.gradient_clip.clone(),
            loss: HuberLoss::new(config.huber_delta),
            memory,
            frames,
            selector,
            rng,
            config,
            state,
        })
    }

    pub fn online(&self) -> &N {
        &self.online
    }

    pub fn target(&self) -> &N {
        &self.target
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ReplayBuffer {
        &mut self.memory
    }

    pub fn state(&self) -> &TrainerState {
        &self.state
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn optimizer(&self) -> &OptimizerWrapper {
        &self.optimizer
    }

    /// Whether the step just taken is an optimize step.
    pub fn should_optimize(&self) -> bool {
        self.state.steps_done > self.config.learn_start && self.state.steps_done % self.config.optimize_every == 0
    }

    /// One gradient step on a uniformly sampled minibatch.
    ///
    /// Returns `None` without touching anything while the buffer holds fewer
    /// than `batch_size` transitions.
    pub fn optimize(&mut self) -> Result<Option<f32>> {
        let batch_size = self.config.batch_size;
        if self.memory.len() < batch_size {
            return Ok(None);
        }

        let batch = {
            let transitions = self.memory.sample(batch_size, &mut self.rng)?;
            TransitionBatch::from_transitions(&transitions)?
        };
        let targets = compute_td_targets(&self.online, &self.target, &batch, self.config.gamma)?;

        let values = self.online.forward_train(batch.states.view())?;
        let num_actions = values.ncols();
        let mut predictions = Array1::<f32>::zeros(batch.len());
        for (row, &action) in batch.actions.iter().enumerate() {
            if action >= num_actions {
                return Err(DuelnetError::InvalidAction { action, max_actions: num_actions });
            }
            predictions[row] = values[[row, action]];
        }

        let loss = self.loss.compute(predictions.view(), targets.view());
        let prediction_gradients = self.loss.gradient(predictions.view(), targets.view());

        let mut output_gradients = Array2::<f32>::zeros(values.raw_dim());
        for (row, &action) in batch.actions.iter().enumerate() {
            output_gradients[[row, action]] = prediction_gradients[row];
        }

        let mut gradients = self.online.backward(output_gradients.view())?;
        self.clipper.clip(&mut gradients);
        self.optimizer.step(self.online.parameters_mut(), &gradients, self.config.learning_rate)?;

        self.state.optimize_steps += 1;
        debug!(step = self.state.steps_done, loss, "optimize step");
        Ok(Some(loss))
    }

    /// Hard copy of every online parameter into the target network.
    pub fn sync_target(&mut self) -> Result<()> {
        self.target.load_state_from(&self.online)?;
        self.state.target_syncs += 1;
        info!(step = self.state.steps_done, syncs = self.state.target_syncs, "target network updated");
        Ok(())
    }

    fn screen<E: Environment>(&self, env: &E, observation: RgbFrame) -> Result<RgbFrame> {
        match self.config.observation_source {
            ObservationSource::Render => env.render(),
            ObservationSource::Step => Ok(observation),
        }
    }

    /// Play one episode, storing every transition and training on the way.
    ///
    /// A lost life is stored as a terminal transition with its reward kept
    /// while the episode goes on; the final transition of an episode is
    /// terminal with zero reward.
    pub fn run_episode<E, P>(&mut self, env: &mut E, preprocessor: &P) -> Result<EpisodeStats>
    where
        E: Environment,
        P: Preprocessor,
    {
        if env.action_space_size() != self.online.num_actions() {
            return Err(DuelnetError::dimension_mismatch(
                format!("{} actions", self.online.num_actions()),
                format!("{}", env.action_space_size()),
            ));
        }
        let (_, height, width) = self.online.input_shape();
        if preprocessor.output_shape() != (height, width) {
            return Err(DuelnetError::dimension_mismatch(
                format!("{}x{} frames", height, width),
                format!("{:?}", preprocessor.output_shape()),
            ));
        }

        let observation = env.reset()?;
        let screen = self.screen(env, observation)?;
        self.frames.reset();
        self.frames.push(preprocessor.process(screen.view())?)?;

        let mut lives = env.lives();
        let mut lives_lost = 0;
        let mut total_reward = 0.0;
        let mut steps = 0;
        let mut losses = Vec::new();
        let mut truncated = false;

        loop {
            let state = self.frames.get();
            let epsilon = self.config.epsilon.value(self.state.steps_done);
            self.state.epsilon = epsilon;
            let action = self.selector.select(&self.online, state.as_ref(), epsilon)?;
            self.state.steps_done += 1;
            steps += 1;

            let outcome = env.step(action)?;
            total_reward += outcome.reward;
            let done = outcome.done;
            let step_lives = outcome.info.lives;
            let reward = outcome.reward;

            let screen = self.screen(env, outcome.observation)?;
            self.frames.push(preprocessor.process(screen.view())?)?;

            let life_lost = !done && step_lives < lives;
            if life_lost {
                lives_lost += lives - step_lives;
                lives = step_lives;
            }

            let (next_state, stored_reward) = if done {
                (NextState::Terminal, 0.0)
            } else if life_lost {
                (NextState::Terminal, reward)
            } else {
                let next = self.frames.get().map(NextState::Present).unwrap_or(NextState::Terminal);
                (next, reward)
            };
            if let Some(state) = state {
                self.memory.push(Transition::new(state, action, next_state, stored_reward));
            }

            if self.should_optimize() {
                if let Some(loss) = self.optimize()? {
                    losses.push(loss);
                }
            }
            if self.state.steps_done % self.config.target_update == 0 {
                self.sync_target()?;
            }

            if done {
                break;
            }
            if steps >= self.config.max_episode_steps {
                truncated = true;
                warn!(episode = self.state.episodes_done, steps, "episode hit the step cap");
                break;
            }
        }

        let episode = self.state.episodes_done;
        self.state.episodes_done += 1;
        if !truncated {
            self.state.episode_rewards.push(total_reward);
        }

        Ok(EpisodeStats {
            episode,
            reward: total_reward,
            steps,
            truncated,
            epsilon: self.state.epsilon,
            lives_lost,
            losses,
        })
    }
}

impl<N> Trainer<N>
where
    N: TrainableEstimator + Clone + Serialize + DeserializeOwned,
{
    /// Write networks, optimizer state and counters to a bincode file.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let checkpoint = CheckpointRef {
            online: &self.online,
            target: &self.target,
            optimizer: &self.optimizer,
            state: &self.state,
        };
        fs::write(path.as_ref(), bincode::serialize(&checkpoint)?)?;
        info!(path = %path.as_ref().display(), step = self.state.steps_done, "checkpoint saved");
        Ok(())
    }

    /// Restore a checkpoint written by [`Trainer::save_checkpoint`].
    ///
    /// The replay buffer is not part of a checkpoint and is left as is.
    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = fs::read(path.as_ref())?;
        let checkpoint: Checkpoint<N> = bincode::deserialize(&bytes)?;
        if checkpoint.online.num_actions() != self.online.num_actions() {
            return Err(DuelnetError::dimension_mismatch(
                format!("{} actions", self.online.num_actions()),
                format!("{}", checkpoint.online.num_actions()),
            ));
        }

        self.online = checkpoint.online;
        self.target = checkpoint.target;
        self.optimizer = checkpoint.optimizer;
        self.state = checkpoint.state;
        info!(path = %path.as_ref().display(), step = self.state.steps_done, "checkpoint loaded");
        Ok(())
    }
}
