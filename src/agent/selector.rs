use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::traits::ValueEstimator;
use crate::error::{DuelnetError, Result};
use crate::types::{states_to_input, Action, StackedState};

/// Epsilon-greedy policy over an online estimator.
#[derive(Debug, Clone)]
pub struct ActionSelector {
    num_actions: usize,
    rng: StdRng,
}

impl ActionSelector {
    /// `seed` makes exploration reproducible; `None` seeds from entropy.
    pub fn new(num_actions: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        ActionSelector { num_actions, rng }
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Greedy with probability `1 - epsilon` when a state is present,
    /// uniformly random otherwise.
    pub fn select<N: ValueEstimator>(
        &mut self,
        online: &N,
        state: Option<&StackedState>,
        epsilon: f32,
    ) -> Result<Action> {
        let sample: f32 = self.rng.gen();
        match state {
            Some(state) if sample >= epsilon => self.greedy(online, state),
            _ => Ok(self.random_action()),
        }
    }

    pub fn random_action(&mut self) -> Action {
        self.rng.gen_range(0..self.num_actions)
    }

    fn greedy<N: ValueEstimator>(&self, online: &N, state: &StackedState) -> Result<Action> {
        let input = states_to_input(std::iter::once(state))?;
        let values = online.evaluate(input.view())?;
        if values.ncols() != self.num_actions {
            return Err(DuelnetError::dimension_mismatch(
                format!("{} action values", self.num_actions),
                format!("{}", values.ncols()),
            ));
        }
        Ok(argmax(values.row(0)))
    }
}

/// Index of the largest value; the lowest index wins ties and NaN never wins.
pub fn argmax(values: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    let mut found = false;
    for (index, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        if !found || value > best_value {
            best = index;
            best_value = value;
            found = true;
        }
    }
    best
}
