//! Core data types shared by the replay buffer, the trainer and the networks.

use ndarray::{Array1, Array2, Array3, Array4, Axis};
use serde::{Serialize, Deserialize};

use crate::error::{DuelnetError, Result};

/// One preprocessed luminance frame `(H, W)`.
pub type Frame = Array2<u8>;

/// Raw RGB observation `(H, W, 3)` as produced by an environment.
pub type RgbFrame = Array3<u8>;

/// K stacked frames `(K, H, W)`, oldest first.
pub type StackedState = Array3<u8>;

/// Discrete action index.
pub type Action = usize;

/// Successor of a transition.
///
/// `Terminal` covers both the end of an episode and the loss of a life; it
/// contributes no bootstrapped value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NextState {
    Present(StackedState),
    Terminal,
}

impl NextState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NextState::Terminal)
    }

    pub fn as_present(&self) -> Option<&StackedState> {
        match self {
            NextState::Present(state) => Some(state),
            NextState::Terminal => None,
        }
    }
}

/// Experience record stored in the replay buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: StackedState,
    pub action: Action,
    pub next_state: NextState,
    pub reward: f32,
}

impl Transition {
    pub fn new(state: StackedState, action: Action, next_state: NextState, reward: f32) -> Self {
        Transition { state, action, next_state, reward }
    }
}

/// Stack `(K, H, W)` states into a `(B, K, H, W)` network input of raw pixel values.
pub fn states_to_input<'a, I>(states: I) -> Result<Array4<f32>>
where
    I: IntoIterator<Item = &'a StackedState>,
{
    let states: Vec<&StackedState> = states.into_iter().collect();
    let first = states.first().ok_or_else(|| {
        DuelnetError::invalid_parameter("states", "cannot build an input from zero states")
    })?;
    let (k, h, w) = first.dim();

    let mut input = Array4::zeros((states.len(), k, h, w));
    for (mut slot, state) in input.axis_iter_mut(Axis(0)).zip(&states) {
        if state.dim() != (k, h, w) {
            return Err(DuelnetError::dimension_mismatch(
                format!("{:?}", (k, h, w)),
                format!("{:?}", state.dim()),
            ));
        }
        slot.zip_mut_with(*state, |dst, &src| *dst = f32::from(src));
    }
    Ok(input)
}

/// Columnar view of a sampled minibatch.
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    /// `(B, K, H, W)` states
    pub states: Array4<f32>,
    pub actions: Vec<Action>,
    pub rewards: Array1<f32>,
    /// `true` where the transition has a present next state
    pub non_terminal_mask: Vec<bool>,
    /// Next states of the non-terminal entries only, in batch order
    pub next_states: Option<Array4<f32>>,
}

impl TransitionBatch {
    pub fn from_transitions(transitions: &[&Transition]) -> Result<Self> {
        let states = states_to_input(transitions.iter().map(|t| &t.state))?;
        let actions = transitions.iter().map(|t| t.action).collect();
        let rewards = transitions.iter().map(|t| t.reward).collect();
        let non_terminal_mask: Vec<bool> = transitions.iter().map(|t| !t.next_state.is_terminal()).collect();

        let present: Vec<&StackedState> = transitions.iter().filter_map(|t| t.next_state.as_present()).collect();
        let next_states = if present.is_empty() {
            None
        } else {
            Some(states_to_input(present)?)
        };

        Ok(TransitionBatch { states, actions, rewards, non_terminal_mask, next_states })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(value: u8) -> StackedState {
        Array3::from_elem((2, 3, 3), value)
    }

    #[test]
    fn test_batch_keeps_only_present_next_states() {
        let transitions = vec![
            Transition::new(state(1), 0, NextState::Present(state(2)), 1.0),
            Transition::new(state(3), 1, NextState::Terminal, 0.0),
            Transition::new(state(5), 2, NextState::Present(state(6)), -1.0),
        ];
        let refs: Vec<&Transition> = transitions.iter().collect();
        let batch = TransitionBatch::from_transitions(&refs).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.non_terminal_mask, vec![true, false, true]);
        let next = batch.next_states.unwrap();
        assert_eq!(next.dim(), (2, 2, 3, 3));
        assert_eq!(next[[0, 0, 0, 0]], 2.0);
        assert_eq!(next[[1, 0, 0, 0]], 6.0);
        assert_eq!(batch.states[[1, 1, 2, 2]], 3.0);
    }

    #[test]
    fn test_all_terminal_batch_has_no_next_states() {
        let transitions = vec![Transition::new(state(1), 0, NextState::Terminal, 0.0)];
        let refs: Vec<&Transition> = transitions.iter().collect();
        let batch = TransitionBatch::from_transitions(&refs).unwrap();
        assert!(batch.next_states.is_none());
    }

    #[test]
    fn test_mismatched_states_rejected() {
        let a = state(0);
        let b = Array3::zeros((2, 4, 4));
        assert!(states_to_input(vec![&a, &b]).is_err());
    }
}
