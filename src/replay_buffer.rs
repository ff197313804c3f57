use rand::seq::index;
use rand::Rng;

use crate::error::{DuelnetError, Result};
use crate::types::Transition;

/// Fixed-capacity ring buffer of transitions.
///
/// Once full, each push overwrites the slot under the write cursor, so the
/// oldest transition is always the next to go.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    memory: Vec<Transition>,
    capacity: usize,
    position: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DuelnetError::invalid_parameter("capacity", "replay capacity must be at least 1"));
        }
        Ok(ReplayBuffer {
            memory: Vec::new(),
            capacity,
            position: 0,
        })
    }

    pub fn push(&mut self, transition: Transition) {
        if self.memory.len() < self.capacity {
            self.memory.push(transition);
        } else {
            self.memory[self.position] = transition;
        }
        self.position = (self.position + 1) % self.capacity;
    }

    /// Draw `batch_size` distinct transitions uniformly at random.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<&Transition>> {
        if batch_size > self.memory.len() {
            return Err(DuelnetError::InsufficientSamples {
                requested: batch_size,
                available: self.memory.len(),
            });
        }
        Ok(index::sample(rng, self.memory.len(), batch_size)
            .into_iter()
            .map(|i| &self.memory[i])
            .collect())
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot the next push writes to
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn get(&self, slot: usize) -> Option<&Transition> {
        self.memory.get(slot)
    }

    /// Populated slots in slot order (not insertion order once wrapped)
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.memory.iter()
    }
}
