use ndarray::{Axis, Array3};
use std::collections::VecDeque;

use crate::error::{DuelnetError, Result};
use crate::types::{Frame, StackedState};

/// The K most recent preprocessed frames, oldest first.
#[derive(Clone, Debug)]
pub struct FrameStack {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameStack {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DuelnetError::invalid_parameter("capacity", "frame stack needs at least one frame"));
        }
        Ok(FrameStack {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a frame, evicting the oldest. The first push after `new` or
    /// `reset` fills every slot with `frame`.
    pub fn push(&mut self, frame: Frame) -> Result<()> {
        if let Some(existing) = self.frames.front() {
            if existing.dim() != frame.dim() {
                return Err(DuelnetError::dimension_mismatch(
                    format!("{:?}", existing.dim()),
                    format!("{:?}", frame.dim()),
                ));
            }
        }

        if self.frames.is_empty() {
            for _ in 1..self.capacity {
                self.frames.push_back(frame.clone());
            }
        } else if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
        Ok(())
    }

    /// Owned `(K, H, W)` copy of the stack, `None` before the first push.
    pub fn get(&self) -> Option<StackedState> {
        let first = self.frames.front()?;
        let (height, width) = first.dim();
        let mut state = Array3::zeros((self.capacity, height, width));
        for (mut slot, frame) in state.axis_iter_mut(Axis(0)).zip(&self.frames) {
            slot.assign(frame);
        }
        Some(state)
    }

    pub fn reset(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
