use ndarray::{Array2, Axis};

use crate::frame_stack::FrameStack;

fn frame(value: u8) -> Array2<u8> {
    Array2::from_elem((3, 5), value)
}

fn stacked_values(stack: &FrameStack) -> Vec<u8> {
    let state = stack.get().unwrap();
    state.axis_iter(Axis(0)).map(|f| f[[0, 0]]).collect()
}

#[test]
fn test_first_push_replicates() {
    let mut stack = FrameStack::new(4).unwrap();
    assert!(stack.get().is_none());

    stack.push(frame(7)).unwrap();
    assert_eq!(stack.len(), 4);
    assert_eq!(stack.get().unwrap().dim(), (4, 3, 5));
    assert_eq!(stacked_values(&stack), vec![7, 7, 7, 7]);
}

#[test]
fn test_sliding_window_oldest_first() {
    let mut stack = FrameStack::new(4).unwrap();
    for value in [1, 2, 3, 4, 5, 6] {
        stack.push(frame(value)).unwrap();
    }
    assert_eq!(stacked_values(&stack), vec![3, 4, 5, 6]);
}

#[test]
fn test_partial_window_keeps_replicas() {
    let mut stack = FrameStack::new(4).unwrap();
    stack.push(frame(1)).unwrap();
    stack.push(frame(2)).unwrap();
    assert_eq!(stacked_values(&stack), vec![1, 1, 1, 2]);
}

#[test]
fn test_reset_retriggers_replication() {
    let mut stack = FrameStack::new(3).unwrap();
    stack.push(frame(1)).unwrap();
    stack.push(frame(2)).unwrap();
    stack.reset();
    assert!(stack.is_empty());
    assert!(stack.get().is_none());

    stack.push(frame(9)).unwrap();
    assert_eq!(stacked_values(&stack), vec![9, 9, 9]);
}

#[test]
fn test_get_returns_independent_copy() {
    let mut stack = FrameStack::new(2).unwrap();
    stack.push(frame(1)).unwrap();
    let before = stack.get().unwrap();
    stack.push(frame(2)).unwrap();
    assert_eq!(before[[1, 0, 0]], 1);
}

#[test]
fn test_shape_mismatch_rejected() {
    let mut stack = FrameStack::new(2).unwrap();
    stack.push(frame(1)).unwrap();
    assert!(stack.push(Array2::zeros((4, 4))).is_err());
    assert!(FrameStack::new(0).is_err());
}
