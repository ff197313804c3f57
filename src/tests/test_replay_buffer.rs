use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

use crate::error::DuelnetError;
use crate::replay_buffer::ReplayBuffer;
use super::common::transition;

#[test]
fn test_replay_buffer_push_and_sample() {
    let mut buffer = ReplayBuffer::new(10).unwrap();
    buffer.push(transition(1));
    assert_eq!(buffer.len(), 1);

    let mut rng = StdRng::seed_from_u64(0);
    let sample = buffer.sample(1, &mut rng).unwrap();
    assert_eq!(sample[0], &transition(1));
}

#[test]
fn test_zero_capacity_rejected() {
    assert!(ReplayBuffer::new(0).is_err());
}

#[test]
fn test_wraparound_overwrites_oldest() {
    // Capacity 4 fed T1..T6
    let mut buffer = ReplayBuffer::new(4).unwrap();
    for id in 1..=6 {
        buffer.push(transition(id));
    }

    assert_eq!(buffer.len(), 4);
    assert_eq!(buffer.position(), 2);
    let slots: Vec<u8> = buffer.iter().map(|t| t.state[[0, 0, 0]]).collect();
    assert_eq!(slots, vec![5, 6, 3, 4]);
}

#[test]
fn test_full_sample_after_wraparound_is_latest_four() {
    let mut buffer = ReplayBuffer::new(4).unwrap();
    for id in 1..=6 {
        buffer.push(transition(id));
    }

    let mut rng = StdRng::seed_from_u64(4);
    let sample = buffer.sample(4, &mut rng).unwrap();
    assert_eq!(sample.len(), 4);

    let ids: HashSet<u8> = sample.iter().map(|t| t.state[[0, 0, 0]]).collect();
    assert_eq!(ids, [3, 4, 5, 6].into_iter().collect());
    for t in sample {
        assert_eq!(t, &transition(t.state[[0, 0, 0]]));
    }
}

#[test]
fn test_len_never_exceeds_capacity() {
    let mut buffer = ReplayBuffer::new(3).unwrap();
    for id in 0..10 {
        buffer.push(transition(id));
        assert_eq!(buffer.len(), usize::from(id + 1).min(3));
    }
    assert_eq!(buffer.capacity(), 3);
}

#[test]
fn test_sample_more_than_stored_fails() {
    let mut buffer = ReplayBuffer::new(10).unwrap();
    for id in 0..3 {
        buffer.push(transition(id));
    }
    let mut rng = StdRng::seed_from_u64(1);
    match buffer.sample(4, &mut rng) {
        Err(DuelnetError::InsufficientSamples { requested, available }) => {
            assert_eq!(requested, 4);
            assert_eq!(available, 3);
        }
        other => panic!("expected InsufficientSamples, got {:?}", other.map(|s| s.len())),
    }
    assert_eq!(buffer.sample(3, &mut rng).unwrap().len(), 3);
}

#[test]
fn test_sample_without_replacement() {
    let mut buffer = ReplayBuffer::new(50).unwrap();
    for id in 0..50 {
        buffer.push(transition(id));
    }
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..20 {
        let ids: HashSet<u8> = buffer.sample(32, &mut rng).unwrap().iter().map(|t| t.state[[0, 0, 0]]).collect();
        assert_eq!(ids.len(), 32);
    }
}

#[test]
fn test_sampling_reaches_every_slot() {
    let mut buffer = ReplayBuffer::new(4).unwrap();
    for id in 1..=6 {
        buffer.push(transition(id));
    }
    let mut rng = StdRng::seed_from_u64(3);
    let mut seen = HashSet::new();
    for _ in 0..200 {
        for t in buffer.sample(1, &mut rng).unwrap() {
            seen.insert(t.state[[0, 0, 0]]);
        }
    }
    assert_eq!(seen, [3, 4, 5, 6].into_iter().collect());
}
