use ndarray::{Array2, Array4};
use rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::agent::{TrainableEstimator, ValueEstimator};
use crate::network::{ConvSpec, DuelingNetwork, NetworkConfig};
use super::common::{small_network, small_network_config, NUM_ACTIONS};

fn random_states(batch: usize, seed: u64) -> Array4<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array4::random_using((batch, 2, 8, 8), Uniform::new(0.0f32, 255.0), &mut rng)
}

#[test]
fn test_default_architecture_shapes() {
    let network = DuelingNetwork::new((4, 84, 84), 4, &NetworkConfig::default()).unwrap();
    assert_eq!(network.feature_shape(), (1024, 1, 1));
    assert_eq!(network.value_head.input_size(), 512);
    assert_eq!(network.advantage_head.output_size(), 4);
    assert_eq!(network.num_actions(), 4);
}

#[test]
fn test_evaluate_output_shape() {
    let network = small_network(0);
    let values = network.evaluate(random_states(5, 1).view()).unwrap();
    assert_eq!(values.dim(), (5, NUM_ACTIONS));
    assert!(values.iter().all(|v| v.is_finite()));
}

#[test]
fn test_wrong_input_shape_rejected() {
    let network = small_network(0);
    assert!(network.evaluate(Array4::zeros((1, 3, 8, 8)).view()).is_err());
}

#[test]
fn test_odd_feature_channels_rejected() {
    let config = NetworkConfig { conv_layers: vec![ConvSpec::new(3, 3, 1)], input_scale: 1.0 };
    assert!(DuelingNetwork::new((2, 8, 8), 2, &config).is_err());

    let too_deep = NetworkConfig { conv_layers: vec![ConvSpec::new(4, 9, 1)], input_scale: 1.0 };
    assert!(DuelingNetwork::new((2, 8, 8), 2, &too_deep).is_err());
}

#[test]
fn test_advantage_offset_does_not_change_q() {
    let network = small_network(2);
    let states = random_states(3, 3);
    let before = network.evaluate(states.view()).unwrap();

    let mut shifted = network.clone();
    shifted.advantage_head.biases += 5.0;
    let after = shifted.evaluate(states.view()).unwrap();
    for (a, b) in before.iter().zip(after.iter()) {
        assert!((a - b).abs() < 1e-4);
    }
}

#[test]
fn test_value_offset_shifts_every_action() {
    let network = small_network(4);
    let states = random_states(2, 5);
    let before = network.evaluate(states.view()).unwrap();

    let mut shifted = network.clone();
    shifted.value_head.biases += 2.0;
    let after = shifted.evaluate(states.view()).unwrap();
    for (a, b) in before.iter().zip(after.iter()) {
        assert!((b - a - 2.0).abs() < 1e-4);
    }
}

#[test]
fn test_forward_train_matches_evaluate() {
    let mut network = small_network(6);
    let states = random_states(4, 7);
    let evaluated = network.evaluate(states.view()).unwrap();
    let trained = network.forward_train(states.view()).unwrap();
    assert_eq!(evaluated, trained);
}

#[test]
fn test_backward_requires_forward_train() {
    let mut network = small_network(0);
    assert!(network.backward(Array2::zeros((1, NUM_ACTIONS)).view()).is_err());
}

#[test]
fn test_gradients_match_finite_differences() {
    let mut network = small_network(8);
    for layer in network.conv_layers.iter_mut() {
        layer.activation = Activation::Linear;
    }
    let states = random_states(2, 9);
    let mut rng = StdRng::seed_from_u64(10);
    let upstream = Array2::random_using((2, NUM_ACTIONS), Uniform::new(-1.0f32, 1.0), &mut rng);

    network.forward_train(states.view()).unwrap();
    let gradients = network.backward(upstream.view()).unwrap();
    assert_eq!(gradients.len(), network.conv_layers.len() + 2);

    let objective = |n: &DuelingNetwork| (n.evaluate(states.view()).unwrap() * &upstream).sum();
    let eps = 1e-2;

    for (group, (weight_grads, bias_grads)) in gradients.iter().enumerate() {
        let (rows, cols) = weight_grads.dim();
        for &(i, j) in &[(0, 0), (rows - 1, cols - 1), (rows / 2, cols / 2)] {
            let mut plus = network.clone();
            plus.parameters_mut()[group].0[[i, j]] += eps;
            let mut minus = network.clone();
            minus.parameters_mut()[group].0[[i, j]] -= eps;
            let numeric = (objective(&plus) - objective(&minus)) / (2.0 * eps);
            let analytic = weight_grads[[i, j]];
            assert!(
                (numeric - analytic).abs() < 1e-2 * analytic.abs().max(1.0),
                "group {} weight {:?}: numeric {} analytic {}",
                group,
                (i, j),
                numeric,
                analytic
            );
        }

        let mut plus = network.clone();
        plus.parameters_mut()[group].1[0] += eps;
        let mut minus = network.clone();
        minus.parameters_mut()[group].1[0] -= eps;
        let numeric = (objective(&plus) - objective(&minus)) / (2.0 * eps);
        assert!((numeric - bias_grads[0]).abs() < 1e-2 * bias_grads[0].abs().max(1.0), "group {} bias", group);
    }
}

#[test]
fn test_load_state_from_makes_networks_agree() {
    let online = small_network(11);
    let mut target = small_network(12);
    let states = random_states(3, 13);
    assert_ne!(online.evaluate(states.view()).unwrap(), target.evaluate(states.view()).unwrap());

    target.load_state_from(&online).unwrap();
    let synced = target.evaluate(states.view()).unwrap();
    assert_eq!(online.evaluate(states.view()).unwrap(), synced);

    // A second sync with no training in between changes nothing
    target.load_state_from(&online).unwrap();
    assert_eq!(target.evaluate(states.view()).unwrap(), synced);
}

#[test]
fn test_load_state_from_rejects_other_architecture() {
    let mut network = small_network(0);
    let mut rng = StdRng::seed_from_u64(0);
    let other = DuelingNetwork::new_with_rng((2, 8, 8), 5, &small_network_config(), &mut rng).unwrap();
    assert!(network.load_state_from(&other).is_err());
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("network.bin");
    let network = small_network(14);
    network.save(&path).unwrap();

    let restored = DuelingNetwork::load(&path).unwrap();
    let states = random_states(2, 15);
    assert_eq!(network.evaluate(states.view()).unwrap(), restored.evaluate(states.view()).unwrap());
}
