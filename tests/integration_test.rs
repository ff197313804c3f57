use duelnet::{
    agent::ValueEstimator,
    config::TrainingConfig,
    environment::{CatchConfig, Environment, ScreenCatch},
    network::{ConvSpec, DuelingNetwork, NetworkConfig},
    preprocessing::{FramePreprocessor, Preprocessor},
    runner::EpisodeRunner,
    trainer::Trainer,
    types::states_to_input,
    frame_stack::FrameStack,
};

fn catch_config() -> CatchConfig {
    CatchConfig { rows: 10, columns: 5, cell_size: 2, paddle_width: 2, lives: 2 }
}

fn training_config() -> TrainingConfig {
    TrainingConfig {
        num_episodes: 4,
        batch_size: 8,
        learning_rate: 1e-3,
        memory_capacity: 500,
        frame_stack: 2,
        learn_start: 20,
        optimize_every: 2,
        target_update: 25,
        max_episode_steps: 120,
        seed: Some(42),
        preprocessing: FramePreprocessor { crop: None, height: 10, width: 10 },
        network: NetworkConfig {
            conv_layers: vec![ConvSpec::new(4, 4, 2), ConvSpec::new(4, 2, 2)],
            input_scale: 1.0 / 255.0,
        },
        report_interval: 2,
        summary_interval: 4,
        checkpoint_every: 2,
        ..TrainingConfig::default()
    }
}

fn build_runner(config: &TrainingConfig) -> EpisodeRunner<ScreenCatch, FramePreprocessor, DuelingNetwork> {
    let env = ScreenCatch::new(catch_config(), 7).unwrap();
    let online = DuelingNetwork::new(config.state_shape(), env.action_space_size(), &config.network).unwrap();
    let trainer = Trainer::new(online, config.clone()).unwrap();
    EpisodeRunner::new(env, config.preprocessing, trainer)
}

#[test]
fn test_end_to_end_training_on_screen_catch() {
    let config = training_config();
    let mut runner = build_runner(&config);

    let summary = runner.run(config.num_episodes).unwrap();

    assert_eq!(summary.episodes, 4);
    assert!(summary.total_steps >= 4 * 9);
    assert!(summary.optimize_steps > 0);
    assert_eq!(summary.target_syncs, summary.total_steps / 25);
    assert_eq!(runner.metrics().episode_count(), 4);
    assert_eq!(runner.metrics().metrics().total_steps, summary.total_steps);

    let trainer = runner.trainer();
    assert!(trainer.memory().len() as u64 <= summary.total_steps);
    assert!(runner.metrics().metrics().losses.iter().all(|l| l.is_finite()));
    assert_eq!(
        trainer.state().episode_rewards.len() + summary.truncated_episodes,
        summary.episodes
    );
}

#[test]
fn test_runner_writes_checkpoints_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let config = training_config();
    let mut runner = build_runner(&config).with_checkpoint_dir(dir.path().join("run")).unwrap();

    runner.run(config.num_episodes).unwrap();

    let second = runner.checkpoint_path(2).unwrap();
    let fourth = runner.checkpoint_path(4).unwrap();
    assert!(second.exists());
    assert!(fourth.exists());
    assert!(!runner.checkpoint_path(3).unwrap().exists());
    assert!(dir.path().join("run").join("metrics.json").exists());

    // Resume from the last checkpoint into a fresh trainer
    let env = ScreenCatch::new(catch_config(), 0).unwrap();
    let fresh = DuelingNetwork::new(config.state_shape(), env.action_space_size(), &config.network).unwrap();
    let mut resumed = Trainer::new(fresh, config.clone()).unwrap();
    resumed.load_checkpoint(&fourth).unwrap();

    let original = runner.trainer();
    assert_eq!(resumed.state(), original.state());

    let mut game = ScreenCatch::new(catch_config(), 1).unwrap();
    let mut frames = FrameStack::new(config.frame_stack).unwrap();
    let screen = game.reset().unwrap();
    frames.push(config.preprocessing.process(screen.view()).unwrap()).unwrap();
    let state = frames.get().unwrap();
    let input = states_to_input(std::iter::once(&state)).unwrap();
    assert_eq!(
        resumed.online().evaluate(input.view()).unwrap(),
        original.online().evaluate(input.view()).unwrap()
    );
}

#[test]
fn test_config_file_drives_training() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    training_config().to_json_file(&path).unwrap();

    let config = TrainingConfig::from_json_file(&path).unwrap();
    assert_eq!(config, training_config());

    let mut runner = build_runner(&config);
    let summary = runner.run(1).unwrap();
    assert_eq!(summary.episodes, 1);
    assert_eq!(runner.env().action_space_size(), ScreenCatch::NUM_ACTIONS);

    // The trainer outlives its runner and keeps counting steps
    let mut trainer = runner.into_trainer();
    let mut game = ScreenCatch::new(catch_config(), 9).unwrap();
    let stats = trainer.run_episode(&mut game, &config.preprocessing).unwrap();
    assert_eq!(stats.episode, 1);
    assert_eq!(trainer.state().steps_done, summary.total_steps + stats.steps as u64);
}

#[test]
fn test_mismatched_network_rejected_before_training() {
    let config = training_config();
    let env = ScreenCatch::new(catch_config(), 7).unwrap();

    let wrong_input = DuelingNetwork::new((3, 10, 10), env.action_space_size(), &config.network).unwrap();
    assert!(Trainer::new(wrong_input, config.clone()).is_err());

    let wrong_actions = DuelingNetwork::new(config.state_shape(), env.action_space_size() + 1, &config.network).unwrap();
    let mut trainer = Trainer::new(wrong_actions, config.clone()).unwrap();
    let mut game = ScreenCatch::new(catch_config(), 7).unwrap();
    assert!(trainer.run_episode(&mut game, &config.preprocessing).is_err());
    assert_eq!(trainer.state().steps_done, 0);
}
