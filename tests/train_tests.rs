// Tests for TrainConfig, train_loop and evaluate

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use rand::{rngs::StdRng, SeedableRng};

use ferrite_rnn::{
    evaluate, expected_cross_entropy, generate, train_loop, Error, ModelConfig, OptimizerKind,
    SequenceModel, TrainConfig, TrainHooks,
};

fn small_config() -> TrainConfig {
    TrainConfig {
        num_epochs: 2,
        data_size: 4_000,
        batch_size: 20,
        num_steps: 5,
        state_size: 4,
        learning_rate: 0.1,
        optimizer: OptimizerKind::Adagrad,
        log_every: 10,
        seed: Some(11),
    }
}

fn model_for(config: &TrainConfig, rng: &mut StdRng) -> SequenceModel {
    SequenceModel::new(ModelConfig { state_size: config.state_size, ..ModelConfig::default() }, rng)
}

// Config tests

#[test]
fn test_default_config_matches_reference_setup() {
    let c = TrainConfig::default();
    assert_eq!(c.batch_size, 200);
    assert_eq!(c.num_steps, 5);
    assert_eq!(c.state_size, 4);
    assert_eq!(c.learning_rate, 0.1);
    assert_eq!(c.optimizer, OptimizerKind::Adagrad);
    assert!(c.validate().is_ok());
}

#[test]
fn test_config_validation() {
    let bad = |f: fn(&mut TrainConfig)| {
        let mut c = small_config();
        f(&mut c);
        matches!(c.validate(), Err(Error::InvalidConfig(_)))
    };
    assert!(bad(|c| c.num_epochs = 0));
    assert!(bad(|c| c.batch_size = 0));
    assert!(bad(|c| c.num_steps = 0));
    assert!(bad(|c| c.state_size = 0));
    assert!(bad(|c| c.log_every = 0));
    assert!(bad(|c| c.learning_rate = 0.0));
    assert!(bad(|c| c.learning_rate = f64::NAN));
    assert!(bad(|c| c.data_size = 99));
    // batch_size * num_steps overflows usize.
    assert!(bad(|c| {
        c.batch_size = usize::MAX / 2 + 1;
        c.num_steps = 2;
    }));
    assert!(!bad(|_| {}));
}

#[test]
fn test_config_json_partial_file_uses_defaults() {
    let path = std::env::temp_dir().join(format!("ferrite_rnn_config_{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "num_steps": 10, "optimizer": "sgd", "seed": 3 }"#).unwrap();
    let loaded = TrainConfig::load_json(path.to_str().unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.num_steps, 10);
    assert_eq!(loaded.optimizer, OptimizerKind::Sgd);
    assert_eq!(loaded.seed, Some(3));
    assert_eq!(loaded.batch_size, TrainConfig::default().batch_size);
}

#[test]
fn test_config_json_round_trip() {
    let path = std::env::temp_dir().join(format!("ferrite_rnn_config_rt_{}.json", std::process::id()));
    let path = path.to_str().unwrap();
    let config = small_config();
    config.save_json(path).unwrap();
    let loaded = TrainConfig::load_json(path).unwrap();
    std::fs::remove_file(path).unwrap();
    assert_eq!(loaded, config);
}

// Training loop tests

#[test]
fn test_train_loop_report_counts() {
    let config = small_config();
    let mut rng = config.rng();
    let mut model = model_for(&config, &mut rng);
    let mut opt = config.optimizer.build(config.learning_rate);

    let report = train_loop(&mut model, &mut *opt, &config, &TrainHooks::default(), &mut rng).unwrap();

    // 4000 / 20 = 200 per row, / 5 = 40 windows per epoch.
    assert_eq!(report.steps, 80);
    assert_eq!(report.epoch_losses.len(), 2);
    // Reports at steps 10, 20, 30 of each epoch.
    assert_eq!(report.losses.len(), 6);
    assert!(!report.stopped_early);
    assert!(report.losses.iter().all(|l| l.is_finite() && *l > 0.0));
    assert!(report.final_loss().is_some());
}

#[test]
fn test_train_loop_is_reproducible_with_seed() {
    let run = || {
        let config = small_config();
        let mut rng = config.rng();
        let mut model = model_for(&config, &mut rng);
        let mut opt = config.optimizer.build(config.learning_rate);
        train_loop(&mut model, &mut *opt, &config, &TrainHooks::default(), &mut rng).unwrap()
    };
    assert_eq!(run().losses, run().losses);
}

#[test]
fn test_progress_channel_receives_each_report() {
    let config = small_config();
    let mut rng = config.rng();
    let mut model = model_for(&config, &mut rng);
    let mut opt = config.optimizer.build(config.learning_rate);

    let (tx, rx) = mpsc::channel();
    let hooks = TrainHooks { progress_tx: Some(tx), stop_flag: None };
    let report = train_loop(&mut model, &mut *opt, &config, &hooks, &mut rng).unwrap();
    drop(hooks);

    let stats: Vec<_> = rx.iter().collect();
    assert_eq!(stats.len(), report.losses.len());
    assert_eq!(stats[0].epoch, 1);
    assert_eq!(stats[0].step, 10);
    // The first report covers steps 0..=10.
    assert_eq!(stats[0].window_count, 11);
    assert_eq!(stats[1].window_count, 10);
    assert_eq!(stats.last().unwrap().epoch, 2);
}

#[test]
fn test_dropped_receiver_stops_training() {
    let config = small_config();
    let mut rng = config.rng();
    let mut model = model_for(&config, &mut rng);
    let mut opt = config.optimizer.build(config.learning_rate);

    let (tx, rx) = mpsc::channel();
    drop(rx);
    let hooks = TrainHooks { progress_tx: Some(tx), stop_flag: None };
    let report = train_loop(&mut model, &mut *opt, &config, &hooks, &mut rng).unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.steps, 11);
    assert!(report.epoch_losses.is_empty());
}

#[test]
fn test_stop_flag_prevents_training() {
    let config = small_config();
    let mut rng = config.rng();
    let mut model = model_for(&config, &mut rng);
    let before = model.cell.weights.clone();
    let mut opt = config.optimizer.build(config.learning_rate);

    let hooks = TrainHooks { progress_tx: None, stop_flag: Some(Arc::new(AtomicBool::new(true))) };
    let report = train_loop(&mut model, &mut *opt, &config, &hooks, &mut rng).unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.steps, 0);
    assert_eq!(model.cell.weights, before);
}

#[test]
fn test_stop_flag_raised_from_progress_thread() {
    // 500 epochs x 40 windows; the run must end long before that.
    let config = TrainConfig { num_epochs: 500, ..small_config() };
    let mut rng = config.rng();
    let mut model = model_for(&config, &mut rng);
    let mut opt = config.optimizer.build(config.learning_rate);

    let flag = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let watcher = {
        let flag = Arc::clone(&flag);
        std::thread::spawn(move || {
            let mut seen = 0usize;
            for _stats in rx {
                seen += 1;
                flag.store(true, Ordering::Relaxed);
            }
            seen
        })
    };

    let hooks = TrainHooks { progress_tx: Some(tx), stop_flag: Some(flag) };
    let report = train_loop(&mut model, &mut *opt, &config, &hooks, &mut rng).unwrap();
    drop(hooks);
    let seen = watcher.join().unwrap();

    assert!(report.stopped_early);
    // The first report goes out after step 10, so at least 11 windows ran.
    assert!(report.steps >= 11);
    assert!(report.steps < 500 * 40);
    assert!(report.epoch_losses.len() < 500);
    assert_eq!(seen, report.losses.len());
}

#[test]
fn test_state_size_mismatch_rejected() {
    let config = small_config();
    let mut rng = config.rng();
    let mut model = SequenceModel::new(ModelConfig { state_size: 7, ..ModelConfig::default() }, &mut rng);
    let mut opt = config.optimizer.build(config.learning_rate);
    let res = train_loop(&mut model, &mut *opt, &config, &TrainHooks::default(), &mut rng);
    assert!(matches!(res, Err(Error::InvalidConfig(_))));
}

#[test]
fn test_evaluate_does_not_change_model() {
    let config = small_config();
    let mut rng = config.rng();
    let model = model_for(&config, &mut rng);
    let data = generate(2_000, &mut rng);

    let a = evaluate(&model, &data, 10, 5).unwrap();
    let b = evaluate(&model, &data, 10, 5).unwrap();
    assert_eq!(a, b);
    assert!(a.is_finite() && a > 0.0);
    assert!(evaluate(&model, &data, 0, 5).is_err());
}

#[test]
fn test_training_learns_the_strong_dependency() {
    // The reference setup: state 4, window 5, Adagrad at 0.1.
    let config = TrainConfig {
        num_epochs: 1,
        data_size: 1_000_000,
        batch_size: 200,
        num_steps: 5,
        state_size: 4,
        learning_rate: 0.1,
        optimizer: OptimizerKind::Adagrad,
        log_every: 100,
        seed: Some(2024),
    };
    let mut rng = StdRng::seed_from_u64(2024);
    let mut model = model_for(&config, &mut rng);
    let mut opt = config.optimizer.build(config.learning_rate);

    train_loop(&mut model, &mut *opt, &config, &TrainHooks::default(), &mut rng).unwrap();

    let held_out = generate(100_000, &mut rng);
    let loss = evaluate(&model, &held_out, config.batch_size, config.num_steps).unwrap();
    let reference = expected_cross_entropy();

    assert!(
        loss < reference.no_dependency - 0.05,
        "held-out loss {loss} did not drop below the no-dependency entropy {}",
        reference.no_dependency
    );
    assert!(loss > reference.both_dependencies - 0.02);
}
