mod common;

use std::path::Path;

use common::{Answer, Harness, ScriptedPresenter};
use jnd_core::{Direction, JndError, SessionKind, TaskKind};
use jnd_experiment::{
    CsvLogFactory, ExperimentConfig, MemoryStimulusStore, Notice, RunSummary, SessionKey,
    SimulatedListener, StimulusResolver, StopReason, TaskConfig, VirtualStimulusStore,
    read_trial_log,
};
use jnd_timing::Timer;
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use Answer::{Correct, Incorrect};

#[test]
fn stops_once_reversals_exceed_the_ceiling() {
    // C, I, then (C, C, I) adds two reversals per cycle: 1 + 7 * 2 = 15
    let mut script = vec![Correct, Incorrect];
    for _ in 0..7 {
        script.extend([Correct, Correct, Incorrect]);
    }
    let mut harness = Harness::new(ScriptedPresenter::new(script, Correct));
    let config = ExperimentConfig::default();

    let outcome = harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_trials(TaskKind::Pitch, 1)
        })
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::MaxReversals);
    assert_eq!(outcome.trials.len(), 23);
    assert_eq!(outcome.reversals().len(), 15);

    let rows = harness.logs.rows(&SessionKey::trial(TaskKind::Pitch, 1));
    assert_eq!(rows.len(), 23);
    let counts: Vec<u32> = rows.iter().map(|r| r.reversals).collect();
    assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(counts.last(), Some(&15));
    assert_eq!(harness.reporter.summaries.len(), 1);
    assert_eq!(harness.reporter.summaries[0], outcome.summary);
}

#[test]
fn all_correct_pause_run_converges_on_baseline() {
    let mut harness = Harness::new(ScriptedPresenter::always(Correct));
    let config = ExperimentConfig::default();

    let outcome = harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_trials(TaskKind::Pause, 1)
        })
        .unwrap();

    // 10 steps of 0.03, 10 of 0.01, 15 of 0.005 and 75 of 0.001
    assert_eq!(outcome.stop_reason, StopReason::StimuliConverged);
    assert_eq!(outcome.trials.len(), 110);
    assert!(outcome.reversals().is_empty());
    assert!(outcome.threshold().is_none());
    let last = outcome.trials.last().unwrap();
    assert_eq!(last.step.difference_after, 0.0);
    assert!(outcome.trials.iter().all(|t| t.step.direction == Direction::Down));
}

#[test]
fn missing_stimulus_aborts_after_logged_trials() {
    let config = ExperimentConfig::default();
    let pause = config.task(TaskKind::Pause).unwrap();
    let store = MemoryStimulusStore::from_iter([
        Path::new("audio/audio-pause/lilli_lisa_ch_pause_0_000.wav"),
        Path::new("audio/audio-pause/lilli_lisa_ch_pause_0_550.wav"),
    ]);
    let resolver = StimulusResolver::new(&store, &config.paths.stimuli_root, pause);
    assert!(resolver.resolve(0.0).is_ok());

    let mut harness = Harness::new(ScriptedPresenter::always(Correct));
    let err = harness
        .run(&config, &store, |runner| runner.run_trials(TaskKind::Pause, 1))
        .unwrap_err();

    match err {
        JndError::StimulusNotFound { task, value, path } => {
            assert_eq!(task, TaskKind::Pause);
            assert!((value - 0.52).abs() < 1e-9);
            assert!(path.ends_with("lilli_lisa_ch_pause_0_520.wav"));
        }
        other => panic!("expected a missing stimulus, got {other:?}"),
    }
    assert_eq!(harness.logs.rows(&SessionKey::trial(TaskKind::Pause, 1)).len(), 1);
    assert!(harness.reporter.summaries.is_empty());
}

#[test]
fn missing_baseline_fails_before_the_log_is_opened() {
    let config = ExperimentConfig::default();
    let mut harness = Harness::new(ScriptedPresenter::always(Correct));
    let err = harness
        .run(&config, &MemoryStimulusStore::new(), |runner| {
            runner.run_trials(TaskKind::FinalLengthening, 1)
        })
        .unwrap_err();
    assert!(err.is_setup_error());
    assert!(!harness.logs.opened(&SessionKey::trial(TaskKind::FinalLengthening, 1)));
}

#[test]
fn invalid_response_records_nothing() {
    let mut harness = Harness::new(ScriptedPresenter::always(Answer::Key("space")));
    let config = ExperimentConfig::default();

    let err = harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_trials(TaskKind::Pitch, 1)
        })
        .unwrap_err();

    assert!(matches!(err, JndError::InvalidResponse { ref key } if key == "space"));
    let key = SessionKey::trial(TaskKind::Pitch, 1);
    assert!(harness.logs.opened(&key));
    assert!(harness.logs.rows(&key).is_empty());
}

#[test]
fn practice_ends_after_four_correct_with_feedback() {
    let script = [Correct, Incorrect, Correct, Correct, Correct];
    let mut harness = Harness::new(ScriptedPresenter::new(script, Incorrect));
    let config = ExperimentConfig::default();

    let outcome = harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_practice(TaskKind::FinalLengthening)
        })
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::PracticeComplete);
    assert_eq!(outcome.trials.len(), 5);
    assert_eq!(harness.presenter.feedback, vec![true, false, true, true, true]);

    let rows = harness.logs.rows(&SessionKey::practice(TaskKind::FinalLengthening));
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.session_type == SessionKind::Practice && r.run == 0));
    assert!(harness.reporter.summaries.is_empty());
}

#[test]
fn practice_gives_up_after_its_trial_limit() {
    let mut harness = Harness::new(ScriptedPresenter::always(Incorrect));
    let config = ExperimentConfig::default();

    let outcome = harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_practice(TaskKind::Pause)
        })
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::MaxTrials);
    assert_eq!(outcome.trials.len(), config.practice.max_trials);
}

#[test]
fn incorrect_first_response_is_clamped_at_the_ceiling() {
    let mut harness = Harness::new(ScriptedPresenter::new([Incorrect, Correct], Correct));
    let config = ExperimentConfig {
        limits: jnd_experiment::StopLimits {
            max_trials: 2,
            max_reversals: 14,
        },
        ..ExperimentConfig::default()
    };

    harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_trials(TaskKind::Pause, 1)
        })
        .unwrap();

    let rows = harness.logs.rows(&SessionKey::trial(TaskKind::Pause, 1));
    assert_eq!(rows[0].direction, Direction::None);
    assert_eq!(rows[0].difference, 0.55);
    assert_eq!(rows[0].reversals, 0);
    assert_eq!(rows[1].difference, 0.55);
    assert_eq!(rows[1].direction, Direction::None);
}

#[test]
fn pitch_steps_down_from_thirteen_point_one() {
    let mut harness = Harness::new(ScriptedPresenter::always(Correct));
    let mut config = ExperimentConfig::default();
    config.tasks = vec![TaskConfig {
        initial_difference: 13.1,
        ..TaskConfig::pitch()
    }];
    config.limits.max_trials = 2;

    harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_trials(TaskKind::Pitch, 1)
        })
        .unwrap();

    let rows = harness.logs.rows(&SessionKey::trial(TaskKind::Pitch, 1));
    assert_eq!(rows[0].difference, 13.1);
    assert_eq!(rows[0].step_size, 0.75);
    assert_eq!(rows[0].direction, Direction::Down);
    assert_eq!(rows[1].difference, 12.35);
}

#[test]
fn pitch_run_stops_when_test_shares_the_baseline_recording() {
    let mut harness = Harness::new(ScriptedPresenter::always(Correct));
    let mut config = ExperimentConfig::default();
    config.tasks = vec![TaskConfig {
        initial_difference: 0.1,
        ..TaskConfig::pitch()
    }];

    let outcome = harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_trials(TaskKind::Pitch, 1)
        })
        .unwrap();

    // 0.005 steps: 0.002 + 0.045 is the first test value named like the baseline
    assert_eq!(outcome.stop_reason, StopReason::StimuliConverged);
    assert_eq!(outcome.trials.len(), 11);
    let last = outcome.trials.last().unwrap();
    assert!((last.step.difference_after - 0.045).abs() < 1e-9);

    let rows = harness.logs.rows(&SessionKey::trial(TaskKind::Pitch, 1));
    assert!((rows[1].difference - 0.095).abs() < 1e-9);
    let first = [&rows[0].recording_a, &rows[0].recording_b];
    assert!(first.iter().any(|name| *name == "nelli_ch_rise_0_0.wav"));
    assert!(first.iter().any(|name| *name == "nelli_ch_rise_0_1.wav"));
}

#[test]
fn trial_timing_follows_the_protocol() {
    let mut harness = Harness::new(ScriptedPresenter::always(Correct));
    let mut config = ExperimentConfig::default();
    config.limits.max_trials = 2;

    harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_trials(TaskKind::Pause, 1)
        })
        .unwrap();

    // three 0.5 s recordings, two 1 s gaps, 0.2 s before the choice
    let rows = harness.logs.rows(&SessionKey::trial(TaskKind::Pause, 1));
    assert_eq!(rows[0].start_time, 0.0);
    assert!((rows[0].duration - 3.7).abs() < 1e-9);
    assert!((rows[1].start_time - 4.7).abs() < 1e-9);
    assert_eq!(harness.player.played.len(), 6);
    assert_eq!(harness.clock.now(), 9_400_000_000);
}

#[test]
fn recordings_follow_the_axb_layout() {
    let mut harness = Harness::new(ScriptedPresenter::always(Correct));
    let mut config = ExperimentConfig::default();
    config.limits.max_trials = 30;

    let outcome = harness
        .run(&config, &VirtualStimulusStore, |runner| {
            runner.run_trials(TaskKind::FinalLengthening, 1)
        })
        .unwrap();

    for (trial, played) in outcome.trials.iter().zip(harness.player.played.chunks(3)) {
        assert_eq!(played, [trial.triple.a.clone(), trial.triple.x.clone(), trial.triple.b.clone()]);
        assert_ne!(trial.triple.a, trial.triple.b);
        assert_ne!(&trial.triple.x, trial.triple.odd_one());
    }
}

#[test]
fn full_experiment_with_simulated_listener() {
    let config = ExperimentConfig::default();
    let mut listener =
        SimulatedListener::from_config(&config, 0.25, 0.05, 0.02, StdRng::seed_from_u64(9))
            .unwrap();
    let mut harness = Harness::new(ScriptedPresenter::always(Correct));

    let outcomes = {
        let mut runner = jnd_experiment::SessionRunner::new(
            &config,
            common::participant(),
            harness.clock.clone(),
            StdRng::seed_from_u64(1),
            jnd_experiment::Collaborators {
                store: &VirtualStimulusStore,
                player: &mut harness.player,
                presenter: &mut listener,
                logs: &mut harness.logs,
                reporter: &mut harness.reporter,
            },
        );
        runner.run_experiment().unwrap()
    };

    assert_eq!(outcomes.len(), 9);
    assert_eq!(harness.reporter.summaries.len(), 6);
    let mut tasks: Vec<TaskKind> = outcomes.iter().map(|o| o.key.task).collect();
    tasks.dedup();
    assert_eq!(tasks.len(), 3);

    for outcome in outcomes.iter().filter(|o| o.key.kind == SessionKind::Trial) {
        assert!(outcome.trials.len() <= config.limits.max_trials);
        let rows = harness.logs.rows(&outcome.key);
        assert_eq!(rows.len(), outcome.trials.len());
        let replayed =
            RunSummary::from_records(&rows, config.staircase.reversal_grammar, 6).unwrap();
        assert_eq!(replayed.reversals, outcome.summary.reversals);
        assert_eq!(replayed.threshold, outcome.summary.threshold);
    }
}

#[test]
fn experiment_shows_breaks_between_runs_and_tasks() {
    let mut config = ExperimentConfig::default();
    config.limits.max_trials = 3;
    config.practice.max_trials = 4;
    let mut harness = Harness::new(ScriptedPresenter::always(Correct));

    harness
        .run(&config, &VirtualStimulusStore, |runner| runner.run_experiment())
        .unwrap();

    let notices = &harness.presenter.notices;
    let count = |f: fn(&Notice) -> bool| notices.iter().filter(|n| f(n)).count();
    assert_eq!(count(|n| matches!(n, Notice::Instructions { .. })), 6);
    assert_eq!(count(|n| matches!(n, Notice::RunBreak { .. })), 3);
    assert_eq!(count(|n| matches!(n, Notice::TaskBreak { .. })), 2);
    assert_eq!(notices.last(), Some(&Notice::Finished));
}

#[test]
fn csv_log_round_trips_through_the_estimator() {
    let dir = std::env::temp_dir().join(format!("jnd-session-csv-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let config = ExperimentConfig::default();
    let mut listener =
        SimulatedListener::from_config(&config, 0.2, 0.05, 0.0, StdRng::seed_from_u64(4)).unwrap();
    let mut logs = CsvLogFactory::new(&dir);
    let mut harness = Harness::new(ScriptedPresenter::always(Correct));

    let outcome = {
        let mut runner = jnd_experiment::SessionRunner::new(
            &config,
            common::participant(),
            harness.clock.clone(),
            StdRng::seed_from_u64(8),
            jnd_experiment::Collaborators {
                store: &VirtualStimulusStore,
                player: &mut harness.player,
                presenter: &mut listener,
                logs: &mut logs,
                reporter: &mut harness.reporter,
            },
        );
        runner.run_trials(TaskKind::Pitch, 2).unwrap()
    };

    let path = logs.path_for(&common::participant(), &SessionKey::trial(TaskKind::Pitch, 2));
    assert!(path.ends_with("JND_pitch_s01_2024-03-28_10h15_run_2.csv"));
    let rows = read_trial_log(&path).unwrap();
    assert_eq!(rows.len(), outcome.trials.len());
    assert_eq!(rows[0].trial, 1);
    assert_eq!(rows[0].difference, 13.11);

    let replayed = RunSummary::from_records(&rows, config.staircase.reversal_grammar, 6).unwrap();
    assert_eq!(replayed.reversal_trials(), outcome.summary.reversal_trials());
    assert_eq!(replayed.threshold, outcome.summary.threshold);

    // the log of a finished session is never overwritten
    let mut again = CsvLogFactory::new(&dir);
    assert!(
        jnd_experiment::TrialLogFactory::open(
            &mut again,
            &common::participant(),
            &SessionKey::trial(TaskKind::Pitch, 2)
        )
        .is_err()
    );
    std::fs::remove_dir_all(&dir).unwrap();
}
