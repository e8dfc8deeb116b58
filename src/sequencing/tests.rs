use super::coordinate::estimate_pointing;
use super::drift::{DriftTracker, DriftVerdict};
use super::sequencer::{SequenceOutcome, SequencePhase, VisitSequencer};
use super::{CommandDispatcher, SequenceError};
use crate::catalog::Target;
use crate::config::SequencerConfig;
use crate::device::{
    AckCode, CommandName, CommandPayload, DeviceCommandChannel, SimAck, SimulatedPointingDevice,
    TimeSample,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn target(id: usize, slew_time_s: f64, visit_exp_time_s: f64) -> Target {
    Target {
        id,
        ra_deg: 20.0 + id as f64,
        dec_deg: -30.0,
        observation_lst_deg: 30.0 + id as f64,
        slew_time_s,
        visit_exp_time_s,
    }
}

fn fast_config(max_buffer_s: f64) -> SequencerConfig {
    SequencerConfig {
        enable_at_start: false,
        disable_at_end: false,
        max_buffer_s,
        time_zone_offset_h: -2.0,
        command_timeout_s: 0.5,
        telemetry_timeout_s: 0.5,
    }
}

fn channel(sim: &Arc<SimulatedPointingDevice>) -> Arc<dyn DeviceCommandChannel> {
    let channel: Arc<dyn DeviceCommandChannel> = sim.clone();
    channel
}

fn adjusted(verdict: DriftVerdict) -> f64 {
    match verdict {
        DriftVerdict::Continue { adjusted_exposure_s } => adjusted_exposure_s,
        DriftVerdict::Abort => panic!("unexpected abort"),
    }
}

#[test]
fn test_fast_slew_folds_saved_time_into_exposure() {
    let mut tracker = DriftTracker::new(60.0);
    let verdict = tracker.record(10.0, 8.0, 30.0).unwrap();
    assert_eq!(adjusted(verdict), 32.0);
    assert_eq!(tracker.budget_s(), 0.0);
}

#[test]
fn test_overrun_beyond_exposure_erodes_budget_and_floors_exposure() {
    let mut tracker = DriftTracker::new(60.0);
    let verdict = tracker.record(5.0, 12.0, 3.0).unwrap();
    assert_eq!(adjusted(verdict), 0.0);
    assert!((tracker.budget_s() - -4.0).abs() < 1e-12);
}

#[test]
fn test_reference_catalog_stays_on_schedule() {
    // (predicted slew, actual slew, predicted exposure) per target, buffer 5s.
    let mut tracker = DriftTracker::new(5.0);
    assert_eq!(adjusted(tracker.record(10.0, 8.0, 30.0).unwrap()), 32.0);
    assert_eq!(adjusted(tracker.record(10.0, 14.0, 30.0).unwrap()), 26.0);
    assert_eq!(adjusted(tracker.record(10.0, 9.0, 1.0).unwrap()), 2.0);
    assert_eq!(tracker.budget_s(), 0.0);
}

#[test]
fn test_reference_catalog_aborts_on_large_overrun() {
    let mut tracker = DriftTracker::new(5.0);
    assert_eq!(adjusted(tracker.record(10.0, 8.0, 30.0).unwrap()), 32.0);
    // 40s overrun, 30s absorbable -> 10s shortfall > 5s ceiling.
    let verdict = tracker.record(10.0, 50.0, 30.0).unwrap();
    assert_eq!(verdict, DriftVerdict::Abort);
    assert!((tracker.budget_s() - -10.0).abs() < 1e-12);
}

#[test]
fn test_early_or_on_time_slews_never_touch_budget() {
    let mut rng = rand::rng();
    let mut tracker = DriftTracker::new(60.0);
    for _ in 0..200 {
        let predicted: f64 = rng.random_range(1.0..120.0);
        let actual = rng.random_range(0.0..=predicted);
        let exposure = rng.random_range(0.0..60.0);
        let verdict = tracker.record(predicted, actual, exposure).unwrap();
        let expected = exposure + (predicted - actual);
        assert!((adjusted(verdict) - expected).abs() < 1e-9);
        assert_eq!(tracker.budget_s(), 0.0);
    }
}

#[test]
fn test_tracker_rejects_negative_timing() {
    let mut tracker = DriftTracker::new(60.0);
    assert!(matches!(tracker.record(-1.0, 2.0, 3.0), Err(SequenceError::InvalidInput(_))));
    assert!(matches!(tracker.record(1.0, f64::NAN, 3.0), Err(SequenceError::InvalidInput(_))));
}

#[test]
fn test_pointing_estimate_and_idempotence() {
    let t = target(0, 5.0, 30.0);
    // ha = 30 - 20 = 10 deg; lst 2h = 30 deg -> ra = 20 deg.
    let sample = TimeSample { lst_hours: 2.0 };
    let first = estimate_pointing(&t, sample).unwrap();
    assert!((first.ra_deg - 20.0).abs() < 1e-9);
    assert_eq!(first.dec_deg, -30.0);
    let second = estimate_pointing(&t, sample).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_pointing_estimate_wraps_into_circle() {
    let mut t = target(0, 5.0, 30.0);
    t.observation_lst_deg = 350.0;
    t.ra_deg = 0.0;
    let est = estimate_pointing(&t, TimeSample { lst_hours: 0.5 }).unwrap();
    assert!((0.0..360.0).contains(&est.ra_deg));
}

#[test]
fn test_pointing_estimate_rejects_non_finite() {
    let mut t = target(0, 5.0, 30.0);
    t.ra_deg = f64::NAN;
    assert!(matches!(
        estimate_pointing(&t, TimeSample { lst_hours: 2.0 }),
        Err(SequenceError::InvalidInput(_))
    ));
    let t_ok = target(0, 5.0, 30.0);
    assert!(matches!(
        estimate_pointing(&t_ok, TimeSample { lst_hours: f64::INFINITY }),
        Err(SequenceError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_dispatcher_normalizes_ack_outcomes() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    let dispatcher = CommandDispatcher::new(channel(&sim));

    let ok = dispatcher
        .dispatch(CommandName::Start, &CommandPayload::Empty, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(ok.ack, AckCode::Complete);

    sim.script_ack(CommandName::Enable, SimAck::Reject);
    let rejected = dispatcher
        .dispatch(CommandName::Enable, &CommandPayload::Empty, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(rejected.ack, AckCode::Failed);

    sim.script_ack(CommandName::Disable, SimAck::Hang);
    let timed_out = dispatcher
        .dispatch(CommandName::Disable, &CommandPayload::Empty, Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(timed_out.ack, AckCode::Timeout);
    assert!(timed_out.elapsed >= Duration::from_millis(50));
}

#[tokio::test]
async fn test_dispatcher_rejects_zero_timeout() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    let dispatcher = CommandDispatcher::new(sim);
    let res = dispatcher
        .dispatch(CommandName::Start, &CommandPayload::Empty, Duration::ZERO)
        .await;
    assert!(matches!(res, Err(SequenceError::InvalidInput(_))));
}

#[tokio::test]
async fn test_sequence_flies_targets_in_order_and_completes() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    sim.set_default_slew(Duration::from_millis(10));
    let targets = vec![target(0, 0.05, 0.02), target(1, 0.05, 0.02)];

    let mut seq = VisitSequencer::new(channel(&sim), fast_config(60.0));
    let started = Instant::now();
    let report = seq.run(&targets, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.outcome, SequenceOutcome::Completed);
    assert_eq!(report.targets_flown, 2);
    assert_eq!(report.final_budget_s, 0.0);
    assert_eq!(seq.phase(), SequencePhase::Standby);
    assert_eq!(sim.issued(), vec![CommandName::RaDecTarget, CommandName::RaDecTarget]);
    // Each visit waits out its actual slew and adjusted exposure before the
    // next dispatch, so the run cannot be faster than the summed waits.
    assert!(started.elapsed() >= Duration::from_millis(140));
}

#[tokio::test]
async fn test_drift_abort_stops_dispatching_and_disables_once() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    sim.script_slew_durations([Duration::from_millis(10), Duration::from_millis(300)]);
    let targets = vec![target(0, 0.0, 0.0), target(1, 0.0, 0.0), target(2, 0.0, 0.0)];

    let mut seq = VisitSequencer::new(channel(&sim), fast_config(0.15));
    let res = seq.run(&targets, &CancellationToken::new()).await;

    assert!(matches!(res, Err(SequenceError::DriftExceeded { .. })));
    assert_eq!(seq.phase(), SequencePhase::Failed);
    assert_eq!(sim.issued_count(CommandName::RaDecTarget), 2);
    assert_eq!(sim.issued_count(CommandName::Disable), 1);
}

#[tokio::test]
async fn test_slew_timeout_fails_without_exposure_wait() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    sim.script_ack(CommandName::RaDecTarget, SimAck::Hang);
    // A long predicted exposure that must never be waited out.
    let targets = vec![target(0, 0.0, 30.0)];

    let mut config = fast_config(60.0);
    config.command_timeout_s = 0.05;
    let mut seq = VisitSequencer::new(channel(&sim), config);
    let started = Instant::now();
    let res = seq.run(&targets, &CancellationToken::new()).await;

    assert!(matches!(
        res,
        Err(SequenceError::CommandFailure { name: CommandName::RaDecTarget, .. })
    ));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(seq.phase(), SequencePhase::Failed);
    assert_eq!(sim.issued_count(CommandName::Disable), 1);
}

#[tokio::test]
async fn test_lifecycle_rejections_are_tolerated() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    sim.set_default_slew(Duration::from_millis(5));
    for name in [CommandName::Start, CommandName::Enable, CommandName::Disable, CommandName::Standby]
    {
        sim.script_ack(name, SimAck::Reject);
    }
    let targets = vec![target(0, 0.01, 0.0)];

    let mut config = fast_config(60.0);
    config.enable_at_start = true;
    config.disable_at_end = true;
    let mut seq = VisitSequencer::new(channel(&sim), config);
    let report = seq.run(&targets, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.outcome, SequenceOutcome::Completed);
    assert_eq!(seq.phase(), SequencePhase::Standby);
    let issued = sim.issued();
    assert_eq!(issued.first(), Some(&CommandName::Start));
    assert_eq!(issued.get(1), Some(&CommandName::Enable));
    assert_eq!(issued.last(), Some(&CommandName::Standby));
}

#[tokio::test]
async fn test_telemetry_exhaustion_is_fatal_after_one_disable() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    sim.script_empty_pulls(100);
    let targets = vec![target(0, 0.01, 0.0)];

    let mut config = fast_config(60.0);
    config.telemetry_timeout_s = 0.05;
    let mut seq = VisitSequencer::new(channel(&sim), config);
    let res = seq.run(&targets, &CancellationToken::new()).await;

    assert!(matches!(res, Err(SequenceError::TelemetryUnavailable { .. })));
    assert_eq!(sim.issued_count(CommandName::RaDecTarget), 0);
    assert_eq!(sim.issued_count(CommandName::Disable), 1);
}

#[tokio::test]
async fn test_cancellation_between_targets_still_runs_exit_lifecycle() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    let targets = vec![target(0, 0.01, 0.0), target(1, 0.01, 0.0)];

    let mut config = fast_config(60.0);
    config.disable_at_end = true;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut seq = VisitSequencer::new(channel(&sim), config);
    let report = seq.run(&targets, &cancel).await.unwrap();

    assert_eq!(report.outcome, SequenceOutcome::Interrupted);
    assert_eq!(report.targets_flown, 0);
    assert_eq!(sim.issued_count(CommandName::RaDecTarget), 0);
    assert_eq!(sim.issued(), vec![CommandName::Disable, CommandName::Standby]);
    assert_eq!(seq.phase(), SequencePhase::Standby);
}

#[tokio::test]
async fn test_negative_command_timeout_is_rejected_before_any_command() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    let targets = vec![target(0, 0.01, 0.0)];

    let mut config = fast_config(60.0);
    config.enable_at_start = true;
    config.command_timeout_s = -1.0;
    let mut seq = VisitSequencer::new(channel(&sim), config);
    let res = seq.run(&targets, &CancellationToken::new()).await;

    assert!(matches!(res, Err(SequenceError::InvalidInput(_))));
    assert!(sim.issued().is_empty());
}

#[tokio::test]
async fn test_negative_drift_buffer_is_rejected_before_any_command() {
    let sim = Arc::new(SimulatedPointingDevice::new(2.0));
    let targets = vec![target(0, 0.01, 0.0)];

    let mut seq = VisitSequencer::new(channel(&sim), fast_config(-5.0));
    let res = seq.run(&targets, &CancellationToken::new()).await;

    assert!(matches!(res, Err(SequenceError::InvalidInput(_))));
    assert!(sim.issued().is_empty());
}
