use super::coordinate::estimate_pointing;
use super::dispatcher::CommandDispatcher;
use super::drift::{DriftTracker, DriftVerdict};
use super::error::SequenceError;
use crate::catalog::Target;
use crate::config::SequencerConfig;
use crate::device::{
    CommandName, CommandPayload, CommandResult, DeviceCommandChannel, LST_TOPIC, SlewPayload,
    TimeSample,
};
use crate::{error, info, log, warn};
use chrono::{TimeDelta, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use strum_macros::Display;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// Lifecycle phase of one sequencing run.
///
/// `Failed` absorbs every fatal condition out of `Starting`, `Enabling` and
/// `Running`; reaching it guarantees exactly one disable attempt before the
/// error surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SequencePhase {
    Idle,
    Starting,
    Enabling,
    Running,
    Disabling,
    Standby,
    Failed,
}

/// How a run that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SequenceOutcome {
    /// Every catalog target was flown.
    Completed,
    /// An external stop was honored between targets.
    Interrupted,
}

/// Terminal summary of a successful (or cleanly interrupted) run.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub outcome: SequenceOutcome,
    pub targets_flown: usize,
    pub final_budget_s: f64,
}

/// Drives the visit sequence: lifecycle entry, the per-target loop, and the
/// guaranteed safe-shutdown path.
///
/// One sequence runs at a time; the sequencer owns the phase, the drift
/// tracker and the dispatcher, and serializes all device access.
pub struct VisitSequencer {
    dispatcher: CommandDispatcher,
    config: SequencerConfig,
    phase: SequencePhase,
}

impl VisitSequencer {
    /// Poll interval for the telemetry retry loop.
    const TLM_RETRY_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(channel: Arc<dyn DeviceCommandChannel>, config: SequencerConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(channel),
            config,
            phase: SequencePhase::Idle,
        }
    }

    pub fn phase(&self) -> SequencePhase { self.phase }

    /// Rejects timing options that cannot be turned into wait durations.
    /// Checked up front, before any command reaches the device.
    fn validate_config(&self) -> Result<(), SequenceError> {
        let timeout = self.config.command_timeout_s;
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(SequenceError::InvalidInput(format!(
                "command timeout {timeout}s must be > 0"
            )));
        }
        let max_buffer = self.config.max_buffer_s;
        if !max_buffer.is_finite() || max_buffer < 0.0 {
            return Err(SequenceError::InvalidInput(format!(
                "max buffer {max_buffer}s must be >= 0"
            )));
        }
        Ok(())
    }

    /// Replays the catalog against the device, in strict catalog order.
    ///
    /// The cancellation token is checked once per target, never mid-command;
    /// an in-flight command always reaches its ack or timeout first.
    pub async fn run(
        &mut self,
        targets: &[Target],
        cancel: &CancellationToken,
    ) -> Result<RunReport, SequenceError> {
        self.validate_config()?;
        if self.config.enable_at_start {
            self.phase = SequencePhase::Starting;
            if let Err(e) = self.lifecycle_step(CommandName::Start).await {
                return self.fail(e).await;
            }
            self.phase = SequencePhase::Enabling;
            if let Err(e) = self.lifecycle_step(CommandName::Enable).await {
                return self.fail(e).await;
            }
        } else {
            log!("Pointing device will not be enabled, flying targets as-is");
        }
        self.phase = SequencePhase::Running;

        let mut tracker = DriftTracker::new(self.config.max_buffer_s);
        let total = targets.len();
        let mut flown = 0;
        let mut outcome = SequenceOutcome::Completed;
        info!("Got {total} targets from catalog, starting sequence");

        for target in targets {
            if cancel.is_cancelled() {
                warn!("Stop requested, tearing down after {flown} targets");
                outcome = SequenceOutcome::Interrupted;
                break;
            }
            if let Err(e) = self.fly_target(target, total, &mut tracker).await {
                return self.fail(e).await;
            }
            flown += 1;
        }

        if self.config.disable_at_end {
            self.phase = SequencePhase::Disabling;
            if let Err(e) = self.lifecycle_step(CommandName::Disable).await {
                error!("Disable on exit failed ({e}), device may be left enabled");
            }
            if let Err(e) = self.lifecycle_step(CommandName::Standby).await {
                error!("Standby on exit failed ({e})");
            }
        } else {
            log!("Pointing device will not be disabled on exit");
        }
        self.phase = SequencePhase::Standby;

        info!(
            "Sequence {outcome}: {flown}/{total} targets, final buffer {:+.2}s of {:.0}s",
            tracker.budget_s(),
            tracker.max_buffer_s()
        );
        Ok(RunReport { outcome, targets_flown: flown, final_budget_s: tracker.budget_s() })
    }

    /// One full visit: telemetry sample, pointing estimate, slew dispatch,
    /// drift reconciliation, then the slew and exposure waits.
    async fn fly_target(
        &mut self,
        target: &Target,
        total: usize,
        tracker: &mut DriftTracker,
    ) -> Result<(), SequenceError> {
        let sample = self.sample_sidereal_time().await?;
        let pointing = estimate_pointing(target, sample)?;
        let payload = CommandPayload::RaDec(SlewPayload {
            ra_deg: pointing.ra_deg,
            dec_deg: pointing.dec_deg,
        });

        let res = self
            .dispatcher
            .dispatch(
                CommandName::RaDecTarget,
                &payload,
                Duration::from_secs_f64(self.config.command_timeout_s),
            )
            .await?;
        if !res.succeeded() {
            return Err(SequenceError::CommandFailure {
                name: CommandName::RaDecTarget,
                detail: format!("{} ({})", res.ack, res.result),
            });
        }

        let actual_slew_s = res.elapsed_s();
        let verdict = tracker.record(target.slew_time_s, actual_slew_s, target.visit_exp_time_s)?;
        let adjusted_exposure_s = match verdict {
            DriftVerdict::Abort => {
                return Err(SequenceError::DriftExceeded {
                    budget_s: tracker.budget_s(),
                    max_buffer_s: tracker.max_buffer_s(),
                });
            }
            DriftVerdict::Continue { adjusted_exposure_s } => adjusted_exposure_s,
        };

        info!(
            "[{:04}/{:04}] ra {:8.2} dec {:8.2} | slew {:.2}s (pred {:.2}s) exp {:.2}s | buffer {:+.2}s",
            target.id + 1,
            total,
            pointing.ra_deg,
            pointing.dec_deg,
            actual_slew_s,
            target.slew_time_s,
            adjusted_exposure_s,
            tracker.budget_s()
        );

        sleep(Duration::from_secs_f64(actual_slew_s)).await;
        sleep(Duration::from_secs_f64(adjusted_exposure_s)).await;
        Ok(())
    }

    /// Dispatches one lifecycle command, tolerating rejection and timeout.
    ///
    /// Lifecycle transitions are best-effort: a failed ack is logged and the
    /// sequence proceeds. Only transport breakage propagates.
    async fn lifecycle_step(&mut self, name: CommandName) -> Result<(), SequenceError> {
        let res = self
            .dispatcher
            .dispatch(
                name,
                &CommandPayload::Empty,
                Duration::from_secs_f64(self.config.command_timeout_s),
            )
            .await?;
        self.log_lifecycle_ack(name, &res);
        Ok(())
    }

    fn log_lifecycle_ack(&self, name: CommandName, res: &CommandResult) {
        if res.succeeded() {
            info!("Lifecycle command {name} acknowledged in {:.2}s", res.elapsed_s());
        } else {
            warn!("Lifecycle command {name} returned {} ({}), proceeding", res.ack, res.result);
        }
    }

    /// Retries the telemetry pull until a valid sample arrives, bounded by
    /// the configured telemetry timeout.
    async fn sample_sidereal_time(&self) -> Result<TimeSample, SequenceError> {
        let deadline =
            Instant::now() + Duration::from_secs_f64(self.config.telemetry_timeout_s.max(0.0));
        let mut logged_fallback = false;
        loop {
            match self.dispatcher.channel().pull_telemetry(LST_TOPIC).await? {
                Some(sample) if sample.lst_hours.is_finite() => return Ok(sample),
                Some(sample) => {
                    return Err(SequenceError::InvalidInput(format!(
                        "non-finite LST sample {}",
                        sample.lst_hours
                    )));
                }
                None => {
                    if !logged_fallback {
                        log!(
                            "No LST telemetry yet, wall-clock estimate {:.2} deg",
                            self.fallback_lst_deg()
                        );
                        logged_fallback = true;
                    }
                    if Instant::now() >= deadline {
                        return Err(SequenceError::TelemetryUnavailable {
                            topic: LST_TOPIC.to_string(),
                            waited_s: self.config.telemetry_timeout_s,
                        });
                    }
                    sleep(Self::TLM_RETRY_INTERVAL).await;
                }
            }
        }
    }

    /// Coarse LST estimate from wall time shifted by the configured zone
    /// offset. Logging only, never used for pointing.
    fn fallback_lst_deg(&self) -> f64 {
        let offset_s = (self.config.time_zone_offset_h * 3600.0) as i64;
        let now = Utc::now() + TimeDelta::seconds(offset_s);
        let hours =
            f64::from(now.hour()) + f64::from(now.minute()) / 60.0 + f64::from(now.second()) / 3600.0;
        hours * 15.0
    }

    /// Single funnel for every fatal condition: one best-effort disable, then
    /// the triggering error propagates.
    async fn fail(&mut self, cause: SequenceError) -> Result<RunReport, SequenceError> {
        self.phase = SequencePhase::Failed;
        error!("Sequence failed: {cause}. Disabling pointing device");
        match self
            .dispatcher
            .dispatch(
                CommandName::Disable,
                &CommandPayload::Empty,
                Duration::from_secs_f64(self.config.command_timeout_s),
            )
            .await
        {
            Ok(res) => self.log_lifecycle_ack(CommandName::Disable, &res),
            Err(e) => error!("Safe-shutdown disable could not be dispatched: {e}"),
        }
        Err(cause)
    }
}
