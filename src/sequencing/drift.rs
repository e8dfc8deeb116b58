use super::error::SequenceError;

/// Verdict for one recorded target timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftVerdict {
    /// Keep going; expose for the adjusted duration (seconds).
    Continue { adjusted_exposure_s: f64 },
    /// The accumulated slippage exceeded the ceiling; stop the sequence.
    Abort,
}

/// Owns the running drift budget and the abort decision.
///
/// Exposure time flexes first: a fast slew folds its saved time into the
/// exposure window so the total visit duration is preserved, and an overrun
/// is absorbed by shortening the exposure. Only the part of an overrun that
/// the exposure cannot absorb erodes the shared budget, and the budget
/// ceiling is a bound on cumulative slippage, not per-target.
#[derive(Debug)]
pub struct DriftTracker {
    budget_s: f64,
    max_buffer_s: f64,
}

impl DriftTracker {
    pub fn new(max_buffer_s: f64) -> Self { Self { budget_s: 0.0, max_buffer_s } }

    /// Accumulated slack in seconds; negative means behind schedule.
    pub fn budget_s(&self) -> f64 { self.budget_s }

    pub fn max_buffer_s(&self) -> f64 { self.max_buffer_s }

    /// Records one target's predicted vs. actual slew timing and returns
    /// whether the sequence may continue, with the exposure duration to use.
    pub fn record(
        &mut self,
        predicted_slew_s: f64,
        actual_slew_s: f64,
        predicted_exposure_s: f64,
    ) -> Result<DriftVerdict, SequenceError> {
        if [predicted_slew_s, actual_slew_s, predicted_exposure_s]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(SequenceError::InvalidInput(format!(
                "timing values must be finite and non-negative, got \
                 slew {predicted_slew_s}/{actual_slew_s}, exposure {predicted_exposure_s}"
            )));
        }

        let delta = predicted_slew_s - actual_slew_s;
        let flexed = predicted_exposure_s + delta;
        let adjusted_exposure_s = if flexed >= 0.0 {
            flexed
        } else {
            // Irreconcilable overrun: the shortfall erodes the shared budget.
            self.budget_s += flexed;
            0.0
        };

        if self.budget_s.abs() > self.max_buffer_s {
            return Ok(DriftVerdict::Abort);
        }
        Ok(DriftVerdict::Continue { adjusted_exposure_s })
    }
}
