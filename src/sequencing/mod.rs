//! The sequencing core: pointing estimation, command dispatch, the drift
//! budget policy, and the visit state machine that ties them together.

mod coordinate;
mod dispatcher;
mod drift;
mod error;
mod sequencer;

#[cfg(test)]
mod tests;

pub use coordinate::{PointingEstimate, estimate_pointing, wrap_degrees};
pub use dispatcher::CommandDispatcher;
pub use drift::{DriftTracker, DriftVerdict};
pub use error::SequenceError;
pub use sequencer::{RunReport, SequenceOutcome, SequencePhase, VisitSequencer};
