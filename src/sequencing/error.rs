use crate::catalog::CatalogError;
use crate::device::{ChannelError, CommandName};
use strum_macros::Display;

/// Fatal conditions a sequencing run can end in.
#[derive(Debug, Display)]
pub enum SequenceError {
    /// A target or telemetry sample carried non-finite or out-of-range values.
    #[strum(to_string = "invalid input: {0}")]
    InvalidInput(String),
    /// The device rejected or never acknowledged a per-target command.
    #[strum(to_string = "command {name} failed: {detail}")]
    CommandFailure { name: CommandName, detail: String },
    /// The accumulated drift budget exceeded its ceiling.
    #[strum(to_string = "drift budget {budget_s}s exceeded ceiling of {max_buffer_s}s")]
    DriftExceeded { budget_s: f64, max_buffer_s: f64 },
    /// The catalog could not be read; raised before any device interaction.
    #[strum(to_string = "catalog unavailable: {0}")]
    CatalogUnavailable(CatalogError),
    /// No valid telemetry sample arrived within the retry bound.
    #[strum(to_string = "no telemetry on {topic} within {waited_s}s")]
    TelemetryUnavailable { topic: String, waited_s: f64 },
    /// The command transport itself failed.
    #[strum(to_string = "command channel error: {0}")]
    Channel(ChannelError),
}

impl std::error::Error for SequenceError {}

impl From<CatalogError> for SequenceError {
    fn from(value: CatalogError) -> Self { SequenceError::CatalogUnavailable(value) }
}

impl From<ChannelError> for SequenceError {
    fn from(value: ChannelError) -> Self { SequenceError::Channel(value) }
}
