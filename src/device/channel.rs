use super::command::{CommandId, CommandName, CommandPayload};
use async_trait::async_trait;
use std::time::Duration;
use strum_macros::Display;

/// One telemetry reading from the pointing device: the local sidereal time
/// in hours, wrapping in [0, 24). Refreshed once per target and never
/// retained beyond its use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    pub lst_hours: f64,
}

impl TimeSample {
    pub fn lst_deg(self) -> f64 { self.lst_hours * 15.0 }
}

#[derive(Debug, Display)]
pub enum ChannelError {
    /// The transport to the device is gone; no further commands can be issued.
    #[strum(to_string = "device transport lost: {0}")]
    Disconnected(String),
    /// No acknowledgement arrived within the wait bound.
    #[strum(to_string = "acknowledgement wait expired")]
    AckTimeout,
    /// The requested telemetry topic is not served by this device.
    #[strum(to_string = "unknown telemetry topic {0}")]
    UnknownTopic(String),
}

impl std::error::Error for ChannelError {}

/// The command/telemetry transport to the pointing device.
///
/// The driver is the only caller and keeps at most one command outstanding,
/// so implementations need no internal command queueing discipline.
#[async_trait]
pub trait DeviceCommandChannel: Send + Sync {
    /// Issues a command and returns a handle for its acknowledgement.
    async fn issue(
        &self,
        name: CommandName,
        payload: &CommandPayload,
    ) -> Result<CommandId, ChannelError>;

    /// Blocks until the command acknowledges or `timeout` expires.
    ///
    /// The raw device ack code is negative on rejection; expiry surfaces as
    /// `ChannelError::AckTimeout`.
    async fn wait_for_completion(
        &self,
        id: CommandId,
        timeout: Duration,
    ) -> Result<(i32, String), ChannelError>;

    /// Pulls the latest sample from a telemetry topic, if one is available.
    async fn pull_telemetry(&self, topic: &str) -> Result<Option<TimeSample>, ChannelError>;
}
