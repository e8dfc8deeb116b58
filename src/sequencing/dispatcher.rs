use super::error::SequenceError;
use crate::device::{
    AckCode, ChannelError, CommandName, CommandPayload, CommandResult, DeviceCommandChannel,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Wraps the device command channel with uniform issue/wait/timeout
/// semantics for the lifecycle and per-target commands.
///
/// One command is issued per call and no retries happen here; a rejected or
/// timed-out acknowledgement comes back as a `CommandResult` value and the
/// caller decides how severe that is. Transport breakage is the only thing
/// that surfaces as an error.
pub struct CommandDispatcher {
    channel: Arc<dyn DeviceCommandChannel>,
}

impl CommandDispatcher {
    pub fn new(channel: Arc<dyn DeviceCommandChannel>) -> Self { Self { channel } }

    pub fn channel(&self) -> &Arc<dyn DeviceCommandChannel> { &self.channel }

    pub async fn dispatch(
        &self,
        name: CommandName,
        payload: &CommandPayload,
        timeout: Duration,
    ) -> Result<CommandResult, SequenceError> {
        if timeout.is_zero() {
            return Err(SequenceError::InvalidInput(format!(
                "dispatch timeout for {name} must be > 0"
            )));
        }
        let issued_at = Instant::now();
        let id = self.channel.issue(name, payload).await?;
        match self.channel.wait_for_completion(id, timeout).await {
            Ok((code, result)) => {
                let ack = if code < 0 { AckCode::Failed } else { AckCode::Complete };
                Ok(CommandResult { ack, result, elapsed: issued_at.elapsed() })
            }
            Err(ChannelError::AckTimeout) => Ok(CommandResult {
                ack: AckCode::Timeout,
                result: format!("no acknowledgement within {:.1}s", timeout.as_secs_f64()),
                elapsed: issued_at.elapsed(),
            }),
            Err(e) => Err(SequenceError::Channel(e)),
        }
    }
}
