use std::fmt::{Display, Formatter};
use std::time::Duration;
use strum_macros::Display;

/// The five commands the driver is allowed to send to the pointing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CommandName {
    #[strum(serialize = "start")]
    Start,
    #[strum(serialize = "enable")]
    Enable,
    #[strum(serialize = "disable")]
    Disable,
    #[strum(serialize = "standby")]
    Standby,
    #[strum(serialize = "raDecTarget")]
    RaDecTarget,
}

impl CommandName {
    pub fn is_lifecycle(self) -> bool { self != CommandName::RaDecTarget }
}

/// Pointing coordinates carried by a `raDecTarget` command (deg).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SlewPayload {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

/// Payload attached to an issued command. Lifecycle commands carry none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandPayload {
    Empty,
    RaDec(SlewPayload),
}

/// Opaque handle for one in-flight command exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub u64);

impl Display for CommandId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "#{}", self.0) }
}

/// Normalized acknowledgement outcome of one dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AckCode {
    Complete,
    Failed,
    Timeout,
}

/// Outcome of one dispatch call: the normalized ack, the device's free-form
/// result text, and the wall time the full issue/ack exchange took.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub ack: AckCode,
    pub result: String,
    pub elapsed: Duration,
}

impl CommandResult {
    pub fn succeeded(&self) -> bool { self.ack == AckCode::Complete }

    pub fn elapsed_s(&self) -> f64 { self.elapsed.as_secs_f64() }
}
