//! The pointing-device boundary: command vocabulary, the abstract command
//! channel, and a simulated device for local runs and tests.

mod channel;
mod command;
mod sim_channel;

pub use channel::{ChannelError, DeviceCommandChannel, TimeSample};
pub use command::{AckCode, CommandId, CommandName, CommandPayload, CommandResult, SlewPayload};
pub use sim_channel::{LST_TOPIC, SimAck, SimulatedPointingDevice};
