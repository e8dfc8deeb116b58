use super::channel::{ChannelError, DeviceCommandChannel, TimeSample};
use super::command::{CommandId, CommandName, CommandPayload};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;

/// Device ack code for a completed command.
const ACK_DONE: i32 = 303;
/// Device ack code for a rejected command.
const ACK_FAILED: i32 = -302;

/// Telemetry topic carrying the local sidereal time.
pub const LST_TOPIC: &str = "timeAndDate";

/// Scripted acknowledgement behavior for one command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimAck {
    /// Acknowledge completion after the command's simulated duration.
    Complete,
    /// Acknowledge with a negative code after the command's simulated duration.
    Reject,
    /// Never acknowledge; the waiter runs into its timeout.
    Hang,
}

struct PendingCommand {
    ready_in: Duration,
    ack: SimAck,
}

/// In-process stand-in for a real pointing device.
///
/// Slew commands complete after scripted per-target durations, lifecycle
/// commands after a fixed short latency, and telemetry serves a configurable
/// LST. Tests script rejections, hangs and empty telemetry pulls through the
/// `script_*` methods.
pub struct SimulatedPointingDevice {
    lst_hours: Mutex<f64>,
    empty_pulls: Mutex<usize>,
    slew_durations: Mutex<VecDeque<Duration>>,
    default_slew: Mutex<Duration>,
    behavior: Mutex<HashMap<CommandName, SimAck>>,
    pending: Mutex<HashMap<u64, PendingCommand>>,
    issued: Mutex<Vec<CommandName>>,
    next_id: AtomicU64,
}

impl SimulatedPointingDevice {
    const LIFECYCLE_LATENCY: Duration = Duration::from_millis(5);

    pub fn new(lst_hours: f64) -> Self {
        Self {
            lst_hours: Mutex::new(lst_hours),
            empty_pulls: Mutex::new(0),
            slew_durations: Mutex::new(VecDeque::new()),
            default_slew: Mutex::new(Duration::from_millis(10)),
            behavior: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            issued: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queues the actual durations successive slew commands will take.
    pub fn script_slew_durations(&self, durations: impl IntoIterator<Item = Duration>) {
        self.slew_durations.lock().unwrap().extend(durations);
    }

    /// Overrides the duration of slews beyond the scripted queue.
    pub fn set_default_slew(&self, d: Duration) { *self.default_slew.lock().unwrap() = d; }

    /// Scripts the ack behavior for every future command with this name.
    pub fn script_ack(&self, name: CommandName, ack: SimAck) {
        self.behavior.lock().unwrap().insert(name, ack);
    }

    /// Makes the next `n` telemetry pulls come back empty.
    pub fn script_empty_pulls(&self, n: usize) { *self.empty_pulls.lock().unwrap() = n; }

    /// Journal of every command issued so far, in order.
    pub fn issued(&self) -> Vec<CommandName> { self.issued.lock().unwrap().clone() }

    /// Number of issued commands with the given name.
    pub fn issued_count(&self, name: CommandName) -> usize {
        self.issued.lock().unwrap().iter().filter(|&&n| n == name).count()
    }

    fn next_duration(&self, name: CommandName) -> Duration {
        if name.is_lifecycle() {
            Self::LIFECYCLE_LATENCY
        } else {
            self.slew_durations
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(*self.default_slew.lock().unwrap())
        }
    }
}

#[async_trait]
impl DeviceCommandChannel for SimulatedPointingDevice {
    async fn issue(
        &self,
        name: CommandName,
        _payload: &CommandPayload,
    ) -> Result<CommandId, ChannelError> {
        self.issued.lock().unwrap().push(name);
        let ack = self.behavior.lock().unwrap().get(&name).copied().unwrap_or(SimAck::Complete);
        let ready_in = self.next_duration(name);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().unwrap().insert(id, PendingCommand { ready_in, ack });
        Ok(CommandId(id))
    }

    async fn wait_for_completion(
        &self,
        id: CommandId,
        timeout: Duration,
    ) -> Result<(i32, String), ChannelError> {
        let pending = self
            .pending
            .lock()
            .unwrap()
            .remove(&id.0)
            .ok_or_else(|| ChannelError::Disconnected(format!("unknown command {id}")))?;
        match pending.ack {
            SimAck::Hang => {
                sleep(timeout).await;
                Err(ChannelError::AckTimeout)
            }
            _ if pending.ready_in > timeout => {
                sleep(timeout).await;
                Err(ChannelError::AckTimeout)
            }
            SimAck::Complete => {
                sleep(pending.ready_in).await;
                Ok((ACK_DONE, String::from("Done")))
            }
            SimAck::Reject => {
                sleep(pending.ready_in).await;
                Ok((ACK_FAILED, String::from("Rejected by device")))
            }
        }
    }

    async fn pull_telemetry(&self, topic: &str) -> Result<Option<TimeSample>, ChannelError> {
        if topic != LST_TOPIC {
            return Err(ChannelError::UnknownTopic(topic.to_string()));
        }
        {
            let mut empty = self.empty_pulls.lock().unwrap();
            if *empty > 0 {
                *empty -= 1;
                return Ok(None);
            }
        }
        Ok(Some(TimeSample { lst_hours: *self.lst_hours.lock().unwrap() }))
    }
}
