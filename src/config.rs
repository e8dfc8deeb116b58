use std::env;

/// Recognized options for a sequencing run.
///
/// Loaded from `VSD_*` environment variables; every field has a default so a
/// bare invocation against the simulated device works out of the box.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Bring the pointing device from standby to enabled before the first target.
    pub enable_at_start: bool,
    /// Return the device to standby after the last target.
    pub disable_at_end: bool,
    /// Maximum accumulated schedule slippage before the run is terminated (seconds).
    pub max_buffer_s: f64,
    /// Time zone offset used only for the wall-clock LST fallback log line (hours).
    pub time_zone_offset_h: f64,
    /// Acknowledgement timeout for a single dispatched command (seconds).
    pub command_timeout_s: f64,
    /// Upper bound on the telemetry retry loop per target (seconds).
    pub telemetry_timeout_s: f64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            enable_at_start: false,
            disable_at_end: false,
            max_buffer_s: 60.0,
            time_zone_offset_h: -2.0,
            command_timeout_s: 5.0,
            telemetry_timeout_s: 30.0,
        }
    }
}

impl SequencerConfig {
    /// Reads the configuration from the process environment, falling back to
    /// defaults for unset or unparsable variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enable_at_start: flag_var("VSD_ENABLE"),
            disable_at_end: flag_var("VSD_DISABLE"),
            max_buffer_s: float_var("VSD_MAX_BUFFER", defaults.max_buffer_s),
            time_zone_offset_h: float_var("VSD_TIME_ZONE", defaults.time_zone_offset_h),
            command_timeout_s: float_var("VSD_CMD_TIMEOUT", defaults.command_timeout_s),
            telemetry_timeout_s: float_var("VSD_TLM_TIMEOUT", defaults.telemetry_timeout_s),
        }
    }
}

fn flag_var(name: &str) -> bool {
    env::var(name).is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
}

fn float_var(name: &str, default: f64) -> f64 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
