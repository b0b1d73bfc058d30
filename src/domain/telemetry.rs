// Telemetry data domain models
use super::alarm::AlarmFlags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RELAY_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeldMode {
    Mig,
    Smaw,
}

impl WeldMode {
    /// The device only distinguishes MIG; every other mode string is SMAW.
    pub fn from_device(mode: &str) -> Self {
        if mode.trim().eq_ignore_ascii_case("MIG") {
            WeldMode::Mig
        } else {
            WeldMode::Smaw
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("frame could not be decoded: {0}")]
    Decode(String),
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),
    #[error("field `{field}` is not a finite number ({value})")]
    NonFinite { field: &'static str, value: f64 },
}

/// One uncalibrated reading as delivered by the sample source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub mode: WeldMode,
    pub voltage: f64,
    pub current: f64,
    pub rpm: f64,
    pub flow: f64,
    pub temperature: f64,
}

impl RawSample {
    pub fn new(
        mode: WeldMode,
        voltage: f64,
        current: f64,
        rpm: f64,
        flow: f64,
        temperature: f64,
    ) -> Self {
        Self {
            mode,
            voltage,
            current,
            rpm,
            flow,
            temperature,
        }
    }

    /// Reject samples that would poison averages and threshold checks.
    pub fn validate(&self) -> Result<(), SampleError> {
        let fields = [
            ("voltage", self.voltage),
            ("current", self.current),
            ("rpm", self.rpm),
            ("flow", self.flow),
            ("temperature", self.temperature),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(SampleError::NonFinite { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelReading {
    pub avg: f64,
    pub rms: f64,
    pub pk: f64,
}

impl ChannelReading {
    pub fn new(avg: f64, rms: f64, pk: f64) -> Self {
        Self { avg, rms, pk }
    }
}

/// The canonical telemetry record, derived from a `RawSample` and the active calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibratedSample {
    pub voltage: ChannelReading,
    pub current: ChannelReading,
    pub rpm: f64,
    pub flow: f64,
    pub temperature: f64,
    pub relays: [bool; RELAY_COUNT],
    pub mode: WeldMode,
    pub alarm: AlarmFlags,
    pub timestamp: i64,
}

impl CalibratedSample {
    /// Stand-in sample committed when the source has gone silent.
    pub fn comm_failure(timestamp: i64) -> Self {
        Self {
            voltage: ChannelReading::default(),
            current: ChannelReading::default(),
            rpm: 0.0,
            flow: 0.0,
            temperature: 0.0,
            relays: [false; RELAY_COUNT],
            mode: WeldMode::Mig,
            alarm: AlarmFlags {
                comm_fail: true,
                ..AlarmFlags::default()
            },
            timestamp,
        }
    }

    #[cfg(test)]
    pub fn is_comm_failure(&self) -> bool {
        self.alarm.comm_fail
    }
}
