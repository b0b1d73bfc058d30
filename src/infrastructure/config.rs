use crate::domain::alarm::AlarmThresholds;
use crate::domain::calibration::WaveformModel;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SupervisorConfig {
    pub server: ServerSettings,
    pub engine: EngineConfig,
    pub source: SourceSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

/// Bounds and timings of the telemetry engine. All durations are milliseconds.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub history_capacity: usize,
    pub recording_capacity: usize,
    pub alarm_history_capacity: usize,
    pub alarm_lookback: usize,
    pub comm_timeout_ms: u64,
    pub liveness_check_ms: u64,
    pub cleanup_interval_ms: u64,
    pub forced_cleanup_window_ms: u64,
    pub alarm_retention_ms: u64,
    /// Also apply the forced-cleanup window to the charts on every periodic pass.
    pub trim_history_on_cleanup: bool,
    pub thresholds: AlarmThresholds,
    pub waveform: WaveformModel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 300,
            recording_capacity: 10_000,
            alarm_history_capacity: 50,
            alarm_lookback: 10,
            comm_timeout_ms: 5_000,
            liveness_check_ms: 1_000,
            cleanup_interval_ms: 60_000,
            forced_cleanup_window_ms: 120_000,
            alarm_retention_ms: 3_600_000,
            trim_history_on_cleanup: false,
            thresholds: AlarmThresholds::default(),
            waveform: WaveformModel::default(),
        }
    }
}

impl EngineConfig {
    pub fn comm_timeout(&self) -> Duration {
        Duration::from_millis(self.comm_timeout_ms)
    }

    pub fn liveness_check(&self) -> Duration {
        Duration::from_millis(self.liveness_check_ms.max(1))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Simulated,
    Stdin,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub interval_ms: u64,
    /// Simulated source goes silent after this many samples.
    pub stall_after: Option<u64>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Simulated,
            interval_ms: 1_000,
            stall_after: None,
        }
    }
}

/// Load `config/supervisor.*` (optional) overlaid with `SUPERVISOR__SECTION__KEY`
/// environment variables.
pub fn load_supervisor_config() -> anyhow::Result<SupervisorConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/supervisor").required(false))
        .add_source(
            config::Environment::with_prefix("SUPERVISOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
