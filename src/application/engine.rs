// Telemetry state engine - owns calibration, alarms, history and recording
use crate::application::clock::Clock;
use crate::domain::alarm::{AlarmLog, AlarmRecord, AlarmType};
use crate::domain::calibration::{self, CalibrationData, CalibrationUpdate};
use crate::domain::history::{ChannelPoint, HistoryBuffers, RpmFlowPoint};
use crate::domain::link::ConnectionStatus;
use crate::domain::liveness::LivenessMonitor;
use crate::domain::recording::Recorder;
use crate::domain::report::SessionSummary;
use crate::domain::telemetry::{CalibratedSample, RawSample, SampleError};
use crate::infrastructure::config::EngineConfig;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;

/// Read-only view published after every mutation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub connection_status: ConnectionStatus,
    pub current: Option<CalibratedSample>,
    pub voltage_history: Vec<ChannelPoint>,
    pub current_history: Vec<ChannelPoint>,
    pub rpm_flow_history: Vec<RpmFlowPoint>,
    pub active_alarms: Vec<AlarmType>,
    pub alarm_history: Vec<AlarmRecord>,
    pub is_recording: bool,
    pub recorded_count: usize,
    pub recording_full: bool,
    /// Samples refused since the recording hit its capacity.
    pub recording_dropped: u64,
    pub calibration: CalibrationData,
    pub last_cleanup: i64,
}

/// What export collaborators receive: the recording and alarm history verbatim.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingExport {
    pub samples: Vec<CalibratedSample>,
    pub alarms: Vec<AlarmRecord>,
    pub summary: SessionSummary,
}

pub struct TelemetryEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    calibration: CalibrationData,
    current: Option<CalibratedSample>,
    history: HistoryBuffers,
    alarms: AlarmLog,
    recorder: Recorder,
    liveness: Option<LivenessMonitor>,
    connection_status: ConnectionStatus,
    last_cleanup: i64,
    snapshot_tx: watch::Sender<Arc<EngineSnapshot>>,
}

impl TelemetryEngine {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let last_cleanup = clock.now_ms();
        let (snapshot_tx, _) = watch::channel(Arc::new(EngineSnapshot::default()));
        let mut engine = Self {
            history: HistoryBuffers::new(config.history_capacity),
            alarms: AlarmLog::new(config.alarm_history_capacity, config.alarm_lookback),
            recorder: Recorder::new(config.recording_capacity),
            config,
            clock,
            calibration: CalibrationData::default(),
            current: None,
            liveness: None,
            connection_status: ConnectionStatus::Disconnected,
            last_cleanup,
            snapshot_tx,
        };
        engine.publish();
        engine
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Calibrate, evaluate and commit one raw sample. Malformed samples are
    /// rejected without touching any state.
    pub fn ingest(&mut self, raw: RawSample) -> Result<(), SampleError> {
        raw.validate()?;

        let now = self.clock.now_ms();
        let mut sample =
            calibration::apply(&raw, &self.calibration, &self.config.waveform, now);
        sample.alarm = self.config.thresholds.evaluate(&sample);

        if let Some(monitor) = self.liveness.as_mut() {
            monitor.touch(Instant::now());
        }
        self.commit(sample);
        Ok(())
    }

    /// Runs the liveness check; on a new silence episode a commFail sample is
    /// committed through the regular path. Returns whether one was injected.
    pub fn check_liveness(&mut self) -> bool {
        let tripped = match self.liveness.as_mut() {
            Some(monitor) => monitor.check(Instant::now()),
            None => false,
        };
        if tripped {
            tracing::warn!(
                timeout_ms = self.config.comm_timeout_ms,
                "No telemetry received within timeout, raising communication failure"
            );
            let sample = CalibratedSample::comm_failure(self.clock.now_ms());
            self.commit(sample);
        }
        tripped
    }

    fn commit(&mut self, sample: CalibratedSample) {
        let raised = self.alarms.merge(sample.alarm.active(), sample.timestamp);
        for alarm in &raised {
            tracing::info!(alarm = alarm.label(), timestamp = sample.timestamp, "Alarm raised");
        }

        self.history.record(&sample);
        self.recorder.record(&sample);
        self.current = Some(sample);

        self.cleanup_if_due();
        self.publish();
    }

    /// Arms the liveness monitor on `connected` and drops it on any other status.
    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        if status == self.connection_status {
            return;
        }
        tracing::info!(from = %self.connection_status, to = %status, "Link status changed");
        self.connection_status = status;
        self.liveness = if status.is_connected() {
            Some(LivenessMonitor::new(self.config.comm_timeout(), Instant::now()))
        } else {
            None
        };
        self.publish();
    }

    pub fn start_recording(&mut self) {
        tracing::info!("Recording started");
        self.recorder.start();
        self.publish();
    }

    pub fn stop_recording(&mut self) {
        tracing::info!(samples = self.recorder.len(), "Recording stopped");
        self.recorder.stop();
        self.publish();
    }

    pub fn clear_recording(&mut self) {
        self.recorder.clear();
        self.publish();
    }

    pub fn acknowledge_alarms(&mut self) {
        self.alarms.acknowledge_all();
        self.publish();
    }

    pub fn update_calibration(&mut self, update: &CalibrationUpdate) {
        self.calibration.merge(update);
        tracing::info!(
            voltage_offset = self.calibration.voltage.offset,
            voltage_gain = self.calibration.voltage.gain,
            current_offset = self.calibration.current.offset,
            current_gain = self.calibration.current.gain,
            "Calibration updated"
        );
        self.publish();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.publish();
    }

    /// Keep only the last `forced_cleanup_window_ms` of chart data and of
    /// acknowledged alarms, and restart the periodic cleanup clock.
    pub fn force_cleanup(&mut self) {
        let now = self.clock.now_ms();
        let cutoff = now - self.config.forced_cleanup_window_ms as i64;
        let points = self.history.retain_since(cutoff);
        let alarms = self.alarms.purge_acknowledged(cutoff);
        self.last_cleanup = now;
        tracing::info!(points, alarms, "Forced cleanup executed");
        self.publish();
    }

    /// Timer entry point for the periodic cleanup policy.
    pub fn periodic_cleanup(&mut self) -> bool {
        let ran = self.cleanup_if_due();
        if ran {
            self.publish();
        }
        ran
    }

    fn cleanup_if_due(&mut self) -> bool {
        let now = self.clock.now_ms();
        if now - self.last_cleanup < self.config.cleanup_interval_ms as i64 {
            return false;
        }

        let alarms = self
            .alarms
            .purge_acknowledged(now - self.config.alarm_retention_ms as i64);
        let points = if self.config.trim_history_on_cleanup {
            self.history
                .retain_since(now - self.config.forced_cleanup_window_ms as i64)
        } else {
            0
        };
        self.last_cleanup = now;
        tracing::debug!(alarms, points, "Periodic cleanup executed");
        true
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            connection_status: self.connection_status,
            current: self.current.clone(),
            voltage_history: self.history.voltage.to_vec(),
            current_history: self.history.current.to_vec(),
            rpm_flow_history: self.history.rpm_flow.to_vec(),
            active_alarms: self.alarms.active().to_vec(),
            alarm_history: self.alarms.records(),
            is_recording: self.recorder.is_recording(),
            recorded_count: self.recorder.len(),
            recording_full: self.recorder.is_full(),
            recording_dropped: self.recorder.dropped(),
            calibration: self.calibration,
            last_cleanup: self.last_cleanup,
        }
    }

    pub fn export(&self) -> RecordingExport {
        let alarms = self.alarms.records();
        RecordingExport {
            summary: SessionSummary::compute(self.recorder.samples(), &alarms),
            samples: self.recorder.samples().to_vec(),
            alarms,
        }
    }

    #[cfg(test)]
    pub fn recorded_samples(&self) -> &[CalibratedSample] {
        self.recorder.samples()
    }

    #[cfg(test)]
    pub fn calibration(&self) -> CalibrationData {
        self.calibration
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    fn publish(&mut self) {
        let snapshot = Arc::new(self.snapshot());
        self.snapshot_tx.send_replace(snapshot);
    }
}
