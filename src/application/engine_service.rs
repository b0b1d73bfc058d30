// Engine service - runs the telemetry engine as a single serialized task
use crate::application::engine::{EngineSnapshot, RecordingExport, TelemetryEngine};
use crate::domain::calibration::CalibrationUpdate;
use crate::domain::link::{CommandMessage, ConnectionStatus};
use crate::domain::telemetry::RawSample;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

const REQUEST_QUEUE: usize = 256;
const COMMAND_QUEUE: usize = 32;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("telemetry engine is no longer running")]
    Closed,
}

#[derive(Debug)]
enum EngineRequest {
    Ingest(RawSample),
    Status(ConnectionStatus),
    StartRecording,
    StopRecording,
    ClearRecording,
    AcknowledgeAlarms,
    UpdateCalibration(CalibrationUpdate),
    ClearHistory,
    ForceCleanup,
    Export(oneshot::Sender<RecordingExport>),
}

/// Cloneable handle used by the transport link and the HTTP layer.
#[derive(Clone)]
pub struct EngineService {
    requests: mpsc::Sender<EngineRequest>,
    commands: mpsc::Sender<CommandMessage>,
    snapshots: watch::Receiver<Arc<EngineSnapshot>>,
}

impl EngineService {
    /// Spawn the engine task. Returns the handle, the receiving end of the
    /// outbound command queue (drained by the transport link) and the task.
    pub fn spawn(
        engine: TelemetryEngine,
        liveness_check: Duration,
        cleanup_interval: Duration,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<CommandMessage>, JoinHandle<()>) {
        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_QUEUE);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        let snapshots = engine.subscribe();

        let runner = EngineRunner {
            engine,
            requests: requests_rx,
            liveness_check,
            cleanup_interval,
            cancel,
        };
        let handle = tokio::spawn(runner.run());

        let service = Self {
            requests: requests_tx,
            commands: commands_tx,
            snapshots,
        };
        (service, commands_rx, handle)
    }

    async fn request(&self, request: EngineRequest) -> Result<(), EngineError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| EngineError::Closed)
    }

    pub async fn ingest(&self, sample: RawSample) -> Result<(), EngineError> {
        self.request(EngineRequest::Ingest(sample)).await
    }

    pub async fn set_connection_status(&self, status: ConnectionStatus) -> Result<(), EngineError> {
        self.request(EngineRequest::Status(status)).await
    }

    pub async fn start_recording(&self) -> Result<(), EngineError> {
        self.request(EngineRequest::StartRecording).await
    }

    pub async fn stop_recording(&self) -> Result<(), EngineError> {
        self.request(EngineRequest::StopRecording).await
    }

    pub async fn clear_recording(&self) -> Result<(), EngineError> {
        self.request(EngineRequest::ClearRecording).await
    }

    pub async fn acknowledge_alarms(&self) -> Result<(), EngineError> {
        self.request(EngineRequest::AcknowledgeAlarms).await
    }

    pub async fn update_calibration(&self, update: CalibrationUpdate) -> Result<(), EngineError> {
        self.request(EngineRequest::UpdateCalibration(update)).await
    }

    pub async fn clear_history(&self) -> Result<(), EngineError> {
        self.request(EngineRequest::ClearHistory).await
    }

    pub async fn force_cleanup(&self) -> Result<(), EngineError> {
        self.request(EngineRequest::ForceCleanup).await
    }

    pub async fn export(&self) -> Result<RecordingExport, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineRequest::Export(tx)).await?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    /// Queue a command for the device. The engine never interprets it.
    pub async fn send_command(&self, command: CommandMessage) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Closed)
    }

    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.snapshots.clone()
    }
}

struct EngineRunner {
    engine: TelemetryEngine,
    requests: mpsc::Receiver<EngineRequest>,
    liveness_check: Duration,
    cleanup_interval: Duration,
    cancel: CancellationToken,
}

impl EngineRunner {
    async fn run(mut self) {
        let mut cleanup = ticker(self.cleanup_interval);
        // Only present while the link reports `connected`.
        let mut liveness: Option<Interval> = None;

        tracing::info!("Telemetry engine started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Telemetry engine shutting down");
                    break;
                }
                request = self.requests.recv() => {
                    let Some(request) = request else {
                        tracing::info!("All engine handles dropped, stopping");
                        break;
                    };
                    self.handle(request, &mut liveness);
                }
                _ = cleanup.tick() => {
                    self.engine.periodic_cleanup();
                }
                _ = next_tick(&mut liveness) => {
                    self.engine.check_liveness();
                }
            }
        }
    }

    fn handle(&mut self, request: EngineRequest, liveness: &mut Option<Interval>) {
        match request {
            EngineRequest::Ingest(sample) => {
                if let Err(e) = self.engine.ingest(sample) {
                    tracing::warn!("Rejected telemetry sample: {}", e);
                }
            }
            EngineRequest::Status(status) => {
                // A repeated status keeps both the monitor and its timer.
                if status == self.engine.connection_status() {
                    return;
                }
                self.engine.set_connection_status(status);
                *liveness = if status.is_connected() {
                    Some(ticker(self.liveness_check))
                } else {
                    None
                };
            }
            EngineRequest::StartRecording => self.engine.start_recording(),
            EngineRequest::StopRecording => self.engine.stop_recording(),
            EngineRequest::ClearRecording => self.engine.clear_recording(),
            EngineRequest::AcknowledgeAlarms => self.engine.acknowledge_alarms(),
            EngineRequest::UpdateCalibration(update) => self.engine.update_calibration(&update),
            EngineRequest::ClearHistory => self.engine.clear_history(),
            EngineRequest::ForceCleanup => self.engine.force_cleanup(),
            EngineRequest::Export(reply) => {
                let _ = reply.send(self.engine.export());
            }
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::{Clock, ManualClock, SystemClock};
    use crate::domain::alarm::AlarmType;
    use crate::domain::telemetry::WeldMode;
    use crate::infrastructure::config::EngineConfig;

    fn spawn_service() -> (EngineService, mpsc::Receiver<CommandMessage>, CancellationToken) {
        let config = EngineConfig::default();
        let cancel = CancellationToken::new();
        let engine = TelemetryEngine::new(config.clone(), Arc::new(SystemClock));
        let (service, commands, _handle) = EngineService::spawn(
            engine,
            config.liveness_check(),
            config.cleanup_interval(),
            cancel.clone(),
        );
        (service, commands, cancel)
    }

    fn nominal() -> RawSample {
        RawSample::new(WeldMode::Mig, 200.0, 100.0, 1500.0, 20.0, 60.0)
    }

    fn comm_failures(export: &RecordingExport) -> usize {
        export
            .samples
            .iter()
            .filter(|s| s.is_comm_failure())
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_produces_exactly_one_comm_failure() {
        let (service, _commands, cancel) = spawn_service();
        service.start_recording().await.unwrap();
        service
            .set_connection_status(ConnectionStatus::Connected)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(6_500)).await;
        let export = service.export().await.unwrap();
        assert_eq!(comm_failures(&export), 1);
        assert_eq!(export.alarms.len(), 1);
        assert_eq!(export.alarms[0].alarm_type, AlarmType::CommFail);

        // Still silent: no further synthetic samples.
        tokio::time::sleep(Duration::from_secs(20)).await;
        let export = service.export().await.unwrap();
        assert_eq!(comm_failures(&export), 1);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_sample_resets_liveness() {
        let (service, _commands, cancel) = spawn_service();
        service.start_recording().await.unwrap();
        service
            .set_connection_status(ConnectionStatus::Connected)
            .await
            .unwrap();

        for _ in 0..8 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            service.ingest(nominal()).await.unwrap();
        }
        let export = service.export().await.unwrap();
        assert_eq!(export.samples.len(), 8);
        assert_eq!(comm_failures(&export), 0);

        tokio::time::sleep(Duration::from_millis(6_500)).await;
        service.ingest(nominal()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        let export = service.export().await.unwrap();
        assert_eq!(comm_failures(&export), 1);
        assert!(!export.samples.last().unwrap().is_comm_failure());
        assert!(!service.snapshot().current.as_ref().unwrap().is_comm_failure());

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_disarms_liveness() {
        let (service, _commands, cancel) = spawn_service();
        service.start_recording().await.unwrap();
        service
            .set_connection_status(ConnectionStatus::Connected)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        service
            .set_connection_status(ConnectionStatus::Disconnected)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;

        let export = service.export().await.unwrap();
        assert_eq!(comm_failures(&export), 0);
        assert_eq!(
            service.snapshot().connection_status,
            ConnectionStatus::Disconnected
        );

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_connected_keeps_liveness_timer() {
        let (service, _commands, cancel) = spawn_service();
        service.start_recording().await.unwrap();
        service
            .set_connection_status(ConnectionStatus::Connected)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        service
            .set_connection_status(ConnectionStatus::Connected)
            .await
            .unwrap();
        // The tick at 6 s sees 6 s of silence.
        tokio::time::sleep(Duration::from_millis(700)).await;

        let export = service.export().await.unwrap();
        assert_eq!(comm_failures(&export), 1);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_timer_purges_without_ingest() {
        let config = EngineConfig::default();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cancel = CancellationToken::new();
        let engine = TelemetryEngine::new(config.clone(), clock.clone());
        let (service, _commands, _handle) = EngineService::spawn(
            engine,
            config.liveness_check(),
            config.cleanup_interval(),
            cancel.clone(),
        );

        service
            .ingest(RawSample::new(WeldMode::Mig, 260.0, 100.0, 1500.0, 20.0, 60.0))
            .await
            .unwrap();
        service.acknowledge_alarms().await.unwrap();
        assert_eq!(service.export().await.unwrap().alarms.len(), 1);

        clock.advance((config.alarm_retention_ms + config.cleanup_interval_ms) as i64);
        tokio::time::sleep(config.cleanup_interval() + Duration::from_secs(1)).await;

        let export = service.export().await.unwrap();
        assert!(export.alarms.is_empty());
        assert_eq!(service.snapshot().last_cleanup, clock.now_ms());

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_commands_pass_through() {
        let (service, mut commands, cancel) = spawn_service();
        let command = CommandMessage::Relay { id: 3, state: true };
        service.send_command(command.clone()).await.unwrap();
        assert_eq!(commands.recv().await, Some(command));
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_cancelled_engine_reports_closed() {
        let (service, _commands, cancel) = spawn_service();
        cancel.cancel();
        // Let the runner observe the cancellation and drop its receiver.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(service.export().await, Err(EngineError::Closed)));
    }
}
