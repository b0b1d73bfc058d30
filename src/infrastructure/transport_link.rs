// Transport link - pumps frames from a source into the engine
use crate::application::engine_service::EngineService;
use crate::application::sample_source::{SampleSource, SourceEvent};
use crate::domain::link::{CommandMessage, ConnectionStatus};
use crate::infrastructure::frame_decoder::decode_frame;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub frames: u64,
    pub rejected: u64,
}

const FRAME_QUEUE: usize = 64;

pub struct TransportLink<S: SampleSource> {
    source: S,
    engine: EngineService,
    commands: mpsc::Receiver<CommandMessage>,
    cancel: CancellationToken,
}

impl<S: SampleSource + 'static> TransportLink<S> {
    pub fn new(
        source: S,
        engine: EngineService,
        commands: mpsc::Receiver<CommandMessage>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            engine,
            commands,
            cancel,
        }
    }

    /// Run until the source ends, fails, or the link is cancelled. The final
    /// status is always reported so the engine disarms its liveness monitor.
    pub async fn run(mut self) -> anyhow::Result<LinkStats> {
        let mut stats = LinkStats::default();
        let name = self.source.source_name().to_string();

        self.engine
            .set_connection_status(ConnectionStatus::Connecting)
            .await?;
        self.engine
            .set_connection_status(ConnectionStatus::Connected)
            .await?;
        tracing::info!(source = %name, "Transport link connected");

        // Reads stay on their own task: a pending read is never dropped half-way
        // through a frame when a command is relayed.
        let (frames_tx, mut frames) = mpsc::channel(FRAME_QUEUE);
        let reader = tokio::spawn(read_frames(self.source, frames_tx, self.cancel.clone()));

        let final_status = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    break ConnectionStatus::Disconnected;
                }
                Some(command) = self.commands.recv() => {
                    // Device-side execution is out of scope; the command is only relayed.
                    match serde_json::to_string(&command) {
                        Ok(wire) => tracing::info!(source = %name, command = %wire, "Forwarding command"),
                        Err(e) => tracing::warn!("Could not encode command: {}", e),
                    }
                }
                event = frames.recv() => {
                    match event {
                        Some(Ok(SourceEvent::Frame(frame))) => {
                            stats.frames += 1;
                            match decode_frame(&frame) {
                                Ok(sample) => self.engine.ingest(sample).await?,
                                Err(e) => {
                                    stats.rejected += 1;
                                    tracing::warn!(source = %name, "Dropping malformed frame: {}", e);
                                }
                            }
                        }
                        Some(Ok(SourceEvent::Eof)) | None => {
                            tracing::info!(source = %name, frames = stats.frames, "Source reached end");
                            break ConnectionStatus::Disconnected;
                        }
                        Some(Err(e)) => {
                            tracing::error!(source = %name, "Source failed: {}", e);
                            break ConnectionStatus::Error;
                        }
                    }
                }
            }
        };
        reader.abort();

        // The engine may already be gone during shutdown.
        let _ = self.engine.set_connection_status(final_status).await;
        tracing::info!(
            source = %name,
            status = %final_status,
            frames = stats.frames,
            rejected = stats.rejected,
            "Transport link stopped"
        );
        Ok(stats)
    }
}

/// Pump source events into `frames` until the source ends, fails, the link
/// stops listening, or the token is cancelled.
async fn read_frames<S: SampleSource>(
    mut source: S,
    frames: mpsc::Sender<anyhow::Result<SourceEvent>>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = source.next_frame() => event,
        };
        let last = !matches!(event, Ok(SourceEvent::Frame(_)));
        if frames.send(event).await.is_err() || last {
            break;
        }
    }
}
