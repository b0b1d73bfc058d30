// Sample source trait for device telemetry ingestion
use async_trait::async_trait;

/// What a source yields on each read.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// One undecoded frame, e.g. a JSON line from the serial bridge.
    Frame(String),
    /// The source has no more data.
    Eof,
}

#[async_trait]
pub trait SampleSource: Send {
    /// Wait for the next frame. Pacing is up to the implementation, and a source
    /// may simply stop producing without returning `Eof`.
    async fn next_frame(&mut self) -> anyhow::Result<SourceEvent>;

    /// Human-readable name for logging
    fn source_name(&self) -> &str;
}
