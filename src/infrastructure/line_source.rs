// Line-delimited frame source (stdin or any async reader)
use crate::application::sample_source::{SampleSource, SourceEvent};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Reads one frame per line, the way the serial bridge forwards `\r\n`-terminated
/// device output.
pub struct LineSource<R> {
    reader: BufReader<R>,
    line: String,
    name: String,
}

impl LineSource<tokio::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin(), "stdin")
    }
}

impl<R: AsyncRead + Unpin + Send> LineSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: String::with_capacity(256),
            name: name.into(),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> SampleSource for LineSource<R> {
    async fn next_frame(&mut self) -> anyhow::Result<SourceEvent> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                return Ok(SourceEvent::Eof);
            }
            let frame = self.line.trim();
            if !frame.is_empty() {
                return Ok(SourceEvent::Frame(frame.to_string()));
            }
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
