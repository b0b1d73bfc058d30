// Simulated welding source for bench runs without a device attached
use crate::application::sample_source::{SampleSource, SourceEvent};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

pub struct SimulatedSource {
    rng: StdRng,
    interval: Duration,
    stall_after: Option<u64>,
    emitted: u64,
    stalled: bool,
}

impl SimulatedSource {
    pub fn new(interval: Duration, stall_after: Option<u64>) -> Self {
        Self::with_rng(StdRng::from_entropy(), interval, stall_after)
    }

    pub fn with_rng(rng: StdRng, interval: Duration, stall_after: Option<u64>) -> Self {
        Self {
            rng,
            interval,
            stall_after,
            emitted: 0,
            stalled: false,
        }
    }

    fn next_payload(&mut self) -> serde_json::Value {
        let mode = if self.rng.gen_bool(0.5) { "MIG" } else { "SMAW" };
        serde_json::json!({
            "mode": mode,
            "V": self.rng.gen_range(200.0..230.0),
            "I": self.rng.gen_range(100.0..140.0),
            "RPM": self.rng.gen_range(1200.0..1700.0),
            "FLOW": self.rng.gen_range(20.0..25.0),
            "TEMP": self.rng.gen_range(60.0..80.0),
        })
    }
}

#[async_trait]
impl SampleSource for SimulatedSource {
    async fn next_frame(&mut self) -> anyhow::Result<SourceEvent> {
        if self.stall_after.is_some_and(|limit| self.emitted >= limit) {
            if !self.stalled {
                tracing::warn!(samples = self.emitted, "Simulated source stalling");
                self.stalled = true;
            }
            // Go quiet without signalling a disconnect, like a hung serial bridge.
            std::future::pending::<()>().await;
        }

        tokio::time::sleep(self.interval).await;
        self.emitted += 1;
        Ok(SourceEvent::Frame(self.next_payload().to_string()))
    }

    fn source_name(&self) -> &str {
        "simulated"
    }
}
