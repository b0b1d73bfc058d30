// Recording buffer - bounded capture of calibrated samples for export
use super::telemetry::CalibratedSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Idle,
    Appended,
    Dropped,
}

#[derive(Debug, Clone)]
pub struct Recorder {
    recording: bool,
    samples: Vec<CalibratedSample>,
    capacity: usize,
    dropped: u64,
}

impl Recorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            recording: false,
            samples: Vec::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Open a new session, discarding whatever the previous one captured.
    pub fn start(&mut self) {
        self.recording = true;
        self.samples.clear();
        self.dropped = 0;
    }

    pub fn stop(&mut self) {
        self.recording = false;
    }

    pub fn clear(&mut self) {
        self.samples = Vec::new();
        self.dropped = 0;
    }

    pub fn record(&mut self, sample: &CalibratedSample) -> RecordOutcome {
        if !self.recording {
            return RecordOutcome::Idle;
        }
        if self.samples.len() >= self.capacity {
            if self.dropped == 0 {
                tracing::warn!(
                    capacity = self.capacity,
                    "Recording limit reached, further samples are dropped"
                );
            }
            self.dropped += 1;
            return RecordOutcome::Dropped;
        }
        self.samples.push(sample.clone());
        RecordOutcome::Appended
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[CalibratedSample] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_recorder_ignores_samples() {
        let mut recorder = Recorder::new(10);
        assert_eq!(
            recorder.record(&CalibratedSample::comm_failure(0)),
            RecordOutcome::Idle
        );
        assert_eq!(recorder.len(), 0);
    }

    #[test]
    fn test_cap_drops_instead_of_overwriting() {
        let mut recorder = Recorder::new(100);
        recorder.start();
        for t in 0..150 {
            recorder.record(&CalibratedSample::comm_failure(t));
        }
        assert_eq!(recorder.len(), 100);
        assert_eq!(recorder.dropped(), 50);
        assert!(recorder.is_full());
        assert_eq!(recorder.samples().last().map(|s| s.timestamp), Some(99));
    }

    #[test]
    fn test_stop_keeps_data_and_start_resets() {
        let mut recorder = Recorder::new(10);
        recorder.start();
        for t in 0..3 {
            recorder.record(&CalibratedSample::comm_failure(t));
        }
        recorder.stop();
        assert!(!recorder.is_recording());
        assert_eq!(recorder.len(), 3);
        assert_eq!(
            recorder.record(&CalibratedSample::comm_failure(3)),
            RecordOutcome::Idle
        );

        recorder.start();
        assert!(recorder.is_recording());
        assert_eq!(recorder.len(), 0);
    }

    #[test]
    fn test_clear_is_unconditional() {
        let mut recorder = Recorder::new(10);
        recorder.start();
        recorder.record(&CalibratedSample::comm_failure(0));
        recorder.clear();
        assert_eq!(recorder.len(), 0);
        assert!(recorder.is_recording());
    }
}
