// Liveness monitor - detects a silent sample source
use std::time::Duration;
use tokio::time::Instant;

/// Tracks the last real sample. A silence episode trips the monitor once;
/// only a fresh sample re-arms it.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    timeout: Duration,
    last_sample: Instant,
    tripped: bool,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_sample: now,
            tripped: false,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_sample = now;
        self.tripped = false;
    }

    /// Returns true exactly once per silence episode.
    pub fn check(&mut self, now: Instant) -> bool {
        if self.tripped {
            return false;
        }
        if now.saturating_duration_since(self.last_sample) > self.timeout {
            self.tripped = true;
            return true;
        }
        false
    }

    #[cfg(test)]
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trips_once_per_episode() {
        let start = Instant::now();
        let mut monitor = LivenessMonitor::new(Duration::from_secs(5), start);

        assert!(!monitor.check(start + Duration::from_secs(5)));
        assert!(monitor.check(start + Duration::from_secs(6)));
        assert!(monitor.is_tripped());
        assert!(!monitor.check(start + Duration::from_secs(7)));
        assert!(!monitor.check(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_touch_rearms() {
        let start = Instant::now();
        let mut monitor = LivenessMonitor::new(Duration::from_secs(5), start);
        assert!(monitor.check(start + Duration::from_secs(6)));

        monitor.touch(start + Duration::from_secs(7));
        assert!(!monitor.is_tripped());
        assert!(!monitor.check(start + Duration::from_secs(11)));
        assert!(monitor.check(start + Duration::from_millis(12_001)));
    }
}
