// Windowed history buffers feeding the live charts
use super::telemetry::CalibratedSample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub trait Timestamped {
    fn timestamp(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelPoint {
    pub timestamp: i64,
    pub avg: f64,
    pub rms: f64,
    pub pk: f64,
}

impl Timestamped for ChannelPoint {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RpmFlowPoint {
    pub timestamp: i64,
    pub rpm: f64,
    pub flow: f64,
}

impl Timestamped for RpmFlowPoint {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Fixed-capacity FIFO; the oldest point is evicted once capacity is exceeded.
#[derive(Debug, Clone)]
pub struct BoundedWindow<T> {
    points: VecDeque<T>,
    capacity: usize,
}

impl<T: Timestamped + Clone> BoundedWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: T) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// Keep only points strictly newer than `cutoff`; returns how many were dropped.
    pub fn retain_since(&mut self, cutoff: i64) -> usize {
        let before = self.points.len();
        self.points.retain(|p| p.timestamp() > cutoff);
        before - self.points.len()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.points.iter().cloned().collect()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryBuffers {
    pub voltage: BoundedWindow<ChannelPoint>,
    pub current: BoundedWindow<ChannelPoint>,
    pub rpm_flow: BoundedWindow<RpmFlowPoint>,
}

impl HistoryBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            voltage: BoundedWindow::new(capacity),
            current: BoundedWindow::new(capacity),
            rpm_flow: BoundedWindow::new(capacity),
        }
    }

    pub fn record(&mut self, sample: &CalibratedSample) {
        self.voltage.push(ChannelPoint {
            timestamp: sample.timestamp,
            avg: sample.voltage.avg,
            rms: sample.voltage.rms,
            pk: sample.voltage.pk,
        });
        self.current.push(ChannelPoint {
            timestamp: sample.timestamp,
            avg: sample.current.avg,
            rms: sample.current.rms,
            pk: sample.current.pk,
        });
        self.rpm_flow.push(RpmFlowPoint {
            timestamp: sample.timestamp,
            rpm: sample.rpm,
            flow: sample.flow,
        });
    }

    pub fn clear(&mut self) {
        self.voltage.clear();
        self.current.clear();
        self.rpm_flow.clear();
    }

    pub fn retain_since(&mut self, cutoff: i64) -> usize {
        self.voltage.retain_since(cutoff)
            + self.current.retain_since(cutoff)
            + self.rpm_flow.retain_since(cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alarm::AlarmFlags;
    use crate::domain::telemetry::{ChannelReading, WeldMode};

    fn sample_at(timestamp: i64) -> CalibratedSample {
        let v = timestamp as f64;
        CalibratedSample {
            voltage: ChannelReading::new(v, v * 1.11, v * 1.41),
            current: ChannelReading::new(v / 2.0, v, v),
            rpm: 1000.0 + v,
            flow: 20.0,
            temperature: 60.0,
            relays: [false; 5],
            mode: WeldMode::Smaw,
            alarm: AlarmFlags::default(),
            timestamp,
        }
    }

    #[test]
    fn test_length_is_min_of_count_and_capacity() {
        for count in [0usize, 1, 7, 10, 11, 25] {
            let mut history = HistoryBuffers::new(10);
            for t in 0..count {
                history.record(&sample_at(t as i64));
            }
            assert_eq!(history.voltage.len(), count.min(10));
            assert_eq!(history.current.len(), count.min(10));
            assert_eq!(history.rpm_flow.len(), count.min(10));
        }
    }

    #[test]
    fn test_keeps_most_recent_in_arrival_order() {
        let mut history = HistoryBuffers::new(3);
        for t in 0..8 {
            history.record(&sample_at(t));
        }
        let timestamps: Vec<i64> = history.voltage.to_vec().iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![5, 6, 7]);

        let rpm: Vec<f64> = history.rpm_flow.to_vec().iter().map(|p| p.rpm).collect();
        assert_eq!(rpm, vec![1005.0, 1006.0, 1007.0]);
    }

    #[test]
    fn test_projection_carries_channel_metrics() {
        let mut history = HistoryBuffers::new(5);
        history.record(&sample_at(100));
        let point = history.voltage.to_vec()[0];
        assert_eq!(point.avg, 100.0);
        assert_eq!(point.rms, 100.0 * 1.11);
        assert_eq!(history.current.to_vec()[0].avg, 50.0);
    }

    #[test]
    fn test_retain_since_and_clear() {
        let mut history = HistoryBuffers::new(100);
        for t in [1_000, 2_000, 3_000, 4_000] {
            history.record(&sample_at(t));
        }

        let removed = history.retain_since(2_000);
        assert_eq!(removed, 6);
        assert_eq!(history.voltage.len(), 2);
        assert_eq!(history.rpm_flow.to_vec()[0].timestamp, 3_000);

        history.clear();
        assert!(history.voltage.is_empty());
        assert!(history.current.is_empty());
        assert!(history.rpm_flow.is_empty());
    }
}
