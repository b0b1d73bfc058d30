// Session summary handed to report generators
use super::alarm::AlarmRecord;
use super::telemetry::{CalibratedSample, ChannelReading, RELAY_COUNT};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Aggregates over a recording: avg and rms are means, pk is the maximum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub sample_count: usize,
    pub duration_ms: i64,
    pub voltage: ChannelReading,
    pub current: ChannelReading,
    pub rpm: f64,
    pub flow: f64,
    pub temperature: f64,
    pub last_relays: Option<[bool; RELAY_COUNT]>,
    pub unacknowledged_alarms: usize,
    pub verdict: Verdict,
}

impl SessionSummary {
    pub fn compute(samples: &[CalibratedSample], alarms: &[AlarmRecord]) -> Self {
        let unacknowledged_alarms = alarms.iter().filter(|a| !a.acknowledged).count();
        let verdict = if unacknowledged_alarms > 0 {
            Verdict::Fail
        } else {
            Verdict::Pass
        };

        let count = samples.len();
        let duration_ms = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0,
        };

        let mut voltage = ChannelReading::default();
        let mut current = ChannelReading::default();
        let (mut rpm, mut flow, mut temperature) = (0.0, 0.0, 0.0);

        for (index, sample) in samples.iter().enumerate() {
            voltage.avg += sample.voltage.avg;
            voltage.rms += sample.voltage.rms;
            current.avg += sample.current.avg;
            current.rms += sample.current.rms;
            if index == 0 {
                voltage.pk = sample.voltage.pk;
                current.pk = sample.current.pk;
            } else {
                voltage.pk = voltage.pk.max(sample.voltage.pk);
                current.pk = current.pk.max(sample.current.pk);
            }
            rpm += sample.rpm;
            flow += sample.flow;
            temperature += sample.temperature;
        }

        if count > 0 {
            let n = count as f64;
            voltage.avg /= n;
            voltage.rms /= n;
            current.avg /= n;
            current.rms /= n;
            rpm /= n;
            flow /= n;
            temperature /= n;
        }

        Self {
            sample_count: count,
            duration_ms,
            voltage,
            current,
            rpm,
            flow,
            temperature,
            last_relays: samples.last().map(|s| s.relays),
            unacknowledged_alarms,
            verdict,
        }
    }
}
