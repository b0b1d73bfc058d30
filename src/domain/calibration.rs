// Calibration domain model - per-channel affine correction
use super::alarm::AlarmFlags;
use super::telemetry::{CalibratedSample, ChannelReading, RawSample, RELAY_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelCalibration {
    pub offset: f64,
    pub gain: f64,
}

impl Default for ChannelCalibration {
    fn default() -> Self {
        Self {
            offset: 0.0,
            gain: 1.0,
        }
    }
}

impl ChannelCalibration {
    pub fn correct(&self, value: f64) -> f64 {
        (value - self.offset) * self.gain
    }

    pub fn correct_reading(&self, reading: ChannelReading) -> ChannelReading {
        ChannelReading::new(
            self.correct(reading.avg),
            self.correct(reading.rms),
            self.correct(reading.pk),
        )
    }

    fn merge(&mut self, update: &ChannelCalibrationUpdate) {
        if let Some(offset) = update.offset {
            self.offset = offset;
        }
        if let Some(gain) = update.gain {
            self.gain = gain;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    pub voltage: ChannelCalibration,
    pub current: ChannelCalibration,
}

impl CalibrationData {
    /// Merge a partial update; channels and fields absent from the update keep their values.
    pub fn merge(&mut self, update: &CalibrationUpdate) {
        if let Some(voltage) = &update.voltage {
            self.voltage.merge(voltage);
        }
        if let Some(current) = &update.current {
            self.current.merge(current);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelCalibrationUpdate {
    #[serde(default)]
    pub offset: Option<f64>,
    #[serde(default)]
    pub gain: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationUpdate {
    #[serde(default)]
    pub voltage: Option<ChannelCalibrationUpdate>,
    #[serde(default)]
    pub current: Option<ChannelCalibrationUpdate>,
}

/// RMS and peak multipliers relative to the measured average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformFactors {
    pub rms: f64,
    pub pk: f64,
}

impl WaveformFactors {
    pub fn expand(&self, avg: f64) -> ChannelReading {
        ChannelReading::new(avg, avg * self.rms, avg * self.pk)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformModel {
    pub voltage: WaveformFactors,
    pub current: WaveformFactors,
}

impl Default for WaveformModel {
    fn default() -> Self {
        Self {
            voltage: WaveformFactors { rms: 1.11, pk: 1.41 },
            current: WaveformFactors { rms: 1.11, pk: 1.57 },
        }
    }
}

/// Derive a calibrated sample from a raw one. Alarm flags start cleared;
/// threshold evaluation happens afterwards.
pub fn apply(
    raw: &RawSample,
    calibration: &CalibrationData,
    waveform: &WaveformModel,
    timestamp: i64,
) -> CalibratedSample {
    CalibratedSample {
        voltage: calibration
            .voltage
            .correct_reading(waveform.voltage.expand(raw.voltage)),
        current: calibration
            .current
            .correct_reading(waveform.current.expand(raw.current)),
        rpm: raw.rpm,
        flow: raw.flow,
        temperature: raw.temperature,
        relays: [false; RELAY_COUNT],
        mode: raw.mode,
        alarm: AlarmFlags::default(),
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::WeldMode;

    fn raw(voltage: f64, current: f64) -> RawSample {
        RawSample::new(WeldMode::Mig, voltage, current, 1500.0, 20.0, 60.0)
    }

    #[test]
    fn test_identity_calibration() {
        let waveform = WaveformModel::default();
        for (v, i) in [(0.0, 0.0), (100.0, 50.0), (260.0, 100.0), (-3.5, 12.25)] {
            let sample = apply(&raw(v, i), &CalibrationData::default(), &waveform, 0);
            assert_eq!(sample.voltage, waveform.voltage.expand(v));
            assert_eq!(sample.current, waveform.current.expand(i));
            assert_eq!(sample.voltage.avg, v);
            assert_eq!(sample.current.avg, i);
        }
    }

    #[test]
    fn test_offset_and_gain_apply_to_every_metric() {
        let calibration = CalibrationData {
            voltage: ChannelCalibration {
                offset: 10.0,
                gain: 2.0,
            },
            current: ChannelCalibration::default(),
        };
        let waveform = WaveformModel {
            voltage: WaveformFactors { rms: 1.5, pk: 2.0 },
            current: WaveformFactors { rms: 1.0, pk: 1.0 },
        };

        let sample = apply(&raw(100.0, 40.0), &calibration, &waveform, 5);

        assert_eq!(sample.voltage.avg, 180.0);
        assert_eq!(sample.voltage.rms, 280.0);
        assert_eq!(sample.voltage.pk, 380.0);
        assert_eq!(sample.current.avg, 40.0);
        assert_eq!(sample.rpm, 1500.0);
        assert_eq!(sample.flow, 20.0);
        assert_eq!(sample.temperature, 60.0);
        assert_eq!(sample.mode, WeldMode::Mig);
        assert_eq!(sample.timestamp, 5);
    }

    #[test]
    fn test_partial_update_is_channel_independent() {
        let mut calibration = CalibrationData::default();
        calibration.current.offset = 3.0;

        calibration.merge(&CalibrationUpdate {
            voltage: Some(ChannelCalibrationUpdate {
                offset: Some(10.0),
                gain: Some(1.0),
            }),
            current: None,
        });

        assert_eq!(calibration.voltage.offset, 10.0);
        assert_eq!(calibration.current.offset, 3.0);
        assert_eq!(calibration.current.gain, 1.0);

        calibration.merge(&CalibrationUpdate {
            voltage: Some(ChannelCalibrationUpdate {
                offset: None,
                gain: Some(0.5),
            }),
            current: None,
        });
        assert_eq!(calibration.voltage.offset, 10.0);
        assert_eq!(calibration.voltage.gain, 0.5);
    }

    #[test]
    fn test_update_deserializes_partial_json() {
        let update: CalibrationUpdate =
            serde_json::from_str(r#"{"voltage":{"offset":10}}"#).unwrap();
        assert_eq!(update.voltage.as_ref().and_then(|v| v.offset), Some(10.0));
        assert_eq!(update.voltage.as_ref().and_then(|v| v.gain), None);
        assert!(update.current.is_none());
    }
}
