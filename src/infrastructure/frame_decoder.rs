// Frame decoder - maps device JSON frames to raw samples
use crate::domain::telemetry::{RawSample, SampleError, WeldMode};
use serde::Deserialize;

/// Device frame as emitted by the serial bridge: `{"mode":"MIG","V":..,"I":..,
/// "RPM":..,"FLOW":..,"TEMP":..}`. Long field names are accepted too.
#[derive(Debug, Deserialize)]
struct DeviceFrame {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default, rename = "V", alias = "voltage")]
    voltage: Option<f64>,
    #[serde(default, rename = "I", alias = "current")]
    current: Option<f64>,
    #[serde(default, rename = "RPM", alias = "rpm")]
    rpm: Option<f64>,
    #[serde(default, rename = "FLOW", alias = "flow")]
    flow: Option<f64>,
    #[serde(default, rename = "TEMP", alias = "temperature")]
    temperature: Option<f64>,
}

pub fn decode_frame(frame: &str) -> Result<RawSample, SampleError> {
    let frame: DeviceFrame =
        serde_json::from_str(frame.trim()).map_err(|e| SampleError::Decode(e.to_string()))?;

    let sample = RawSample::new(
        frame
            .mode
            .as_deref()
            .map(WeldMode::from_device)
            .unwrap_or(WeldMode::Smaw),
        frame.voltage.ok_or(SampleError::MissingField("voltage"))?,
        frame.current.ok_or(SampleError::MissingField("current"))?,
        frame.rpm.ok_or(SampleError::MissingField("rpm"))?,
        frame.flow.ok_or(SampleError::MissingField("flow"))?,
        frame
            .temperature
            .ok_or(SampleError::MissingField("temperature"))?,
    );
    sample.validate()?;
    Ok(sample)
}
