// Domain layer - telemetry records and the pure rules applied to them
pub mod alarm;
pub mod calibration;
pub mod history;
pub mod link;
pub mod liveness;
pub mod recording;
pub mod report;
pub mod telemetry;
