// Transport link domain model - connection status and outbound commands
use super::calibration::CalibrationUpdate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Operator command forwarded to the device untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CommandMessage {
    Relay { id: u8, state: bool },
    Analog { id: u8, value: f64 },
    Calibration { calibration: CalibrationUpdate },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_shape() {
        let relay: CommandMessage =
            serde_json::from_str(r#"{"type":"relay","id":2,"state":true}"#).unwrap();
        assert_eq!(relay, CommandMessage::Relay { id: 2, state: true });

        let json = serde_json::to_value(CommandMessage::Analog { id: 1, value: 4.5 }).unwrap();
        assert_eq!(json["type"], "analog");
        assert_eq!(json["value"], 4.5);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
        assert_eq!(ConnectionStatus::Error.to_string(), "error");
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(!ConnectionStatus::default().is_connected());
    }
}
