// Alarm domain model - threshold evaluation and de-duplicated alarm history
use super::telemetry::CalibratedSample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlarmType {
    OverVoltage,
    OverCurrent,
    LowFlow,
    OverTemp,
    CommFail,
}

impl AlarmType {
    pub const ALL: [AlarmType; 5] = [
        AlarmType::OverVoltage,
        AlarmType::OverCurrent,
        AlarmType::LowFlow,
        AlarmType::OverTemp,
        AlarmType::CommFail,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AlarmType::OverVoltage => "Over voltage",
            AlarmType::OverCurrent => "Over current",
            AlarmType::LowFlow => "Low gas flow",
            AlarmType::OverTemp => "Over temperature",
            AlarmType::CommFail => "Communication failure",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmFlags {
    pub over_voltage: bool,
    pub over_current: bool,
    pub low_flow: bool,
    pub over_temp: bool,
    pub comm_fail: bool,
}

impl AlarmFlags {
    pub fn is_set(&self, alarm: AlarmType) -> bool {
        match alarm {
            AlarmType::OverVoltage => self.over_voltage,
            AlarmType::OverCurrent => self.over_current,
            AlarmType::LowFlow => self.low_flow,
            AlarmType::OverTemp => self.over_temp,
            AlarmType::CommFail => self.comm_fail,
        }
    }

    /// Active conditions in declaration order.
    pub fn active(&self) -> Vec<AlarmType> {
        AlarmType::ALL
            .into_iter()
            .filter(|alarm| self.is_set(*alarm))
            .collect()
    }

    #[cfg(test)]
    pub fn any(&self) -> bool {
        AlarmType::ALL.iter().any(|alarm| self.is_set(*alarm))
    }
}

/// Limits for threshold-derived alarms. commFail has no threshold; only the
/// liveness monitor raises it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmThresholds {
    pub voltage_max: f64,
    pub current_max: f64,
    pub flow_min: f64,
    pub temperature_max: f64,
}

impl Default for AlarmThresholds {
    fn default() -> Self {
        Self {
            voltage_max: 250.0,
            current_max: 450.0,
            flow_min: 5.0,
            temperature_max: 90.0,
        }
    }
}

impl AlarmThresholds {
    pub fn evaluate(&self, sample: &CalibratedSample) -> AlarmFlags {
        AlarmFlags {
            over_voltage: sample.voltage.avg > self.voltage_max,
            over_current: sample.current.avg > self.current_max,
            low_flow: sample.flow < self.flow_min,
            over_temp: sample.temperature > self.temperature_max,
            comm_fail: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmRecord {
    #[serde(rename = "type")]
    pub alarm_type: AlarmType,
    pub timestamp: i64,
    pub acknowledged: bool,
}

/// Bounded alarm history plus the set of conditions active on the latest sample.
#[derive(Debug, Clone)]
pub struct AlarmLog {
    records: VecDeque<AlarmRecord>,
    active: Vec<AlarmType>,
    capacity: usize,
    lookback: usize,
}

impl AlarmLog {
    pub fn new(capacity: usize, lookback: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            active: Vec::new(),
            capacity,
            lookback,
        }
    }

    /// Replace the active set and raise a record for every active type that has
    /// no unacknowledged record among the last `lookback` entries. Returns the
    /// types that produced a new record.
    pub fn merge(&mut self, active: Vec<AlarmType>, timestamp: i64) -> Vec<AlarmType> {
        // Decide against the history as it stood before this sample.
        let raised: Vec<AlarmType> = active
            .iter()
            .copied()
            .filter(|alarm| !self.has_recent_unacknowledged(*alarm))
            .collect();

        for alarm_type in &raised {
            self.records.push_back(AlarmRecord {
                alarm_type: *alarm_type,
                timestamp,
                acknowledged: false,
            });
        }
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }

        self.active = active;
        raised
    }

    fn has_recent_unacknowledged(&self, alarm: AlarmType) -> bool {
        self.records
            .iter()
            .rev()
            .take(self.lookback)
            .any(|r| r.alarm_type == alarm && !r.acknowledged)
    }

    pub fn acknowledge_all(&mut self) {
        for record in self.records.iter_mut() {
            record.acknowledged = true;
        }
        self.active.clear();
    }

    /// Drop acknowledged records at or before `cutoff`. Unacknowledged records are kept
    /// regardless of age.
    pub fn purge_acknowledged(&mut self, cutoff: i64) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.timestamp > cutoff || !r.acknowledged);
        before - self.records.len()
    }

    pub fn active(&self) -> &[AlarmType] {
        &self.active
    }

    pub fn records(&self) -> Vec<AlarmRecord> {
        self.records.iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}
