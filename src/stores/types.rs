// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Domain values and their mapping from backend JSON

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// An installed application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub port: Option<u16>,
}

impl App {
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }
}

/// UPS / power supply state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerStatus {
    #[serde(default)]
    pub battery_percent: Option<f64>,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub charging: bool,
    #[serde(default)]
    pub on_battery: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpioPin {
    pub pin: u8,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_used: u64,
    #[serde(default)]
    pub memory_total: u64,
    #[serde(default)]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub temperature_c: Option<f64>,
}

impl SystemStats {
    pub fn memory_percent(&self) -> f64 {
        if self.memory_total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let percent = self.memory_used as f64 / self.memory_total as f64 * 100.0;
        percent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub up: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkStatus {
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub internet: bool,
    #[serde(default)]
    pub interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDisk {
    pub name: String,
    #[serde(default)]
    pub mount: String,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub used_bytes: u64,
}

/// Unwraps `{"<field>": [...]}` envelopes; bare arrays pass through
fn list_field(raw: Value, field: &str) -> Result<Value, ApiError> {
    match raw {
        Value::Array(_) => Ok(raw),
        Value::Object(mut map) => map
            .remove(field)
            .ok_or_else(|| ApiError::Decode(format!("missing '{field}' in response"))),
        Value::Null => Ok(Value::Array(Vec::new())),
        other => Err(ApiError::Decode(format!(
            "expected list of {field}, got {other}"
        ))),
    }
}

pub fn parse_apps(raw: Value) -> Result<Vec<App>, ApiError> {
    Ok(serde_json::from_value(list_field(raw, "apps")?)?)
}

pub fn parse_favorites(raw: Value) -> Result<Vec<String>, ApiError> {
    Ok(serde_json::from_value(list_field(raw, "favorites")?)?)
}

pub fn parse_gpio(raw: Value) -> Result<Vec<GpioPin>, ApiError> {
    Ok(serde_json::from_value(list_field(raw, "pins")?)?)
}

pub fn parse_disks(raw: Value) -> Result<Vec<StorageDisk>, ApiError> {
    Ok(serde_json::from_value(list_field(raw, "disks")?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_apps_envelope_and_bare_list() {
        let wrapped = parse_apps(json!({ "apps": [{ "name": "pihole", "status": "running" }] }));
        let bare = parse_apps(json!([{ "name": "pihole", "status": "running" }]));

        assert_eq!(wrapped.unwrap(), bare.unwrap());
    }

    #[test]
    fn test_app_defaults_and_running() {
        let apps = parse_apps(json!([{ "name": "npm", "status": "Running" }, { "name": "x" }])).unwrap();
        assert!(apps[0].is_running());
        assert!(!apps[1].is_running());
        assert_eq!(apps[1].port, None);
    }

    #[test]
    fn test_parse_favorites_null_is_empty() {
        assert!(parse_favorites(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_parse_favorites_rejects_scalars() {
        assert!(matches!(parse_favorites(json!(3)), Err(ApiError::Decode(_))));
        assert!(matches!(parse_favorites(json!({ "other": [] })), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_memory_percent() {
        let stats = SystemStats {
            memory_used: 512,
            memory_total: 2048,
            ..SystemStats::default()
        };
        assert!((stats.memory_percent() - 25.0).abs() < f64::EPSILON);
        assert_eq!(SystemStats::default().memory_percent(), 0.0);
    }

    #[test]
    fn test_parse_gpio_pins() {
        let pins = parse_gpio(json!({ "pins": [{ "pin": 17, "mode": "out", "value": 1 }] })).unwrap();
        assert_eq!(pins[0].pin, 17);
        assert_eq!(pins[0].value, 1);
    }
}
