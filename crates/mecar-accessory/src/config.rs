//! Per-vehicle accessory configuration
//!
//! Field names follow the TOML config (`electric_vehicle`, `max_range`);
//! the host platform's camelCase spellings are accepted as aliases.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration of one vehicle accessory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryConfig {
    /// Display name (defaults to the VIN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Vehicle identification number
    pub vin: String,
    /// Read battery state from the electric container instead of fuel
    #[serde(default, alias = "electricVehicle")]
    pub electric_vehicle: bool,
    /// Full range, used to turn remaining range into a percentage
    #[serde(default, alias = "maxRange", skip_serializing_if = "Option::is_none")]
    pub max_range: Option<f64>,
    /// Delay between poll cycles in milliseconds
    #[serde(default = "default_polling")]
    pub polling: u64,
}

fn default_polling() -> u64 {
    60_000
}

/// Which container feeds the battery service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatterySource {
    /// Tank level / liquid range
    Fuel,
    /// State of charge / electric range
    Electric,
}

impl BatterySource {
    /// Field carrying a direct percentage
    pub fn percent_field(self) -> &'static str {
        match self {
            BatterySource::Fuel => "tanklevelpercent",
            BatterySource::Electric => "soc",
        }
    }

    /// Field carrying the remaining range
    pub fn range_field(self) -> &'static str {
        match self {
            BatterySource::Fuel => "rangeliquid",
            BatterySource::Electric => "rangeelectric",
        }
    }
}

impl AccessoryConfig {
    /// Config for a combustion vehicle with default polling
    pub fn new(vin: impl Into<String>) -> Self {
        Self {
            name: None,
            vin: vin.into(),
            electric_vehicle: false,
            max_range: None,
            polling: default_polling(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn electric(mut self, electric: bool) -> Self {
        self.electric_vehicle = electric;
        self
    }

    pub fn with_max_range(mut self, max_range: f64) -> Self {
        self.max_range = Some(max_range);
        self
    }

    pub fn with_polling_ms(mut self, polling: u64) -> Self {
        self.polling = polling;
        self
    }

    /// Name shown on the host
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.vin)
    }

    /// Delay between two poll cycles
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling)
    }

    pub fn battery_source(&self) -> BatterySource {
        if self.electric_vehicle {
            BatterySource::Electric
        } else {
            BatterySource::Fuel
        }
    }

    /// Check the config can drive a poll loop
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vin.trim().is_empty() {
            return Err(ConfigError::MissingVin);
        }
        if self.polling == 0 {
            return Err(ConfigError::InvalidPolling(self.vin.clone()));
        }
        if let Some(max_range) = self.max_range {
            if !(max_range.is_finite() && max_range > 0.0) {
                return Err(ConfigError::InvalidMaxRange {
                    vin: self.vin.clone(),
                    max_range,
                });
            }
        }
        Ok(())
    }
}

/// Invalid accessory configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Vehicle config is missing a VIN")]
    MissingVin,

    #[error("Polling interval of {0} must be greater than zero")]
    InvalidPolling(String),

    #[error("Max range of {vin} must be positive, got {max_range}")]
    InvalidMaxRange { vin: String, max_range: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_toml() {
        let config: AccessoryConfig = toml::from_str(r#"vin = "WDD123""#).unwrap();
        assert_eq!(config.vin, "WDD123");
        assert!(!config.electric_vehicle);
        assert_eq!(config.max_range, None);
        assert_eq!(config.polling_interval(), Duration::from_secs(60));
        assert_eq!(config.display_name(), "WDD123");
        assert_eq!(config.battery_source(), BatterySource::Fuel);
    }

    #[test]
    fn test_host_aliases() {
        let config: AccessoryConfig = serde_json::from_str(
            r#"{"vin": "ABC", "electricVehicle": true, "maxRange": 400, "polling": 5000}"#,
        )
        .unwrap();
        assert!(config.electric_vehicle);
        assert_eq!(config.max_range, Some(400.0));
        assert_eq!(config.polling, 5000);
        assert_eq!(config.battery_source(), BatterySource::Electric);
    }

    #[test]
    fn test_validate() {
        assert!(AccessoryConfig::new("ABC").validate().is_ok());
        assert!(matches!(
            AccessoryConfig::new(" ").validate(),
            Err(ConfigError::MissingVin)
        ));
        assert!(matches!(
            AccessoryConfig::new("ABC").with_polling_ms(0).validate(),
            Err(ConfigError::InvalidPolling(_))
        ));
        assert!(matches!(
            AccessoryConfig::new("ABC").with_max_range(0.0).validate(),
            Err(ConfigError::InvalidMaxRange { .. })
        ));
    }

    #[test]
    fn test_battery_fields() {
        assert_eq!(BatterySource::Fuel.percent_field(), "tanklevelpercent");
        assert_eq!(BatterySource::Fuel.range_field(), "rangeliquid");
        assert_eq!(BatterySource::Electric.percent_field(), "soc");
        assert_eq!(BatterySource::Electric.range_field(), "rangeelectric");
    }
}
