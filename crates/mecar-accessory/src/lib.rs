//! mecar-accessory - Vehicle accessory bridge logic
//!
//! Registers the five host services of a vehicle accessory (lock, battery,
//! doors, windows, lights), maps vendor telemetry onto their
//! characteristics, and keeps them fresh with one poll loop per vehicle.
//!
//! # Usage
//!
//! ```ignore
//! use mecar_accessory::{AccessoryConfig, VehicleAccessory};
//!
//! let config = AccessoryConfig::new("WDD2054231F123456");
//! let vehicle = VehicleAccessory::start(config, backend)?;
//! // ... host reads vehicle.accessory() ...
//! vehicle.teardown().await;
//! ```

pub mod config;
pub mod error;
pub mod mapping;
pub mod poller;
pub mod services;
mod vehicle;

pub use config::{AccessoryConfig, BatterySource, ConfigError};
pub use error::{Error, Result};
pub use mapping::{BatteryReading, ContactState, LockState};
pub use poller::{CycleOutcome, Poller};
pub use services::{register_services, CarServices, REVERT_DELAY};
pub use vehicle::VehicleAccessory;
