//! mecar-core - Core traits and types for the vehicle accessory bridge
//!
//! This crate provides the abstractions shared by the vendor client, the
//! polling loop and the host bridge: the telemetry data model, the
//! `VehicleBackend` trait and an in-process model of the host platform's
//! accessories, services and characteristics.

pub mod accessory;
pub mod backend;
pub mod error;
pub mod telemetry;

pub use accessory::{
    Accessory, Characteristic, CharacteristicType, CharacteristicValue, Service, ServiceType,
    SetHandler, ValueChange,
};
pub use backend::VehicleBackend;
pub use error::{AccessoryError, AccessoryResult, ApiError, ApiResult, ErrorClass};
pub use telemetry::{FieldValue, Snapshot, TelemetryRecord};
