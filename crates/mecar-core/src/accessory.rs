//! In-process model of the host platform's accessory framework
//!
//! An accessory owns services, a service owns characteristics, and a
//! characteristic carries a value that can be updated locally, written
//! externally through a set handler, and observed through change events.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{AccessoryError, AccessoryResult};

/// Buffered change events per characteristic before slow listeners lag
const CHANGE_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Service and Characteristic Types
// =============================================================================

/// Host service types used by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    LockMechanism,
    Battery,
    ContactSensor,
    Lightbulb,
}

impl ServiceType {
    /// Characteristics every service of this type carries
    pub fn characteristics(self) -> &'static [CharacteristicType] {
        match self {
            ServiceType::LockMechanism => &[
                CharacteristicType::LockCurrentState,
                CharacteristicType::LockTargetState,
            ],
            ServiceType::Battery => &[
                CharacteristicType::BatteryLevel,
                CharacteristicType::ChargingState,
                CharacteristicType::StatusLowBattery,
            ],
            ServiceType::ContactSensor => &[CharacteristicType::ContactSensorState],
            ServiceType::Lightbulb => &[CharacteristicType::On],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::LockMechanism => "lock_mechanism",
            ServiceType::Battery => "battery",
            ServiceType::ContactSensor => "contact_sensor",
            ServiceType::Lightbulb => "lightbulb",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host characteristic types used by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicType {
    LockCurrentState,
    LockTargetState,
    BatteryLevel,
    ChargingState,
    StatusLowBattery,
    ContactSensorState,
    On,
}

impl CharacteristicType {
    pub fn as_str(self) -> &'static str {
        match self {
            CharacteristicType::LockCurrentState => "lock_current_state",
            CharacteristicType::LockTargetState => "lock_target_state",
            CharacteristicType::BatteryLevel => "battery_level",
            CharacteristicType::ChargingState => "charging_state",
            CharacteristicType::StatusLowBattery => "status_low_battery",
            CharacteristicType::ContactSensorState => "contact_sensor_state",
            CharacteristicType::On => "on",
        }
    }

    /// Whether the host may write this characteristic
    pub fn writable(self) -> bool {
        matches!(
            self,
            CharacteristicType::LockTargetState | CharacteristicType::On
        )
    }

    /// Value a freshly created characteristic starts with
    pub fn default_value(self) -> CharacteristicValue {
        match self {
            CharacteristicType::On => CharacteristicValue::Bool(false),
            _ => CharacteristicValue::UInt(0),
        }
    }

    /// Largest accepted value for integer characteristics
    fn max_value(self) -> u8 {
        match self {
            CharacteristicType::BatteryLevel => 100,
            CharacteristicType::LockCurrentState => 3,
            CharacteristicType::ChargingState => 2,
            _ => 1,
        }
    }

    /// Check that `value` has the right kind and range for this characteristic
    pub fn validate(self, value: &CharacteristicValue) -> AccessoryResult<()> {
        match (self.default_value(), value) {
            (CharacteristicValue::Bool(_), CharacteristicValue::Bool(_)) => Ok(()),
            (CharacteristicValue::UInt(_), CharacteristicValue::UInt(v)) => {
                if *v <= self.max_value() {
                    Ok(())
                } else {
                    Err(AccessoryError::InvalidValue {
                        characteristic: self,
                        reason: format!("{} exceeds maximum {}", v, self.max_value()),
                    })
                }
            }
            (CharacteristicValue::Bool(_), _) => Err(AccessoryError::InvalidValue {
                characteristic: self,
                reason: "expected a boolean".to_string(),
            }),
            (CharacteristicValue::UInt(_), _) => Err(AccessoryError::InvalidValue {
                characteristic: self,
                reason: "expected an unsigned integer".to_string(),
            }),
        }
    }
}

impl fmt::Display for CharacteristicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharacteristicType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "lock_current_state" => CharacteristicType::LockCurrentState,
            "lock_target_state" => CharacteristicType::LockTargetState,
            "battery_level" => CharacteristicType::BatteryLevel,
            "charging_state" => CharacteristicType::ChargingState,
            "status_low_battery" => CharacteristicType::StatusLowBattery,
            "contact_sensor_state" => CharacteristicType::ContactSensorState,
            "on" => CharacteristicType::On,
            other => return Err(format!("Unknown characteristic: {}", other)),
        };
        Ok(kind)
    }
}

// =============================================================================
// Values and Change Events
// =============================================================================

/// A characteristic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    UInt(u8),
}

impl CharacteristicValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CharacteristicValue::Bool(b) => Some(*b),
            CharacteristicValue::UInt(_) => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            CharacteristicValue::UInt(v) => Some(*v),
            CharacteristicValue::Bool(_) => None,
        }
    }
}

impl From<bool> for CharacteristicValue {
    fn from(value: bool) -> Self {
        CharacteristicValue::Bool(value)
    }
}

impl From<u8> for CharacteristicValue {
    fn from(value: u8) -> Self {
        CharacteristicValue::UInt(value)
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacteristicValue::Bool(b) => write!(f, "{}", b),
            CharacteristicValue::UInt(v) => write!(f, "{}", v),
        }
    }
}

/// Published on every value update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueChange {
    pub old: CharacteristicValue,
    pub new: CharacteristicValue,
}

impl ValueChange {
    /// True when the update actually changed the value
    pub fn is_transition(&self) -> bool {
        self.old != self.new
    }
}

/// Handler invoked on external writes before the value is stored.
///
/// Returning an error refuses the write.
pub type SetHandler = Arc<dyn Fn(&CharacteristicValue) -> AccessoryResult<()> + Send + Sync>;

// =============================================================================
// Characteristic
// =============================================================================

/// A single observable, optionally writable value on a service
pub struct Characteristic {
    kind: CharacteristicType,
    value: RwLock<CharacteristicValue>,
    changes: broadcast::Sender<ValueChange>,
    set_handler: RwLock<Option<SetHandler>>,
}

impl Characteristic {
    pub fn new(kind: CharacteristicType) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            kind,
            value: RwLock::new(kind.default_value()),
            changes,
            set_handler: RwLock::new(None),
        }
    }

    pub fn kind(&self) -> CharacteristicType {
        self.kind
    }

    /// Current value
    pub fn value(&self) -> CharacteristicValue {
        *self.value.read()
    }

    /// Store a new value and publish a change event.
    ///
    /// Used by the bridge itself; external writes go through [`set_value`].
    ///
    /// [`set_value`]: Characteristic::set_value
    pub fn update_value(&self, value: impl Into<CharacteristicValue>) {
        let new = value.into();
        let old = std::mem::replace(&mut *self.value.write(), new);
        // No listeners is fine
        let _ = self.changes.send(ValueChange { old, new });
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<ValueChange> {
        self.changes.subscribe()
    }

    /// Install the handler run on external writes, replacing any previous one
    pub fn on_set<F>(&self, handler: F)
    where
        F: Fn(&CharacteristicValue) -> AccessoryResult<()> + Send + Sync + 'static,
    {
        *self.set_handler.write() = Some(Arc::new(handler));
    }

    /// Apply an external write.
    ///
    /// Validates the value, runs the set handler (if any) and stores the
    /// value once the handler acknowledged it.
    pub fn set_value(&self, value: CharacteristicValue) -> AccessoryResult<()> {
        if !self.kind.writable() {
            return Err(AccessoryError::ReadOnly(self.kind));
        }
        self.kind.validate(&value)?;

        let handler = self.set_handler.read().clone();
        if let Some(handler) = handler {
            handler(&value)?;
        }

        self.update_value(value);
        Ok(())
    }
}

impl fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Characteristic")
            .field("kind", &self.kind)
            .field("value", &self.value())
            .field("has_set_handler", &self.set_handler.read().is_some())
            .finish()
    }
}

// =============================================================================
// Service
// =============================================================================

/// A typed group of characteristics exposed by an accessory
#[derive(Debug)]
pub struct Service {
    service_type: ServiceType,
    name: String,
    subtype: Option<String>,
    characteristics: Vec<Arc<Characteristic>>,
}

impl Service {
    /// Create a service carrying every characteristic its type requires
    pub fn new(service_type: ServiceType, name: impl Into<String>, subtype: Option<&str>) -> Self {
        let characteristics = service_type
            .characteristics()
            .iter()
            .map(|kind| Arc::new(Characteristic::new(*kind)))
            .collect();

        Self {
            service_type,
            name: name.into(),
            subtype: subtype.map(str::to_string),
            characteristics,
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn characteristics(&self) -> &[Arc<Characteristic>] {
        &self.characteristics
    }

    /// Look up a characteristic by type
    pub fn characteristic(&self, kind: CharacteristicType) -> AccessoryResult<Arc<Characteristic>> {
        self.characteristics
            .iter()
            .find(|c| c.kind() == kind)
            .cloned()
            .ok_or(AccessoryError::CharacteristicNotFound(kind))
    }
}

// =============================================================================
// Accessory
// =============================================================================

/// A host accessory: one per vehicle
#[derive(Debug)]
pub struct Accessory {
    id: String,
    display_name: String,
    services: RwLock<Vec<Arc<Service>>>,
}

impl Accessory {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            services: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Snapshot of the service list
    pub fn services(&self) -> Vec<Arc<Service>> {
        self.services.read().clone()
    }

    /// First service of the given type
    pub fn service_by_type(&self, service_type: ServiceType) -> Option<Arc<Service>> {
        self.services
            .read()
            .iter()
            .find(|s| s.service_type() == service_type)
            .cloned()
    }

    /// Service with the given name
    pub fn service_by_name(&self, name: &str) -> Option<Arc<Service>> {
        self.services
            .read()
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    /// Add a new service and return a handle to it
    pub fn add_service(
        &self,
        service_type: ServiceType,
        name: impl Into<String>,
        subtype: Option<&str>,
    ) -> Arc<Service> {
        let service = Arc::new(Service::new(service_type, name, subtype));
        self.services.write().push(service.clone());
        service
    }
}
