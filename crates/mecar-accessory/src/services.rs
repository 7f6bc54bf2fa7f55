//! Service registration for a vehicle accessory
//!
//! Makes sure the accessory carries the lock, battery, doors, windows and
//! lights services, installs the reject-and-revert handlers on the two
//! writable characteristics and logs state transitions.

use std::sync::{Arc, Weak};
use std::time::Duration;

use mecar_core::{
    Accessory, AccessoryError, AccessoryResult, Characteristic, CharacteristicType,
    CharacteristicValue, Service, ServiceType,
};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::mapping::{BatteryReading, ContactState, LockState, NOT_CHARGING};

/// Delay before a rejected write is reverted
pub const REVERT_DELAY: Duration = Duration::from_millis(500);

pub const LOCK_SERVICE: &str = "Lock";
pub const BATTERY_SERVICE: &str = "Battery";
pub const DOORS_SERVICE: &str = "Doors";
pub const WINDOWS_SERVICE: &str = "Windows";
pub const LIGHTS_SERVICE: &str = "Lights";

/// Handles to the five services of a vehicle accessory
#[derive(Debug, Clone)]
pub struct CarServices {
    pub lock: Arc<Service>,
    pub battery: Arc<Service>,
    pub doors: Arc<Service>,
    pub windows: Arc<Service>,
    pub lights: Arc<Service>,
}

/// Register the vehicle services on `accessory`.
///
/// Existing services are reused: lock, battery and lights are found by type,
/// doors and windows by name since both are contact sensors. Revert timers
/// and transition loggers stop when `shutdown` is cancelled.
///
/// Must be called from within a Tokio runtime.
pub fn register_services(
    accessory: &Accessory,
    shutdown: &CancellationToken,
) -> AccessoryResult<CarServices> {
    let runtime = Handle::try_current()
        .map_err(|e| AccessoryError::Rejected(format!("no runtime for service tasks: {}", e)))?;
    let name = accessory.display_name().to_string();

    let lock = find_or_add(accessory, ServiceType::LockMechanism, LOCK_SERVICE, Some("lock"), false);
    let battery = find_or_add(accessory, ServiceType::Battery, BATTERY_SERVICE, None, false);
    let doors = find_or_add(accessory, ServiceType::ContactSensor, DOORS_SERVICE, Some("door"), true);
    let windows = find_or_add(
        accessory,
        ServiceType::ContactSensor,
        WINDOWS_SERVICE,
        Some("window"),
        true,
    );
    let lights = find_or_add(accessory, ServiceType::Lightbulb, LIGHTS_SERVICE, Some("lightbulb"), false);

    reject_lock_writes(&lock, &name, &runtime, shutdown)?;
    reject_light_writes(&lights, &name, &runtime, shutdown)?;

    let lock_current = lock.characteristic(CharacteristicType::LockCurrentState)?;
    let door_contact = doors.characteristic(CharacteristicType::ContactSensorState)?;
    let window_contact = windows.characteristic(CharacteristicType::ContactSensorState)?;
    let light_on = lights.characteristic(CharacteristicType::On)?;

    log_transitions(
        &lock_current,
        &name,
        &runtime,
        shutdown,
        |value| match value.as_u8() {
            Some(0) => "Car lock secured",
            _ => "Car lock unlocked",
        },
    );
    log_transitions(
        &door_contact,
        &name,
        &runtime,
        shutdown,
        |value| match value.as_u8() {
            Some(0) => "Door(s)/trunk closed",
            _ => "Door(s)/trunk opened",
        },
    );
    log_transitions(
        &window_contact,
        &name,
        &runtime,
        shutdown,
        |value| match value.as_u8() {
            Some(0) => "Window(s)/sunroof closed",
            _ => "Window(s)/sunroof opened",
        },
    );
    log_transitions(
        &light_on,
        &name,
        &runtime,
        shutdown,
        |value| match value.as_bool() {
            Some(true) => "Interior light on",
            _ => "Interior light off",
        },
    );

    Ok(CarServices {
        lock,
        battery,
        doors,
        windows,
        lights,
    })
}

fn find_or_add(
    accessory: &Accessory,
    service_type: ServiceType,
    name: &str,
    subtype: Option<&str>,
    by_name: bool,
) -> Arc<Service> {
    let existing = if by_name {
        accessory.service_by_name(name)
    } else {
        accessory.service_by_type(service_type)
    };

    existing.unwrap_or_else(|| {
        debug!(accessory = %accessory.display_name(), service = name, "Adding service");
        accessory.add_service(service_type, name, subtype)
    })
}

// =============================================================================
// Reject and Revert
// =============================================================================

fn reject_lock_writes(
    service: &Service,
    accessory: &str,
    runtime: &Handle,
    shutdown: &CancellationToken,
) -> AccessoryResult<()> {
    let target = service.characteristic(CharacteristicType::LockTargetState)?;
    let current = service.characteristic(CharacteristicType::LockCurrentState)?;
    let revert_to = [Arc::downgrade(&target), Arc::downgrade(&current)];
    let accessory = accessory.to_string();
    let runtime = runtime.clone();
    let shutdown = shutdown.clone();

    target.on_set(move |value| {
        info!(accessory = %accessory, "Can not change lock state, remote control is not supported");
        let reverted = if value.as_u8().unwrap_or(0) != 0 { 0u8 } else { 1u8 };
        schedule_revert(&runtime, &shutdown, revert_to.to_vec(), reverted.into());
        Ok(())
    });
    Ok(())
}

fn reject_light_writes(
    service: &Service,
    accessory: &str,
    runtime: &Handle,
    shutdown: &CancellationToken,
) -> AccessoryResult<()> {
    let on = service.characteristic(CharacteristicType::On)?;
    let revert_to = [Arc::downgrade(&on)];
    let accessory = accessory.to_string();
    let runtime = runtime.clone();
    let shutdown = shutdown.clone();

    on.on_set(move |value| {
        info!(accessory = %accessory, "Can not switch interior lights, remote control is not supported");
        let reverted = !value.as_bool().unwrap_or(false);
        schedule_revert(&runtime, &shutdown, revert_to.to_vec(), reverted.into());
        Ok(())
    });
    Ok(())
}

/// One-shot task that writes `value` to `targets` after [`REVERT_DELAY`].
///
/// Handlers hold weak references so a characteristic never keeps itself
/// alive through its own set handler.
fn schedule_revert(
    runtime: &Handle,
    shutdown: &CancellationToken,
    targets: Vec<Weak<Characteristic>>,
    value: CharacteristicValue,
) {
    let shutdown = shutdown.clone();

    runtime.spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(REVERT_DELAY) => {
                for characteristic in targets.iter().filter_map(Weak::upgrade) {
                    characteristic.update_value(value);
                }
            }
        }
    });
}

// =============================================================================
// Transition Logging
// =============================================================================

/// Log `describe(new)` whenever the characteristic actually changes value
fn log_transitions(
    characteristic: &Characteristic,
    accessory: &str,
    runtime: &Handle,
    shutdown: &CancellationToken,
    describe: fn(CharacteristicValue) -> &'static str,
) {
    let mut changes = characteristic.subscribe();
    let kind = characteristic.kind();
    let accessory = accessory.to_string();
    let shutdown = shutdown.clone();

    runtime.spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                change = changes.recv() => match change {
                    Ok(change) if change.is_transition() => {
                        info!(accessory = %accessory, "{}", describe(change.new));
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(accessory = %accessory, characteristic = %kind, skipped, "Change listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });
}

// =============================================================================
// Applying Mapped State
// =============================================================================

impl CarServices {
    /// Write battery values; an absent level leaves the level untouched
    pub fn apply_battery(&self, reading: &BatteryReading) -> AccessoryResult<()> {
        if let Some(level) = reading.level {
            self.battery
                .characteristic(CharacteristicType::BatteryLevel)?
                .update_value(level);
        }
        self.battery
            .characteristic(CharacteristicType::ChargingState)?
            .update_value(NOT_CHARGING);
        self.battery
            .characteristic(CharacteristicType::StatusLowBattery)?
            .update_value(reading.low_value());
        Ok(())
    }

    /// Write current and target lock state
    pub fn apply_lock(&self, state: LockState) -> AccessoryResult<()> {
        self.lock
            .characteristic(CharacteristicType::LockCurrentState)?
            .update_value(state.value());
        self.lock
            .characteristic(CharacteristicType::LockTargetState)?
            .update_value(state.value());
        Ok(())
    }

    pub fn apply_doors(&self, state: ContactState) -> AccessoryResult<()> {
        self.doors
            .characteristic(CharacteristicType::ContactSensorState)?
            .update_value(state.value());
        Ok(())
    }

    pub fn apply_windows(&self, state: ContactState) -> AccessoryResult<()> {
        self.windows
            .characteristic(CharacteristicType::ContactSensorState)?
            .update_value(state.value());
        Ok(())
    }

    pub fn apply_lights(&self, on: bool) -> AccessoryResult<()> {
        self.lights
            .characteristic(CharacteristicType::On)?
            .update_value(on);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(service: &Service, kind: CharacteristicType) -> CharacteristicValue {
        service.characteristic(kind).unwrap().value()
    }

    #[tokio::test]
    async fn test_registers_five_services() {
        let accessory = Accessory::new("abc", "Family car");
        let token = CancellationToken::new();
        let services = register_services(&accessory, &token).unwrap();

        assert_eq!(accessory.services().len(), 5);
        assert_eq!(services.doors.name(), DOORS_SERVICE);
        assert_eq!(services.windows.name(), WINDOWS_SERVICE);
        assert_eq!(services.battery.service_type(), ServiceType::Battery);
        token.cancel();
    }

    #[test]
    fn test_registration_outside_runtime_is_an_error() {
        let accessory = Accessory::new("abc", "Family car");
        let token = CancellationToken::new();

        let result = register_services(&accessory, &token);
        assert!(matches!(result, Err(AccessoryError::Rejected(_))));
        assert!(accessory.services().is_empty());
    }

    #[tokio::test]
    async fn test_registration_reuses_existing_services() {
        let accessory = Accessory::new("abc", "Family car");
        let existing_lock = accessory.add_service(ServiceType::LockMechanism, "Old lock", None);
        let existing_doors = accessory.add_service(ServiceType::ContactSensor, DOORS_SERVICE, None);
        let token = CancellationToken::new();

        let services = register_services(&accessory, &token).unwrap();
        assert!(Arc::ptr_eq(&services.lock, &existing_lock));
        assert!(Arc::ptr_eq(&services.doors, &existing_doors));
        assert!(!Arc::ptr_eq(&services.windows, &existing_doors));
        assert_eq!(accessory.services().len(), 5);

        register_services(&accessory, &token).unwrap();
        assert_eq!(accessory.services().len(), 5);
        token.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_write_reverts_after_delay() {
        let accessory = Accessory::new("abc", "Family car");
        let token = CancellationToken::new();
        let services = register_services(&accessory, &token).unwrap();
        let target = services.lock.characteristic(CharacteristicType::LockTargetState).unwrap();
        let current = services.lock.characteristic(CharacteristicType::LockCurrentState).unwrap();
        let mut target_changes = target.subscribe();

        target.set_value(CharacteristicValue::UInt(1)).unwrap();
        assert_eq!(target.value(), CharacteristicValue::UInt(1));
        assert_eq!(target_changes.recv().await.unwrap().new, CharacteristicValue::UInt(1));

        tokio::time::sleep(REVERT_DELAY - Duration::from_millis(1)).await;
        assert_eq!(current.value(), CharacteristicValue::UInt(0));
        assert!(target_changes.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(target.value(), CharacteristicValue::UInt(0));
        assert_eq!(current.value(), CharacteristicValue::UInt(0));
        assert_eq!(target_changes.try_recv().unwrap().new, CharacteristicValue::UInt(0));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(target_changes.try_recv().is_err());
        token.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_write_zero_reverts_to_unlocked() {
        let accessory = Accessory::new("abc", "Family car");
        let token = CancellationToken::new();
        let services = register_services(&accessory, &token).unwrap();

        services
            .lock
            .characteristic(CharacteristicType::LockTargetState)
            .unwrap()
            .set_value(CharacteristicValue::UInt(0))
            .unwrap();
        tokio::time::sleep(REVERT_DELAY + Duration::from_millis(1)).await;

        assert_eq!(value(&services.lock, CharacteristicType::LockTargetState), CharacteristicValue::UInt(1));
        assert_eq!(value(&services.lock, CharacteristicType::LockCurrentState), CharacteristicValue::UInt(1));
        token.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_light_write_reverts() {
        let accessory = Accessory::new("abc", "Family car");
        let token = CancellationToken::new();
        let services = register_services(&accessory, &token).unwrap();
        let on = services.lights.characteristic(CharacteristicType::On).unwrap();

        on.set_value(CharacteristicValue::Bool(true)).unwrap();
        assert_eq!(on.value(), CharacteristicValue::Bool(true));

        tokio::time::sleep(REVERT_DELAY + Duration::from_millis(1)).await;
        assert_eq!(on.value(), CharacteristicValue::Bool(false));
        token.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_token_drops_pending_revert() {
        let accessory = Accessory::new("abc", "Family car");
        let token = CancellationToken::new();
        let services = register_services(&accessory, &token).unwrap();
        let on = services.lights.characteristic(CharacteristicType::On).unwrap();

        on.set_value(CharacteristicValue::Bool(true)).unwrap();
        token.cancel();
        tokio::time::sleep(REVERT_DELAY * 2).await;

        assert_eq!(on.value(), CharacteristicValue::Bool(true));
    }

    #[tokio::test]
    async fn test_read_only_characteristics_reject_writes() {
        let accessory = Accessory::new("abc", "Family car");
        let token = CancellationToken::new();
        let services = register_services(&accessory, &token).unwrap();

        let result = services
            .doors
            .characteristic(CharacteristicType::ContactSensorState)
            .unwrap()
            .set_value(CharacteristicValue::UInt(1));
        assert!(matches!(result, Err(AccessoryError::ReadOnly(_))));
        token.cancel();
    }

    #[tokio::test]
    async fn test_apply_battery_keeps_level_when_absent() {
        let accessory = Accessory::new("abc", "Family car");
        let token = CancellationToken::new();
        let services = register_services(&accessory, &token).unwrap();

        services.apply_battery(&BatteryReading::from_level(Some(15))).unwrap();
        assert_eq!(value(&services.battery, CharacteristicType::BatteryLevel), CharacteristicValue::UInt(15));
        assert_eq!(value(&services.battery, CharacteristicType::StatusLowBattery), CharacteristicValue::UInt(1));

        services.apply_battery(&BatteryReading::from_level(None)).unwrap();
        assert_eq!(value(&services.battery, CharacteristicType::BatteryLevel), CharacteristicValue::UInt(15));
        assert_eq!(value(&services.battery, CharacteristicType::StatusLowBattery), CharacteristicValue::UInt(0));
        assert_eq!(value(&services.battery, CharacteristicType::ChargingState), CharacteristicValue::UInt(0));
        token.cancel();
    }

    #[tokio::test]
    async fn test_apply_lock_syncs_target() {
        let accessory = Accessory::new("abc", "Family car");
        let token = CancellationToken::new();
        let services = register_services(&accessory, &token).unwrap();

        services.apply_lock(LockState::Unlocked).unwrap();
        assert_eq!(value(&services.lock, CharacteristicType::LockCurrentState), CharacteristicValue::UInt(1));
        assert_eq!(value(&services.lock, CharacteristicType::LockTargetState), CharacteristicValue::UInt(1));
        token.cancel();
    }
}
