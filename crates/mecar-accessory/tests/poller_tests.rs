//! Poll loop behaviour against scripted and HTTP-backed vendors

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mecar_accessory::{register_services, AccessoryConfig, CycleOutcome, Poller, VehicleAccessory};
use mecar_client::testing::{MockVendor, TestServer};
use mecar_client::Container;
use mecar_core::{
    Accessory, ApiError, ApiResult, CharacteristicType, CharacteristicValue, ErrorClass,
    FieldValue, Service, Snapshot, TelemetryRecord, VehicleBackend,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Scripted Backend
// =============================================================================

/// Backend answering from fixed snapshots, optionally failing one call
#[derive(Default)]
struct ScriptedBackend {
    snapshots: HashMap<&'static str, Snapshot>,
    failures: HashMap<&'static str, u16>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedBackend {
    fn with(mut self, call: &'static str, snapshot: Snapshot) -> Self {
        self.snapshots.insert(call, snapshot);
        self
    }

    fn failing(mut self, call: &'static str, status: u16) -> Self {
        self.failures.insert(call, status);
        self
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    fn answer(&self, call: &'static str) -> ApiResult<Snapshot> {
        self.calls.lock().push(call);
        if let Some(status) = self.failures.get(call) {
            return Err(ApiError::http(*status, None));
        }
        Ok(self.snapshots.get(call).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl VehicleBackend for ScriptedBackend {
    async fn fuel_status(&self, _vin: &str) -> ApiResult<Snapshot> {
        self.answer("fuel")
    }

    async fn electro_status(&self, _vin: &str) -> ApiResult<Snapshot> {
        self.answer("electro")
    }

    async fn lock_status(&self, _vin: &str) -> ApiResult<Snapshot> {
        self.answer("lock")
    }

    async fn vehicle_status(&self, _vin: &str) -> ApiResult<Snapshot> {
        self.answer("vehicle")
    }
}

fn snapshot(fields: &[(&str, &str)]) -> Snapshot {
    Snapshot::new(vec![fields
        .iter()
        .map(|(name, value)| (name.to_string(), FieldValue::new(*value)))
        .collect::<TelemetryRecord>()])
}

fn value(service: &Service, kind: CharacteristicType) -> CharacteristicValue {
    service.characteristic(kind).unwrap().value()
}

fn poller(backend: Arc<ScriptedBackend>, config: AccessoryConfig, token: &CancellationToken) -> Poller {
    let accessory = Accessory::new(config.vin.clone(), config.display_name());
    let services = register_services(&accessory, token).unwrap();
    Poller::new(backend, config, services)
}

// =============================================================================
// Single Cycles
// =============================================================================

#[tokio::test]
async fn test_cycle_maps_all_services() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .with("fuel", snapshot(&[("tanklevelpercent", "15")]))
            .with("lock", snapshot(&[("doorlockstatusvehicle", "2")]))
            .with(
                "vehicle",
                snapshot(&[("decklidstatus", "true"), ("sunroofstatus", "0"), ("interiorLightsRear", "true")]),
            ),
    );
    let token = CancellationToken::new();
    let poller = poller(backend.clone(), AccessoryConfig::new("ABC"), &token);

    assert_eq!(poller.poll_once().await, CycleOutcome::Completed);
    assert_eq!(backend.calls(), vec!["fuel", "lock", "vehicle"]);

    let services = poller.services();
    assert_eq!(value(&services.battery, CharacteristicType::BatteryLevel), CharacteristicValue::UInt(15));
    assert_eq!(value(&services.battery, CharacteristicType::StatusLowBattery), CharacteristicValue::UInt(1));
    assert_eq!(value(&services.lock, CharacteristicType::LockCurrentState), CharacteristicValue::UInt(1));
    assert_eq!(value(&services.lock, CharacteristicType::LockTargetState), CharacteristicValue::UInt(1));
    assert_eq!(value(&services.doors, CharacteristicType::ContactSensorState), CharacteristicValue::UInt(1));
    assert_eq!(value(&services.windows, CharacteristicType::ContactSensorState), CharacteristicValue::UInt(0));
    assert_eq!(value(&services.lights, CharacteristicType::On), CharacteristicValue::Bool(true));
    token.cancel();
}

#[tokio::test]
async fn test_electric_vehicle_uses_electro_status() {
    let backend = Arc::new(ScriptedBackend::default().with("electro", snapshot(&[("soc", "64")])));
    let token = CancellationToken::new();
    let poller = poller(backend.clone(), AccessoryConfig::new("ABC").electric(true), &token);

    assert_eq!(poller.poll_once().await, CycleOutcome::Completed);
    assert_eq!(backend.calls(), vec!["electro", "lock", "vehicle"]);
    assert_eq!(
        value(&poller.services().battery, CharacteristicType::BatteryLevel),
        CharacteristicValue::UInt(64)
    );
    token.cancel();
}

#[tokio::test]
async fn test_failed_fetch_stops_the_cycle() {
    let backend = Arc::new(ScriptedBackend::default().failing("lock", 401));
    let token = CancellationToken::new();
    let poller = poller(backend.clone(), AccessoryConfig::new("ABC"), &token);

    assert_eq!(poller.poll_once().await, CycleOutcome::Failed(ErrorClass::Unauthorized));
    assert_eq!(backend.calls(), vec!["fuel", "lock"]);
    token.cancel();
}

// =============================================================================
// Scheduling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_next_poll_after_interval() {
    let backend = Arc::new(ScriptedBackend::default().with("fuel", snapshot(&[("rangeliquid", "300")])));
    let config = AccessoryConfig::new("ABC").with_max_range(600.0).with_polling_ms(5000);
    let token = CancellationToken::new();
    let poller = poller(backend.clone(), config, &token);
    let services = poller.services().clone();
    let handle = poller.spawn(token.clone());

    tokio::time::sleep(Duration::from_millis(4999)).await;
    assert_eq!(backend.count("fuel"), 1);
    assert_eq!(value(&services.battery, CharacteristicType::BatteryLevel), CharacteristicValue::UInt(50));
    assert_eq!(value(&services.battery, CharacteristicType::ChargingState), CharacteristicValue::UInt(0));
    assert_eq!(value(&services.battery, CharacteristicType::StatusLowBattery), CharacteristicValue::UInt(0));

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(backend.count("fuel"), 2);

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failure_arms_exactly_one_next_cycle() {
    let backend = Arc::new(ScriptedBackend::default().failing("vehicle", 503));
    let config = AccessoryConfig::new("ABC").with_polling_ms(1000);
    let token = CancellationToken::new();
    let handle = poller(backend.clone(), config, &token).spawn(token.clone());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.count("fuel"), 1);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(backend.count("fuel"), 2);
    assert_eq!(backend.count("vehicle"), 2);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(backend.count("fuel"), 3);

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting_stops_loop() {
    let backend = Arc::new(ScriptedBackend::default());
    let config = AccessoryConfig::new("ABC").with_polling_ms(60_000);
    let token = CancellationToken::new();
    let handle = poller(backend.clone(), config, &token).spawn(token.clone());

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();
    handle.await.unwrap();

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(backend.count("fuel"), 1);
}

/// Backend whose lock call never completes
struct HangingBackend;

#[async_trait]
impl VehicleBackend for HangingBackend {
    async fn fuel_status(&self, _vin: &str) -> ApiResult<Snapshot> {
        Ok(Snapshot::default())
    }

    async fn electro_status(&self, _vin: &str) -> ApiResult<Snapshot> {
        Ok(Snapshot::default())
    }

    async fn lock_status(&self, _vin: &str) -> ApiResult<Snapshot> {
        std::future::pending().await
    }

    async fn vehicle_status(&self, _vin: &str) -> ApiResult<Snapshot> {
        Ok(Snapshot::default())
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_cycle_in_flight() {
    let accessory = Accessory::new("ABC", "ABC");
    let token = CancellationToken::new();
    let services = register_services(&accessory, &token).unwrap();
    let handle = Poller::new(Arc::new(HangingBackend), AccessoryConfig::new("ABC"), services).spawn(token.clone());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!handle.is_finished());

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_vehicle_accessory_lifecycle() {
    let backend = Arc::new(ScriptedBackend::default().with("fuel", snapshot(&[("tanklevelpercent", "80")])));
    let config = AccessoryConfig::new("ABC").with_name("Family car");
    let vehicle = VehicleAccessory::start(config, backend.clone()).unwrap();

    assert_eq!(vehicle.accessory().id(), "ABC");
    assert_eq!(vehicle.accessory().display_name(), "Family car");

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(
        value(&vehicle.services().battery, CharacteristicType::BatteryLevel),
        CharacteristicValue::UInt(80)
    );

    let token = vehicle.shutdown_token();
    vehicle.teardown().await;
    assert!(token.is_cancelled());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let backend = Arc::new(ScriptedBackend::default());
    let result = VehicleAccessory::start(AccessoryConfig::new("ABC").with_polling_ms(0), backend);
    assert!(matches!(result, Err(mecar_accessory::Error::Config(_))));
}

// =============================================================================
// Over HTTP
// =============================================================================

#[tokio::test]
async fn test_cycle_against_mock_vendor() {
    let vendor = MockVendor::new();
    vendor.set_json("ABC", Container::FuelStatus, json!([{"rangeliquid": {"value": "300"}}]));
    vendor.set_json(
        "ABC",
        Container::VehicleLockStatus,
        json!([{"doorlockstatusvehicle": {"value": "0"}}, {"doorlockstatusgas": {"value": "true"}}]),
    );
    vendor.set_status("ABC", Container::VehicleStatus, 204, None);
    let server = TestServer::start(vendor.router()).await.unwrap();

    let accessory = Accessory::new("ABC", "ABC");
    let token = CancellationToken::new();
    let services = register_services(&accessory, &token).unwrap();
    let config = AccessoryConfig::new("ABC").with_max_range(600.0);
    let poller = Poller::new(Arc::new(server.client.clone()), config, services);

    assert_eq!(poller.poll_once().await, CycleOutcome::Completed);
    assert_eq!(vendor.request_count(), 3);
    assert_eq!(
        value(&poller.services().battery, CharacteristicType::BatteryLevel),
        CharacteristicValue::UInt(50)
    );
    assert_eq!(
        value(&poller.services().lock, CharacteristicType::LockCurrentState),
        CharacteristicValue::UInt(0)
    );
    token.cancel();
}

#[tokio::test]
async fn test_unsupported_container_over_http() {
    let vendor = MockVendor::new();
    let server = TestServer::start(vendor.router()).await.unwrap();

    let accessory = Accessory::new("ABC", "ABC");
    let token = CancellationToken::new();
    let services = register_services(&accessory, &token).unwrap();
    let poller = Poller::new(Arc::new(server.client.clone()), AccessoryConfig::new("ABC"), services);

    assert_eq!(poller.poll_once().await, CycleOutcome::Failed(ErrorClass::Unsupported));
    assert_eq!(vendor.request_count(), 1);
    token.cancel();
}
