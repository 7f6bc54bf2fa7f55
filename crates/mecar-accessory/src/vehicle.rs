//! Lifecycle of one vehicle accessory

use std::sync::Arc;

use mecar_core::{Accessory, VehicleBackend};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AccessoryConfig;
use crate::error::Result;
use crate::poller::Poller;
use crate::services::{register_services, CarServices};

/// A registered vehicle accessory with its running poll loop.
///
/// Dropping it cancels the loop, pending reverts and change listeners.
pub struct VehicleAccessory {
    accessory: Arc<Accessory>,
    services: CarServices,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl VehicleAccessory {
    /// Create the accessory, register its services and start polling.
    ///
    /// The first cycle runs immediately.
    pub fn start(config: AccessoryConfig, backend: Arc<dyn VehicleBackend>) -> Result<Self> {
        Self::attach(Arc::new(Accessory::new(config.vin.clone(), config.display_name())), config, backend)
    }

    /// Same as [`start`](Self::start) for an accessory the host already knows
    pub fn attach(
        accessory: Arc<Accessory>,
        config: AccessoryConfig,
        backend: Arc<dyn VehicleBackend>,
    ) -> Result<Self> {
        config.validate()?;

        let shutdown = CancellationToken::new();
        let services = register_services(&accessory, &shutdown)?;
        info!(
            accessory = %accessory.display_name(),
            vin = %config.vin,
            electric = config.electric_vehicle,
            "Vehicle accessory registered"
        );

        let task = Poller::new(backend, config, services.clone()).spawn(shutdown.clone());

        Ok(Self {
            accessory,
            services,
            shutdown,
            task: Some(task),
        })
    }

    pub fn accessory(&self) -> &Arc<Accessory> {
        &self.accessory
    }

    pub fn services(&self) -> &CarServices {
        &self.services
    }

    /// Token cancelled at teardown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop polling and wait for the loop to finish
    pub async fn teardown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(accessory = %self.accessory.display_name(), error = %e, "Poll task ended abnormally");
            }
        }
        info!(accessory = %self.accessory.display_name(), "Vehicle accessory stopped");
    }
}

impl Drop for VehicleAccessory {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
