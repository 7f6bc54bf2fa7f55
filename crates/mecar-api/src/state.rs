//! Application state for the bridge API

use std::collections::HashMap;
use std::sync::Arc;

use mecar_core::{Accessory, AccessoryError, Service};

use crate::error::HttpError;

/// Application state shared across all handlers
#[derive(Clone, Default)]
pub struct AppState {
    /// Map of accessory ID to accessory
    accessories: Arc<HashMap<String, Arc<Accessory>>>,
}

impl AppState {
    /// Create a new AppState from a set of accessories, keyed by their ID
    pub fn new(accessories: impl IntoIterator<Item = Arc<Accessory>>) -> Self {
        let accessories = accessories
            .into_iter()
            .map(|a| (a.id().to_string(), a))
            .collect();
        Self {
            accessories: Arc::new(accessories),
        }
    }

    /// Create AppState from a single accessory
    pub fn single(accessory: Arc<Accessory>) -> Self {
        Self::new([accessory])
    }

    /// Get an accessory by ID
    pub fn get_accessory(&self, accessory_id: &str) -> Result<&Arc<Accessory>, HttpError> {
        self.accessories
            .get(accessory_id)
            .ok_or_else(|| HttpError::NotFound(format!("Accessory not found: {}", accessory_id)))
    }

    /// All accessories, ordered by ID
    pub fn accessories(&self) -> Vec<&Arc<Accessory>> {
        let mut accessories: Vec<_> = self.accessories.values().collect();
        accessories.sort_by(|a, b| a.id().cmp(b.id()));
        accessories
    }

    /// Find a service on an accessory by subtype or (case-insensitive) name
    pub fn get_service(&self, accessory_id: &str, service: &str) -> Result<Arc<Service>, HttpError> {
        self.get_accessory(accessory_id)?
            .services()
            .into_iter()
            .find(|s| s.subtype() == Some(service) || s.name().eq_ignore_ascii_case(service))
            .ok_or_else(|| {
                AccessoryError::ServiceNotFound(format!("{} on {}", service, accessory_id)).into()
            })
    }
}
