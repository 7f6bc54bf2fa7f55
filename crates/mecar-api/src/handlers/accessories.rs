//! Accessory listing handlers

use axum::extract::{Path, State};
use axum::Json;
use mecar_core::{Accessory, CharacteristicType, CharacteristicValue, Service, ServiceType};
use serde::Serialize;

use crate::error::HttpError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct AccessoriesResponse {
    pub items: Vec<AccessoryResponse>,
}

#[derive(Serialize)]
pub struct AccessoryResponse {
    pub id: String,
    pub name: String,
    pub href: String,
    pub services: Vec<ServiceResponse>,
}

#[derive(Serialize)]
pub struct ServiceResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub characteristics: Vec<CharacteristicResponse>,
}

#[derive(Serialize)]
pub struct CharacteristicResponse {
    #[serde(rename = "type")]
    pub characteristic_type: CharacteristicType,
    pub value: CharacteristicValue,
    pub writable: bool,
}

impl From<&Service> for ServiceResponse {
    fn from(service: &Service) -> Self {
        Self {
            name: service.name().to_string(),
            service_type: service.service_type(),
            subtype: service.subtype().map(str::to_string),
            characteristics: service
                .characteristics()
                .iter()
                .map(|c| CharacteristicResponse {
                    characteristic_type: c.kind(),
                    value: c.value(),
                    writable: c.kind().writable(),
                })
                .collect(),
        }
    }
}

impl From<&Accessory> for AccessoryResponse {
    fn from(accessory: &Accessory) -> Self {
        Self {
            id: accessory.id().to_string(),
            name: accessory.display_name().to_string(),
            href: format!("/accessories/{}", accessory.id()),
            services: accessory
                .services()
                .iter()
                .map(|s| ServiceResponse::from(s.as_ref()))
                .collect(),
        }
    }
}

/// GET /accessories
/// List all accessories with their current values
pub async fn list_accessories(State(state): State<AppState>) -> Json<AccessoriesResponse> {
    let items = state
        .accessories()
        .into_iter()
        .map(|a| AccessoryResponse::from(a.as_ref()))
        .collect();

    Json(AccessoriesResponse { items })
}

/// GET /accessories/{accessory_id}
pub async fn get_accessory(
    State(state): State<AppState>,
    Path(accessory_id): Path<String>,
) -> Result<Json<AccessoryResponse>, HttpError> {
    let accessory = state.get_accessory(&accessory_id)?;
    Ok(Json(AccessoryResponse::from(accessory.as_ref())))
}
