//! Characteristic read/write handlers
//!
//! Writes go through the characteristic's set handler, exactly like a write
//! issued by the host itself.

use axum::extract::{Path, State};
use axum::Json;
use mecar_core::{Characteristic, CharacteristicType, CharacteristicValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::HttpError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WriteCharacteristicRequest {
    pub value: serde_json::Value,
}

#[derive(Serialize)]
pub struct CharacteristicValueResponse {
    pub accessory: String,
    pub service: String,
    #[serde(rename = "type")]
    pub characteristic_type: CharacteristicType,
    pub value: CharacteristicValue,
}

/// Path parameters shared by both handlers
type CharacteristicPath = Path<(String, String, String)>;

fn lookup(
    state: &AppState,
    accessory_id: &str,
    service: &str,
    characteristic: &str,
) -> Result<(String, Arc<Characteristic>), HttpError> {
    let kind: CharacteristicType = characteristic
        .parse()
        .map_err(|_| HttpError::NotFound(format!("Unknown characteristic: {}", characteristic)))?;
    let service = state.get_service(accessory_id, service)?;
    let characteristic = service.characteristic(kind)?;
    Ok((service.name().to_string(), characteristic))
}

/// Convert a JSON value into a characteristic value without coercion
fn parse_value(value: &serde_json::Value) -> Result<CharacteristicValue, HttpError> {
    match value {
        serde_json::Value::Bool(b) => Ok(CharacteristicValue::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .map(CharacteristicValue::UInt)
            .ok_or_else(|| HttpError::BadRequest(format!("Value out of range: {}", n))),
        other => Err(HttpError::BadRequest(format!(
            "Expected a boolean or unsigned integer, got {}",
            other
        ))),
    }
}

/// GET /accessories/{accessory_id}/services/{service}/characteristics/{characteristic}
pub async fn read_characteristic(
    State(state): State<AppState>,
    Path((accessory_id, service, characteristic)): CharacteristicPath,
) -> Result<Json<CharacteristicValueResponse>, HttpError> {
    let (service, characteristic) = lookup(&state, &accessory_id, &service, &characteristic)?;

    Ok(Json(CharacteristicValueResponse {
        accessory: accessory_id,
        service,
        characteristic_type: characteristic.kind(),
        value: characteristic.value(),
    }))
}

/// PUT /accessories/{accessory_id}/services/{service}/characteristics/{characteristic}
/// Forward an external write to the characteristic's set handler
pub async fn write_characteristic(
    State(state): State<AppState>,
    Path((accessory_id, service, characteristic)): CharacteristicPath,
    Json(request): Json<WriteCharacteristicRequest>,
) -> Result<Json<CharacteristicValueResponse>, HttpError> {
    let (service, characteristic) = lookup(&state, &accessory_id, &service, &characteristic)?;
    let value = parse_value(&request.value)?;

    info!(
        accessory = %accessory_id,
        service = %service,
        characteristic = %characteristic.kind(),
        %value,
        "External characteristic write"
    );
    characteristic.set_value(value)?;

    Ok(Json(CharacteristicValueResponse {
        accessory: accessory_id,
        service,
        characteristic_type: characteristic.kind(),
        value: characteristic.value(),
    }))
}
