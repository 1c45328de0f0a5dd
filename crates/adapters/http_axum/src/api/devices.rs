//! JSON handlers for devices.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use glowhub_domain::device::Device;
use glowhub_domain::error::{GlowHubError, NotFoundError};
use glowhub_domain::id::DeviceId;
use glowhub_domain::property::{Property, PropertyValue};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for a property write.
#[derive(Deserialize)]
pub struct SetPropertyRequest {
    pub value: PropertyValue,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Device>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and property endpoints.
pub enum GetResponse {
    Ok(Json<Device>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

pub(crate) fn parse_device_id(raw: &str) -> Result<DeviceId, ApiError> {
    DeviceId::from_str(raw).map_err(|err| ApiError::from(GlowHubError::from(err)))
}

/// `GET /api/devices`
pub async fn list(State(state): State<AppState>) -> ListResponse {
    ListResponse::Ok(Json(state.registry.list()))
}

/// `GET /api/devices/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError> {
    let device_id = parse_device_id(&id)?;
    let device = state.registry.get(&device_id)?;
    Ok(GetResponse::Ok(Json(device)))
}

/// `DELETE /api/devices/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError> {
    let device_id = parse_device_id(&id)?;
    state.registry.remove(&device_id).ok_or_else(|| {
        ApiError::from(GlowHubError::from(NotFoundError {
            entity: "Device",
            id: device_id.to_string(),
        }))
    })?;
    Ok(DeleteResponse::NoContent)
}

/// `PUT /api/devices/{id}/properties/{property}`
pub async fn set_property(
    State(state): State<AppState>,
    Path((id, property)): Path<(String, String)>,
    Json(req): Json<SetPropertyRequest>,
) -> Result<GetResponse, ApiError> {
    let device_id = parse_device_id(&id)?;
    let property = Property::from_str(&property).map_err(GlowHubError::from)?;
    let device = state.registry.set_property(&device_id, property, req.value)?;
    Ok(GetResponse::Ok(Json(device)))
}
