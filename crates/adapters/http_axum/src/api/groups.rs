//! JSON handlers for groups.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use glowhub_domain::device::Device;
use glowhub_domain::error::{GlowHubError, NotFoundError};
use glowhub_domain::group::Group;
use glowhub_domain::id::GroupId;
use glowhub_domain::property::Property;

use super::devices::{SetPropertyRequest, parse_device_id};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating a group.
#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Group>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and membership endpoints.
pub enum GetResponse {
    Ok(Json<Group>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Group>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
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

/// Possible responses from the group property endpoint.
pub enum SetPropertyResponse {
    Ok(Json<Vec<Device>>),
}

impl IntoResponse for SetPropertyResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

// a malformed id cannot name an existing group
fn parse_group_id(raw: &str) -> Result<GroupId, ApiError> {
    GroupId::from_str(raw).map_err(|_| {
        ApiError::from(GlowHubError::from(NotFoundError {
            entity: "Group",
            id: raw.to_string(),
        }))
    })
}

/// `GET /api/groups`
pub async fn list(State(state): State<AppState>) -> ListResponse {
    ListResponse::Ok(Json(state.group_service.list_groups()))
}

/// `POST /api/groups`
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<CreateResponse, ApiError> {
    let mut builder = Group::builder().name(req.name);
    for member in &req.members {
        builder = builder.member(parse_device_id(member)?);
    }
    let group = state.group_service.create_group(builder.build()?)?;
    Ok(CreateResponse::Created(Json(group)))
}

/// `GET /api/groups/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError> {
    let group = state.group_service.get_group(parse_group_id(&id)?)?;
    Ok(GetResponse::Ok(Json(group)))
}

/// `DELETE /api/groups/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError> {
    state.group_service.delete_group(parse_group_id(&id)?)?;
    Ok(DeleteResponse::NoContent)
}

/// `PUT /api/groups/{id}/members/{device_id}`
pub async fn add_member(
    State(state): State<AppState>,
    Path((id, device_id)): Path<(String, String)>,
) -> Result<GetResponse, ApiError> {
    let group = state
        .group_service
        .add_member(parse_group_id(&id)?, parse_device_id(&device_id)?)?;
    Ok(GetResponse::Ok(Json(group)))
}

/// `DELETE /api/groups/{id}/members/{device_id}`
pub async fn remove_member(
    State(state): State<AppState>,
    Path((id, device_id)): Path<(String, String)>,
) -> Result<GetResponse, ApiError> {
    let group = state
        .group_service
        .remove_member(parse_group_id(&id)?, &parse_device_id(&device_id)?)?;
    Ok(GetResponse::Ok(Json(group)))
}

/// `PUT /api/groups/{id}/properties/{property}`
pub async fn set_property(
    State(state): State<AppState>,
    Path((id, property)): Path<(String, String)>,
    Json(req): Json<SetPropertyRequest>,
) -> Result<SetPropertyResponse, ApiError> {
    let group_id = parse_group_id(&id)?;
    let property = Property::from_str(&property).map_err(GlowHubError::from)?;
    let devices = state
        .group_service
        .set_property(group_id, property, req.value)?;
    Ok(SetPropertyResponse::Ok(Json(devices)))
}
