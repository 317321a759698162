use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::location::Location;
use crate::models::rider::{Rider, RiderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", post(create_rider).get(list_riders))
        .route("/riders/:id/location", patch(update_rider_location))
        .route("/riders/:id/status", patch(update_rider_status))
}

#[derive(Deserialize)]
pub struct CreateRiderRequest {
    pub name: String,
    pub location: Location,
    #[serde(default = "default_online")]
    pub is_online: bool,
    #[serde(default = "default_status")]
    pub status: RiderStatus,
}

fn default_online() -> bool {
    true
}

fn default_status() -> RiderStatus {
    RiderStatus::Approved
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: Location,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub is_online: Option<bool>,
    pub status: Option<RiderStatus>,
}

async fn create_rider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRiderRequest>,
) -> Result<Json<Rider>, DispatchError> {
    if payload.name.trim().is_empty() {
        return Err(DispatchError::BadRequest(
            "name cannot be empty".to_string(),
        ));
    }

    let rider = Rider {
        id: Uuid::new_v4(),
        name: payload.name,
        location: payload.location,
        is_online: payload.is_online,
        status: payload.status,
        active_assignments: 0,
        updated_at: Utc::now(),
    };

    state.riders.insert(rider.id, rider.clone());
    Ok(Json(rider))
}

async fn list_riders(State(state): State<Arc<AppState>>) -> Json<Vec<Rider>> {
    let riders = state
        .riders
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(riders)
}

async fn update_rider_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Rider>, DispatchError> {
    let mut rider = state
        .riders
        .get_mut(&id)
        .ok_or_else(|| DispatchError::NotFound(format!("rider {} not found", id)))?;

    rider.location = payload.location;
    rider.updated_at = Utc::now();

    Ok(Json(rider.clone()))
}

async fn update_rider_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Rider>, DispatchError> {
    let mut rider = state
        .riders
        .get_mut(&id)
        .ok_or_else(|| DispatchError::NotFound(format!("rider {} not found", id)))?;

    if let Some(is_online) = payload.is_online {
        rider.is_online = is_online;
    }
    if let Some(status) = payload.status {
        rider.status = status;
    }
    rider.updated_at = Utc::now();

    Ok(Json(rider.clone()))
}
