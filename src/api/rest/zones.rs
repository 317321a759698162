use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::location::Location;
use crate::models::zone::{DeliveryZone, MAX_ZONE_BATCH_SIZE};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/zones", post(create_zone).get(list_zones))
        .route("/zones/:id/status", patch(toggle_zone_status))
}

#[derive(Deserialize)]
pub struct CreateZoneRequest {
    pub name: String,
    pub center: Location,
    pub radius_km: f64,
    pub max_batch_size: u8,
    pub max_batch_distance_km: f64,
    pub base_delivery_fee: f64,
    pub estimated_delivery_minutes: u32,
}

#[derive(Deserialize)]
pub struct ListZonesQuery {
    pub active: Option<bool>,
}

async fn create_zone(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateZoneRequest>,
) -> Result<Json<DeliveryZone>, DispatchError> {
    if payload.name.trim().is_empty() {
        return Err(DispatchError::BadRequest(
            "name cannot be empty".to_string(),
        ));
    }

    if !payload.center.has_fix() {
        return Err(DispatchError::BadRequest(
            "zone center requires coordinates".to_string(),
        ));
    }

    if payload.radius_km <= 0.0 {
        return Err(DispatchError::BadRequest(
            "radius must be > 0".to_string(),
        ));
    }

    if payload.max_batch_size == 0 || payload.max_batch_size > MAX_ZONE_BATCH_SIZE {
        return Err(DispatchError::BadRequest(format!(
            "max batch size must be between 1 and {MAX_ZONE_BATCH_SIZE}"
        )));
    }

    if payload.max_batch_distance_km <= 0.0 {
        return Err(DispatchError::BadRequest(
            "max batch distance must be > 0".to_string(),
        ));
    }

    if payload.base_delivery_fee < 0.0 {
        return Err(DispatchError::BadRequest(
            "base delivery fee cannot be negative".to_string(),
        ));
    }

    let now = Utc::now();
    let zone = DeliveryZone {
        id: Uuid::new_v4(),
        name: payload.name,
        center: payload.center,
        radius_km: payload.radius_km,
        max_batch_size: payload.max_batch_size,
        max_batch_distance_km: payload.max_batch_distance_km,
        base_delivery_fee: payload.base_delivery_fee,
        estimated_delivery_minutes: payload.estimated_delivery_minutes,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.zones.insert(zone.id, zone.clone());
    Ok(Json(zone))
}

async fn list_zones(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListZonesQuery>,
) -> Json<Vec<DeliveryZone>> {
    let zones = state
        .zones
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|zone| match query.active {
            Some(active) => zone.is_active == active,
            None => true,
        })
        .collect();

    Json(zones)
}

async fn toggle_zone_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryZone>, DispatchError> {
    let mut zone = state
        .zones
        .get_mut(&id)
        .ok_or_else(|| DispatchError::NotFound(format!("zone {} not found", id)))?;

    zone.is_active = !zone.is_active;
    zone.updated_at = Utc::now();

    Ok(Json(zone.clone()))
}
