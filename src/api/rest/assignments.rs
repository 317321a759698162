use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::coordinator;
use crate::engine::dispatch::{run_batching_pass, BatchOutcome};
use crate::error::DispatchError;
use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dispatch/run", post(run_pass))
        .route("/assignments", get(list_assignments))
        .route("/assignments/:id", get(get_assignment))
        .route("/assignments/:id/accept", post(accept_assignment))
        .route("/assignments/:id/pickup", post(mark_picked_up))
        .route("/assignments/:id/start-delivery", post(start_delivering))
        .route("/assignments/:id/deliver", post(mark_delivered))
        .route("/assignments/:id/cancel", post(cancel_assignment))
}

#[derive(Deserialize)]
pub struct RunPassQuery {
    pub zone_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ListAssignmentsQuery {
    pub rider_id: Option<Uuid>,
    pub status: Option<AssignmentStatus>,
    pub order_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct AcceptRequest {
    pub rider_id: Uuid,
}

#[derive(Deserialize)]
pub struct PickupRequest {
    pub order_id: Uuid,
}

#[derive(Deserialize)]
pub struct DeliverRequest {
    pub order_id: Uuid,
    pub proof_ref: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

async fn run_pass(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RunPassQuery>,
) -> Result<Json<Vec<BatchOutcome>>, DispatchError> {
    let outcomes = run_batching_pass(&state, query.zone_id)?;
    Ok(Json(outcomes))
}

async fn list_assignments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAssignmentsQuery>,
) -> Json<Vec<Assignment>> {
    let assignments = state
        .assignments
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|assignment| match query.rider_id {
            Some(rider_id) => assignment.rider_id == rider_id,
            None => true,
        })
        .filter(|assignment| match query.status {
            Some(status) => assignment.status == status,
            None => true,
        })
        .filter(|assignment| match query.order_id {
            Some(order_id) => assignment.contains_order(order_id),
            None => true,
        })
        .collect();

    Json(assignments)
}

async fn get_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, DispatchError> {
    let assignment = state
        .assignments
        .get(&id)
        .ok_or_else(|| DispatchError::NotFound(format!("assignment {} not found", id)))?;

    Ok(Json(assignment.value().clone()))
}

async fn accept_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptRequest>,
) -> Result<Json<Assignment>, DispatchError> {
    let assignment = coordinator::accept(&state, id, payload.rider_id)?;
    Ok(Json(assignment))
}

async fn mark_picked_up(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PickupRequest>,
) -> Result<Json<Assignment>, DispatchError> {
    let assignment = coordinator::mark_picked_up(&state, id, payload.order_id)?;
    Ok(Json(assignment))
}

async fn start_delivering(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, DispatchError> {
    let assignment = coordinator::start_delivering(&state, id)?;
    Ok(Json(assignment))
}

async fn mark_delivered(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeliverRequest>,
) -> Result<Json<Assignment>, DispatchError> {
    let assignment =
        coordinator::mark_delivered(&state, id, payload.order_id, payload.proof_ref)?;
    Ok(Json(assignment))
}

async fn cancel_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<Assignment>, DispatchError> {
    let reason = payload.reason.as_deref().unwrap_or("no reason provided");
    let assignment = coordinator::cancel(&state, id, reason).await?;
    Ok(Json(assignment))
}
