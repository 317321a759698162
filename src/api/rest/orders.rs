use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::queue::enqueue_ready;
use crate::error::DispatchError;
use crate::models::location::Location;
use crate::models::order::{OrderForBatching, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub pharmacy_id: Uuid,
    pub pickup: Location,
    pub delivery: Location,
    pub delivery_fee: Option<f64>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<OrderForBatching>, DispatchError> {
    if !payload.pickup.has_fix() {
        return Err(DispatchError::BadRequest(
            "pickup location requires coordinates".to_string(),
        ));
    }

    if let Some(fee) = payload.delivery_fee {
        if fee < 0.0 {
            return Err(DispatchError::BadRequest(
                "delivery fee cannot be negative".to_string(),
            ));
        }
    }

    let order = OrderForBatching {
        id: Uuid::new_v4(),
        pharmacy_id: payload.pharmacy_id,
        pickup: payload.pickup,
        delivery: payload.delivery,
        delivery_fee: payload.delivery_fee,
        ready_at: Utc::now(),
        status: OrderStatus::Pending,
        assignment_id: None,
    };

    state.orders.insert(order.id, order.clone());
    enqueue_ready(&state, order.id).await?;

    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderForBatching>, DispatchError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| DispatchError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order.value().clone()))
}

async fn list_orders(State(state): State<Arc<AppState>>) -> Json<Vec<OrderForBatching>> {
    let orders = state
        .orders
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    Json(orders)
}
