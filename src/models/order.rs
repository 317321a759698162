use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::Location;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum OrderStatus {
    Pending,
    Assigned,
    Delivered,
    Cancelled,
}

/// Projection of an order that has reached "ready for pickup". The engine
/// only moves it between the batching pool and an assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderForBatching {
    pub id: Uuid,
    pub pharmacy_id: Uuid,
    pub pickup: Location,
    pub delivery: Location,
    pub delivery_fee: Option<f64>,
    pub ready_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub assignment_id: Option<Uuid>,
}
