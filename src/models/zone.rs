use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::Location;

pub const MAX_ZONE_BATCH_SIZE: u8 = 5;

/// Operator-maintained delivery zone. When an order's pickup point falls in an
/// active zone, the zone's batching limits and base fee replace the global
/// defaults. An inactive zone contributes nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub id: Uuid,
    pub name: String,
    pub center: Location,
    pub radius_km: f64,
    pub max_batch_size: u8,
    pub max_batch_distance_km: f64,
    pub base_delivery_fee: f64,
    pub estimated_delivery_minutes: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
