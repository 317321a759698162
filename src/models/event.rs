use serde::Serialize;
use uuid::Uuid;

use crate::models::assignment::Assignment;

/// Notifications the dispatch core emits toward the owning order and rider
/// services. Broadcast in-process and streamed out over the websocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    OrderAssigned {
        order_id: Uuid,
        assignment_id: Uuid,
    },
    OrderReleased {
        order_id: Uuid,
    },
    OrderDelivered {
        order_id: Uuid,
        proof_ref: Option<String>,
    },
    AssignmentUpdated {
        assignment: Assignment,
    },
}
