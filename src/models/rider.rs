use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::Location;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum RiderStatus {
    Pending,
    Approved,
    Suspended,
}

/// Snapshot of a rider as reported by the rider registry. The engine reads it
/// for eligibility and only touches the active-assignment count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub location: Location,
    pub is_online: bool,
    pub status: RiderStatus,
    pub active_assignments: u8,
    pub updated_at: DateTime<Utc>,
}

impl Rider {
    pub fn is_eligible(&self, assignment_limit: u8) -> bool {
        self.is_online
            && self.status == RiderStatus::Approved
            && self.active_assignments < assignment_limit
    }
}
