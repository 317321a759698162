use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum AssignmentType {
    Single,
    Batch,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum AssignmentStatus {
    Assigned,
    Accepted,
    PickedUp,
    Delivering,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Accepted => "accepted",
            AssignmentStatus::PickedUp => "picked_up",
            AssignmentStatus::Delivering => "delivering",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Completed | AssignmentStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LegStatus {
    Assigned,
    PickedUp,
    Delivered,
}

/// One order's slice of an assignment: its place in the pickup and delivery
/// visitation plan plus its own monotonic progress state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLeg {
    pub order_id: Uuid,
    pub pickup_sequence: u32,
    pub delivery_sequence: u32,
    pub status: LegStatus,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub proof_ref: Option<String>,
}

impl OrderLeg {
    pub fn new(order_id: Uuid, pickup_sequence: u32, delivery_sequence: u32) -> Self {
        Self {
            order_id,
            pickup_sequence,
            delivery_sequence,
            status: LegStatus::Assigned,
            picked_up_at: None,
            delivered_at: None,
            proof_ref: None,
        }
    }
}

/// The durable unit of work binding a batch (or single order) to one rider.
///
/// Status flow: assigned -> accepted -> picked_up -> delivering -> completed,
/// with cancelled reachable from assigned/accepted only, and only while no leg
/// has been picked up. Terminal assignments are immutable history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub assignment_type: AssignmentType,
    pub rider_id: Uuid,
    pub status: AssignmentStatus,
    pub legs: Vec<OrderLeg>,
    pub total_delivery_fee: f64,
    pub rider_earnings: f64,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivering_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Assignment {
    pub fn new(
        rider_id: Uuid,
        legs: Vec<OrderLeg>,
        total_delivery_fee: f64,
        rider_earnings: f64,
    ) -> Self {
        let assignment_type = if legs.len() > 1 {
            AssignmentType::Batch
        } else {
            AssignmentType::Single
        };

        Self {
            id: Uuid::new_v4(),
            assignment_type,
            rider_id,
            status: AssignmentStatus::Assigned,
            legs,
            total_delivery_fee,
            rider_earnings,
            created_at: Utc::now(),
            accepted_at: None,
            picked_up_at: None,
            delivering_at: None,
            completed_at: None,
            cancelled_at: None,
            notes: None,
        }
    }

    pub fn order_ids(&self) -> Vec<Uuid> {
        self.legs.iter().map(|leg| leg.order_id).collect()
    }

    pub fn contains_order(&self, order_id: Uuid) -> bool {
        self.legs.iter().any(|leg| leg.order_id == order_id)
    }

    pub fn all_picked_up(&self) -> bool {
        self.legs
            .iter()
            .all(|leg| leg.status != LegStatus::Assigned)
    }

    pub fn all_delivered(&self) -> bool {
        self.legs
            .iter()
            .all(|leg| leg.status == LegStatus::Delivered)
    }

    fn any_picked_up(&self) -> bool {
        self.legs
            .iter()
            .any(|leg| leg.status != LegStatus::Assigned)
    }

    fn leg_mut(&mut self, order_id: Uuid) -> Result<&mut OrderLeg, DispatchError> {
        self.legs
            .iter_mut()
            .find(|leg| leg.order_id == order_id)
            .ok_or_else(|| {
                DispatchError::NotFound(format!("order {order_id} is not part of this assignment"))
            })
    }

    pub fn accept(&mut self, rider_id: Uuid) -> Result<(), DispatchError> {
        if rider_id != self.rider_id {
            return Err(DispatchError::InvalidTransition(
                "only the assigned rider can accept".to_string(),
            ));
        }

        match self.status {
            AssignmentStatus::Assigned => {
                self.status = AssignmentStatus::Accepted;
                self.accepted_at = Some(Utc::now());
                Ok(())
            }
            status => Err(DispatchError::InvalidTransition(format!(
                "cannot accept an assignment in status {}",
                status.as_str()
            ))),
        }
    }

    /// Marks one order picked up. Retrying an already-picked-up order is a
    /// no-op, not an error.
    pub fn mark_picked_up(&mut self, order_id: Uuid) -> Result<(), DispatchError> {
        match self.status {
            AssignmentStatus::Accepted | AssignmentStatus::PickedUp => {}
            status => {
                return Err(DispatchError::InvalidTransition(format!(
                    "cannot mark pickup in status {}",
                    status.as_str()
                )));
            }
        }

        let leg = self.leg_mut(order_id)?;
        match leg.status {
            LegStatus::Assigned => {
                leg.status = LegStatus::PickedUp;
                leg.picked_up_at = Some(Utc::now());
            }
            LegStatus::PickedUp => return Ok(()),
            LegStatus::Delivered => {
                return Err(DispatchError::InvalidTransition(
                    "order is already delivered".to_string(),
                ));
            }
        }

        if self.all_picked_up() {
            self.status = AssignmentStatus::PickedUp;
            self.picked_up_at = Some(Utc::now());
        }

        Ok(())
    }

    /// Confirms physical departure from the pharmacy; requires every leg to
    /// be picked up first.
    pub fn start_delivering(&mut self) -> Result<(), DispatchError> {
        match self.status {
            AssignmentStatus::PickedUp => {
                self.status = AssignmentStatus::Delivering;
                self.delivering_at = Some(Utc::now());
                Ok(())
            }
            status => Err(DispatchError::InvalidTransition(format!(
                "cannot start delivering in status {}, all orders must be picked up first",
                status.as_str()
            ))),
        }
    }

    pub fn mark_delivered(
        &mut self,
        order_id: Uuid,
        proof_ref: Option<String>,
    ) -> Result<(), DispatchError> {
        match self.status {
            AssignmentStatus::Delivering => {}
            status => {
                return Err(DispatchError::InvalidTransition(format!(
                    "cannot mark delivery in status {}",
                    status.as_str()
                )));
            }
        }

        let leg = self.leg_mut(order_id)?;
        match leg.status {
            LegStatus::PickedUp => {
                leg.status = LegStatus::Delivered;
                leg.delivered_at = Some(Utc::now());
                leg.proof_ref = proof_ref;
            }
            LegStatus::Delivered => return Ok(()),
            LegStatus::Assigned => {
                return Err(DispatchError::InvalidTransition(
                    "order was never picked up".to_string(),
                ));
            }
        }

        if self.all_delivered() {
            self.status = AssignmentStatus::Completed;
            self.completed_at = Some(Utc::now());
        }

        Ok(())
    }

    /// Valid only before any pickup: a partially collected batch cannot be
    /// unwound through this API.
    pub fn cancel(&mut self, reason: &str) -> Result<(), DispatchError> {
        match self.status {
            AssignmentStatus::Assigned | AssignmentStatus::Accepted => {}
            status => {
                return Err(DispatchError::InvalidTransition(format!(
                    "cannot cancel an assignment in status {}",
                    status.as_str()
                )));
            }
        }

        if self.any_picked_up() {
            return Err(DispatchError::InvalidTransition(
                "cannot cancel after pickup has started".to_string(),
            ));
        }

        self.status = AssignmentStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
        self.notes = Some(reason.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{Assignment, AssignmentStatus, AssignmentType, LegStatus, OrderLeg};

    fn batch_assignment(orders: usize) -> Assignment {
        let legs = (0..orders)
            .map(|i| OrderLeg::new(Uuid::from_u128(i as u128 + 1), i as u32 + 1, i as u32 + 1))
            .collect();
        Assignment::new(Uuid::from_u128(99), legs, 10.0, 8.0)
    }

    #[test]
    fn single_order_assignment_has_single_type() {
        let assignment = batch_assignment(1);
        assert_eq!(assignment.assignment_type, AssignmentType::Single);

        let assignment = batch_assignment(3);
        assert_eq!(assignment.assignment_type, AssignmentType::Batch);
    }

    #[test]
    fn accept_requires_bound_rider() {
        let mut assignment = batch_assignment(1);
        assert!(assignment.accept(Uuid::from_u128(7)).is_err());
        assert_eq!(assignment.status, AssignmentStatus::Assigned);

        assignment.accept(Uuid::from_u128(99)).unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Accepted);
        assert!(assignment.accepted_at.is_some());
    }

    #[test]
    fn accept_twice_is_rejected() {
        let mut assignment = batch_assignment(1);
        assignment.accept(Uuid::from_u128(99)).unwrap();
        assert!(assignment.accept(Uuid::from_u128(99)).is_err());
    }

    #[test]
    fn pickup_before_accept_is_rejected() {
        let mut assignment = batch_assignment(2);
        assert!(assignment.mark_picked_up(Uuid::from_u128(1)).is_err());
    }

    #[test]
    fn partial_pickup_keeps_assignment_accepted() {
        let mut assignment = batch_assignment(2);
        assignment.accept(Uuid::from_u128(99)).unwrap();

        assignment.mark_picked_up(Uuid::from_u128(1)).unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Accepted);
        assert_eq!(assignment.legs[0].status, LegStatus::PickedUp);

        assignment.mark_picked_up(Uuid::from_u128(2)).unwrap();
        assert_eq!(assignment.status, AssignmentStatus::PickedUp);
        assert!(assignment.picked_up_at.is_some());
    }

    #[test]
    fn pickup_is_idempotent() {
        let mut assignment = batch_assignment(2);
        assignment.accept(Uuid::from_u128(99)).unwrap();
        assignment.mark_picked_up(Uuid::from_u128(1)).unwrap();

        let first_stamp = assignment.legs[0].picked_up_at;
        assignment.mark_picked_up(Uuid::from_u128(1)).unwrap();

        assert_eq!(assignment.legs[0].picked_up_at, first_stamp);
        assert_eq!(assignment.legs[0].status, LegStatus::PickedUp);
        assert_eq!(assignment.status, AssignmentStatus::Accepted);
    }

    #[test]
    fn delivery_requires_start_delivering() {
        let mut assignment = batch_assignment(1);
        assignment.accept(Uuid::from_u128(99)).unwrap();
        assignment.mark_picked_up(Uuid::from_u128(1)).unwrap();

        assert!(assignment.mark_delivered(Uuid::from_u128(1), None).is_err());

        assignment.start_delivering().unwrap();
        assignment
            .mark_delivered(Uuid::from_u128(1), Some("photo-1".to_string()))
            .unwrap();

        assert_eq!(assignment.status, AssignmentStatus::Completed);
        assert_eq!(assignment.legs[0].proof_ref.as_deref(), Some("photo-1"));
        assert!(assignment.completed_at.is_some());
    }

    #[test]
    fn start_delivering_requires_all_pickups() {
        let mut assignment = batch_assignment(2);
        assignment.accept(Uuid::from_u128(99)).unwrap();
        assignment.mark_picked_up(Uuid::from_u128(1)).unwrap();

        assert!(assignment.start_delivering().is_err());
    }

    #[test]
    fn completion_waits_for_every_leg() {
        let mut assignment = batch_assignment(2);
        assignment.accept(Uuid::from_u128(99)).unwrap();
        assignment.mark_picked_up(Uuid::from_u128(1)).unwrap();
        assignment.mark_picked_up(Uuid::from_u128(2)).unwrap();
        assignment.start_delivering().unwrap();

        assignment
            .mark_delivered(Uuid::from_u128(1), None)
            .unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Delivering);

        assignment
            .mark_delivered(Uuid::from_u128(2), None)
            .unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Completed);
    }

    #[test]
    fn cancel_before_pickup_releases_assignment() {
        let mut assignment = batch_assignment(2);
        assignment.cancel("pharmacy closed").unwrap();

        assert_eq!(assignment.status, AssignmentStatus::Cancelled);
        assert_eq!(assignment.notes.as_deref(), Some("pharmacy closed"));
    }

    #[test]
    fn cancel_after_any_pickup_is_rejected() {
        let mut assignment = batch_assignment(2);
        assignment.accept(Uuid::from_u128(99)).unwrap();
        assignment.mark_picked_up(Uuid::from_u128(1)).unwrap();

        assert!(assignment.cancel("changed my mind").is_err());
        assert_eq!(assignment.status, AssignmentStatus::Accepted);
    }

    #[test]
    fn terminal_assignment_rejects_all_transitions() {
        let mut assignment = batch_assignment(1);
        assignment.cancel("test").unwrap();

        assert!(assignment.accept(Uuid::from_u128(99)).is_err());
        assert!(assignment.mark_picked_up(Uuid::from_u128(1)).is_err());
        assert!(assignment.start_delivering().is_err());
        assert!(assignment.mark_delivered(Uuid::from_u128(1), None).is_err());
        assert!(assignment.cancel("again").is_err());
    }
}
