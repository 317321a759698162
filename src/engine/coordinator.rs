use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::batching::Batch;
use crate::engine::queue::enqueue_ready;
use crate::engine::sequencing;
use crate::error::DispatchError;
use crate::geo;
use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::event::DispatchEvent;
use crate::models::location::Location;
use crate::models::order::OrderStatus;
use crate::models::rider::Rider;
use crate::state::AppState;

/// Turns a batch into a durable assignment bound to the nearest eligible
/// rider. The rider's map entry is the serialization point: the eligibility
/// re-check and the active-assignment increment happen under its lock, so two
/// racing proposals cannot both claim the same rider.
pub fn propose_assignment(state: &AppState, batch: &Batch) -> Result<Assignment, DispatchError> {
    check_batch_coherence(state, batch)?;

    let legs = sequencing::plan_legs(&batch.orders);
    let first_pickup = first_pickup_location(batch, &legs);

    let base_fee = base_fee_for(state, &first_pickup);
    let total_delivery_fee: f64 = batch
        .orders
        .iter()
        .map(|order| order.delivery_fee.unwrap_or(base_fee))
        .sum();
    let rider_earnings = total_delivery_fee * state.config.rider_fee_share;

    let candidates: Vec<Rider> = state
        .riders
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    let limit = state.config.rider_assignment_limit;
    let selected = sequencing::select_rider(&candidates, &first_pickup, limit)
        .ok_or(DispatchError::NoEligibleRider)?;

    {
        let mut rider = state
            .riders
            .get_mut(&selected.id)
            .ok_or(DispatchError::NoEligibleRider)?;
        if !rider.is_eligible(limit) {
            // Lost the race against a concurrent proposal.
            return Err(DispatchError::NoEligibleRider);
        }
        rider.active_assignments += 1;
        rider.updated_at = Utc::now();
        state
            .metrics
            .rider_active_assignments
            .with_label_values(&[&rider.id.to_string()])
            .set(rider.active_assignments as f64);
    }

    let assignment = Assignment::new(selected.id, legs, total_delivery_fee, rider_earnings);
    state.assignments.insert(assignment.id, assignment.clone());

    for order in &batch.orders {
        if let Some(mut entry) = state.orders.get_mut(&order.id) {
            entry.status = OrderStatus::Assigned;
            entry.assignment_id = Some(assignment.id);
        }
        let _ = state.events_tx.send(DispatchEvent::OrderAssigned {
            order_id: order.id,
            assignment_id: assignment.id,
        });
    }

    let _ = state.events_tx.send(DispatchEvent::AssignmentUpdated {
        assignment: assignment.clone(),
    });
    state
        .metrics
        .assignments_total
        .with_label_values(&["proposed"])
        .inc();

    info!(
        assignment_id = %assignment.id,
        rider_id = %selected.id,
        orders = assignment.legs.len(),
        total_fee = total_delivery_fee,
        "assignment proposed"
    );

    Ok(assignment)
}

pub fn accept(
    state: &AppState,
    assignment_id: Uuid,
    rider_id: Uuid,
) -> Result<Assignment, DispatchError> {
    let snapshot = {
        let mut entry = assignment_entry(state, assignment_id)?;
        entry.accept(rider_id)?;
        entry.clone()
    };

    let _ = state.events_tx.send(DispatchEvent::AssignmentUpdated {
        assignment: snapshot.clone(),
    });

    info!(assignment_id = %assignment_id, rider_id = %rider_id, "assignment accepted");
    Ok(snapshot)
}

pub fn mark_picked_up(
    state: &AppState,
    assignment_id: Uuid,
    order_id: Uuid,
) -> Result<Assignment, DispatchError> {
    let snapshot = {
        let mut entry = assignment_entry(state, assignment_id)?;
        entry.mark_picked_up(order_id)?;
        entry.clone()
    };

    let _ = state.events_tx.send(DispatchEvent::AssignmentUpdated {
        assignment: snapshot.clone(),
    });

    info!(
        assignment_id = %assignment_id,
        order_id = %order_id,
        status = snapshot.status.as_str(),
        "order picked up"
    );
    Ok(snapshot)
}

pub fn start_delivering(
    state: &AppState,
    assignment_id: Uuid,
) -> Result<Assignment, DispatchError> {
    let snapshot = {
        let mut entry = assignment_entry(state, assignment_id)?;
        entry.start_delivering()?;
        entry.clone()
    };

    let _ = state.events_tx.send(DispatchEvent::AssignmentUpdated {
        assignment: snapshot.clone(),
    });

    info!(assignment_id = %assignment_id, "delivery started");
    Ok(snapshot)
}

pub fn mark_delivered(
    state: &AppState,
    assignment_id: Uuid,
    order_id: Uuid,
    proof_ref: Option<String>,
) -> Result<Assignment, DispatchError> {
    let (snapshot, just_completed) = {
        let mut entry = assignment_entry(state, assignment_id)?;
        let before = entry.status;
        entry.mark_delivered(order_id, proof_ref)?;
        let after = entry.status;
        (
            entry.clone(),
            before != AssignmentStatus::Completed && after == AssignmentStatus::Completed,
        )
    };

    if just_completed {
        complete_assignment(state, &snapshot);
    }

    let _ = state.events_tx.send(DispatchEvent::AssignmentUpdated {
        assignment: snapshot.clone(),
    });

    info!(
        assignment_id = %assignment_id,
        order_id = %order_id,
        status = snapshot.status.as_str(),
        "order delivered"
    );
    Ok(snapshot)
}

pub async fn cancel(
    state: &AppState,
    assignment_id: Uuid,
    reason: &str,
) -> Result<Assignment, DispatchError> {
    let snapshot = {
        let mut entry = assignment_entry(state, assignment_id)?;
        entry.cancel(reason)?;
        entry.clone()
    };

    release_rider(state, snapshot.rider_id);

    // Every member order returns to the batchable pool and is re-queued.
    for leg in &snapshot.legs {
        if let Some(mut order) = state.orders.get_mut(&leg.order_id) {
            order.status = OrderStatus::Pending;
            order.assignment_id = None;
        }
        let _ = state.events_tx.send(DispatchEvent::OrderReleased {
            order_id: leg.order_id,
        });
        enqueue_ready(state, leg.order_id).await?;
    }

    let _ = state.events_tx.send(DispatchEvent::AssignmentUpdated {
        assignment: snapshot.clone(),
    });
    state
        .metrics
        .assignments_total
        .with_label_values(&["cancelled"])
        .inc();

    info!(assignment_id = %assignment_id, reason, "assignment cancelled");
    Ok(snapshot)
}

fn complete_assignment(state: &AppState, assignment: &Assignment) {
    release_rider(state, assignment.rider_id);

    for leg in &assignment.legs {
        if let Some(mut order) = state.orders.get_mut(&leg.order_id) {
            order.status = OrderStatus::Delivered;
        }
        let _ = state.events_tx.send(DispatchEvent::OrderDelivered {
            order_id: leg.order_id,
            proof_ref: leg.proof_ref.clone(),
        });
    }

    state
        .metrics
        .assignments_total
        .with_label_values(&["completed"])
        .inc();

    info!(
        assignment_id = %assignment.id,
        rider_id = %assignment.rider_id,
        earnings = assignment.rider_earnings,
        "assignment completed"
    );
}

fn release_rider(state: &AppState, rider_id: Uuid) {
    if let Some(mut rider) = state.riders.get_mut(&rider_id) {
        rider.active_assignments = rider.active_assignments.saturating_sub(1);
        rider.updated_at = Utc::now();
        state
            .metrics
            .rider_active_assignments
            .with_label_values(&[&rider_id.to_string()])
            .set(rider.active_assignments as f64);
    }
}

fn assignment_entry<'a>(
    state: &'a AppState,
    assignment_id: Uuid,
) -> Result<dashmap::mapref::one::RefMut<'a, Uuid, Assignment>, DispatchError> {
    state
        .assignments
        .get_mut(&assignment_id)
        .ok_or_else(|| DispatchError::NotFound(format!("assignment {assignment_id} not found")))
}

fn check_batch_coherence(state: &AppState, batch: &Batch) -> Result<(), DispatchError> {
    if batch.is_empty() {
        return Err(DispatchError::IncoherentBatch("batch is empty".to_string()));
    }

    let mut ids = batch.order_ids();
    ids.sort();
    ids.dedup();
    if ids.len() != batch.len() {
        return Err(DispatchError::IncoherentBatch(
            "batch contains duplicate orders".to_string(),
        ));
    }

    for order in &batch.orders {
        match state.orders.get(&order.id) {
            Some(current) if current.status == OrderStatus::Pending => {}
            Some(current) => {
                return Err(DispatchError::IncoherentBatch(format!(
                    "order {} is no longer pending ({:?})",
                    order.id, current.status
                )));
            }
            None => {
                return Err(DispatchError::IncoherentBatch(format!(
                    "order {} is unknown",
                    order.id
                )));
            }
        }
    }

    Ok(())
}

fn first_pickup_location(batch: &Batch, legs: &[crate::models::assignment::OrderLeg]) -> Location {
    legs.iter()
        .find(|leg| leg.pickup_sequence == 1)
        .and_then(|leg| batch.orders.iter().find(|order| order.id == leg.order_id))
        .map(|order| order.pickup)
        .unwrap_or_default()
}

fn base_fee_for(state: &AppState, pickup: &Location) -> f64 {
    state
        .zones
        .iter()
        .filter(|entry| entry.value().is_active)
        .filter(|entry| geo::zone_contains(entry.value(), pickup))
        .map(|entry| entry.value().base_delivery_fee)
        .next()
        .unwrap_or(state.config.default_base_delivery_fee)
}
