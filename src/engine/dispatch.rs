use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::batching::{build_batches, BatchLimits};
use crate::engine::coordinator;
use crate::engine::queue::enqueue_ready;
use crate::error::DispatchError;
use crate::geo;
use crate::models::order::{OrderForBatching, OrderStatus};
use crate::models::zone::DeliveryZone;
use crate::state::AppState;

/// What one batching pass did with one batch: either the assignment it
/// created, or why the batch is still waiting.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub order_ids: Vec<Uuid>,
    pub assignment_id: Option<Uuid>,
    pub rider_id: Option<Uuid>,
    pub detail: Option<String>,
}

pub async fn run_dispatch_engine(state: Arc<AppState>, mut ready_rx: mpsc::Receiver<Uuid>) {
    info!("dispatch engine started");

    while let Some(order_id) = ready_rx.recv().await {
        state.metrics.orders_in_queue.dec();

        let start = Instant::now();
        match run_batching_pass(&state, None) {
            Ok(outcomes) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .dispatch_pass_latency_seconds
                    .with_label_values(&["success"])
                    .observe(elapsed);
                if !outcomes.is_empty() {
                    info!(batches = outcomes.len(), "batching pass finished");
                }
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .dispatch_pass_latency_seconds
                    .with_label_values(&["error"])
                    .observe(elapsed);
                error!(error = %err, "batching pass failed");
            }
        }

        let still_pending = state
            .orders
            .get(&order_id)
            .map(|order| order.status == OrderStatus::Pending)
            .unwrap_or(false);
        if still_pending {
            warn!(order_id = %order_id, "order not dispatched; re-queueing");
            sleep(Duration::from_millis(state.config.retry_delay_ms)).await;
            if let Err(err) = enqueue_ready(&state, order_id).await {
                error!(error = %err, order_id = %order_id, "failed to re-queue order");
            }
        }
    }

    warn!("dispatch engine stopped: queue channel closed");
}

/// One synchronous batching pass over the pending pool. Orders are grouped
/// under the first active zone containing their pickup point (orders outside
/// every zone use the global defaults), partitioned into batches, and each
/// batch is proposed to a rider.
pub fn run_batching_pass(
    state: &AppState,
    zone_id: Option<Uuid>,
) -> Result<Vec<BatchOutcome>, DispatchError> {
    let pending: Vec<OrderForBatching> = state
        .orders
        .iter()
        .filter(|entry| entry.value().status == OrderStatus::Pending)
        .map(|entry| entry.value().clone())
        .collect();

    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let mut groups: Vec<(BatchLimits, Vec<OrderForBatching>)> = Vec::new();

    match zone_id {
        Some(id) => {
            let zone = state
                .zones
                .get(&id)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| DispatchError::NotFound(format!("zone {id} not found")))?;

            let in_zone: Vec<OrderForBatching> = pending
                .into_iter()
                .filter(|order| geo::zone_contains(&zone, &order.pickup))
                .collect();

            // An inactive zone still scopes the pass geographically but its
            // limits no longer apply.
            let limits = if zone.is_active {
                BatchLimits::from_zone(&zone)
            } else {
                BatchLimits::from_defaults(&state.config)
            };
            groups.push((limits, in_zone));
        }
        None => {
            let mut zones: Vec<DeliveryZone> = state
                .zones
                .iter()
                .filter(|entry| entry.value().is_active)
                .map(|entry| entry.value().clone())
                .collect();
            zones.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

            let mut zoned: Vec<Vec<OrderForBatching>> = vec![Vec::new(); zones.len()];
            let mut unzoned: Vec<OrderForBatching> = Vec::new();
            for order in pending {
                match zones
                    .iter()
                    .position(|zone| geo::zone_contains(zone, &order.pickup))
                {
                    Some(index) => zoned[index].push(order),
                    None => unzoned.push(order),
                }
            }

            for (zone, orders) in zones.iter().zip(zoned) {
                if !orders.is_empty() {
                    groups.push((BatchLimits::from_zone(zone), orders));
                }
            }
            if !unzoned.is_empty() {
                groups.push((BatchLimits::from_defaults(&state.config), unzoned));
            }
        }
    }

    let mut outcomes = Vec::new();
    for (limits, orders) in groups {
        if orders.is_empty() {
            continue;
        }

        for batch in build_batches(orders, &limits) {
            state
                .metrics
                .batches_built_total
                .with_label_values(&[&batch.len().to_string()])
                .inc();

            let outcome = match coordinator::propose_assignment(state, &batch) {
                Ok(assignment) => BatchOutcome {
                    order_ids: batch.order_ids(),
                    assignment_id: Some(assignment.id),
                    rider_id: Some(assignment.rider_id),
                    detail: None,
                },
                Err(DispatchError::NoEligibleRider) => {
                    warn!(orders = batch.len(), "no eligible rider for batch");
                    state
                        .metrics
                        .assignments_total
                        .with_label_values(&["no_rider"])
                        .inc();
                    BatchOutcome {
                        order_ids: batch.order_ids(),
                        assignment_id: None,
                        rider_id: None,
                        detail: Some("no eligible rider".to_string()),
                    }
                }
                Err(err) => {
                    error!(error = %err, "failed to propose assignment for batch");
                    BatchOutcome {
                        order_ids: batch.order_ids(),
                        assignment_id: None,
                        rider_id: None,
                        detail: Some(err.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
    }

    Ok(outcomes)
}
