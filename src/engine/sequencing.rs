use uuid::Uuid;

use crate::geo;
use crate::models::assignment::OrderLeg;
use crate::models::location::Location;
use crate::models::order::OrderForBatching;
use crate::models::rider::Rider;

/// Builds the pickup and delivery visitation plan for a batch.
///
/// Pickups group orders by pharmacy, groups in batch order, so a rider never
/// returns to a pharmacy they already left. Deliveries run nearest-neighbor
/// from the final pickup point, ties broken by order id.
pub fn plan_legs(orders: &[OrderForBatching]) -> Vec<OrderLeg> {
    let pickup_ids = pickup_order(orders);
    let start = pickup_ids
        .last()
        .and_then(|id| orders.iter().find(|order| order.id == *id))
        .map(|order| order.pickup)
        .unwrap_or_default();
    let delivery_ids = delivery_order(orders, &start);

    orders
        .iter()
        .map(|order| {
            let pickup_sequence = sequence_of(&pickup_ids, order.id);
            let delivery_sequence = sequence_of(&delivery_ids, order.id);
            OrderLeg::new(order.id, pickup_sequence, delivery_sequence)
        })
        .collect()
}

fn sequence_of(ids: &[Uuid], id: Uuid) -> u32 {
    ids.iter()
        .position(|candidate| *candidate == id)
        .map(|index| index as u32 + 1)
        .unwrap_or(0)
}

fn pickup_order(orders: &[OrderForBatching]) -> Vec<Uuid> {
    let mut pharmacies: Vec<Uuid> = Vec::new();
    for order in orders {
        if !pharmacies.contains(&order.pharmacy_id) {
            pharmacies.push(order.pharmacy_id);
        }
    }

    let mut sequence = Vec::with_capacity(orders.len());
    for pharmacy_id in &pharmacies {
        for order in orders {
            if order.pharmacy_id == *pharmacy_id {
                sequence.push(order.id);
            }
        }
    }
    sequence
}

fn delivery_order(orders: &[OrderForBatching], start: &Location) -> Vec<Uuid> {
    let mut remaining: Vec<&OrderForBatching> = orders.iter().collect();
    let mut current = *start;
    let mut sequence = Vec::with_capacity(orders.len());

    while !remaining.is_empty() {
        let mut best_index = 0;
        for index in 1..remaining.len() {
            if closer(&current, remaining[index], remaining[best_index]) {
                best_index = index;
            }
        }

        let next = remaining.remove(best_index);
        sequence.push(next.id);
        if next.delivery.has_fix() {
            current = next.delivery;
        }
    }

    sequence
}

// Members with an undefined distance sort after every reachable one; equal or
// both-undefined distances fall back to order id.
fn closer(from: &Location, candidate: &OrderForBatching, best: &OrderForBatching) -> bool {
    let candidate_distance = geo::distance_km(from, &candidate.delivery);
    let best_distance = geo::distance_km(from, &best.delivery);

    match (candidate_distance, best_distance) {
        (Some(c), Some(b)) => c < b || (c == b && candidate.id < best.id),
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => candidate.id < best.id,
    }
}

/// Picks the eligible rider closest to the batch's first pickup point. Riders
/// without a usable distance are skipped entirely; ties break by rider id.
pub fn select_rider(riders: &[Rider], pickup: &Location, assignment_limit: u8) -> Option<Rider> {
    riders
        .iter()
        .filter(|rider| rider.is_eligible(assignment_limit))
        .filter_map(|rider| {
            geo::distance_km(&rider.location, pickup).map(|distance| (rider, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.id.cmp(&b.0.id)))
        .map(|(rider, _)| rider.clone())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{plan_legs, select_rider};
    use crate::models::location::Location;
    use crate::models::order::{OrderForBatching, OrderStatus};
    use crate::models::rider::{Rider, RiderStatus};

    fn order(seed: u128, pharmacy: u128, delivery: Location) -> OrderForBatching {
        OrderForBatching {
            id: Uuid::from_u128(seed),
            pharmacy_id: Uuid::from_u128(pharmacy),
            pickup: Location::new(52.5200, 13.4050),
            delivery,
            delivery_fee: Some(4.0),
            ready_at: Utc::now(),
            status: OrderStatus::Pending,
            assignment_id: None,
        }
    }

    fn rider(seed: u128, location: Location, is_online: bool, status: RiderStatus) -> Rider {
        Rider {
            id: Uuid::from_u128(seed),
            name: format!("rider-{seed}"),
            location,
            is_online,
            status,
            active_assignments: 0,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn deliveries_run_nearest_neighbor_from_last_pickup() {
        // Pickup is at the base point; the near delivery must come before the
        // far one regardless of batch order.
        let far = order(1, 10, Location::new(52.5380, 13.4050));
        let near = order(2, 10, Location::new(52.5290, 13.4050));

        let legs = plan_legs(&[far.clone(), near.clone()]);

        let near_leg = legs.iter().find(|leg| leg.order_id == near.id).unwrap();
        let far_leg = legs.iter().find(|leg| leg.order_id == far.id).unwrap();

        assert_eq!(near_leg.delivery_sequence, 1);
        assert_eq!(far_leg.delivery_sequence, 2);
    }

    #[test]
    fn orders_sharing_a_pharmacy_pick_up_adjacently() {
        let a = order(1, 10, Location::new(52.5290, 13.4050));
        let b = order(2, 20, Location::new(52.5290, 13.4150));
        let c = order(3, 10, Location::new(52.5290, 13.4250));

        let legs = plan_legs(&[a, b, c]);

        let pickup_of = |seed: u128| {
            legs.iter()
                .find(|leg| leg.order_id == Uuid::from_u128(seed))
                .unwrap()
                .pickup_sequence
        };

        // Pharmacy 10 orders come first (1 then 3), pharmacy 20 follows.
        assert_eq!(pickup_of(1), 1);
        assert_eq!(pickup_of(3), 2);
        assert_eq!(pickup_of(2), 3);
    }

    #[test]
    fn equidistant_deliveries_tie_break_by_order_id() {
        let same_spot = Location::new(52.5290, 13.4050);
        let second = order(2, 10, same_spot);
        let first = order(1, 10, same_spot);

        let legs = plan_legs(&[second, first]);

        let leg_one = legs
            .iter()
            .find(|leg| leg.order_id == Uuid::from_u128(1))
            .unwrap();
        assert_eq!(leg_one.delivery_sequence, 1);
    }

    #[test]
    fn select_rider_prefers_nearest_eligible() {
        let pickup = Location::new(52.5200, 13.4050);
        let near = rider(1, Location::new(52.5210, 13.4060), true, RiderStatus::Approved);
        let far = rider(2, Location::new(52.6000, 13.5000), true, RiderStatus::Approved);

        let selected = select_rider(&[far, near.clone()], &pickup, 1).unwrap();
        assert_eq!(selected.id, near.id);
    }

    #[test]
    fn offline_rider_loses_to_farther_online_rider() {
        let pickup = Location::new(52.5200, 13.4050);
        let offline_near = rider(1, Location::new(52.5201, 13.4051), false, RiderStatus::Approved);
        let online_far = rider(2, Location::new(52.6000, 13.5000), true, RiderStatus::Approved);

        let selected = select_rider(&[offline_near, online_far.clone()], &pickup, 1).unwrap();
        assert_eq!(selected.id, online_far.id);
    }

    #[test]
    fn unapproved_and_saturated_riders_are_skipped() {
        let pickup = Location::new(52.5200, 13.4050);
        let unapproved = rider(1, Location::new(52.5201, 13.4051), true, RiderStatus::Pending);
        let mut saturated = rider(2, Location::new(52.5202, 13.4052), true, RiderStatus::Approved);
        saturated.active_assignments = 1;

        assert!(select_rider(&[unapproved, saturated], &pickup, 1).is_none());
    }

    #[test]
    fn rider_without_fix_is_never_selected() {
        let pickup = Location::new(52.5200, 13.4050);
        let lost = rider(1, Location::default(), true, RiderStatus::Approved);

        assert!(select_rider(&[lost], &pickup, 1).is_none());
    }
}
