use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::geo;
use crate::models::order::OrderForBatching;
use crate::models::zone::DeliveryZone;

/// Effective batching constraints for one pass: taken from an active zone, or
/// from the global defaults when no zone applies.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub max_batch_size: usize,
    pub max_distance_km: f64,
}

impl BatchLimits {
    pub fn from_zone(zone: &DeliveryZone) -> Self {
        Self {
            max_batch_size: zone.max_batch_size as usize,
            max_distance_km: zone.max_batch_distance_km,
        }
    }

    pub fn from_defaults(config: &Config) -> Self {
        Self {
            max_batch_size: config.default_max_batch_size as usize,
            max_distance_km: config.default_max_batch_distance_km,
        }
    }
}

/// A transient grouping of orders for one delivery run. Only becomes durable
/// once the coordinator turns it into an assignment.
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    pub orders: Vec<OrderForBatching>,
}

impl Batch {
    pub fn order_ids(&self) -> Vec<Uuid> {
        self.orders.iter().map(|order| order.id).collect()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Greedy proximity clustering. Always returns a full partition of the input:
/// every candidate lands in exactly one batch, solo when nothing compatible
/// remains. Oldest orders open batches first.
///
/// The distance check is pairwise against every current member, not against a
/// centroid: A-B close and B-C close does not admit C when A-C is far.
pub fn build_batches(mut candidates: Vec<OrderForBatching>, limits: &BatchLimits) -> Vec<Batch> {
    candidates.sort_by(|a, b| a.ready_at.cmp(&b.ready_at).then(a.id.cmp(&b.id)));

    let mut placed = vec![false; candidates.len()];
    let mut batches = Vec::new();

    for i in 0..candidates.len() {
        if placed[i] {
            continue;
        }
        placed[i] = true;

        let mut members = vec![candidates[i].clone()];

        // An order without delivery coordinates can never pass a pairwise
        // check, so it rides alone.
        if candidates[i].delivery.has_fix() {
            for j in (i + 1)..candidates.len() {
                if placed[j] {
                    continue;
                }
                if members.len() >= limits.max_batch_size {
                    break;
                }
                if joins_batch(&members, &candidates[j], limits.max_distance_km) {
                    placed[j] = true;
                    members.push(candidates[j].clone());
                }
            }
        }

        batches.push(Batch { orders: members });
    }

    batches
}

fn joins_batch(members: &[OrderForBatching], candidate: &OrderForBatching, max_km: f64) -> bool {
    members.iter().all(|member| {
        matches!(
            geo::distance_km(&member.delivery, &candidate.delivery),
            Some(distance) if distance <= max_km
        )
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{build_batches, BatchLimits};
    use crate::models::location::Location;
    use crate::models::order::{OrderForBatching, OrderStatus};

    const LIMITS: BatchLimits = BatchLimits {
        max_batch_size: 3,
        max_distance_km: 2.0,
    };

    // 0.009 degrees of latitude is roughly one kilometre.
    fn order(seed: u128, ready_offset_secs: i64, delivery: Location) -> OrderForBatching {
        OrderForBatching {
            id: Uuid::from_u128(seed),
            pharmacy_id: Uuid::from_u128(1000),
            pickup: Location::new(52.5200, 13.4050),
            delivery,
            delivery_fee: Some(4.0),
            ready_at: Utc::now() + Duration::seconds(ready_offset_secs),
            status: OrderStatus::Pending,
            assignment_id: None,
        }
    }

    #[test]
    fn output_partitions_the_input() {
        let orders = vec![
            order(1, 0, Location::new(52.5200, 13.4050)),
            order(2, 1, Location::new(52.5290, 13.4050)),
            order(3, 2, Location::new(52.7000, 13.9000)),
            order(4, 3, Location::default()),
        ];

        let batches = build_batches(orders.clone(), &LIMITS);

        let mut seen: Vec<Uuid> = batches
            .iter()
            .flat_map(|batch| batch.order_ids())
            .collect();
        seen.sort();

        let mut expected: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        expected.sort();

        assert_eq!(seen, expected);
    }

    #[test]
    fn pairwise_check_rejects_chain_drift() {
        // A at X, B one km north of X, C 1.3 km south of X: C is within 2 km
        // of A but 2.3 km from B, so C must not join the {A, B} batch.
        let a = order(1, 0, Location::new(52.5200, 13.4050));
        let b = order(2, 1, Location::new(52.5290, 13.4050));
        let c = order(3, 2, Location::new(52.5080, 13.4050));

        let batches = build_batches(vec![a, b, c], &LIMITS);

        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches[0].order_ids(),
            vec![Uuid::from_u128(1), Uuid::from_u128(2)]
        );
        assert_eq!(batches[1].order_ids(), vec![Uuid::from_u128(3)]);
    }

    #[test]
    fn batches_never_exceed_max_size() {
        let orders = (1..=5)
            .map(|i| order(i, i as i64, Location::new(52.5200, 13.4050)))
            .collect();

        let batches = build_batches(orders, &LIMITS);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[1].len(), 2);
        for batch in &batches {
            assert!(batch.len() <= LIMITS.max_batch_size);
        }
    }

    #[test]
    fn order_without_delivery_fix_is_always_solo() {
        let orders = vec![
            order(1, 0, Location::default()),
            order(2, 1, Location::new(52.5200, 13.4050)),
            order(3, 2, Location::new(52.5200, 13.4050)),
        ];

        let batches = build_batches(orders, &LIMITS);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].order_ids(), vec![Uuid::from_u128(1)]);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[1].len(), 2);
    }

    #[test]
    fn oldest_order_opens_the_first_batch() {
        let newer = order(1, 10, Location::new(52.5200, 13.4050));
        let older = order(2, 0, Location::new(52.7000, 13.9000));

        let batches = build_batches(vec![newer, older], &LIMITS);

        assert_eq!(batches[0].order_ids(), vec![Uuid::from_u128(2)]);
        assert_eq!(batches[1].order_ids(), vec![Uuid::from_u128(1)]);
    }

    #[test]
    fn single_order_is_a_solo_batch() {
        let batches = build_batches(
            vec![order(1, 0, Location::new(52.5200, 13.4050))],
            &LIMITS,
        );

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
    }
}
