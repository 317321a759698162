use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::models::assignment::Assignment;
use crate::models::event::DispatchEvent;
use crate::models::order::OrderForBatching;
use crate::models::rider::Rider;
use crate::models::zone::DeliveryZone;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub config: Config,
    pub orders: DashMap<Uuid, OrderForBatching>,
    pub riders: DashMap<Uuid, Rider>,
    pub zones: DashMap<Uuid, DeliveryZone>,
    pub assignments: DashMap<Uuid, Assignment>,
    pub ready_tx: mpsc::Sender<Uuid>,
    pub events_tx: broadcast::Sender<DispatchEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> (Self, mpsc::Receiver<Uuid>) {
        let (ready_tx, ready_rx) = mpsc::channel(config.order_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        (
            Self {
                config,
                orders: DashMap::new(),
                riders: DashMap::new(),
                zones: DashMap::new(),
                assignments: DashMap::new(),
                ready_tx,
                events_tx,
                metrics: Metrics::new(),
            },
            ready_rx,
        )
    }
}
