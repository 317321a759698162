use prometheus::{
    Encoder, GaugeVec, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_in_queue: IntGauge,
    pub batches_built_total: IntCounterVec,
    pub assignments_total: IntCounterVec,
    pub dispatch_pass_latency_seconds: HistogramVec,
    pub rider_active_assignments: GaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_in_queue =
            IntGauge::new("orders_in_queue", "Current number of orders awaiting a batching pass")
                .expect("valid orders_in_queue metric");

        let batches_built_total = IntCounterVec::new(
            Opts::new("batches_built_total", "Total batches built, by batch size"),
            &["size"],
        )
        .expect("valid batches_built_total metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total assignment outcomes"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let dispatch_pass_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "dispatch_pass_latency_seconds",
                "Latency of batching passes in seconds",
            ),
            &["outcome"],
        )
        .expect("valid dispatch_pass_latency_seconds metric");

        let rider_active_assignments = GaugeVec::new(
            Opts::new(
                "rider_active_assignments",
                "Active assignments currently held per rider",
            ),
            &["rider_id"],
        )
        .expect("valid rider_active_assignments metric");

        registry
            .register(Box::new(orders_in_queue.clone()))
            .expect("register orders_in_queue");
        registry
            .register(Box::new(batches_built_total.clone()))
            .expect("register batches_built_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(dispatch_pass_latency_seconds.clone()))
            .expect("register dispatch_pass_latency_seconds");
        registry
            .register(Box::new(rider_active_assignments.clone()))
            .expect("register rider_active_assignments");

        Self {
            registry,
            orders_in_queue,
            batches_built_total,
            assignments_total,
            dispatch_pass_latency_seconds,
            rider_active_assignments,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
