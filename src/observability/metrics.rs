use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub order_transitions_total: IntCounterVec,
    pub dispatch_rejections_total: IntCounterVec,
    pub ratings_total: IntCounterVec,
    pub pending_orders: IntGauge,
    pub operation_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("valid orders_created_total metric");

        let order_transitions_total = IntCounterVec::new(
            Opts::new(
                "order_transitions_total",
                "Committed order status transitions by target status",
            ),
            &["to"],
        )
        .expect("valid order_transitions_total metric");

        let dispatch_rejections_total = IntCounterVec::new(
            Opts::new(
                "dispatch_rejections_total",
                "Assignment attempts rejected at commit time by reason",
            ),
            &["reason"],
        )
        .expect("valid dispatch_rejections_total metric");

        let ratings_total = IntCounterVec::new(
            Opts::new("ratings_total", "Ratings recorded by rated party"),
            &["rated"],
        )
        .expect("valid ratings_total metric");

        let pending_orders = IntGauge::new("pending_orders", "Orders currently pending")
            .expect("valid pending_orders metric");

        let operation_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "operation_latency_seconds",
                "Latency of core operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid operation_latency_seconds metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(dispatch_rejections_total.clone()))
            .expect("register dispatch_rejections_total");
        registry
            .register(Box::new(ratings_total.clone()))
            .expect("register ratings_total");
        registry
            .register(Box::new(pending_orders.clone()))
            .expect("register pending_orders");
        registry
            .register(Box::new(operation_latency_seconds.clone()))
            .expect("register operation_latency_seconds");

        Self {
            registry,
            orders_created_total,
            order_transitions_total,
            dispatch_rejections_total,
            ratings_total,
            pending_orders,
            operation_latency_seconds,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
