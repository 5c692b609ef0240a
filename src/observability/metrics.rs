use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub approvals_total: IntCounter,
    pub rejections_total: IntCounter,
    pub assignments_total: IntCounter,
    pub outcomes_total: IntCounterVec,
    pub trucks_paired: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let approvals_total =
            IntCounter::new("approvals_total", "Requests approved into bins")
                .expect("valid approvals_total metric");

        let rejections_total =
            IntCounter::new("rejections_total", "Requests rejected and removed")
                .expect("valid rejections_total metric");

        let assignments_total =
            IntCounter::new("assignments_total", "Bins assigned to collectors")
                .expect("valid assignments_total metric");

        let outcomes_total = IntCounterVec::new(
            Opts::new("outcomes_total", "Reported bin outcomes"),
            &["outcome"],
        )
        .expect("valid outcomes_total metric");

        let trucks_paired =
            IntGauge::new("trucks_paired", "Trucks currently paired with a collector")
                .expect("valid trucks_paired metric");

        registry
            .register(Box::new(approvals_total.clone()))
            .expect("register approvals_total");
        registry
            .register(Box::new(rejections_total.clone()))
            .expect("register rejections_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(outcomes_total.clone()))
            .expect("register outcomes_total");
        registry
            .register(Box::new(trucks_paired.clone()))
            .expect("register trucks_paired");

        Self {
            registry,
            approvals_total,
            rejections_total,
            assignments_total,
            outcomes_total,
            trucks_paired,
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
