use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Process-wide counters, registered once at startup and scraped
/// through `GET /metrics`.
pub struct ApiMetrics {
    registry: Registry,
    pub trips_created_total: IntCounter,
    pub trip_transitions_total: IntCounterVec,
    pub location_pings_total: IntCounter,
    pub sync_snapshot_version: IntGauge,
    pub sync_refetches_discarded: IntGauge,
    pub sync_refetches_failed: IntGauge,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let trips_created_total =
            IntCounter::new("livery_trips_created_total", "Trips booked through the API")?;
        registry.register(Box::new(trips_created_total.clone()))?;

        let trip_transitions_total = IntCounterVec::new(
            Opts::new(
                "livery_trip_transitions_total",
                "Lifecycle transitions applied, labelled by action",
            ),
            &["action"],
        )?;
        registry.register(Box::new(trip_transitions_total.clone()))?;

        let location_pings_total = IntCounter::new(
            "livery_location_pings_total",
            "Driver location reports accepted",
        )?;
        registry.register(Box::new(location_pings_total.clone()))?;

        let sync_snapshot_version = IntGauge::new(
            "livery_sync_snapshot_version",
            "Version of the snapshot currently served",
        )?;
        registry.register(Box::new(sync_snapshot_version.clone()))?;

        let sync_refetches_discarded = IntGauge::new(
            "livery_sync_refetches_discarded_total",
            "Refetch results discarded by the monotonic token guard",
        )?;
        registry.register(Box::new(sync_refetches_discarded.clone()))?;

        let sync_refetches_failed = IntGauge::new(
            "livery_sync_refetches_failed_total",
            "Refetch attempts that returned an error",
        )?;
        registry.register(Box::new(sync_refetches_failed.clone()))?;

        Ok(Self {
            registry,
            trips_created_total,
            trip_transitions_total,
            location_pings_total,
            sync_snapshot_version,
            sync_refetches_discarded,
            sync_refetches_failed,
        })
    }

    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
