//! Collector — maps the current snapshot onto Prometheus metric families.
//!
//! Families are declared once; every `collect()` builds fresh metric vectors
//! from the snapshot, so nothing accumulates between scrapes and two scrapes
//! of the same snapshot produce the same output.

use std::collections::BTreeMap;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Gauge, GaugeVec, IntCounterVec, IntGauge, Opts};
use tracing::{debug, warn};

use micro_state::{EndpointStat, ServiceStat, Snapshot, SnapshotStore};

const NAMESPACE: &str = "micro";

const ENDPOINT_LABELS: &[&str] = &["service", "id", "version", "endpoint"];
const SERVICE_LABELS: &[&str] = &["service", "id", "version"];

/// One set of metric vectors, filled from a single snapshot.
struct Families {
    requests: IntCounterVec,
    errors: IntCounterVec,
    processing_time: CounterVec,
    average_processing_time: GaugeVec,
    start_time: GaugeVec,
    services: IntGauge,
    skipped: IntGauge,
    bus_up: IntGauge,
    last_poll: Gauge,
}

impl Families {
    fn new() -> prometheus::Result<Self> {
        Ok(Self {
            requests: IntCounterVec::new(
                Opts::new("requests_total", "Requests handled by the endpoint")
                    .namespace(NAMESPACE)
                    .subsystem("endpoint"),
                ENDPOINT_LABELS,
            )?,
            errors: IntCounterVec::new(
                Opts::new("errors_total", "Requests that ended in an error")
                    .namespace(NAMESPACE)
                    .subsystem("endpoint"),
                ENDPOINT_LABELS,
            )?,
            processing_time: CounterVec::new(
                Opts::new(
                    "processing_time_seconds_total",
                    "Total time spent handling requests",
                )
                .namespace(NAMESPACE)
                .subsystem("endpoint"),
                ENDPOINT_LABELS,
            )?,
            average_processing_time: GaugeVec::new(
                Opts::new(
                    "average_processing_time_seconds",
                    "Mean time spent per request",
                )
                .namespace(NAMESPACE)
                .subsystem("endpoint"),
                ENDPOINT_LABELS,
            )?,
            start_time: GaugeVec::new(
                Opts::new(
                    "start_time_seconds",
                    "Unix time the service instance started",
                )
                .namespace(NAMESPACE)
                .subsystem("service"),
                SERVICE_LABELS,
            )?,
            services: IntGauge::with_opts(
                Opts::new("services", "Service instances in the current snapshot")
                    .namespace(NAMESPACE)
                    .subsystem("exporter"),
            )?,
            skipped: IntGauge::with_opts(
                Opts::new(
                    "skipped_responses",
                    "Stats replies dropped as undecodable in the last poll",
                )
                .namespace(NAMESPACE)
                .subsystem("exporter"),
            )?,
            bus_up: IntGauge::with_opts(
                Opts::new("bus_up", "Whether the last poll reached the bus (1) or not (0)")
                    .namespace(NAMESPACE)
                    .subsystem("exporter"),
            )?,
            last_poll: Gauge::with_opts(
                Opts::new(
                    "last_poll_timestamp_seconds",
                    "Unix time the current snapshot was captured, 0 before the first poll",
                )
                .namespace(NAMESPACE)
                .subsystem("exporter"),
            )?,
        })
    }

    fn collectors(&self) -> [&dyn Collector; 9] {
        [
            &self.requests,
            &self.errors,
            &self.processing_time,
            &self.average_processing_time,
            &self.start_time,
            &self.services,
            &self.skipped,
            &self.bus_up,
            &self.last_poll,
        ]
    }

    fn descs(&self) -> Vec<Desc> {
        self.collectors()
            .into_iter()
            .flat_map(|c| c.desc())
            .cloned()
            .collect()
    }

    fn observe(&self, snapshot: &Snapshot) {
        self.services.set(snapshot.len() as i64);
        self.skipped
            .set(i64::try_from(snapshot.skipped_responses).unwrap_or(i64::MAX));
        self.bus_up.set(i64::from(snapshot.bus_up));
        self.last_poll.set(
            snapshot
                .captured_at
                .map(|t| t.timestamp_millis() as f64 / 1000.0)
                .unwrap_or(0.0),
        );

        for service in snapshot.services() {
            let id = &service.identity;
            self.start_time
                .with_label_values(&[id.name.as_str(), id.id.as_str(), id.version.as_str()])
                .set(service.started_at.timestamp_millis() as f64 / 1000.0);

            for (endpoint, stat) in unique_endpoints(service) {
                let labels = [
                    id.name.as_str(),
                    id.id.as_str(),
                    id.version.as_str(),
                    endpoint,
                ];
                self.requests
                    .with_label_values(&labels)
                    .inc_by(stat.num_requests);
                self.errors.with_label_values(&labels).inc_by(stat.num_errors);
                self.processing_time
                    .with_label_values(&labels)
                    .inc_by(stat.processing_time.as_secs_f64());
                self.average_processing_time
                    .with_label_values(&labels)
                    .set(stat.average_processing_time().as_secs_f64());
            }
        }
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.collectors()
            .into_iter()
            .flat_map(|c| c.collect())
            .collect()
    }
}

/// Endpoints keyed by name so a label set is never emitted twice.
///
/// A service that reports the same endpoint name more than once keeps the
/// last entry.
fn unique_endpoints(service: &ServiceStat) -> BTreeMap<&str, &EndpointStat> {
    let mut unique = BTreeMap::new();
    for stat in &service.endpoints {
        if unique.insert(stat.name.as_str(), stat).is_some() {
            debug!(
                service = %service.identity,
                endpoint = %stat.name,
                "duplicate endpoint in stats reply, keeping last"
            );
        }
    }
    unique
}

/// Prometheus collector over the fleet snapshot.
///
/// Register it once with a [`prometheus::Registry`]; every gather reads
/// [`SnapshotStore::current`] and nothing else.
pub struct MicroCollector {
    store: SnapshotStore,
    descs: Vec<Desc>,
}

impl MicroCollector {
    pub fn new(store: SnapshotStore) -> prometheus::Result<Self> {
        let descs = Families::new()?.descs();
        Ok(Self { store, descs })
    }
}

impl Collector for MicroCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let snapshot = self.store.current();
        // Same options as the descriptors built in `new`, so this only fails
        // if the prometheus crate itself misbehaves.
        let families = match Families::new() {
            Ok(families) => families,
            Err(e) => {
                warn!(error = %e, "failed to build metric families");
                return Vec::new();
            }
        };
        families.observe(&snapshot);
        families.collect()
    }
}
