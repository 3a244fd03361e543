//! Domain types for the fleet snapshot.
//!
//! A [`Snapshot`] maps every discovered [`ServiceIdentity`] to the
//! [`ServiceStat`] it reported during one poll cycle. Counters are carried
//! exactly as the fleet reported them; when an instance restarts it comes
//! back under a new instance id and its counters start over.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

// ── Identity ──────────────────────────────────────────────────────

/// Uniquely identifies one running service instance.
///
/// Ordered by name, then version, then instance id, which is also the order
/// snapshots iterate in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
    /// Instance id assigned by the service at start-up.
    pub id: String,
}

impl ServiceIdentity {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.name, self.version, self.id)
    }
}

// ── Stats ─────────────────────────────────────────────────────────

/// Statistics for a single endpoint of a service instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStat {
    pub name: String,
    /// Subject the endpoint listens on.
    pub subject: String,
    pub queue_group: Option<String>,
    /// Requests handled since the instance started.
    pub num_requests: u64,
    /// Requests that ended in an error since the instance started.
    pub num_errors: u64,
    /// Total time spent handling requests, serialized as integer nanoseconds.
    #[serde(serialize_with = "duration_as_nanos")]
    pub processing_time: Duration,
    /// Most recent error message, if any.
    pub last_error: Option<String>,
}

fn duration_as_nanos<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}

impl EndpointStat {
    /// Mean processing time per request, zero when nothing was handled.
    pub fn average_processing_time(&self) -> Duration {
        if self.num_requests == 0 {
            return Duration::ZERO;
        }
        let nanos = self.processing_time.as_nanos() / u128::from(self.num_requests);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Statistics reported by one live service instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStat {
    pub identity: ServiceIdentity,
    pub started_at: DateTime<Utc>,
    /// Endpoints in the order the service reported them.
    pub endpoints: Vec<EndpointStat>,
}

// ── Snapshot ──────────────────────────────────────────────────────

/// One immutable, fully built view of the fleet.
///
/// A new snapshot replaces the previous one wholesale; nothing is carried
/// over between generations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Poll cycle that produced this snapshot; 0 before the first poll.
    pub generation: u64,
    /// When the cycle finished, `None` before the first poll.
    pub captured_at: Option<DateTime<Utc>>,
    /// Whether the bus could be reached during the cycle.
    pub bus_up: bool,
    /// Replies dropped because they could not be decoded.
    pub skipped_responses: u64,
    #[serde(serialize_with = "services_as_list")]
    pub services: BTreeMap<ServiceIdentity, ServiceStat>,
}

// JSON maps need string keys; the identity is repeated inside each stat.
fn services_as_list<S: serde::Serializer>(
    services: &BTreeMap<ServiceIdentity, ServiceStat>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(services.values())
}

impl Snapshot {
    /// The placeholder served before the poller publishes anything.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            captured_at: None,
            bus_up: false,
            skipped_responses: 0,
            services: BTreeMap::new(),
        }
    }

    /// Fold the services discovered in one cycle into a snapshot.
    ///
    /// If an identity shows up more than once the later entry wins.
    pub fn from_services(
        generation: u64,
        captured_at: DateTime<Utc>,
        services: impl IntoIterator<Item = ServiceStat>,
        skipped_responses: u64,
    ) -> Self {
        let mut by_identity = BTreeMap::new();
        for stat in services {
            by_identity.insert(stat.identity.clone(), stat);
        }
        Self {
            generation,
            captured_at: Some(captured_at),
            bus_up: true,
            skipped_responses,
            services: by_identity,
        }
    }

    /// The snapshot published for a cycle in which the bus was unreachable.
    ///
    /// Deliberately empty: scrapers should see "no data" rather than the
    /// previous cycle's numbers presented as current.
    pub fn unavailable(generation: u64, captured_at: DateTime<Utc>) -> Self {
        Self {
            generation,
            captured_at: Some(captured_at),
            ..Self::empty()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn get(&self, identity: &ServiceIdentity) -> Option<&ServiceStat> {
        self.services.get(identity)
    }

    /// Iterate services in identity order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceStat> {
        self.services.values()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
