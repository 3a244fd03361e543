//! Decoding of NATS micro stats responses.
//!
//! Every service built on the NATS micro framework answers `$SRV.STATS`
//! with a JSON document of type `io.nats.micro.v1.stats_response`.
//! Durations on the wire are integer nanoseconds.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use micro_state::{EndpointStat, ServiceIdentity, ServiceStat};

use crate::error::{DiscoveryError, DiscoveryResult};

/// Value of the `type` field on a stats reply.
pub const STATS_RESPONSE_TYPE: &str = "io.nats.micro.v1.stats_response";

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    id: String,
    #[serde(default)]
    version: String,
    started: DateTime<Utc>,
    // Go services encode an empty endpoint list as `null`.
    #[serde(default)]
    endpoints: Option<Vec<EndpointStats>>,
}

#[derive(Debug, Deserialize)]
struct EndpointStats {
    name: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    queue_group: Option<String>,
    #[serde(default)]
    num_requests: u64,
    #[serde(default)]
    num_errors: u64,
    #[serde(default)]
    processing_time: u64,
    #[serde(default)]
    last_error: Option<String>,
}

/// Decode one stats reply into a [`ServiceStat`].
pub fn decode_stats(payload: &[u8]) -> DiscoveryResult<ServiceStat> {
    let resp: StatsResponse =
        serde_json::from_slice(payload).map_err(|e| DiscoveryError::Decode(e.to_string()))?;

    if resp.kind != STATS_RESPONSE_TYPE {
        return Err(DiscoveryError::Decode(format!(
            "unexpected response type {:?}",
            resp.kind
        )));
    }
    if resp.name.is_empty() || resp.id.is_empty() {
        return Err(DiscoveryError::Decode(
            "service name and id must not be empty".to_string(),
        ));
    }

    let endpoints = resp
        .endpoints
        .unwrap_or_default()
        .into_iter()
        .map(|ep| EndpointStat {
            name: ep.name,
            subject: ep.subject,
            queue_group: ep.queue_group.filter(|q| !q.is_empty()),
            num_requests: ep.num_requests,
            num_errors: ep.num_errors,
            processing_time: Duration::from_nanos(ep.processing_time),
            last_error: ep.last_error.filter(|e| !e.is_empty()),
        })
        .collect();

    Ok(ServiceStat {
        identity: ServiceIdentity::new(resp.name, resp.version, resp.id),
        started_at: resp.started,
        endpoints,
    })
}
