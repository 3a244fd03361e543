//! Stats client — one fleet-wide stats request per call.
//!
//! The fleet size is unknown, so the client does not wait for a fixed number
//! of replies: it gathers whatever arrives before the deadline, then drops
//! the reply stream and ignores stragglers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use micro_state::ServiceStat;

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::wire::decode_stats;

/// Subject every NATS micro service answers stats requests on.
pub const STATS_SUBJECT: &str = "$SRV.STATS";

/// Raw reply payloads for one request, in arrival order.
pub type ReplyStream = BoxStream<'static, Bytes>;

/// Request/many-replies access to the messaging bus.
#[async_trait]
pub trait StatsTransport: Send + Sync {
    /// Publish an empty request on `subject` and stream every reply.
    ///
    /// The stream may stay open indefinitely; callers bound it with their
    /// own deadline. An `Err` means the bus could not be reached at all.
    async fn request_all(&self, subject: &str) -> DiscoveryResult<ReplyStream>;
}

/// Outcome of one discovery request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    /// Decoded services, in arrival order.
    pub services: Vec<ServiceStat>,
    /// Replies that could not be decoded.
    pub skipped: u64,
}

/// Issues discovery requests over a [`StatsTransport`].
#[derive(Clone)]
pub struct StatsClient {
    transport: Arc<dyn StatsTransport>,
}

impl StatsClient {
    pub fn new(transport: Arc<dyn StatsTransport>) -> Self {
        Self { transport }
    }

    /// Ask the whole fleet for stats and collect replies until `timeout`.
    ///
    /// No replies is a valid (empty) report. Only a transport failure is
    /// returned as an error.
    pub async fn discover(&self, timeout: Duration) -> DiscoveryResult<DiscoveryReport> {
        let deadline = Instant::now() + timeout;

        let mut replies = timeout_at(deadline, self.transport.request_all(STATS_SUBJECT))
            .await
            .map_err(|_| {
                DiscoveryError::TransportUnavailable(
                    "timed out sending discovery request".to_string(),
                )
            })??;

        let mut report = DiscoveryReport::default();
        while let Ok(Some(payload)) = timeout_at(deadline, replies.next()).await {
            match decode_stats(&payload) {
                Ok(stat) => report.services.push(stat),
                Err(e) => {
                    report.skipped += 1;
                    debug!(error = %e, bytes = payload.len(), "skipping stats reply");
                }
            }
        }

        debug!(
            services = report.services.len(),
            skipped = report.skipped,
            "discovery window closed"
        );
        Ok(report)
    }
}
