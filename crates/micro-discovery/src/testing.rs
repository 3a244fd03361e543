//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use crate::client::{ReplyStream, StatsTransport};
use crate::error::{DiscoveryError, DiscoveryResult};

/// What the bus does for one request.
pub(crate) enum Round {
    /// Deliver these replies, then keep the stream open like a real inbox.
    Replies(Vec<Bytes>),
    /// Deliver these replies, then end the stream.
    Closed(Vec<Bytes>),
    /// Deliver `early` at once and `late` after a delay.
    Late {
        early: Vec<Bytes>,
        late: Bytes,
        after: Duration,
    },
    /// Fail to reach the bus.
    Down,
}

pub(crate) struct ScriptedTransport {
    rounds: Mutex<VecDeque<Round>>,
    subjects: Mutex<Vec<String>>,
    requested_at: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    pub(crate) fn new(rounds: Vec<Round>) -> Arc<Self> {
        Arc::new(Self {
            rounds: Mutex::new(rounds.into()),
            subjects: Mutex::new(Vec::new()),
            requested_at: Mutex::new(Vec::new()),
        })
    }

    /// Subjects requested so far.
    pub(crate) fn subjects(&self) -> Vec<String> {
        self.subjects.lock().unwrap().clone()
    }

    /// When each request was made, in order.
    pub(crate) fn request_times(&self) -> Vec<Instant> {
        self.requested_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatsTransport for ScriptedTransport {
    async fn request_all(&self, subject: &str) -> DiscoveryResult<ReplyStream> {
        self.subjects.lock().unwrap().push(subject.to_string());
        self.requested_at.lock().unwrap().push(Instant::now());
        let round = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Round::Replies(Vec::new()));

        match round {
            Round::Replies(replies) => Ok(stream::iter(replies).chain(stream::pending()).boxed()),
            Round::Closed(replies) => Ok(stream::iter(replies).boxed()),
            Round::Late { early, late, after } => Ok(stream::iter(early)
                .chain(stream::once(async move {
                    tokio::time::sleep(after).await;
                    late
                }))
                .chain(stream::pending())
                .boxed()),
            Round::Down => Err(DiscoveryError::TransportUnavailable(
                "connection refused".to_string(),
            )),
        }
    }
}

/// A well-formed stats reply with a single `process` endpoint.
pub(crate) fn stats_reply(name: &str, version: &str, id: &str, requests: u64) -> Bytes {
    let body = serde_json::json!({
        "type": "io.nats.micro.v1.stats_response",
        "name": name,
        "id": id,
        "version": version,
        "started": "2025-03-01T12:00:00Z",
        "endpoints": [{
            "name": "process",
            "subject": format!("{name}.process"),
            "queue_group": "q",
            "num_requests": requests,
            "num_errors": 0,
            "processing_time": requests * 1_000_000,
            "average_processing_time": 1_000_000,
            "last_error": ""
        }]
    });
    Bytes::from(body.to_string())
}
