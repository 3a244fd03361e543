//! NATS connection and the bus side of discovery.

use async_nats::{ConnectOptions, ServerAddr};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tracing::{info, warn};

use micro_discovery::{DiscoveryError, DiscoveryResult, ReplyStream, StatsTransport};

use crate::config::{Auth, ExporterConfig};

/// [`StatsTransport`] over a NATS client.
///
/// Each request subscribes a fresh inbox, publishes with that inbox as the
/// reply subject and hands the subscription back as the reply stream.
/// Dropping the stream unsubscribes.
#[derive(Clone)]
pub struct NatsTransport {
    client: async_nats::Client,
}

impl NatsTransport {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

fn unavailable(e: impl std::fmt::Display) -> DiscoveryError {
    DiscoveryError::TransportUnavailable(e.to_string())
}

#[async_trait]
impl StatsTransport for NatsTransport {
    async fn request_all(&self, subject: &str) -> DiscoveryResult<ReplyStream> {
        let inbox = self.client.new_inbox();
        let replies = self
            .client
            .subscribe(inbox.clone())
            .await
            .map_err(unavailable)?;
        self.client
            .publish_with_reply(subject.to_string(), inbox, Bytes::new())
            .await
            .map_err(unavailable)?;
        self.client.flush().await.map_err(unavailable)?;

        Ok(replies.map(|msg| msg.payload).boxed())
    }
}

/// Parse a comma separated list of server URLs.
pub fn server_addrs(urls: &str) -> std::io::Result<Vec<ServerAddr>> {
    urls.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::parse)
        .collect()
}

/// Build a `.creds` document from a bare JWT and nkey seed.
pub fn creds_document(jwt: &str, seed: &str) -> String {
    format!(
        "-----BEGIN NATS USER JWT-----\n{jwt}\n------END NATS USER JWT------\n\n\
         -----BEGIN USER NKEY SEED-----\n{seed}\n------END USER NKEY SEED------\n"
    )
}

async fn connect_options(auth: &Auth) -> std::io::Result<ConnectOptions> {
    match auth {
        Auth::Jwt { jwt, seed } => ConnectOptions::with_credentials(&creds_document(jwt, seed)),
        Auth::CredentialsFile(path) => ConnectOptions::with_credentials_file(path.clone()).await,
        Auth::Anonymous => Ok(ConnectOptions::new()),
    }
}

/// Connect to the servers named in `config`.
///
/// Returns without waiting for a server: an unreachable bus at start-up is
/// retried in the background and shows up as a failed poll cycle, the same
/// as an outage later on.
pub async fn connect(config: &ExporterConfig) -> anyhow::Result<async_nats::Client> {
    let addrs = server_addrs(&config.nats_urls)?;
    let options = connect_options(&config.auth())
        .await?
        .name(&config.name)
        .retry_on_initial_connect()
        .event_callback(|event| async move {
            match event {
                async_nats::Event::Connected => info!("nats connected"),
                other => warn!(event = ?other, "nats connection event"),
            }
        });

    let client = options.connect(addrs).await?;
    info!(servers = %config.nats_urls, name = %config.name, "nats client started");
    Ok(client)
}
