//! Command-line and environment configuration.
//!
//! Every flag can also be set through the environment variable named in its
//! `env` attribute.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use micro_discovery::PollerConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--jwt and --seed must be given together")]
    IncompleteJwt,

    #[error("discovery timeout must be greater than zero")]
    ZeroTimeout,
}

/// How to authenticate to NATS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    Anonymous,
    Jwt { jwt: String, seed: String },
    CredentialsFile(PathBuf),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "micro-exporter", about = "Prometheus exporter for NATS microservices")]
pub struct ExporterConfig {
    /// NATS connection name.
    #[arg(long, env = "EXPORTER_NAME", default_value = "micro-exporter")]
    pub name: String,

    /// Port the metrics server listens on.
    #[arg(long, env = "EXPORTER_PORT", default_value = "10015")]
    pub port: u16,

    /// NATS server URLs, comma separated.
    #[arg(
        short = 's',
        long = "server",
        env = "NATS_URLS",
        default_value = "nats://localhost:4222"
    )]
    pub nats_urls: String,

    /// User credentials file.
    #[arg(long = "creds", env = "CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// User JWT.
    #[arg(long, env = "NATS_JWT")]
    pub jwt: Option<String>,

    /// User seed.
    #[arg(long, env = "NATS_SEED")]
    pub seed: Option<String>,

    /// Seconds between service discovery polls.
    #[arg(
        long,
        env = "SCRAPE_INTERVAL",
        default_value = "15",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub scrape_interval: u64,

    /// How long each poll waits for stats replies (e.g. "2s", "500ms").
    #[arg(long, env = "DISCOVERY_TIMEOUT", default_value = "2s", value_parser = parse_duration)]
    pub discovery_timeout: Duration,

    /// Emit logs as JSON.
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl ExporterConfig {
    /// Check flag combinations clap cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.is_some() != self.seed.is_some() {
            return Err(ConfigError::IncompleteJwt);
        }
        if self.discovery_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(self.scrape_interval),
            timeout: self.discovery_timeout,
        }
    }

    /// JWT and seed win over a credentials file.
    pub fn auth(&self) -> Auth {
        match (&self.jwt, &self.seed, &self.credentials_file) {
            (Some(jwt), Some(seed), _) => Auth::Jwt {
                jwt: jwt.clone(),
                seed: seed.clone(),
            },
            (_, _, Some(path)) => Auth::CredentialsFile(path.clone()),
            _ => Auth::Anonymous,
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// Parse `"500ms"`, `"2s"` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let parsed = if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().map(Duration::from_secs)
    } else {
        s.parse::<u64>().map(Duration::from_secs)
    };
    parsed.map_err(|_| format!("invalid duration {s:?}, expected e.g. \"2s\" or \"500ms\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ExporterConfig {
        let mut argv = vec!["micro-exporter"];
        argv.extend_from_slice(args);
        ExporterConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.name, "micro-exporter");
        assert_eq!(config.port, 10015);
        assert_eq!(config.nats_urls, "nats://localhost:4222");
        assert_eq!(config.scrape_interval, 15);
        assert_eq!(config.discovery_timeout, Duration::from_secs(2));
        assert_eq!(config.auth(), Auth::Anonymous);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_flags_give_default_poller_timing() {
        assert_eq!(parse(&[]).poller_config(), PollerConfig::default());
    }

    #[test]
    fn poller_config_from_flags() {
        let config = parse(&["--scrape-interval", "30", "--discovery-timeout", "750ms"]);
        let poller = config.poller_config();
        assert_eq!(poller.interval, Duration::from_secs(30));
        assert_eq!(poller.timeout, Duration::from_millis(750));
    }

    #[test]
    fn zero_interval_rejected() {
        let result = ExporterConfig::try_parse_from(["micro-exporter", "--scrape-interval", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = parse(&["--discovery-timeout", "0s"]);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn jwt_requires_seed() {
        let config = parse(&["--jwt", "eyJ0eXAi"]);
        assert_eq!(config.validate(), Err(ConfigError::IncompleteJwt));
    }

    #[test]
    fn jwt_wins_over_credentials_file() {
        let config = parse(&["--jwt", "J", "--seed", "S", "--creds", "/etc/nats/user.creds"]);
        assert_eq!(
            config.auth(),
            Auth::Jwt {
                jwt: "J".to_string(),
                seed: "S".to_string()
            }
        );
    }

    #[test]
    fn credentials_file_auth() {
        let config = parse(&["--creds", "/etc/nats/user.creds"]);
        assert_eq!(
            config.auth(),
            Auth::CredentialsFile(PathBuf::from("/etc/nats/user.creds"))
        );
    }

    #[test]
    fn short_server_flag() {
        let config = parse(&["-s", "nats://a:4222,nats://b:4222"]);
        assert_eq!(config.nats_urls, "nats://a:4222,nats://b:4222");
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("2s"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("3"), Ok(Duration::from_secs(3)));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("1h").is_err());
    }

    #[test]
    fn listen_addr_uses_port() {
        let config = parse(&["--port", "9999"]);
        assert_eq!(config.listen_addr().port(), 9999);
    }
}
