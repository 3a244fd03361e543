//! Prometheus text exposition format.
//!
//! Gathers a registry and encodes it for the `/metrics` endpoint.

use prometheus::{Encoder, Registry, TextEncoder};

/// `Content-Type` of [`render_prometheus`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Render every collector in `registry` in the text exposition format.
pub fn render_prometheus(registry: &Registry) -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let families = registry.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}
