//! HTTP routes.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Index page linking to `/metrics` |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/services` | Current snapshot as JSON |

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use prometheus::Registry;
use tracing::error;

use micro_metrics::{render_prometheus, CONTENT_TYPE};
use micro_state::{Snapshot, SnapshotStore};

const INDEX: &str = "<html>\
<head><title>Micro Stats Exporter</title></head>\
<body>\n<h1>Micro Stats Exporter</h1>\
<p><a href='/metrics'>Metrics</a></p>\
</body>\n</html>";

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub registry: Registry,
    pub store: SnapshotStore,
}

/// Build the exporter router.
pub fn build_router(registry: Registry, store: SnapshotStore) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .route("/services", get(services))
        .with_state(HttpState { registry, store })
}

/// GET /
async fn index() -> Html<&'static str> {
    Html(INDEX)
}

/// GET /metrics
async fn metrics(State(state): State<HttpState>) -> impl IntoResponse {
    match render_prometheus(&state.registry) {
        Ok(body) => (StatusCode::OK, [("content-type", CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /services
async fn services(State(state): State<HttpState>) -> Json<Snapshot> {
    Json(Snapshot::clone(&state.store.current()))
}
