use std::net::SocketAddr;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tokio::net::TcpListener;
use tracing::{error, info};

use pixtag_prometheus::PrometheusMetrics;

/// Bind `addr` and serve `/metrics` in the background.
pub async fn spawn_metrics_server(addr: SocketAddr, metrics: PrometheusMetrics) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let app = Router::new()
        .route("/metrics", get(scrape))
        .with_state(metrics);

    info!(addr = %addr, "metrics endpoint listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "metrics endpoint stopped");
        }
    });
    Ok(())
}

async fn scrape(State(metrics): State<PrometheusMetrics>) -> Result<String, (StatusCode, String)> {
    metrics
        .encode_text()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
