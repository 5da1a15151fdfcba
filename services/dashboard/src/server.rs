//! HTTP API for the advisory dashboard.
//!
//! Endpoints:
//! - `GET /dashboard?suburb=NAME` — latest pollen categories and the dust
//!   advisory for the requested site
//! - `GET /status` — freshness markers and stored row counts
//! - `GET /health` — liveness check

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use advisory_common::DashboardSummary;
use storage::AdvisoryStore;

use crate::scheduler::FreshnessMarkers;

/// Shared state for the HTTP handlers.
pub struct ServerState {
    pub store: Arc<AdvisoryStore>,
    pub markers: Arc<FreshnessMarkers>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub suburb: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub service: String,
    pub last_pollen_date: Option<NaiveDate>,
    pub last_dust_time: Option<NaiveDateTime>,
    pub pollen_rows: u64,
    pub dust_rows: u64,
}

/// Create the dashboard API router.
pub fn create_router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(Extension(state))
}

/// Assemble the latest advisory summary for a site.
///
/// Unset freshness markers and missing rows yield null fields. A storage
/// error during a lookup is logged and the field reported as null; the
/// query contract never fails on missing data.
pub async fn build_summary(
    store: &AdvisoryStore,
    markers: &FreshnessMarkers,
    suburb: &str,
) -> DashboardSummary {
    let mut summary = DashboardSummary::default();

    if let Some(date) = markers.pollen_date().await {
        summary.tree = lookup_category(store, date, "TREE").await;
        summary.grass = lookup_category(store, date, "GRASS").await;
        summary.ragweed = lookup_category(store, date, "RAGWEED").await;
    }

    if let Some(time) = markers.dust_time().await {
        summary.dust = match store.get_dust_advice(time, suburb).await {
            Ok(advice) => advice,
            Err(e) => {
                warn!(error = %e, site = %suburb, "Dust advice lookup failed");
                None
            }
        };
    }

    summary
}

async fn lookup_category(
    store: &AdvisoryStore,
    date: NaiveDate,
    pollen_type: &str,
) -> Option<String> {
    match store.get_category(date, pollen_type).await {
        Ok(category) => category,
        Err(e) => {
            warn!(error = %e, pollen_type = pollen_type, "Category lookup failed");
            None
        }
    }
}

/// GET /dashboard?suburb=... - Latest advisory summary for a site
async fn dashboard_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Query(params): Query<DashboardQuery>,
) -> impl IntoResponse {
    Json(build_summary(&state.store, &state.markers, &params.suburb).await)
}

/// GET /status - Freshness markers and stored row counts
async fn status_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    let counts = match state.store.counts().await {
        Ok(counts) => counts,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    Json(StatusResponse {
        service: "dashboard".to_string(),
        last_pollen_date: state.markers.pollen_date().await,
        last_dust_time: state.markers.dust_time().await,
        pollen_rows: counts.pollen_rows,
        dust_rows: counts.dust_rows,
    })
    .into_response()
}

/// GET /health - Health check endpoint
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "dashboard"
    }))
}

/// Start the HTTP server.
pub async fn run_server(state: Arc<ServerState>, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    info!(port = port, "Starting dashboard server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_missing_fields_as_null() {
        let summary = DashboardSummary {
            grass: Some("LOW".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["grass"], "LOW");
        assert!(json["tree"].is_null());
        assert!(json["ragweed"].is_null());
        assert!(json["dust"].is_null());
    }
}
