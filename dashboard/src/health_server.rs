use std::net::SocketAddr;

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tracing::info;

use crate::dashboard::SharedSnapshot;

pub fn router(snapshot: SharedSnapshot) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/snapshot", get(latest_snapshot))
        .with_state(snapshot)
}

/// Serves `/health` and the last rendered `/snapshot` on `0.0.0.0:port`
pub async fn start_health_check_server(port: u16, snapshot: SharedSnapshot) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    info!("Starting health check server on {}", addr);
    axum::Server::bind(&addr)
        .serve(router(snapshot).into_make_service())
        .await?;
    Ok(())
}

async fn latest_snapshot(State(snapshot): State<SharedSnapshot>) -> impl IntoResponse {
    match snapshot.read().await.clone() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::NOT_FOUND, "no snapshot yet").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tokio::sync::RwLock;

    use super::*;
    use crate::{aggregator::AccountSnapshot, test_support::test_account};

    #[tokio::test]
    async fn test_snapshot_is_not_found_before_first_refresh() {
        let snapshot: SharedSnapshot = Arc::new(RwLock::new(None));

        let response = latest_snapshot(State(snapshot)).await.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_snapshot_is_served_once_available() {
        let snapshot: SharedSnapshot = Arc::new(RwLock::new(Some(AccountSnapshot {
            account: test_account(),
            liquidity: Some(10.0),
            shortfall: Some(0.0),
            positions: vec![],
            assets_in: vec![],
            refreshed_at: Utc::now(),
        })));

        let response = latest_snapshot(State(snapshot)).await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
