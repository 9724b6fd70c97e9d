use axum::http::StatusCode;

/// Liveness probe, never touches the store.
pub async fn check() -> (StatusCode, &'static str) {
    tracing::info!("health check requested");
    (StatusCode::OK, "OK")
}
