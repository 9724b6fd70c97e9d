use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, header},
    response::IntoResponse,
    routing::get,
};
use engine::{Engine, EngineError};
use tokio::sync::oneshot;
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

use std::{any::Any, future::Future, net::SocketAddr, sync::Arc, time::Duration};

use crate::{ServerError, expense, health};

/// Behaviour switches for the request handlers.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    /// Write created expenses to the store instead of only echoing them.
    pub persist_created: bool,
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub options: ServerOptions,
}

async fn not_found() -> ServerError {
    ServerError::Engine(EngineError::NotFound)
}

async fn method_not_allowed() -> ServerError {
    ServerError::MethodNotAllowed
}

/// Client address: `X-Real-IP`, then the first `X-Forwarded-For` hop, then
/// the peer of the connection.
pub(crate) fn remote_addr<B>(request: &Request<B>) -> String {
    let header_value = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(ip) = header_value("x-real-ip") {
        return ip.to_string();
    }
    if let Some(ip) = header_value("x-forwarded-for")
        .and_then(|hops| hops.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn request_span(request: &Request<Body>) -> Span {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        remote_addr = %remote_addr(request),
        user_agent = %user_agent,
    )
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<axum::body::Body> {
    let reason = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("handler panicked: {reason}");

    ServerError::Engine(EngineError::Internal).into_response()
}

/// Build the routes of the service on top of `engine`.
pub fn router(engine: Engine, options: ServerOptions) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
        options,
    };

    Router::new()
        .route("/health", get(health::check))
        .route("/expense", get(expense::list).post(expense::create))
        .route("/expense/", get(expense::list).post(expense::create))
        .route("/expense/{id}", get(expense::get))
        .route("/expense/{id}/", get(expense::get))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves.
///
/// In-flight requests get `grace` to complete once `shutdown` fired; past
/// that the server is aborted and a `TimedOut` error returned.
pub async fn run_with_listener<F>(
    engine: Engine,
    options: ServerOptions,
    listener: tokio::net::TcpListener,
    shutdown: F,
    grace: Duration,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let (stopping_tx, stopping_rx) = oneshot::channel();
    let signal = async move {
        shutdown.await;
        tracing::info!("shutting down server");
        let _ = stopping_tx.send(());
    };

    let app = router(engine, options);
    let mut serving = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
    });

    tokio::select! {
        res = &mut serving => return res.map_err(std::io::Error::other)?,
        _ = stopping_rx => {}
    }

    match tokio::time::timeout(grace, &mut serving).await {
        Ok(res) => res.map_err(std::io::Error::other)?,
        Err(_) => {
            serving.abort();
            tracing::error!("server forced to shutdown after {grace:?}");
            Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "graceful shutdown timed out",
            ))
        }
    }
}
