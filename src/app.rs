use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::error_handling::HandleErrorLayer;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{BoxError, Router};
use lazy_static::lazy_static;
use serde_json::json;
use tower::buffer::BufferLayer;
use tower::limit::RateLimitLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::client::KasplexClient;
use crate::config::AppConfig;
use crate::dto::Ticker;
use crate::handlers::{
    get_burned_supply, get_circulating_supply, get_index, get_locked_supply, get_max_supply,
    get_minted_supply, get_supply, get_token, get_total_supply, get_unlocked_circulating_supply,
    get_unminted_supply, method_not_allowed,
};
use crate::response::ApiErrorResponse;
use crate::state::CommonState;

lazy_static! {
    static ref HTTP_TIMEOUT: u64 = 60;
    static ref API_VERSION_HEADER: HeaderName = HeaderName::from_static("x-api-version");
    static ref SOURCE_CODE_HEADER: HeaderName = HeaderName::from_static("x-source-code");
}

pub struct ApplicationServer;

impl ApplicationServer {
    pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
        let default_token =
            Ticker::parse(&config.default_token).context("invalid default token")?;
        let client = KasplexClient::new(
            &config.upstream_url,
            Duration::from_secs(config.upstream_timeout),
        )
        .context("could not build upstream http client")?;

        let state = CommonState::new(Arc::new(client), default_token);
        let router = Self::router(state, config.req_per_sec, config.source_url.as_deref());

        let port = config.port;
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        tracing::info!(
            "Server has launched on http://{addr}, upstream {}",
            config.upstream_url
        );

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("could not bind {addr}"))?;

        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .context("server error")?;

        Ok(())
    }

    pub fn router(state: CommonState, req_per_sec: u64, source_url: Option<&str>) -> Router {
        let routes = Router::new()
            .route("/supply", get(get_supply))
            .route("/token", get(get_token))
            .route("/max", get(get_max_supply))
            .route("/total", get(get_total_supply))
            .route("/minted", get(get_minted_supply))
            .route("/burned", get(get_burned_supply))
            .route("/locked", get(get_locked_supply))
            .route("/unminted", get(get_unminted_supply))
            .route("/circulating", get(get_circulating_supply))
            .route("/unlocked-circulating", get(get_unlocked_circulating_supply))
            .method_not_allowed_fallback(method_not_allowed)
            .with_state(state.clone());

        let source_url = source_url.and_then(|url| {
            HeaderValue::from_str(url)
                .map_err(|e| tracing::warn!("Ignoring source url {}: {}", url, e))
                .ok()
        });

        let cors = CorsLayer::new()
            .allow_origin(HeaderValue::from_static("*"))
            .allow_methods(Any)
            .allow_headers(Any);

        let router = Router::new()
            .nest("/api/v1", routes)
            .merge(
                Router::new()
                    .route("/", get(get_index))
                    .method_not_allowed_fallback(method_not_allowed)
                    .with_state(state),
            )
            .merge(
                Router::new()
                    .route(
                        "/health",
                        get(|| async {
                            json!({ "version": env!("CARGO_PKG_VERSION") }).to_string()
                        }),
                    )
                    .method_not_allowed_fallback(method_not_allowed),
            )
            .layer(SetResponseHeaderLayer::overriding(
                API_VERSION_HEADER.clone(),
                HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                SOURCE_CODE_HEADER.clone(),
                move |_: &Response| source_url.clone(),
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(HandleErrorLayer::new(Self::handle_timeout_error))
                    .timeout(Duration::from_secs(*HTTP_TIMEOUT))
                    .layer(cors)
                    .layer(BufferLayer::new(4096))
                    .layer(RateLimitLayer::new(req_per_sec.max(1), Duration::from_secs(1))),
            );

        router.fallback(Self::handle_404)
    }

    /// Adds a custom handler for tower's `TimeoutLayer`, see https://docs.rs/axum/latest/axum/middleware/index.html#commonly-used-middleware.
    async fn handle_timeout_error(err: BoxError) -> Response {
        if err.is::<tower::timeout::error::Elapsed>() {
            ApiErrorResponse::send(
                StatusCode::REQUEST_TIMEOUT.as_u16(),
                Some(format!(
                    "request took longer than the configured {} second timeout",
                    *HTTP_TIMEOUT
                )),
            )
        } else {
            tracing::error!("Unhandled middleware error: {}", err);
            ApiErrorResponse::send(
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                Some("Internal server error".to_string()),
            )
        }
    }

    /// Waits for CTRL+C, used by `with_graceful_shutdown`.
    async fn shutdown_signal() {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("could not listen for shutdown signal: {}", e);
        }
        tracing::warn!("signal shutdown");
    }

    async fn handle_404() -> impl IntoResponse {
        ApiErrorResponse::send(
            StatusCode::NOT_FOUND.as_u16(),
            Some("The requested resource does not exist on this server!".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn test_unhandled_middleware_error_is_generic() {
        let err: BoxError = Box::new(io::Error::new(io::ErrorKind::Other, "buffer worker closed"));

        let response = ApplicationServer::handle_timeout_error(err).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }
}
