use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use aviator_engine::Engine;

use crate::metrics::WsMetrics;

mod http;
mod ws;

/// Shared state behind every route.
pub struct AppContext {
    pub engine: Arc<Engine>,
    pub metrics: WsMetrics,
    pub admin_token: Option<String>,
    pub ws_outbound_capacity: usize,
    pub ws_send_timeout: Duration,
}

pub struct Api {
    context: Arc<AppContext>,
}

impl Api {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    pub fn router(&self) -> Router {
        // Configure CORS: ALLOWED_HTTP_ORIGINS is a comma-separated list;
        // unset or "*" allows any origin.
        let allowed = std::env::var("ALLOWED_HTTP_ORIGINS").unwrap_or_default();
        let origins: Vec<HeaderValue> = allowed
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty() && *origin != "*")
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("invalid origin in ALLOWED_HTTP_ORIGINS: {}", origin);
                    None
                }
            })
            .collect();
        let cors = if origins.is_empty() {
            CorsLayer::new().allow_origin(AllowOrigin::any())
        } else {
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        }
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        Router::new()
            .route("/healthz", get(http::healthz))
            .route("/state", get(http::state))
            .route("/rounds/recent", get(http::recent_rounds))
            .route("/metrics/ws", get(http::ws_metrics))
            .route("/metrics/engine", get(http::engine_metrics))
            .route("/admin/crash-override", post(http::crash_override))
            .route("/ws/:user_id", get(ws::game_ws))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.context.clone())
    }
}
