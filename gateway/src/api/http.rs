use axum::extract::State as AxumState;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use aviator_types::{now_ms, RoundSnapshot};

use super::AppContext;

pub(super) async fn healthz() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct StatePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    round: Option<RoundSnapshot>,
    server_time_ms: u64,
}

/// Public snapshot of the active round. Never includes the hidden crash
/// value.
pub(super) async fn state(AxumState(context): AxumState<Arc<AppContext>>) -> impl IntoResponse {
    Json(StatePayload {
        round: context.engine.snapshot(),
        server_time_ms: now_ms(),
    })
}

#[derive(Serialize)]
struct RecentRounds {
    crashes: Vec<Decimal>,
}

pub(super) async fn recent_rounds(
    AxumState(context): AxumState<Arc<AppContext>>,
) -> impl IntoResponse {
    Json(RecentRounds {
        crashes: context.engine.recent_crashes(),
    })
}

pub(super) async fn ws_metrics(
    AxumState(context): AxumState<Arc<AppContext>>,
) -> impl IntoResponse {
    Json(context.metrics.snapshot())
}

pub(super) async fn engine_metrics(
    AxumState(context): AxumState<Arc<AppContext>>,
) -> impl IntoResponse {
    Json(context.engine.counters())
}

#[derive(Deserialize)]
pub(super) struct OverrideRequest {
    value: Decimal,
}

#[derive(Serialize)]
struct OverrideResponse {
    staged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    replaced: Option<Decimal>,
}

/// Stages a single-use crash override for the next round. Guarded by a
/// bearer token; disabled entirely when no token is configured.
pub(super) async fn crash_override(
    AxumState(context): AxumState<Arc<AppContext>>,
    headers: HeaderMap,
    Json(request): Json<OverrideRequest>,
) -> axum::response::Response {
    let Some(expected) = context.admin_token.as_deref() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "admin override disabled").into_response();
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if provided != Some(expected) {
        warn!("rejected crash override with missing or wrong token");
        return (StatusCode::FORBIDDEN, "invalid admin token").into_response();
    }

    match context.engine.stage_crash_override(request.value) {
        Ok(replaced) => {
            if replaced.is_some() {
                warn!("crash override replaced a pending unconsumed value");
            }
            info!("crash override staged for next round");
            (
                StatusCode::OK,
                Json(OverrideResponse {
                    staged: true,
                    replaced,
                }),
            )
                .into_response()
        }
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}
