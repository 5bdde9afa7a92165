use crate::infra::{quote_placement, AppState, PlacementQuote, QuoteRequest};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use hire_ledger::error::AppError;
use hire_ledger::workflows::placement::{
    placement_router, AuditTrail, GuaranteePolicy, PlacementLifecycleService, PlacementRepository,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_placement_routes<R, A>(
    service: Arc<PlacementLifecycleService<R, A>>,
) -> axum::Router
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let policy = *service.policy();
    placement_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/revenue/quote",
            axum::routing::post(move |payload: Json<QuoteRequest>| {
                quote_endpoint(policy, payload)
            }),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn quote_endpoint(
    policy: GuaranteePolicy,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<PlacementQuote>, AppError> {
    let quote = quote_placement(&request, &policy)?;
    Ok(Json(quote))
}
