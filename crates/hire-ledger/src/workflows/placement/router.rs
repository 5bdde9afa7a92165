use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::audit::AuditTrail;
use super::domain::{
    Actor, CandidateId, CandidateProfile, CandidateStage, ClientId, ClientTerms, OfferId,
    OfferStatus,
};
use super::error::{LifecycleError, ValidationError};
use super::offer::OfferTerms;
use super::repository::PlacementRepository;
use super::service::{OfferStatusContext, PlacementLifecycleService};
use super::stage::{parse_calendar_date, parse_optional_date};

/// Router builder exposing the placement lifecycle over HTTP.
pub fn placement_router<R, A>(service: Arc<PlacementLifecycleService<R, A>>) -> Router
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    Router::new()
        .route("/api/v1/clients", post(upsert_client_handler::<R, A>))
        .route("/api/v1/candidates", post(register_candidate_handler::<R, A>))
        .route(
            "/api/v1/candidates/:candidate_id",
            get(candidate_handler::<R, A>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/stage",
            post(stage_handler::<R, A>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/offers",
            post(create_offer_handler::<R, A>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/renege",
            post(renege_handler::<R, A>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/safety",
            get(safety_handler::<R, A>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/safety/confirm",
            post(confirm_safe_handler::<R, A>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/timeline",
            get(timeline_handler::<R, A>),
        )
        .route("/api/v1/offers/:offer_id", patch(amend_offer_handler::<R, A>))
        .route(
            "/api/v1/offers/:offer_id/status",
            post(offer_status_handler::<R, A>),
        )
        .route("/api/v1/placements/sweep", post(sweep_handler::<R, A>))
        .with_state(service)
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertClientRequest {
    pub actor_id: String,
    #[serde(default)]
    pub role: Option<String>,
    pub client_id: String,
    pub name: String,
    pub fee_percentage: Decimal,
    #[serde(default)]
    pub replacement_guarantee_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCandidateRequest {
    pub actor_id: String,
    #[serde(default)]
    pub role: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub client_id: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub expected_ctc: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageRequest {
    pub actor_id: String,
    #[serde(default)]
    pub role: Option<String>,
    pub stage: String,
    #[serde(default)]
    pub joining_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferRequest {
    pub actor_id: String,
    #[serde(default)]
    pub role: Option<String>,
    pub fixed_ctc: Decimal,
    #[serde(default)]
    pub variable_ctc: Option<Decimal>,
    pub expected_joining_date: String,
    #[serde(default)]
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferStatusRequest {
    pub actor_id: String,
    #[serde(default)]
    pub role: Option<String>,
    pub status: String,
    #[serde(default)]
    pub joining_date: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub renege_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenegeRequest {
    pub actor_id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub renege_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActorRequest {
    pub actor_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

fn actor(actor_id: &str, role: Option<&str>) -> Result<Actor, LifecycleError> {
    let actor_id = actor_id.trim();
    if actor_id.is_empty() {
        return Err(ValidationError::MissingField("actor_id").into());
    }
    Ok(Actor::new(actor_id, role.unwrap_or("recruiter")))
}

fn offer_terms(request: OfferRequest) -> Result<(Actor, OfferTerms), LifecycleError> {
    let actor = actor(&request.actor_id, request.role.as_deref())?;
    let terms = OfferTerms {
        fixed_ctc: request.fixed_ctc,
        variable_ctc: request.variable_ctc.unwrap_or(Decimal::ZERO),
        expected_joining_date: parse_calendar_date(&request.expected_joining_date)?,
        job_title: request.job_title,
    };
    Ok((actor, terms))
}

fn respond<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (status, axum::Json(body)).into_response()
}

fn error_response(err: LifecycleError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "placement request failed");
    }
    let payload = json!({
        "error": err.to_string(),
        "kind": err.kind(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn upsert_client_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    axum::Json(request): axum::Json<UpsertClientRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let result = actor(&request.actor_id, request.role.as_deref()).and_then(|actor| {
        let client = ClientTerms {
            id: ClientId(request.client_id),
            name: request.name,
            fee_percentage: request.fee_percentage,
            replacement_guarantee_days: request.replacement_guarantee_days,
        };
        service.upsert_client(client, &actor)
    });

    match result {
        Ok(recorded) => respond(StatusCode::OK, &recorded),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn register_candidate_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    axum::Json(request): axum::Json<RegisterCandidateRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let result = actor(&request.actor_id, request.role.as_deref()).and_then(|actor| {
        let profile = CandidateProfile {
            name: request.name,
            email: request.email,
            phone: request.phone,
            client_id: ClientId(request.client_id),
            job_title: request.job_title,
            expected_ctc: request.expected_ctc,
        };
        service.register_candidate(profile, &actor)
    });

    match result {
        Ok(recorded) => respond(StatusCode::CREATED, &recorded),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn candidate_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let id = CandidateId(candidate_id);
    let result = service
        .candidate(&id)
        .and_then(|candidate| Ok((candidate, service.offers_for(&id)?)));

    match result {
        Ok((candidate, offers)) => respond(
            StatusCode::OK,
            &json!({ "candidate": candidate, "offers": offers }),
        ),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stage_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    Path(candidate_id): Path<String>,
    axum::Json(request): axum::Json<StageRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let result = (|| -> Result<_, LifecycleError> {
        let actor = actor(&request.actor_id, request.role.as_deref())?;
        let target = CandidateStage::from_label(&request.stage).ok_or_else(|| {
            ValidationError::UnknownLabel {
                kind: "candidate stage",
                value: request.stage.clone(),
            }
        })?;
        let joining_date = parse_optional_date(request.joining_date.as_deref())?;
        service.transition_stage(&CandidateId(candidate_id), target, &actor, joining_date)
    })();

    match result {
        Ok(recorded) => respond(StatusCode::OK, &recorded),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_offer_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    Path(candidate_id): Path<String>,
    axum::Json(request): axum::Json<OfferRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let result = offer_terms(request)
        .and_then(|(actor, terms)| service.create_offer(&CandidateId(candidate_id), terms, &actor));

    match result {
        Ok(recorded) => respond(StatusCode::CREATED, &recorded),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn amend_offer_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    Path(offer_id): Path<String>,
    axum::Json(request): axum::Json<OfferRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let result = offer_terms(request)
        .and_then(|(actor, terms)| service.amend_offer(&OfferId(offer_id), terms, &actor));

    match result {
        Ok(recorded) => respond(StatusCode::OK, &recorded),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn offer_status_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    Path(offer_id): Path<String>,
    axum::Json(request): axum::Json<OfferStatusRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let result = (|| -> Result<_, LifecycleError> {
        let actor = actor(&request.actor_id, request.role.as_deref())?;
        let status = OfferStatus::from_label(&request.status).ok_or_else(|| {
            ValidationError::UnknownLabel {
                kind: "offer status",
                value: request.status.clone(),
            }
        })?;
        let context = OfferStatusContext {
            joining_date: parse_optional_date(request.joining_date.as_deref())?,
            reason: request.reason.clone(),
            renege_date: parse_optional_date(request.renege_date.as_deref())?,
        };
        service.update_offer_status(&OfferId(offer_id), status, &actor, context)
    })();

    match result {
        Ok(recorded) => respond(StatusCode::OK, &recorded),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn renege_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    Path(candidate_id): Path<String>,
    axum::Json(request): axum::Json<RenegeRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let result = (|| -> Result<_, LifecycleError> {
        let actor = actor(&request.actor_id, request.role.as_deref())?;
        let renege_date = parse_optional_date(request.renege_date.as_deref())?;
        service.record_renege(
            &CandidateId(candidate_id),
            &request.reason,
            &actor,
            renege_date,
        )
    })();

    match result {
        Ok(recorded) => respond(StatusCode::OK, &recorded),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn safety_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    match service.safety_classification(&CandidateId(candidate_id)) {
        Ok(classification) => respond(StatusCode::OK, &classification),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn confirm_safe_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    Path(candidate_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let result = actor(&request.actor_id, request.role.as_deref())
        .and_then(|actor| service.confirm_safe(&CandidateId(candidate_id), &actor));

    match result {
        Ok(recorded) => respond(StatusCode::OK, &recorded),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn timeline_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    match service.timeline(&CandidateId(candidate_id)) {
        Ok(entries) => respond(StatusCode::OK, &entries),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn sweep_handler<R, A>(
    State(service): State<Arc<PlacementLifecycleService<R, A>>>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    let result = actor(&request.actor_id, request.role.as_deref())
        .and_then(|actor| service.sweep_placements(&actor));

    match result {
        Ok(report) => respond(StatusCode::OK, &report),
        Err(err) => error_response(err),
    }
}
