use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::workflows::placement::audit::{AuditEntry, AuditError, AuditTrail};
use crate::workflows::placement::domain::{
    Actor, Candidate, CandidateId, CandidateProfile, ClientId, ClientTerms, OfferId,
    OfferStatus,
};
use crate::workflows::placement::offer::{Offer, OfferTerms};
use crate::workflows::placement::repository::{
    LifecycleCommit, PlacementRepository, RepositoryError,
};
use crate::workflows::placement::safety::SafetyRecord;
use crate::workflows::placement::{
    placement_router, FixedClock, GuaranteePolicy, InMemoryAuditTrail, InMemoryPlacementStore,
    OfferStatusContext, PlacementLifecycleService,
};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Clock start for every harness.
pub(super) fn today() -> NaiveDate {
    date(2026, 1, 20)
}

pub(super) fn joining_day() -> NaiveDate {
    date(2026, 1, 15)
}

pub(super) fn rupees(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

pub(super) fn standard_fee() -> Decimal {
    Decimal::new(833, 2)
}

pub(super) fn recruiter() -> Actor {
    Actor::new("recruiter-7", "recruiter")
}

pub(super) fn client_terms() -> ClientTerms {
    ClientTerms {
        id: ClientId("client-acme".to_string()),
        name: "Acme Analytics".to_string(),
        fee_percentage: standard_fee(),
        replacement_guarantee_days: None,
    }
}

pub(super) fn profile() -> CandidateProfile {
    CandidateProfile {
        name: "Priya Raman".to_string(),
        email: "priya.raman@example.com".to_string(),
        phone: Some("+91 98450 12345".to_string()),
        client_id: client_terms().id,
        job_title: Some("Data Engineer".to_string()),
        expected_ctc: Some(rupees(1_100_000)),
    }
}

pub(super) fn offer_terms(fixed: i64, variable: i64) -> OfferTerms {
    OfferTerms {
        fixed_ctc: rupees(fixed),
        variable_ctc: rupees(variable),
        expected_joining_date: joining_day(),
        job_title: Some("Data Engineer".to_string()),
    }
}

pub(super) struct Harness<A: AuditTrail + 'static = InMemoryAuditTrail> {
    pub service: Arc<PlacementLifecycleService<InMemoryPlacementStore, A>>,
    pub store: Arc<InMemoryPlacementStore>,
    pub audit: Arc<A>,
    pub clock: Arc<FixedClock>,
}

pub(super) fn harness() -> Harness {
    harness_with(Arc::new(InMemoryAuditTrail::default()))
}

pub(super) fn harness_with<A: AuditTrail + 'static>(audit: Arc<A>) -> Harness<A> {
    build_harness(audit, GuaranteePolicy::default())
}

pub(super) fn harness_with_policy(policy: GuaranteePolicy) -> Harness {
    build_harness(Arc::new(InMemoryAuditTrail::default()), policy)
}

fn build_harness<A: AuditTrail + 'static>(audit: Arc<A>, policy: GuaranteePolicy) -> Harness<A> {
    let store = Arc::new(InMemoryPlacementStore::default());
    let clock = Arc::new(FixedClock::at(today()));
    let service = PlacementLifecycleService::with_clock(
        store.clone(),
        audit.clone(),
        policy,
        clock.clone(),
    );
    service
        .upsert_client(client_terms(), &recruiter())
        .expect("client terms stored");

    Harness {
        service: Arc::new(service),
        store,
        audit,
        clock,
    }
}

impl<A: AuditTrail + 'static> Harness<A> {
    pub fn register(&self) -> Candidate {
        self.service
            .register_candidate(profile(), &recruiter())
            .expect("candidate registered")
            .into_record()
    }

    pub fn stored(&self, id: &CandidateId) -> Candidate {
        self.store
            .fetch_candidate(id)
            .expect("store readable")
            .expect("candidate present")
    }

    pub fn stored_offer(&self, id: &OfferId) -> Offer {
        self.store
            .fetch_offer(id)
            .expect("store readable")
            .expect("offer present")
    }

    pub fn extended(&self, fixed: i64, variable: i64) -> (Candidate, Offer) {
        let candidate = self.register();
        let offer = self
            .service
            .create_offer(&candidate.id, offer_terms(fixed, variable), &recruiter())
            .expect("offer created")
            .into_record();
        (self.stored(&candidate.id), offer)
    }

    pub fn accepted(&self, fixed: i64, variable: i64) -> (Candidate, Offer) {
        let (candidate, offer) = self.extended(fixed, variable);
        let offer = self
            .service
            .update_offer_status(
                &offer.id,
                OfferStatus::Accepted,
                &recruiter(),
                OfferStatusContext::default(),
            )
            .expect("offer accepted")
            .into_record();
        (self.stored(&candidate.id), offer)
    }

    pub fn joined(&self, fixed: i64, joining_date: NaiveDate) -> (Candidate, Offer) {
        let (candidate, offer) = self.accepted(fixed, 0);
        let offer = self
            .service
            .update_offer_status(
                &offer.id,
                OfferStatus::Joined,
                &recruiter(),
                OfferStatusContext {
                    joining_date: Some(joining_date),
                    ..OfferStatusContext::default()
                },
            )
            .expect("candidate joined")
            .into_record();
        (self.stored(&candidate.id), offer)
    }

    pub fn safety(&self, id: &CandidateId) -> SafetyRecord {
        self.store
            .fetch_safety(id)
            .expect("store readable")
            .expect("guarantee record present")
    }
}

impl Harness {
    pub fn timeline_len(&self, id: &CandidateId) -> usize {
        self.audit.entries_for(id).expect("audit readable").len()
    }
}

/// Audit sink that is always down.
#[derive(Debug, Default)]
pub(super) struct FailingAudit;

impl AuditTrail for FailingAudit {
    fn append(&self, _entry: AuditEntry) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit database offline".to_string()))
    }

    fn entries_for(&self, _candidate: &CandidateId) -> Result<Vec<AuditEntry>, AuditError> {
        Err(AuditError::Unavailable("audit database offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl PlacementRepository for UnavailableRepository {
    fn insert_candidate(&self, _candidate: Candidate) -> Result<Candidate, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_candidate(&self, _id: &CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_offer(&self, _id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn active_offer(&self, _candidate: &CandidateId) -> Result<Option<Offer>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn offers_for(&self, _candidate: &CandidateId) -> Result<Vec<Offer>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn upsert_client(&self, _client: ClientTerms) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_client(&self, _id: &ClientId) -> Result<Option<ClientTerms>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_safety(
        &self,
        _candidate: &CandidateId,
    ) -> Result<Option<SafetyRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn open_placements(&self) -> Result<Vec<SafetyRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit(&self, _commit: LifecycleCommit) -> Result<Candidate, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_for(harness: &Harness) -> axum::Router {
    placement_router(harness.service.clone())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
