use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{Actor, CandidateId, OfferId};

/// Kind of lifecycle event captured on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    ClientTermsUpdated,
    CandidateRegistered,
    StageChanged,
    OfferCreated,
    OfferAmended,
    OfferStatusChanged,
    CandidateJoined,
    RenegeRecorded,
    PlacementSafe,
}

impl AuditEvent {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ClientTermsUpdated => "client_terms_updated",
            Self::CandidateRegistered => "candidate_registered",
            Self::StageChanged => "stage_changed",
            Self::OfferCreated => "offer_created",
            Self::OfferAmended => "offer_amended",
            Self::OfferStatusChanged => "offer_status_changed",
            Self::CandidateJoined => "candidate_joined",
            Self::RenegeRecorded => "renege_recorded",
            Self::PlacementSafe => "placement_safe",
        }
    }
}

/// Immutable timeline entry. `payload` carries the old/new values of the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub event: AuditEvent,
    pub actor: Actor,
    pub candidate_id: Option<CandidateId>,
    pub offer_id: Option<OfferId>,
    pub description: String,
    pub payload: Value,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only sink for lifecycle events, read back only by dashboards.
pub trait AuditTrail: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;
    fn entries_for(&self, candidate: &CandidateId) -> Result<Vec<AuditEntry>, AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit trail unavailable: {0}")]
    Unavailable(String),
}

/// Whether the audit entry for a committed change made it to the trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum AuditStatus {
    Appended,
    /// The call changed nothing, so nothing was recorded.
    NotRequired,
    Failed(String),
}

impl AuditStatus {
    pub fn warning(&self) -> Option<&str> {
        match self {
            AuditStatus::Failed(reason) => Some(reason.as_str()),
            AuditStatus::Appended | AuditStatus::NotRequired => None,
        }
    }
}

/// Result of a mutating lifecycle call together with its audit outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recorded<T> {
    pub record: T,
    pub audit: AuditStatus,
}

impl<T> Recorded<T> {
    pub fn into_record(self) -> T {
        self.record
    }
}
