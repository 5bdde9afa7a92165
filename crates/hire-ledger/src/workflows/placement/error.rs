use std::fmt;

use axum::http::StatusCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::domain::{CandidateId, CandidateStage, ClientId, OfferId, OfferStatus};
use super::repository::RepositoryError;

/// Reference to a record that a lifecycle call could not find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Candidate(CandidateId),
    Offer(OfferId),
    Client(ClientId),
    SafetyRecord(CandidateId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Candidate(id) => write!(f, "candidate {id}"),
            EntityRef::Offer(id) => write!(f, "offer {id}"),
            EntityRef::Client(id) => write!(f, "client {id}"),
            EntityRef::SafetyRecord(id) => write!(f, "guarantee record for candidate {id}"),
        }
    }
}

/// Malformed or missing input; the caller must fix and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("joining date is required to move candidate {candidate} to joined")]
    MissingJoiningDate { candidate: CandidateId },
    #[error("joining date {date} is after today ({today})")]
    JoiningDateInFuture { date: NaiveDate, today: NaiveDate },
    #[error("'{raw}' is not a calendar date in YYYY-MM-DD form")]
    InvalidDate { raw: String },
    #[error("{field} must be {requirement} (found {value})")]
    InvalidCompensation {
        field: &'static str,
        requirement: &'static str,
        value: Decimal,
    },
    #[error("fee percentage must be greater than 0 and at most 100 (found {0})")]
    InvalidFeePercentage(Decimal),
    #[error("replacement guarantee of {days} days exceeds the {max} day limit")]
    InvalidGuaranteeDays { days: u32, max: u32 },
    #[error("guarantee of {days} days from {joined_on} ends past the last representable date")]
    GuaranteeEndOutOfRange { joined_on: NaiveDate, days: u32 },
    #[error("'{value}' is not a known {kind}")]
    UnknownLabel { kind: &'static str, value: String },
    #[error("{0} must not be blank")]
    MissingField(&'static str),
    #[error("renege date {date} is after today ({today})")]
    RenegeDateInFuture { date: NaiveDate, today: NaiveDate },
    #[error("renege date {date} precedes joining date {joined}")]
    RenegeBeforeJoining { date: NaiveDate, joined: NaiveDate },
}

/// State precondition violated; surfaced to an operator for a manual decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("candidate {candidate} already has active offer {offer}")]
    ActiveOfferExists {
        candidate: CandidateId,
        offer: OfferId,
    },
    #[error("offer {offer} cannot move from {from} to {to}")]
    IllegalOfferTransition {
        offer: OfferId,
        from: OfferStatus,
        to: OfferStatus,
    },
    #[error("offer {offer} is {status}; terms can only be edited while extended")]
    OfferLocked { offer: OfferId, status: OfferStatus },
    #[error("candidate {candidate} cannot move to {target} while its active offer is {}", describe_offer(.offer))]
    StageOfferMismatch {
        candidate: CandidateId,
        target: CandidateStage,
        offer: Option<OfferStatus>,
    },
    #[error("candidate {candidate} cannot be put on hold from {stage}")]
    HoldFromInactiveStage {
        candidate: CandidateId,
        stage: CandidateStage,
    },
    #[error("candidate {candidate} has no accepted or joined offer to renege")]
    NoRenegeableOffer { candidate: CandidateId },
    #[error("candidate {candidate} has not joined; no guarantee window is open")]
    NotPlaced { candidate: CandidateId },
    #[error("guarantee window for candidate {candidate} runs until {ends}")]
    GuaranteeWindowOpen {
        candidate: CandidateId,
        ends: NaiveDate,
    },
    #[error("placement for candidate {candidate} was reneged")]
    PlacementReneged { candidate: CandidateId },
    #[error("concurrent modification detected: {0}")]
    ConcurrentModification(String),
}

fn describe_offer(offer: &Option<OfferStatus>) -> &'static str {
    match offer {
        Some(status) => status.label(),
        None => "absent",
    }
}

/// Error taxonomy returned by every lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),
    #[error("{0} not found")]
    NotFound(EntityRef),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for LifecycleError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::PreconditionFailed(detail) => {
                Self::Conflict(ConflictError::ConcurrentModification(detail))
            }
            other => Self::Repository(other),
        }
    }
}

impl LifecycleError {
    pub const fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Validation(_) => "validation",
            LifecycleError::Conflict(_) => "conflict",
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::Repository(_) => "repository",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LifecycleError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::Conflict(_) => StatusCode::CONFLICT,
            LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
            LifecycleError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            LifecycleError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
