//! Candidate placement lifecycle: pipeline stages, offers, revenue recognition and the
//! replacement-guarantee window that follows a joining.
//!
//! [`PlacementLifecycleService`] is the single entry point for every state change. It reads the
//! current records, computes the complete change, and commits candidate, offer and guarantee
//! record together through [`PlacementRepository::commit`] before appending to the audit trail.

pub mod audit;
pub mod clock;
pub mod domain;
pub mod error;
pub mod memory;
pub mod offer;
pub mod repository;
pub mod revenue;
pub mod router;
pub mod safety;
pub mod service;
pub mod stage;

#[cfg(test)]
mod tests;

pub use audit::{AuditEntry, AuditError, AuditEvent, AuditStatus, AuditTrail, Recorded};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    Actor, ActorId, Candidate, CandidateId, CandidateProfile, CandidateStage, ClientId,
    ClientTerms, OfferId, OfferStatus, PlacementStatus,
};
pub use error::{ConflictError, EntityRef, LifecycleError, ValidationError};
pub use memory::{InMemoryAuditTrail, InMemoryPlacementStore};
pub use offer::{Offer, OfferTerms};
pub use repository::{
    LifecycleCommit, OfferWrite, PlacementRepository, RepositoryError, SafetyWrite,
};
pub use revenue::{AccountingPeriod, RevenueRecognition};
pub use router::placement_router;
pub use safety::{
    GuaranteePolicy, SafetyClassification, SafetyRecord, SafetyThresholds,
    DEFAULT_AT_RISK_DAYS, DEFAULT_CRITICAL_DAYS, DEFAULT_GUARANTEE_DAYS, MAX_GUARANTEE_DAYS,
};
pub use service::{OfferStatusContext, PlacementLifecycleService, RenegeOutcome, SweepReport};
pub use stage::{parse_calendar_date, parse_optional_date};
