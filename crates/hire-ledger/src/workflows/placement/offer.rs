use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{Candidate, CandidateId, ClientId, ClientTerms, OfferId, OfferStatus};
use super::error::{ConflictError, LifecycleError, ValidationError};
use super::revenue;

/// Compensation, dates and job details proposed to a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferTerms {
    pub fixed_ctc: Decimal,
    #[serde(default)]
    pub variable_ctc: Decimal,
    pub expected_joining_date: NaiveDate,
    #[serde(default)]
    pub job_title: Option<String>,
}

impl OfferTerms {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.fixed_ctc <= Decimal::ZERO {
            return Err(ValidationError::InvalidCompensation {
                field: "fixed_ctc",
                requirement: "greater than zero",
                value: self.fixed_ctc,
            });
        }
        if self.variable_ctc < Decimal::ZERO {
            return Err(ValidationError::InvalidCompensation {
                field: "variable_ctc",
                requirement: "zero or positive",
                value: self.variable_ctc,
            });
        }
        Ok(())
    }
}

/// Persisted offer record. `revenue_percentage` is frozen from the client at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub candidate_id: CandidateId,
    pub client_id: ClientId,
    pub status: OfferStatus,
    pub fixed_ctc: Decimal,
    pub variable_ctc: Decimal,
    pub offered_ctc: Decimal,
    pub billable_ctc: Decimal,
    pub revenue_percentage: Decimal,
    pub expected_joining_date: NaiveDate,
    pub actual_joining_date: Option<NaiveDate>,
    pub job_title: Option<String>,
    pub renege_reason: Option<String>,
    pub renege_date: Option<NaiveDate>,
    pub extended_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn extend(
        id: OfferId,
        candidate_id: CandidateId,
        client: &ClientTerms,
        terms: OfferTerms,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let mut offer = Self {
            id,
            candidate_id,
            client_id: client.id.clone(),
            status: OfferStatus::Extended,
            fixed_ctc: Decimal::ZERO,
            variable_ctc: Decimal::ZERO,
            offered_ctc: Decimal::ZERO,
            billable_ctc: Decimal::ZERO,
            revenue_percentage: client.fee_percentage,
            expected_joining_date: terms.expected_joining_date,
            actual_joining_date: None,
            job_title: None,
            renege_reason: None,
            renege_date: None,
            extended_at: now,
            responded_at: None,
            updated_at: now,
        };
        offer.apply_terms(terms, now)?;
        Ok(offer)
    }

    /// Edit terms in place; only permitted while the offer is still `extended`.
    pub fn amend(&mut self, terms: OfferTerms, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if self.status != OfferStatus::Extended {
            return Err(ConflictError::OfferLocked {
                offer: self.id.clone(),
                status: self.status,
            }
            .into());
        }
        self.apply_terms(terms, now)?;
        Ok(())
    }

    /// Terms are only taken once the revenue they would earn at join time is computable.
    fn apply_terms(&mut self, terms: OfferTerms, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let offered_ctc = revenue::offered_ctc(terms.fixed_ctc, terms.variable_ctc)?;
        revenue::recognized_revenue(terms.fixed_ctc, self.revenue_percentage)?;

        self.fixed_ctc = terms.fixed_ctc;
        self.variable_ctc = terms.variable_ctc;
        self.offered_ctc = offered_ctc;
        self.billable_ctc = revenue::billable_ctc(terms.fixed_ctc);
        self.expected_joining_date = terms.expected_joining_date;
        if terms.job_title.is_some() {
            self.job_title = terms.job_title;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Move to `next`, refusing anything outside the offer status graph.
    pub fn transition(&mut self, next: OfferStatus, now: DateTime<Utc>) -> Result<(), ConflictError> {
        if !self.status.can_transition_to(next) {
            return Err(ConflictError::IllegalOfferTransition {
                offer: self.id.clone(),
                from: self.status,
                to: next,
            });
        }

        if self.status == OfferStatus::Extended {
            self.responded_at = Some(now);
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

impl OfferStatus {
    pub const fn can_transition_to(self, next: OfferStatus) -> bool {
        matches!(
            (self, next),
            (OfferStatus::Extended, OfferStatus::Accepted)
                | (OfferStatus::Extended, OfferStatus::Rejected)
                | (OfferStatus::Extended, OfferStatus::Expired)
                | (OfferStatus::Accepted, OfferStatus::Rejected)
                | (OfferStatus::Accepted, OfferStatus::Joined)
                | (OfferStatus::Accepted, OfferStatus::Renege)
                | (OfferStatus::Joined, OfferStatus::Renege)
        )
    }
}

/// Copy the offer's compensation onto the candidate for fast reads.
pub fn mirror_compensation(candidate: &mut Candidate, offer: &Offer) {
    candidate.fixed_ctc = Some(offer.fixed_ctc);
    candidate.variable_ctc = Some(offer.variable_ctc);
    candidate.offered_ctc = Some(offer.offered_ctc);
    candidate.billable_ctc = Some(offer.billable_ctc);
}

/// Fail if `active` holds an offer that still blocks a new one.
pub fn ensure_no_active_offer(
    candidate: &CandidateId,
    active: Option<&Offer>,
) -> Result<(), ConflictError> {
    match active {
        Some(offer) if offer.status.is_active() => Err(ConflictError::ActiveOfferExists {
            candidate: candidate.clone(),
            offer: offer.id.clone(),
        }),
        _ => Ok(()),
    }
}
