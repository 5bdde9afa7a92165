//! Replacement-guarantee tracking for joined candidates.
//!
//! The tier is always recomputed from `guarantee_period_ends` and the evaluation date. The
//! status stored on the record is a cache refreshed by sweeps; promotion to `safe` and renege
//! reversal are the only transitions that change money or final state.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{CandidateId, ClientTerms, OfferId, PlacementStatus};
use super::error::{ConflictError, ValidationError};

pub const DEFAULT_GUARANTEE_DAYS: u32 = 90;
/// Longest replacement guarantee accepted from a client or from configuration.
pub const MAX_GUARANTEE_DAYS: u32 = 3_650;
pub const DEFAULT_AT_RISK_DAYS: u32 = 30;
pub const DEFAULT_CRITICAL_DAYS: u32 = 7;

/// Day counts at or below which a placement is at risk or critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyThresholds {
    pub at_risk_days: u32,
    pub critical_days: u32,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            at_risk_days: DEFAULT_AT_RISK_DAYS,
            critical_days: DEFAULT_CRITICAL_DAYS,
        }
    }
}

impl SafetyThresholds {
    pub fn tier(&self, days_remaining: u32) -> PlacementStatus {
        if days_remaining <= self.critical_days {
            PlacementStatus::Critical
        } else if days_remaining <= self.at_risk_days {
            PlacementStatus::AtRisk
        } else {
            PlacementStatus::Monitoring
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuaranteePolicy {
    /// Used when a client has no `replacement_guarantee_days` of its own.
    pub default_guarantee_days: u32,
    pub thresholds: SafetyThresholds,
}

impl Default for GuaranteePolicy {
    fn default() -> Self {
        Self {
            default_guarantee_days: DEFAULT_GUARANTEE_DAYS,
            thresholds: SafetyThresholds::default(),
        }
    }
}

impl GuaranteePolicy {
    pub fn guarantee_days(&self, client: &ClientTerms) -> u32 {
        client
            .replacement_guarantee_days
            .unwrap_or(self.default_guarantee_days)
    }

    pub fn period_end(
        &self,
        joined_on: NaiveDate,
        client: &ClientTerms,
    ) -> Result<NaiveDate, ValidationError> {
        let days = self.guarantee_days(client);
        validate_guarantee_days(days)?;
        joined_on
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or(ValidationError::GuaranteeEndOutOfRange { joined_on, days })
    }
}

pub fn validate_guarantee_days(days: u32) -> Result<(), ValidationError> {
    if days > MAX_GUARANTEE_DAYS {
        return Err(ValidationError::InvalidGuaranteeDays {
            days,
            max: MAX_GUARANTEE_DAYS,
        });
    }
    Ok(())
}

pub fn days_remaining(period_ends: NaiveDate, today: NaiveDate) -> u32 {
    let days = (period_ends - today).num_days().max(0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Read model returned by the classification query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyClassification {
    pub guarantee_period_ends: NaiveDate,
    pub days_remaining: u32,
    pub status: PlacementStatus,
    pub is_placement_safe: bool,
    /// Window has elapsed without a renege, so the placement may be promoted to `safe`.
    pub eligible_for_safe: bool,
}

/// Outcome of applying a renege to a guarantee record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenegeAssessment {
    pub within_window: bool,
    pub revenue_reversed: Decimal,
}

/// One record per joined candidate, opened at the moment of joining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRecord {
    pub candidate_id: CandidateId,
    pub offer_id: OfferId,
    pub joined_on: NaiveDate,
    pub guarantee_period_ends: NaiveDate,
    pub safety_status: PlacementStatus,
    pub is_placement_safe: bool,
    pub revenue_at_stake: Decimal,
    pub revenue_reversed: Decimal,
    pub renege_reason: Option<String>,
    pub renege_date: Option<NaiveDate>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SafetyRecord {
    pub fn open(
        candidate_id: CandidateId,
        offer_id: OfferId,
        joined_on: NaiveDate,
        guarantee_period_ends: NaiveDate,
        revenue_at_stake: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            candidate_id,
            offer_id,
            joined_on,
            guarantee_period_ends,
            safety_status: PlacementStatus::Monitoring,
            is_placement_safe: false,
            revenue_at_stake,
            revenue_reversed: Decimal::ZERO,
            renege_reason: None,
            renege_date: None,
            opened_at: now,
            updated_at: now,
        }
    }

    pub fn classify(&self, today: NaiveDate, thresholds: &SafetyThresholds) -> SafetyClassification {
        let days_remaining = days_remaining(self.guarantee_period_ends, today);
        let status = if self.safety_status.is_final() {
            self.safety_status
        } else {
            thresholds.tier(days_remaining)
        };

        SafetyClassification {
            guarantee_period_ends: self.guarantee_period_ends,
            days_remaining,
            status,
            is_placement_safe: self.is_placement_safe,
            eligible_for_safe: !self.safety_status.is_final() && days_remaining == 0,
        }
    }

    /// Update the cached tier; returns `true` when the stored status changed.
    pub fn refresh(
        &mut self,
        today: NaiveDate,
        thresholds: &SafetyThresholds,
        now: DateTime<Utc>,
    ) -> bool {
        if self.safety_status.is_final() {
            return false;
        }
        let tier = self.classify(today, thresholds).status;
        if tier == self.safety_status {
            return false;
        }
        self.safety_status = tier;
        self.updated_at = now;
        true
    }

    pub fn promote(&mut self, today: NaiveDate, now: DateTime<Utc>) -> Result<(), ConflictError> {
        match self.safety_status {
            PlacementStatus::Renege => {
                return Err(ConflictError::PlacementReneged {
                    candidate: self.candidate_id.clone(),
                })
            }
            PlacementStatus::Safe => return Ok(()),
            _ => {}
        }
        if days_remaining(self.guarantee_period_ends, today) > 0 {
            return Err(ConflictError::GuaranteeWindowOpen {
                candidate: self.candidate_id.clone(),
                ends: self.guarantee_period_ends,
            });
        }

        self.safety_status = PlacementStatus::Safe;
        self.is_placement_safe = true;
        self.updated_at = now;
        Ok(())
    }

    /// Record a renege. Inside the window (and before promotion) the revenue is reversed;
    /// after it the placement is settled as safe and the revenue stands.
    pub fn register_renege(
        &mut self,
        renege_date: NaiveDate,
        reason: &str,
        now: DateTime<Utc>,
    ) -> RenegeAssessment {
        let within_window = self.safety_status != PlacementStatus::Safe
            && renege_date <= self.guarantee_period_ends;

        self.renege_reason = Some(reason.to_string());
        self.renege_date = Some(renege_date);
        self.updated_at = now;

        if within_window {
            self.safety_status = PlacementStatus::Renege;
            self.is_placement_safe = false;
            self.revenue_reversed = self.revenue_at_stake;
        } else {
            self.safety_status = PlacementStatus::Safe;
            self.is_placement_safe = true;
        }

        RenegeAssessment {
            within_window,
            revenue_reversed: self.revenue_reversed,
        }
    }
}
