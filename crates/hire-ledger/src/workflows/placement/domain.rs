use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier wrapper for candidates in the pipeline.
    CandidateId
);
identifier!(
    /// Identifier wrapper for offers extended to candidates.
    OfferId
);
identifier!(
    /// Identifier wrapper for hiring clients.
    ClientId
);
identifier!(ActorId);

/// Caller identity passed into every lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: ActorId(id.into()),
            role: role.into(),
        }
    }

    /// Identity used for scheduled sweeps.
    pub fn system() -> Self {
        Self::new("system", "scheduler")
    }
}

/// Pipeline position of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStage {
    Sourced,
    Screening,
    InterviewScheduled,
    InterviewCompleted,
    OfferExtended,
    OfferAccepted,
    Documentation,
    Joined,
    Rejected,
    Dropped,
    OnHold,
}

impl CandidateStage {
    pub const fn ordered() -> [Self; 11] {
        [
            Self::Sourced,
            Self::Screening,
            Self::InterviewScheduled,
            Self::InterviewCompleted,
            Self::OfferExtended,
            Self::OfferAccepted,
            Self::Documentation,
            Self::Joined,
            Self::Rejected,
            Self::Dropped,
            Self::OnHold,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sourced => "sourced",
            Self::Screening => "screening",
            Self::InterviewScheduled => "interview_scheduled",
            Self::InterviewCompleted => "interview_completed",
            Self::OfferExtended => "offer_extended",
            Self::OfferAccepted => "offer_accepted",
            Self::Documentation => "documentation",
            Self::Joined => "joined",
            Self::Rejected => "rejected",
            Self::Dropped => "dropped",
            Self::OnHold => "on_hold",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        let needle = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|stage| stage.label() == needle)
    }
}

impl fmt::Display for CandidateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status of an offer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Extended,
    Accepted,
    Rejected,
    Expired,
    Joined,
    Renege,
}

impl OfferStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Extended => "extended",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Joined => "joined",
            Self::Renege => "renege",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        let needle = value.trim().to_ascii_lowercase();
        [
            Self::Extended,
            Self::Accepted,
            Self::Rejected,
            Self::Expired,
            Self::Joined,
            Self::Renege,
        ]
        .into_iter()
        .find(|status| status.label() == needle)
    }

    /// Active offers block the creation of a new offer for the same candidate.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Extended | Self::Accepted | Self::Joined)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Guarantee safety tier of a joined placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    Monitoring,
    AtRisk,
    Critical,
    Safe,
    Renege,
}

impl PlacementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Monitoring => "monitoring",
            Self::AtRisk => "at_risk",
            Self::Critical => "critical",
            Self::Safe => "safe",
            Self::Renege => "renege",
        }
    }

    pub const fn is_final(self) -> bool {
        matches!(self, Self::Safe | Self::Renege)
    }
}

impl fmt::Display for PlacementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Client fee and replacement-guarantee terms read by the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTerms {
    pub id: ClientId,
    pub name: String,
    pub fee_percentage: Decimal,
    #[serde(default)]
    pub replacement_guarantee_days: Option<u32>,
}

/// Details captured when a candidate is first sourced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub client_id: ClientId,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub expected_ctc: Option<Decimal>,
}

/// Persisted candidate record; `current_stage` is the authoritative pipeline position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub client_id: ClientId,
    pub job_title: Option<String>,
    pub sourced_by: ActorId,
    pub current_stage: CandidateStage,
    /// Stage to return to when leaving `on_hold`.
    pub held_from: Option<CandidateStage>,
    pub expected_ctc: Option<Decimal>,
    pub offered_ctc: Option<Decimal>,
    pub fixed_ctc: Option<Decimal>,
    pub variable_ctc: Option<Decimal>,
    pub billable_ctc: Option<Decimal>,
    pub joining_date: Option<NaiveDate>,
    pub revenue_earned: Option<Decimal>,
    pub revenue_month: Option<u32>,
    pub revenue_year: Option<i32>,
    pub guarantee_period_ends: Option<NaiveDate>,
    pub is_placement_safe: bool,
    pub placement_status: Option<PlacementStatus>,
    pub renege_reason: Option<String>,
    pub renege_date: Option<NaiveDate>,
    pub stage_dates: BTreeMap<CandidateStage, DateTime<Utc>>,
    pub last_activity_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the repository on every commit.
    pub version: u64,
}

impl Candidate {
    pub fn sourced(
        id: CandidateId,
        profile: CandidateProfile,
        sourced_by: ActorId,
        now: DateTime<Utc>,
    ) -> Self {
        let mut stage_dates = BTreeMap::new();
        stage_dates.insert(CandidateStage::Sourced, now);

        Self {
            id,
            name: profile.name,
            email: profile.email,
            phone: profile.phone,
            client_id: profile.client_id,
            job_title: profile.job_title,
            sourced_by,
            current_stage: CandidateStage::Sourced,
            held_from: None,
            expected_ctc: profile.expected_ctc,
            offered_ctc: None,
            fixed_ctc: None,
            variable_ctc: None,
            billable_ctc: None,
            joining_date: None,
            revenue_earned: None,
            revenue_month: None,
            revenue_year: None,
            guarantee_period_ends: None,
            is_placement_safe: false,
            placement_status: None,
            renege_reason: None,
            renege_date: None,
            stage_dates,
            last_activity_date: now,
            created_at: now,
            version: 0,
        }
    }

    /// Pipeline position for reporting: a held candidate reports the stage it was parked from.
    /// Offer reconciliation works from the active offer's status instead.
    pub fn effective_stage(&self) -> CandidateStage {
        match (self.current_stage, self.held_from) {
            (CandidateStage::OnHold, Some(previous)) => previous,
            (stage, _) => stage,
        }
    }

    pub fn stage_date(&self, stage: CandidateStage) -> Option<DateTime<Utc>> {
        self.stage_dates.get(&stage).copied()
    }
}
