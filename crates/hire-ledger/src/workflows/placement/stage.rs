//! Pipeline stage rules for candidates.
//!
//! Any stage may be selected from any other stage so that recruiters can correct mistakes;
//! the rules here only decide what a move implies for the candidate's active offer and which
//! inputs are mandatory.

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{Candidate, CandidateStage, OfferStatus};
use super::error::{ConflictError, ValidationError};

impl CandidateStage {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Joined | Self::Rejected | Self::Dropped)
    }

    /// Active stages are the ones a candidate can be parked from with `on_hold`.
    pub const fn is_active(self) -> bool {
        !self.is_terminal() && !matches!(self, Self::OnHold)
    }

    /// Offer status the candidate's active offer must have while at this stage.
    /// `None` means no offer may be active. Not meaningful for `on_hold`.
    pub const fn expected_offer_status(self) -> Option<OfferStatus> {
        match self {
            Self::OfferExtended => Some(OfferStatus::Extended),
            Self::OfferAccepted | Self::Documentation => Some(OfferStatus::Accepted),
            Self::Joined => Some(OfferStatus::Joined),
            Self::Sourced
            | Self::Screening
            | Self::InterviewScheduled
            | Self::InterviewCompleted
            | Self::Rejected
            | Self::Dropped
            | Self::OnHold => None,
        }
    }
}

/// What a requested stage change amounts to once the current stage is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMove {
    /// Target equals the current stage; nothing is written.
    Unchanged,
    Hold,
    Move,
}

/// Offer side effect needed to keep the active offer aligned with a stage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferSync {
    Keep,
    Accept,
    Reject,
    Expire,
    Join,
    Renege,
}

pub fn classify_move(
    candidate: &Candidate,
    target: CandidateStage,
) -> Result<StageMove, ConflictError> {
    if candidate.current_stage == target {
        return Ok(StageMove::Unchanged);
    }

    if target == CandidateStage::OnHold {
        if !candidate.current_stage.is_active() {
            return Err(ConflictError::HoldFromInactiveStage {
                candidate: candidate.id.clone(),
                stage: candidate.current_stage,
            });
        }
        return Ok(StageMove::Hold);
    }

    Ok(StageMove::Move)
}

/// Decide how the active offer follows a move to `target`.
pub fn offer_sync(
    candidate: &Candidate,
    target: CandidateStage,
    active_offer: Option<OfferStatus>,
) -> Result<OfferSync, ConflictError> {
    if target == CandidateStage::OnHold {
        return Ok(OfferSync::Keep);
    }

    let sync = match (target.expected_offer_status(), active_offer) {
        (None, None) => Some(OfferSync::Keep),
        (None, Some(OfferStatus::Extended)) => Some(if target == CandidateStage::Rejected {
            OfferSync::Reject
        } else {
            OfferSync::Expire
        }),
        (None, Some(OfferStatus::Accepted)) => match target {
            CandidateStage::Rejected => Some(OfferSync::Reject),
            CandidateStage::Dropped => Some(OfferSync::Renege),
            _ => None,
        },
        (None, Some(OfferStatus::Joined)) => {
            (target == CandidateStage::Dropped).then_some(OfferSync::Renege)
        }
        (Some(expected), Some(current)) if expected == current => Some(OfferSync::Keep),
        (Some(OfferStatus::Accepted), Some(OfferStatus::Extended)) => Some(OfferSync::Accept),
        (Some(OfferStatus::Joined), Some(OfferStatus::Accepted)) => Some(OfferSync::Join),
        _ => None,
    };

    sync.ok_or_else(|| ConflictError::StageOfferMismatch {
        candidate: candidate.id.clone(),
        target,
        offer: active_offer,
    })
}

/// Set the stage, maintain the hold bookkeeping and stamp the stage and activity dates.
pub fn apply_stage(candidate: &mut Candidate, target: CandidateStage, now: DateTime<Utc>) {
    if target == CandidateStage::OnHold {
        candidate.held_from = Some(candidate.current_stage);
    } else {
        candidate.held_from = None;
    }

    candidate.current_stage = target;
    candidate.stage_dates.insert(target, now);
    candidate.last_activity_date = now;
}

pub fn require_joining_date(
    candidate: &Candidate,
    joining_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    let date = joining_date.ok_or_else(|| ValidationError::MissingJoiningDate {
        candidate: candidate.id.clone(),
    })?;

    if date > today {
        return Err(ValidationError::JoiningDateInFuture { date, today });
    }

    Ok(date)
}

pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        raw: raw.to_string(),
    })
}

pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_calendar_date(value).map(Some),
    }
}
