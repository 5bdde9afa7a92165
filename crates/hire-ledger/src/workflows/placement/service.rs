use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::audit::{AuditEntry, AuditEvent, AuditStatus, AuditTrail, Recorded};
use super::clock::{Clock, SystemClock};
use super::domain::{
    Actor, Candidate, CandidateId, CandidateProfile, CandidateStage, ClientId, ClientTerms,
    OfferId, OfferStatus, PlacementStatus,
};
use super::error::{ConflictError, EntityRef, LifecycleError, ValidationError};
use super::offer::{self, Offer, OfferTerms};
use super::repository::{
    LifecycleCommit, OfferWrite, PlacementRepository, RepositoryError, SafetyWrite,
};
use super::revenue;
use super::safety::{self, GuaranteePolicy, SafetyClassification, SafetyRecord};
use super::stage::{self, OfferSync, StageMove};

/// Orchestrates stage, offer, revenue and guarantee changes for one candidate at a time.
///
/// Every mutating call computes the full set of record changes, hands them to the repository
/// as a single conditional commit, and only then appends the audit entry.
pub struct PlacementLifecycleService<R, A> {
    repository: Arc<R>,
    audit: Arc<A>,
    clock: Arc<dyn Clock>,
    policy: GuaranteePolicy,
}

static CANDIDATE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static OFFER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_candidate_id() -> CandidateId {
    let id = CANDIDATE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CandidateId(format!("cand-{id:06}"))
}

fn next_offer_id() -> OfferId {
    let id = OFFER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OfferId(format!("offer-{id:06}"))
}

/// Optional inputs that accompany an offer status change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferStatusContext {
    pub joining_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub renege_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenegeOutcome {
    pub candidate: Candidate,
    pub offer: Offer,
    pub revenue_reversed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub refreshed: usize,
    pub promoted: Vec<CandidateId>,
    pub audit_warnings: Vec<String>,
    pub failures: Vec<String>,
}

struct Snapshot {
    candidate: Candidate,
    active_offer: Option<Offer>,
}

struct AuditNote {
    event: AuditEvent,
    candidate_id: Option<CandidateId>,
    offer_id: Option<OfferId>,
    description: String,
    payload: Value,
}

struct Shifted {
    candidate: Candidate,
    offer: Option<Offer>,
    audit: AuditStatus,
}

impl<R, A> PlacementLifecycleService<R, A>
where
    R: PlacementRepository + 'static,
    A: AuditTrail + 'static,
{
    pub fn new(repository: Arc<R>, audit: Arc<A>, policy: GuaranteePolicy) -> Self {
        Self::with_clock(repository, audit, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        audit: Arc<A>,
        policy: GuaranteePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            audit,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &GuaranteePolicy {
        &self.policy
    }

    /// Store fee and guarantee terms for a client. Existing offers keep their captured fee.
    pub fn upsert_client(
        &self,
        client: ClientTerms,
        actor: &Actor,
    ) -> Result<Recorded<ClientTerms>, LifecycleError> {
        if client.name.trim().is_empty() {
            return Err(ValidationError::MissingField("client name").into());
        }
        revenue::validate_fee_percentage(client.fee_percentage)?;
        if let Some(days) = client.replacement_guarantee_days {
            safety::validate_guarantee_days(days)?;
        }

        let previous = self.repository.fetch_client(&client.id)?;
        self.repository.upsert_client(client.clone())?;

        let audit = self.append_audit(
            actor,
            AuditNote {
                event: AuditEvent::ClientTermsUpdated,
                candidate_id: None,
                offer_id: None,
                description: format!(
                    "terms for client {} set to {}% fee, {} guarantee days",
                    client.id,
                    client.fee_percentage,
                    self.policy.guarantee_days(&client)
                ),
                payload: json!({ "client_id": client.id, "old": previous, "new": client }),
            },
        );

        Ok(Recorded {
            record: client,
            audit,
        })
    }

    /// Create a candidate at `sourced` for an existing client.
    pub fn register_candidate(
        &self,
        profile: CandidateProfile,
        actor: &Actor,
    ) -> Result<Recorded<Candidate>, LifecycleError> {
        if profile.name.trim().is_empty() {
            return Err(ValidationError::MissingField("candidate name").into());
        }
        if profile.email.trim().is_empty() {
            return Err(ValidationError::MissingField("candidate email").into());
        }
        if let Some(expected) = profile.expected_ctc {
            if expected < Decimal::ZERO {
                return Err(ValidationError::InvalidCompensation {
                    field: "expected_ctc",
                    requirement: "zero or positive",
                    value: expected,
                }
                .into());
            }
        }
        self.client(&profile.client_id)?;

        let candidate = Candidate::sourced(
            next_candidate_id(),
            profile,
            actor.id.clone(),
            self.clock.now(),
        );
        let candidate = self.repository.insert_candidate(candidate)?;
        info!(candidate = %candidate.id, client = %candidate.client_id, "candidate sourced");

        let audit = self.append_audit(
            actor,
            AuditNote {
                event: AuditEvent::CandidateRegistered,
                candidate_id: Some(candidate.id.clone()),
                offer_id: None,
                description: format!("{} sourced for client {}", candidate.name, candidate.client_id),
                payload: json!({ "stage": { "old": null, "new": CandidateStage::Sourced } }),
            },
        );

        Ok(Recorded {
            record: candidate,
            audit,
        })
    }

    pub fn candidate(&self, id: &CandidateId) -> Result<Candidate, LifecycleError> {
        self.repository
            .fetch_candidate(id)?
            .ok_or_else(|| LifecycleError::NotFound(EntityRef::Candidate(id.clone())))
    }

    pub fn offer(&self, id: &OfferId) -> Result<Offer, LifecycleError> {
        self.repository
            .fetch_offer(id)?
            .ok_or_else(|| LifecycleError::NotFound(EntityRef::Offer(id.clone())))
    }

    pub fn offers_for(&self, id: &CandidateId) -> Result<Vec<Offer>, LifecycleError> {
        self.candidate(id)?;
        Ok(self.repository.offers_for(id)?)
    }

    /// Move a candidate to `target`, reconciling the active offer with the new stage.
    ///
    /// Moving to the current stage is accepted and changes nothing. `joined` requires a
    /// joining date and runs the same routine as the offer-status surface.
    pub fn transition_stage(
        &self,
        candidate_id: &CandidateId,
        target: CandidateStage,
        actor: &Actor,
        joining_date: Option<NaiveDate>,
    ) -> Result<Recorded<Candidate>, LifecycleError> {
        let snapshot = self.load(candidate_id)?;

        if stage::classify_move(&snapshot.candidate, target)? == StageMove::Unchanged {
            return Ok(Recorded {
                record: snapshot.candidate,
                audit: AuditStatus::NotRequired,
            });
        }

        let joining_date = if target == CandidateStage::Joined {
            Some(stage::require_joining_date(
                &snapshot.candidate,
                joining_date,
                self.clock.today(),
            )?)
        } else {
            None
        };

        let active_status = snapshot.active_offer.as_ref().map(|offer| offer.status);
        let sync = stage::offer_sync(&snapshot.candidate, target, active_status)?;

        match sync {
            OfferSync::Join => {
                let (candidate, offer) = Self::split_active(snapshot)?;
                let date = joining_date.ok_or_else(|| ValidationError::MissingJoiningDate {
                    candidate: candidate.id.clone(),
                })?;
                let (candidate, _, audit) =
                    self.mark_joined(candidate, offer, date, actor, "stage")?;
                Ok(Recorded {
                    record: candidate,
                    audit,
                })
            }
            OfferSync::Renege => {
                let (candidate, offer) = Self::split_active(snapshot)?;
                let reason = format!("stage changed to {}", CandidateStage::Dropped);
                let today = self.clock.today();
                let (outcome, audit) =
                    self.renege(candidate, offer, &reason, today, actor, "stage")?;
                Ok(Recorded {
                    record: outcome.candidate,
                    audit,
                })
            }
            OfferSync::Keep => {
                let shifted = self.shift(snapshot, target, None, actor, AuditEvent::StageChanged)?;
                Ok(Recorded {
                    record: shifted.candidate,
                    audit: shifted.audit,
                })
            }
            OfferSync::Accept | OfferSync::Reject | OfferSync::Expire => {
                let next = match sync {
                    OfferSync::Accept => OfferStatus::Accepted,
                    OfferSync::Reject => OfferStatus::Rejected,
                    _ => OfferStatus::Expired,
                };
                let shifted =
                    self.shift(snapshot, target, Some(next), actor, AuditEvent::StageChanged)?;
                Ok(Recorded {
                    record: shifted.candidate,
                    audit: shifted.audit,
                })
            }
        }
    }

    /// Extend a new offer. The client's fee percentage is captured onto the offer here.
    pub fn create_offer(
        &self,
        candidate_id: &CandidateId,
        terms: OfferTerms,
        actor: &Actor,
    ) -> Result<Recorded<Offer>, LifecycleError> {
        terms.validate()?;
        let Snapshot {
            mut candidate,
            active_offer,
        } = self.load(candidate_id)?;
        offer::ensure_no_active_offer(&candidate.id, active_offer.as_ref())?;
        let client = self.client(&candidate.client_id)?;

        let now = self.clock.now();
        let created = Offer::extend(next_offer_id(), candidate.id.clone(), &client, terms, now)?;
        let from_stage = candidate.current_stage;
        offer::mirror_compensation(&mut candidate, &created);
        stage::apply_stage(&mut candidate, CandidateStage::OfferExtended, now);

        let note = AuditNote {
            event: AuditEvent::OfferCreated,
            candidate_id: Some(candidate.id.clone()),
            offer_id: Some(created.id.clone()),
            description: format!(
                "offer {} extended to {} at {} fixed + {} variable ({}% fee)",
                created.id,
                candidate.name,
                created.fixed_ctc,
                created.variable_ctc,
                created.revenue_percentage
            ),
            payload: json!({
                "stage": { "old": from_stage, "new": CandidateStage::OfferExtended },
                "offer": {
                    "fixed_ctc": created.fixed_ctc,
                    "variable_ctc": created.variable_ctc,
                    "offered_ctc": created.offered_ctc,
                    "billable_ctc": created.billable_ctc,
                    "revenue_percentage": created.revenue_percentage,
                    "expected_joining_date": created.expected_joining_date,
                },
            }),
        };

        let commit =
            LifecycleCommit::candidate(candidate).with_offer(OfferWrite::Insert(created.clone()));
        let (_, audit) = self.apply(actor, commit, note)?;

        Ok(Recorded {
            record: created,
            audit,
        })
    }

    /// Edit the terms of an offer that is still `extended`.
    pub fn amend_offer(
        &self,
        offer_id: &OfferId,
        terms: OfferTerms,
        actor: &Actor,
    ) -> Result<Recorded<Offer>, LifecycleError> {
        terms.validate()?;
        let mut amended = self.offer(offer_id)?;
        let mut candidate = self.candidate(&amended.candidate_id)?;
        let before = amended.clone();
        let now = self.clock.now();

        amended.amend(terms, now)?;
        offer::mirror_compensation(&mut candidate, &amended);
        candidate.last_activity_date = now;

        let note = AuditNote {
            event: AuditEvent::OfferAmended,
            candidate_id: Some(candidate.id.clone()),
            offer_id: Some(amended.id.clone()),
            description: format!("terms of offer {} amended", amended.id),
            payload: json!({
                "old": {
                    "fixed_ctc": before.fixed_ctc,
                    "variable_ctc": before.variable_ctc,
                    "expected_joining_date": before.expected_joining_date,
                },
                "new": {
                    "fixed_ctc": amended.fixed_ctc,
                    "variable_ctc": amended.variable_ctc,
                    "expected_joining_date": amended.expected_joining_date,
                },
            }),
        };

        let commit = LifecycleCommit::candidate(candidate).with_offer(OfferWrite::Update {
            offer: amended.clone(),
            expected_status: OfferStatus::Extended,
        });
        let (_, audit) = self.apply(actor, commit, note)?;

        Ok(Recorded {
            record: amended,
            audit,
        })
    }

    /// Move an offer along its status graph and drive the candidate's stage to match.
    pub fn update_offer_status(
        &self,
        offer_id: &OfferId,
        next: OfferStatus,
        actor: &Actor,
        context: OfferStatusContext,
    ) -> Result<Recorded<Offer>, LifecycleError> {
        let current = self.offer(offer_id)?;
        if current.status == next {
            return Ok(Recorded {
                record: current,
                audit: AuditStatus::NotRequired,
            });
        }
        if !current.status.can_transition_to(next) {
            return Err(ConflictError::IllegalOfferTransition {
                offer: current.id.clone(),
                from: current.status,
                to: next,
            }
            .into());
        }

        let candidate = self.candidate(&current.candidate_id)?;
        let snapshot = Snapshot {
            candidate,
            active_offer: Some(current),
        };

        let target = match next {
            OfferStatus::Accepted => CandidateStage::OfferAccepted,
            OfferStatus::Rejected => CandidateStage::Rejected,
            OfferStatus::Expired => CandidateStage::Dropped,
            OfferStatus::Joined => {
                let date = stage::require_joining_date(
                    &snapshot.candidate,
                    context.joining_date,
                    self.clock.today(),
                )?;
                let (candidate, offer) = Self::split_active(snapshot)?;
                let (_, joined, audit) = self.mark_joined(candidate, offer, date, actor, "offer")?;
                return Ok(Recorded {
                    record: joined,
                    audit,
                });
            }
            OfferStatus::Renege => {
                let reason = context.reason.unwrap_or_default();
                let date = context.renege_date.unwrap_or_else(|| self.clock.today());
                let (candidate, offer) = Self::split_active(snapshot)?;
                let (outcome, audit) = self.renege(candidate, offer, &reason, date, actor, "offer")?;
                return Ok(Recorded {
                    record: outcome.offer,
                    audit,
                });
            }
            OfferStatus::Extended => {
                return Err(ConflictError::IllegalOfferTransition {
                    offer: offer_id.clone(),
                    from: snapshot
                        .active_offer
                        .map(|offer| offer.status)
                        .unwrap_or(OfferStatus::Extended),
                    to: next,
                }
                .into())
            }
        };

        let shifted = self.shift(
            snapshot,
            target,
            Some(next),
            actor,
            AuditEvent::OfferStatusChanged,
        )?;
        let offer = shifted
            .offer
            .ok_or_else(|| LifecycleError::NotFound(EntityRef::Offer(offer_id.clone())))?;

        Ok(Recorded {
            record: offer,
            audit: shifted.audit,
        })
    }

    /// Record that an accepted or joined candidate walked away.
    pub fn record_renege(
        &self,
        candidate_id: &CandidateId,
        reason: &str,
        actor: &Actor,
        renege_date: Option<NaiveDate>,
    ) -> Result<Recorded<RenegeOutcome>, LifecycleError> {
        let snapshot = self.load(candidate_id)?;
        let (candidate, offer) = Self::split_active(snapshot)?;
        let date = renege_date.unwrap_or_else(|| self.clock.today());
        let (outcome, audit) = self.renege(candidate, offer, reason, date, actor, "renege")?;

        Ok(Recorded {
            record: outcome,
            audit,
        })
    }

    /// Days remaining and tier, recomputed from the guarantee end date on every call.
    pub fn safety_classification(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<SafetyClassification, LifecycleError> {
        let candidate = self.candidate(candidate_id)?;
        let record = self.safety_record(&candidate)?;
        Ok(record.classify(self.clock.today(), &self.policy.thresholds))
    }

    /// Operator action: mark a placement safe once its guarantee window has elapsed.
    pub fn confirm_safe(
        &self,
        candidate_id: &CandidateId,
        actor: &Actor,
    ) -> Result<Recorded<Candidate>, LifecycleError> {
        let candidate = self.candidate(candidate_id)?;
        let record = self.safety_record(&candidate)?;
        if record.safety_status == PlacementStatus::Safe {
            return Ok(Recorded {
                record: candidate,
                audit: AuditStatus::NotRequired,
            });
        }
        self.promote(candidate, record, actor, "operator")
    }

    /// Scheduled sweep: refresh cached tiers and promote every placement whose window elapsed.
    pub fn sweep_placements(&self, actor: &Actor) -> Result<SweepReport, LifecycleError> {
        let today = self.clock.today();
        let mut report = SweepReport::default();

        for record in self.repository.open_placements()? {
            report.examined += 1;
            let candidate_id = record.candidate_id.clone();
            let outcome = self.sweep_one(record, today, actor);
            match outcome {
                Ok(SweepStep::Promoted(audit)) => {
                    if let Some(warning) = audit.warning() {
                        report
                            .audit_warnings
                            .push(format!("{candidate_id}: {warning}"));
                    }
                    report.promoted.push(candidate_id);
                }
                Ok(SweepStep::Refreshed) => report.refreshed += 1,
                Ok(SweepStep::Unchanged) => {}
                Err(err) => {
                    warn!(candidate = %candidate_id, error = %err, "guarantee sweep skipped placement");
                    report.failures.push(format!("{candidate_id}: {err}"));
                }
            }
        }

        info!(
            examined = report.examined,
            refreshed = report.refreshed,
            promoted = report.promoted.len(),
            failures = report.failures.len(),
            "guarantee sweep finished"
        );
        Ok(report)
    }

    /// Audit entries for a candidate, oldest first.
    pub fn timeline(&self, candidate_id: &CandidateId) -> Result<Vec<AuditEntry>, LifecycleError> {
        self.candidate(candidate_id)?;
        self.audit
            .entries_for(candidate_id)
            .map_err(|err| RepositoryError::Unavailable(err.to_string()).into())
    }

    /// Promote an elapsed placement, or refresh its cached tier. A tier refresh is logged but
    /// never audited: the tier is derived from the guarantee end date, which the join entry
    /// already records, so only promotion adds to the timeline.
    fn sweep_one(
        &self,
        mut record: SafetyRecord,
        today: NaiveDate,
        actor: &Actor,
    ) -> Result<SweepStep, LifecycleError> {
        let mut candidate = self.candidate(&record.candidate_id)?;

        if record
            .classify(today, &self.policy.thresholds)
            .eligible_for_safe
        {
            let recorded = self.promote(candidate, record, actor, "sweep")?;
            return Ok(SweepStep::Promoted(recorded.audit));
        }

        let now = self.clock.now();
        if !record.refresh(today, &self.policy.thresholds, now) {
            return Ok(SweepStep::Unchanged);
        }

        let previous = candidate.placement_status;
        let tier = record.safety_status;
        candidate.placement_status = Some(tier);
        let commit =
            LifecycleCommit::candidate(candidate).with_safety(SafetyWrite::Update(record));
        let committed = self.repository.commit(commit)?;
        info!(
            candidate = %committed.id,
            from = ?previous,
            to = %tier,
            "guarantee tier refreshed"
        );
        Ok(SweepStep::Refreshed)
    }

    fn promote(
        &self,
        mut candidate: Candidate,
        mut record: SafetyRecord,
        actor: &Actor,
        via: &'static str,
    ) -> Result<Recorded<Candidate>, LifecycleError> {
        let previous = record.safety_status;
        let now = self.clock.now();
        record.promote(self.clock.today(), now)?;

        candidate.placement_status = Some(PlacementStatus::Safe);
        candidate.is_placement_safe = true;
        candidate.last_activity_date = now;

        let note = AuditNote {
            event: AuditEvent::PlacementSafe,
            candidate_id: Some(candidate.id.clone()),
            offer_id: Some(record.offer_id.clone()),
            description: format!(
                "placement of {} is safe; guarantee ended {}",
                candidate.name, record.guarantee_period_ends
            ),
            payload: json!({
                "via": via,
                "placement_status": { "old": previous, "new": PlacementStatus::Safe },
                "guarantee_period_ends": record.guarantee_period_ends,
            }),
        };

        let commit =
            LifecycleCommit::candidate(candidate).with_safety(SafetyWrite::Update(record));
        let (candidate, audit) = self.apply(actor, commit, note)?;
        Ok(Recorded {
            record: candidate,
            audit,
        })
    }

    /// The one joining routine, shared by the stage and offer-status surfaces.
    fn mark_joined(
        &self,
        mut candidate: Candidate,
        mut offer: Offer,
        joining_date: NaiveDate,
        actor: &Actor,
        via: &'static str,
    ) -> Result<(Candidate, Offer, AuditStatus), LifecycleError> {
        let client = self.client(&candidate.client_id)?;
        let now = self.clock.now();
        let expected_status = offer.status;

        offer.transition(OfferStatus::Joined, now)?;
        offer.actual_joining_date = Some(joining_date);

        let recognition =
            revenue::recognize(offer.fixed_ctc, offer.revenue_percentage, joining_date)?;
        let ends = self.policy.period_end(joining_date, &client)?;
        let record = SafetyRecord::open(
            candidate.id.clone(),
            offer.id.clone(),
            joining_date,
            ends,
            recognition.recognized_revenue,
            now,
        );

        let from_stage = candidate.current_stage;
        stage::apply_stage(&mut candidate, CandidateStage::Joined, now);
        offer::mirror_compensation(&mut candidate, &offer);
        candidate.billable_ctc = Some(recognition.billable_ctc);
        candidate.joining_date = Some(joining_date);
        candidate.revenue_earned = Some(recognition.recognized_revenue);
        candidate.revenue_month = Some(recognition.period.month);
        candidate.revenue_year = Some(recognition.period.year);
        candidate.guarantee_period_ends = Some(ends);
        candidate.placement_status = Some(PlacementStatus::Monitoring);
        candidate.is_placement_safe = false;
        candidate.renege_reason = None;
        candidate.renege_date = None;

        let note = AuditNote {
            event: AuditEvent::CandidateJoined,
            candidate_id: Some(candidate.id.clone()),
            offer_id: Some(offer.id.clone()),
            description: format!(
                "{} joined on {}; {} revenue booked to {:02}/{}, guarantee until {}",
                candidate.name,
                joining_date,
                recognition.recognized_revenue,
                recognition.period.month,
                recognition.period.year,
                ends
            ),
            payload: json!({
                "via": via,
                "stage": { "old": from_stage, "new": CandidateStage::Joined },
                "offer_status": { "old": expected_status, "new": OfferStatus::Joined },
                "joining_date": joining_date,
                "billable_ctc": recognition.billable_ctc,
                "revenue_percentage": offer.revenue_percentage,
                "revenue_earned": recognition.recognized_revenue,
                "revenue_period": recognition.period,
                "guarantee_period_ends": ends,
            }),
        };

        let commit = LifecycleCommit::candidate(candidate)
            .with_offer(OfferWrite::Update {
                offer: offer.clone(),
                expected_status,
            })
            .with_safety(SafetyWrite::Open(record));
        let (candidate, audit) = self.apply(actor, commit, note)?;

        Ok((candidate, offer, audit))
    }

    /// The one renege routine. Reverses revenue only inside an unsettled guarantee window.
    fn renege(
        &self,
        mut candidate: Candidate,
        mut offer: Offer,
        reason: &str,
        renege_date: NaiveDate,
        actor: &Actor,
        via: &'static str,
    ) -> Result<(RenegeOutcome, AuditStatus), LifecycleError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingField("renege reason").into());
        }
        let today = self.clock.today();
        if renege_date > today {
            return Err(ValidationError::RenegeDateInFuture {
                date: renege_date,
                today,
            }
            .into());
        }
        if !matches!(offer.status, OfferStatus::Accepted | OfferStatus::Joined) {
            return Err(ConflictError::NoRenegeableOffer {
                candidate: candidate.id.clone(),
            }
            .into());
        }
        if let Some(joined) = offer.actual_joining_date {
            if renege_date < joined {
                return Err(ValidationError::RenegeBeforeJoining {
                    date: renege_date,
                    joined,
                }
                .into());
            }
        }

        let now = self.clock.now();
        let expected_status = offer.status;
        let mut safety = if expected_status == OfferStatus::Joined {
            Some(self.safety_record(&candidate)?)
        } else {
            None
        };

        offer.transition(OfferStatus::Renege, now)?;
        offer.renege_reason = Some(reason.to_string());
        offer.renege_date = Some(renege_date);

        let revenue_before = candidate.revenue_earned;
        let mut revenue_reversed = false;
        let mut amount_reversed = Decimal::ZERO;
        if let Some(record) = safety.as_mut() {
            let assessment = record.register_renege(renege_date, reason, now);
            revenue_reversed = assessment.within_window;
            amount_reversed = assessment.revenue_reversed;
            if assessment.within_window {
                candidate.revenue_earned = Some(Decimal::ZERO);
                candidate.placement_status = Some(PlacementStatus::Renege);
                candidate.is_placement_safe = false;
            } else {
                candidate.placement_status = Some(PlacementStatus::Safe);
                candidate.is_placement_safe = true;
            }
        }

        let from_stage = candidate.current_stage;
        candidate.renege_reason = Some(reason.to_string());
        candidate.renege_date = Some(renege_date);
        stage::apply_stage(&mut candidate, CandidateStage::Dropped, now);

        let note = AuditNote {
            event: AuditEvent::RenegeRecorded,
            candidate_id: Some(candidate.id.clone()),
            offer_id: Some(offer.id.clone()),
            description: if revenue_reversed {
                format!(
                    "{} reneged on {} inside the guarantee window; revenue reversed",
                    candidate.name, renege_date
                )
            } else {
                format!("{} reneged on {}; revenue unchanged", candidate.name, renege_date)
            },
            payload: json!({
                "via": via,
                "reason": reason,
                "renege_date": renege_date,
                "stage": { "old": from_stage, "new": CandidateStage::Dropped },
                "offer_status": { "old": expected_status, "new": OfferStatus::Renege },
                "revenue_earned": { "old": revenue_before, "new": candidate.revenue_earned },
                "revenue_reversed": revenue_reversed,
                "amount_reversed": amount_reversed,
            }),
        };

        let mut commit = LifecycleCommit::candidate(candidate).with_offer(OfferWrite::Update {
            offer: offer.clone(),
            expected_status,
        });
        if let Some(record) = safety {
            commit = commit.with_safety(SafetyWrite::Update(record));
        }
        let (candidate, audit) = self.apply(actor, commit, note)?;

        Ok((
            RenegeOutcome {
                candidate,
                offer,
                revenue_reversed,
            },
            audit,
        ))
    }

    /// Stage change with an optional offer status change, committed together.
    fn shift(
        &self,
        snapshot: Snapshot,
        target: CandidateStage,
        offer_status: Option<OfferStatus>,
        actor: &Actor,
        event: AuditEvent,
    ) -> Result<Shifted, LifecycleError> {
        let Snapshot {
            mut candidate,
            active_offer,
        } = snapshot;
        let now = self.clock.now();
        let from_stage = candidate.current_stage;

        let mut offer_change = None;
        if let Some(next) = offer_status {
            let mut changed = active_offer.ok_or_else(|| ConflictError::StageOfferMismatch {
                candidate: candidate.id.clone(),
                target,
                offer: None,
            })?;
            let previous = changed.status;
            changed.transition(next, now)?;
            offer_change = Some((changed, previous));
        }

        stage::apply_stage(&mut candidate, target, now);
        let pipeline_stage = candidate.effective_stage();

        let offer_payload = offer_change.as_ref().map(|(offer, previous)| {
            json!({ "offer_id": offer.id, "old": previous, "new": offer.status })
        });
        let description = match &offer_change {
            Some((offer, previous)) => format!(
                "{} moved from {} to {}; offer {} {} -> {}",
                candidate.name, from_stage, target, offer.id, previous, offer.status
            ),
            None => format!("{} moved from {} to {}", candidate.name, from_stage, target),
        };
        let note = AuditNote {
            event,
            candidate_id: Some(candidate.id.clone()),
            offer_id: offer_change.as_ref().map(|(offer, _)| offer.id.clone()),
            description,
            payload: json!({
                "stage": { "old": from_stage, "new": target },
                "pipeline_stage": pipeline_stage,
                "offer_status": offer_payload,
            }),
        };

        let mut commit = LifecycleCommit::candidate(candidate);
        if let Some((offer, expected_status)) = &offer_change {
            commit = commit.with_offer(OfferWrite::Update {
                offer: offer.clone(),
                expected_status: *expected_status,
            });
        }
        let (candidate, audit) = self.apply(actor, commit, note)?;

        Ok(Shifted {
            candidate,
            offer: offer_change.map(|(offer, _)| offer),
            audit,
        })
    }

    fn load(&self, candidate_id: &CandidateId) -> Result<Snapshot, LifecycleError> {
        let candidate = self.candidate(candidate_id)?;
        let active_offer = self.repository.active_offer(candidate_id)?;
        Ok(Snapshot {
            candidate,
            active_offer,
        })
    }

    fn split_active(snapshot: Snapshot) -> Result<(Candidate, Offer), LifecycleError> {
        let Snapshot {
            candidate,
            active_offer,
        } = snapshot;
        match active_offer {
            Some(offer) => Ok((candidate, offer)),
            None => Err(ConflictError::NoRenegeableOffer {
                candidate: candidate.id,
            }
            .into()),
        }
    }

    fn client(&self, id: &ClientId) -> Result<ClientTerms, LifecycleError> {
        self.repository
            .fetch_client(id)?
            .ok_or_else(|| LifecycleError::NotFound(EntityRef::Client(id.clone())))
    }

    fn safety_record(&self, candidate: &Candidate) -> Result<SafetyRecord, LifecycleError> {
        if candidate.guarantee_period_ends.is_none() {
            return Err(ConflictError::NotPlaced {
                candidate: candidate.id.clone(),
            }
            .into());
        }
        self.repository
            .fetch_safety(&candidate.id)?
            .ok_or_else(|| LifecycleError::NotFound(EntityRef::SafetyRecord(candidate.id.clone())))
    }

    fn apply(
        &self,
        actor: &Actor,
        commit: LifecycleCommit,
        note: AuditNote,
    ) -> Result<(Candidate, AuditStatus), LifecycleError> {
        let candidate = self.repository.commit(commit)?;
        info!(
            candidate = %candidate.id,
            offer = ?note.offer_id.as_ref().map(|id| id.0.as_str()),
            event = note.event.label(),
            actor = %actor.id,
            stage = %candidate.current_stage,
            "placement lifecycle event committed"
        );
        let audit = self.append_audit(actor, note);
        Ok((candidate, audit))
    }

    fn append_audit(&self, actor: &Actor, note: AuditNote) -> AuditStatus {
        let event = note.event;
        let candidate = note.candidate_id.clone();
        let entry = AuditEntry {
            event: note.event,
            actor: actor.clone(),
            candidate_id: note.candidate_id,
            offer_id: note.offer_id,
            description: note.description,
            payload: note.payload,
            recorded_at: self.clock.now(),
        };

        match self.audit.append(entry) {
            Ok(()) => AuditStatus::Appended,
            Err(err) => {
                warn!(
                    event = event.label(),
                    candidate = ?candidate.as_ref().map(|id| id.0.as_str()),
                    error = %err,
                    "audit entry not recorded; lifecycle change kept"
                );
                AuditStatus::Failed(err.to_string())
            }
        }
    }
}

enum SweepStep {
    Promoted(AuditStatus),
    Refreshed,
    Unchanged,
}
