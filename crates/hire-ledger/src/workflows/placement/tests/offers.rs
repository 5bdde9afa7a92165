use super::common::*;
use crate::workflows::placement::audit::AuditStatus;
use crate::workflows::placement::domain::{CandidateStage, OfferStatus};
use crate::workflows::placement::error::{ConflictError, LifecycleError, ValidationError};
use crate::workflows::placement::OfferStatusContext;

#[test]
fn create_offer_captures_fee_and_moves_candidate() {
    let harness = harness();
    let (candidate, offer) = harness.extended(1_000_000, 200_000);

    assert_eq!(offer.status, OfferStatus::Extended);
    assert_eq!(offer.revenue_percentage, standard_fee());
    assert_eq!(offer.offered_ctc, rupees(1_200_000));
    assert_eq!(offer.billable_ctc, rupees(1_000_000));

    assert_eq!(candidate.current_stage, CandidateStage::OfferExtended);
    assert_eq!(candidate.offered_ctc, Some(rupees(1_200_000)));
    assert_eq!(candidate.fixed_ctc, Some(rupees(1_000_000)));
    assert_eq!(candidate.variable_ctc, Some(rupees(200_000)));
    assert!(candidate.stage_date(CandidateStage::OfferExtended).is_some());
}

#[test]
fn second_active_offer_is_rejected() {
    let harness = harness();
    let (candidate, first) = harness.extended(1_000_000, 0);

    match harness
        .service
        .create_offer(&candidate.id, offer_terms(1_100_000, 0), &recruiter())
    {
        Err(LifecycleError::Conflict(ConflictError::ActiveOfferExists { offer, .. })) => {
            assert_eq!(offer, first.id);
        }
        other => panic!("expected active offer conflict, got {other:?}"),
    }

    let offers = harness
        .service
        .offers_for(&candidate.id)
        .expect("offers listed");
    assert_eq!(offers.len(), 1);
}

#[test]
fn rejected_offer_does_not_block_a_new_one() {
    let harness = harness();
    let (candidate, first) = harness.extended(1_000_000, 0);

    harness
        .service
        .update_offer_status(
            &first.id,
            OfferStatus::Rejected,
            &recruiter(),
            OfferStatusContext::default(),
        )
        .expect("offer rejected");
    assert_eq!(
        harness.stored(&candidate.id).current_stage,
        CandidateStage::Rejected
    );

    let second = harness
        .service
        .create_offer(&candidate.id, offer_terms(1_150_000, 0), &recruiter())
        .expect("new offer allowed")
        .into_record();
    assert_eq!(second.status, OfferStatus::Extended);
    assert_eq!(
        harness.stored(&candidate.id).current_stage,
        CandidateStage::OfferExtended
    );
}

#[test]
fn invalid_terms_are_validation_errors() {
    let harness = harness();
    let candidate = harness.register();

    match harness
        .service
        .create_offer(&candidate.id, offer_terms(0, 0), &recruiter())
    {
        Err(LifecycleError::Validation(ValidationError::InvalidCompensation {
            field: "fixed_ctc",
            ..
        })) => {}
        other => panic!("expected compensation validation error, got {other:?}"),
    }

    match harness
        .service
        .create_offer(&candidate.id, offer_terms(900_000, -1), &recruiter())
    {
        Err(LifecycleError::Validation(ValidationError::InvalidCompensation {
            field: "variable_ctc",
            ..
        })) => {}
        other => panic!("expected compensation validation error, got {other:?}"),
    }
}

#[test]
fn amend_updates_terms_while_extended() {
    let harness = harness();
    let (candidate, offer) = harness.extended(1_000_000, 0);

    let amended = harness
        .service
        .amend_offer(&offer.id, offer_terms(1_050_000, 100_000), &recruiter())
        .expect("amend succeeds");

    assert_eq!(amended.audit, AuditStatus::Appended);
    assert_eq!(amended.record.offered_ctc, rupees(1_150_000));
    assert_eq!(amended.record.revenue_percentage, standard_fee());
    assert_eq!(
        harness.stored(&candidate.id).offered_ctc,
        Some(rupees(1_150_000))
    );
}

#[test]
fn amend_is_locked_after_acceptance() {
    let harness = harness();
    let (_, offer) = harness.accepted(1_000_000, 0);

    match harness
        .service
        .amend_offer(&offer.id, offer_terms(1_050_000, 0), &recruiter())
    {
        Err(LifecycleError::Conflict(ConflictError::OfferLocked {
            status: OfferStatus::Accepted,
            ..
        })) => {}
        other => panic!("expected locked offer, got {other:?}"),
    }
}

#[test]
fn accepting_offer_moves_candidate_to_offer_accepted() {
    let harness = harness();
    let (candidate, offer) = harness.accepted(1_000_000, 0);

    assert_eq!(offer.status, OfferStatus::Accepted);
    assert!(offer.responded_at.is_some());
    assert_eq!(candidate.current_stage, CandidateStage::OfferAccepted);
}

#[test]
fn expiring_offer_drops_candidate() {
    let harness = harness();
    let (candidate, offer) = harness.extended(1_000_000, 0);

    let expired = harness
        .service
        .update_offer_status(
            &offer.id,
            OfferStatus::Expired,
            &recruiter(),
            OfferStatusContext::default(),
        )
        .expect("offer expires")
        .into_record();

    assert_eq!(expired.status, OfferStatus::Expired);
    assert_eq!(
        harness.stored(&candidate.id).current_stage,
        CandidateStage::Dropped
    );
}

#[test]
fn illegal_offer_transitions_conflict() {
    let harness = harness();
    let (_, offer) = harness.extended(1_000_000, 0);

    match harness.service.update_offer_status(
        &offer.id,
        OfferStatus::Joined,
        &recruiter(),
        OfferStatusContext {
            joining_date: Some(joining_day()),
            ..OfferStatusContext::default()
        },
    ) {
        Err(LifecycleError::Conflict(ConflictError::IllegalOfferTransition {
            from: OfferStatus::Extended,
            to: OfferStatus::Joined,
            ..
        })) => {}
        other => panic!("expected illegal transition, got {other:?}"),
    }

    harness
        .service
        .update_offer_status(
            &offer.id,
            OfferStatus::Rejected,
            &recruiter(),
            OfferStatusContext::default(),
        )
        .expect("offer rejected");

    assert!(matches!(
        harness.service.update_offer_status(
            &offer.id,
            OfferStatus::Accepted,
            &recruiter(),
            OfferStatusContext::default(),
        ),
        Err(LifecycleError::Conflict(
            ConflictError::IllegalOfferTransition { .. }
        ))
    ));
}

#[test]
fn repeated_status_update_is_a_no_op() {
    let harness = harness();
    let (candidate, offer) = harness.accepted(1_000_000, 0);
    let entries = harness.timeline_len(&candidate.id);

    let repeated = harness
        .service
        .update_offer_status(
            &offer.id,
            OfferStatus::Accepted,
            &recruiter(),
            OfferStatusContext::default(),
        )
        .expect("repeat accepted");

    assert_eq!(repeated.audit, AuditStatus::NotRequired);
    assert_eq!(harness.timeline_len(&candidate.id), entries);
    assert_eq!(harness.stored(&candidate.id).version, candidate.version);
}

#[test]
fn joining_through_offer_requires_date() {
    let harness = harness();
    let (_, offer) = harness.accepted(1_000_000, 0);

    match harness.service.update_offer_status(
        &offer.id,
        OfferStatus::Joined,
        &recruiter(),
        OfferStatusContext::default(),
    ) {
        Err(LifecycleError::Validation(ValidationError::MissingJoiningDate { .. })) => {}
        other => panic!("expected missing joining date, got {other:?}"),
    }
}

#[test]
fn fee_change_after_offer_does_not_touch_captured_percentage() {
    let harness = harness();
    let (candidate, offer) = harness.accepted(1_000_000, 0);

    let mut raised = client_terms();
    raised.fee_percentage = rust_decimal::Decimal::new(1_200, 2);
    harness
        .service
        .upsert_client(raised, &recruiter())
        .expect("terms updated");

    harness
        .service
        .update_offer_status(
            &offer.id,
            OfferStatus::Joined,
            &recruiter(),
            OfferStatusContext {
                joining_date: Some(joining_day()),
                ..OfferStatusContext::default()
            },
        )
        .expect("candidate joined");

    let joined = harness.stored(&candidate.id);
    assert_eq!(joined.revenue_earned, Some(rupees(83_300)));
}

#[test]
fn offer_lookups_report_missing_records() {
    let harness = harness();
    assert!(matches!(
        harness.service.offer(&"offer-missing".into()),
        Err(LifecycleError::NotFound(_))
    ));
}

#[test]
fn offer_too_large_to_total_is_rejected_without_side_effects() {
    let harness = harness();
    let candidate = harness.register();
    let mut terms = offer_terms(1_000_000, 0);
    terms.fixed_ctc = rust_decimal::Decimal::MAX;
    terms.variable_ctc = rust_decimal::Decimal::MAX;

    assert!(matches!(
        harness.service.create_offer(&candidate.id, terms, &recruiter()),
        Err(LifecycleError::Validation(
            ValidationError::InvalidCompensation { .. }
        ))
    ));

    let stored = harness.stored(&candidate.id);
    assert_eq!(stored.current_stage, CandidateStage::Sourced);
    assert!(harness
        .service
        .offers_for(&candidate.id)
        .expect("offers readable")
        .is_empty());
    assert_eq!(harness.timeline_len(&candidate.id), 1);
}

#[test]
fn offer_whose_revenue_cannot_be_computed_is_never_extended() {
    let harness = harness();
    let candidate = harness.register();
    let mut terms = offer_terms(1_000_000, 0);
    terms.fixed_ctc = rust_decimal::Decimal::MAX;

    assert!(matches!(
        harness.service.create_offer(&candidate.id, terms, &recruiter()),
        Err(LifecycleError::Validation(
            ValidationError::InvalidCompensation {
                field: "fixed_ctc",
                ..
            }
        ))
    ));

    // a sane offer for the same candidate still goes through and joins
    let offer = harness
        .service
        .create_offer(&candidate.id, offer_terms(1_000_000, 0), &recruiter())
        .expect("offer created")
        .into_record();
    harness
        .service
        .update_offer_status(
            &offer.id,
            OfferStatus::Accepted,
            &recruiter(),
            OfferStatusContext::default(),
        )
        .expect("offer accepted");
    let joined = harness
        .service
        .update_offer_status(
            &offer.id,
            OfferStatus::Joined,
            &recruiter(),
            OfferStatusContext {
                joining_date: Some(joining_day()),
                ..OfferStatusContext::default()
            },
        )
        .expect("candidate joined");
    assert_eq!(joined.record.status, OfferStatus::Joined);
    assert_eq!(
        harness.stored(&candidate.id).revenue_earned,
        Some(rupees(83_300))
    );
}

#[test]
fn amendment_to_unbillable_terms_keeps_previous_terms() {
    let harness = harness();
    let (candidate, offer) = harness.extended(1_000_000, 200_000);
    let mut terms = offer_terms(1_000_000, 0);
    terms.fixed_ctc = rust_decimal::Decimal::MAX;

    assert!(matches!(
        harness.service.amend_offer(&offer.id, terms, &recruiter()),
        Err(LifecycleError::Validation(_))
    ));

    let stored = harness.stored_offer(&offer.id);
    assert_eq!(stored.fixed_ctc, rupees(1_000_000));
    assert_eq!(stored.offered_ctc, rupees(1_200_000));
    assert_eq!(
        harness.stored(&candidate.id).fixed_ctc,
        Some(rupees(1_000_000))
    );
}
