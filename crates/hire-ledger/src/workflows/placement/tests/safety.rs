use super::common::*;
use crate::workflows::placement::audit::{AuditEvent, AuditStatus, AuditTrail};
use crate::workflows::placement::domain::{Actor, OfferStatus, PlacementStatus};
use crate::workflows::placement::{GuaranteePolicy, OfferStatusContext};
use crate::workflows::placement::error::{ConflictError, LifecycleError, ValidationError};
use crate::workflows::placement::safety::MAX_GUARANTEE_DAYS;

#[test]
fn joining_opens_guarantee_window() {
    let harness = harness();
    let (candidate, _) = harness.joined(1_200_000, joining_day());

    assert_eq!(candidate.guarantee_period_ends, Some(date(2026, 4, 15)));
    assert_eq!(candidate.placement_status, Some(PlacementStatus::Monitoring));
    assert!(!candidate.is_placement_safe);

    let record = harness.safety(&candidate.id);
    assert_eq!(record.safety_status, PlacementStatus::Monitoring);
    assert_eq!(record.revenue_at_stake, rupees(99_960));
}

#[test]
fn client_guarantee_days_override_default() {
    let harness = harness();
    let mut terms = client_terms();
    terms.replacement_guarantee_days = Some(60);
    harness
        .service
        .upsert_client(terms, &recruiter())
        .expect("terms updated");

    let (candidate, _) = harness.joined(1_000_000, joining_day());
    assert_eq!(candidate.guarantee_period_ends, Some(date(2026, 3, 16)));
}

#[test]
fn classification_tiers_at_boundaries() {
    let harness = harness();
    let (candidate, _) = harness.joined(1_000_000, joining_day());
    let ends = date(2026, 4, 15);

    let cases = [
        (ends - chrono::Duration::days(31), 31, PlacementStatus::Monitoring, false),
        (ends - chrono::Duration::days(30), 30, PlacementStatus::AtRisk, false),
        (ends - chrono::Duration::days(8), 8, PlacementStatus::AtRisk, false),
        (ends - chrono::Duration::days(7), 7, PlacementStatus::Critical, false),
        (ends, 0, PlacementStatus::Critical, true),
    ];

    for (day, remaining, status, eligible) in cases {
        harness.clock.set_today(day);
        let classification = harness
            .service
            .safety_classification(&candidate.id)
            .expect("classification available");
        assert_eq!(classification.days_remaining, remaining, "on {day}");
        assert_eq!(classification.status, status, "on {day}");
        assert_eq!(classification.eligible_for_safe, eligible, "on {day}");
        assert_eq!(classification.guarantee_period_ends, ends);
    }
}

#[test]
fn classification_requires_a_placement() {
    let harness = harness();
    let candidate = harness.register();

    match harness.service.safety_classification(&candidate.id) {
        Err(LifecycleError::Conflict(ConflictError::NotPlaced { .. })) => {}
        other => panic!("expected not placed, got {other:?}"),
    }
}

#[test]
fn confirm_safe_waits_for_window_to_elapse() {
    let harness = harness();
    let (candidate, _) = harness.joined(1_000_000, joining_day());

    match harness.service.confirm_safe(&candidate.id, &recruiter()) {
        Err(LifecycleError::Conflict(ConflictError::GuaranteeWindowOpen { ends, .. })) => {
            assert_eq!(ends, date(2026, 4, 15));
        }
        other => panic!("expected open window, got {other:?}"),
    }

    harness.clock.set_today(date(2026, 4, 15));
    let confirmed = harness
        .service
        .confirm_safe(&candidate.id, &recruiter())
        .expect("window elapsed");
    assert_eq!(confirmed.audit, AuditStatus::Appended);
    assert!(confirmed.record.is_placement_safe);
    assert_eq!(
        confirmed.record.placement_status,
        Some(PlacementStatus::Safe)
    );

    let again = harness
        .service
        .confirm_safe(&candidate.id, &recruiter())
        .expect("repeat confirm");
    assert_eq!(again.audit, AuditStatus::NotRequired);
}

#[test]
fn sweep_refreshes_tiers_then_promotes() {
    let harness = harness();
    let (candidate, _) = harness.joined(1_000_000, joining_day());

    harness.clock.set_today(date(2026, 3, 20));
    let report = harness
        .service
        .sweep_placements(&Actor::system())
        .expect("sweep runs");
    assert_eq!(report.examined, 1);
    assert_eq!(report.refreshed, 1);
    assert!(report.promoted.is_empty());
    assert_eq!(
        harness.stored(&candidate.id).placement_status,
        Some(PlacementStatus::AtRisk)
    );

    let unchanged = harness
        .service
        .sweep_placements(&Actor::system())
        .expect("sweep runs");
    assert_eq!(unchanged.refreshed, 0);

    harness.clock.set_today(date(2026, 4, 16));
    let report = harness
        .service
        .sweep_placements(&Actor::system())
        .expect("sweep runs");
    assert_eq!(report.promoted, vec![candidate.id.clone()]);
    assert!(report.failures.is_empty());

    let stored = harness.stored(&candidate.id);
    assert!(stored.is_placement_safe);
    assert_eq!(stored.placement_status, Some(PlacementStatus::Safe));
    assert_eq!(stored.revenue_earned, Some(rupees(83_300)));

    let entries = harness
        .audit
        .entries_for(&candidate.id)
        .expect("audit readable");
    let safe = entries
        .iter()
        .find(|entry| entry.event == AuditEvent::PlacementSafe)
        .expect("promotion audited");
    assert_eq!(safe.actor, Actor::system());

    let after = harness
        .service
        .sweep_placements(&Actor::system())
        .expect("sweep runs");
    assert_eq!(after.examined, 0);
}

#[test]
fn tier_refresh_is_not_added_to_the_timeline() {
    let harness = harness();
    let (candidate, _) = harness.joined(1_000_000, joining_day());
    let before = harness.timeline_len(&candidate.id);

    harness.clock.set_today(date(2026, 4, 10));
    let report = harness
        .service
        .sweep_placements(&Actor::system())
        .expect("sweep runs");

    assert_eq!(report.refreshed, 1);
    assert_eq!(
        harness.safety(&candidate.id).safety_status,
        PlacementStatus::Critical
    );
    assert_eq!(harness.timeline_len(&candidate.id), before);
}

#[test]
fn client_guarantee_days_are_bounded() {
    let harness = harness();
    let mut terms = client_terms();
    terms.replacement_guarantee_days = Some(u32::MAX);

    assert!(matches!(
        harness.service.upsert_client(terms.clone(), &recruiter()),
        Err(LifecycleError::Validation(
            ValidationError::InvalidGuaranteeDays { days: u32::MAX, .. }
        ))
    ));

    terms.replacement_guarantee_days = Some(MAX_GUARANTEE_DAYS);
    harness
        .service
        .upsert_client(terms, &recruiter())
        .expect("longest guarantee accepted");
    let (candidate, _) = harness.joined(1_000_000, joining_day());
    assert_eq!(
        candidate.guarantee_period_ends,
        Some(joining_day() + chrono::Duration::days(i64::from(MAX_GUARANTEE_DAYS)))
    );
}

#[test]
fn oversized_default_guarantee_fails_the_join_cleanly() {
    let policy = GuaranteePolicy {
        default_guarantee_days: u32::MAX,
        ..GuaranteePolicy::default()
    };
    let harness = harness_with_policy(policy);
    let (candidate, offer) = harness.accepted(1_000_000, 0);

    let result = harness.service.update_offer_status(
        &offer.id,
        OfferStatus::Joined,
        &recruiter(),
        OfferStatusContext {
            joining_date: Some(joining_day()),
            ..OfferStatusContext::default()
        },
    );

    assert!(matches!(
        result,
        Err(LifecycleError::Validation(
            ValidationError::InvalidGuaranteeDays { .. }
        ))
    ));
    assert_eq!(
        harness.stored_offer(&offer.id).status,
        OfferStatus::Accepted
    );
    assert!(harness.stored(&candidate.id).joining_date.is_none());
}
