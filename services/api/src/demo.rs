use crate::infra::{parse_date, quote_placement, QuoteRequest};
use chrono::{Days, NaiveDate};
use clap::Args;
use hire_ledger::error::AppError;
use hire_ledger::workflows::placement::{
    Actor, CandidateId, CandidateProfile, CandidateStage, ClientId, ClientTerms, Clock,
    FixedClock, GuaranteePolicy, InMemoryAuditTrail, InMemoryPlacementStore, OfferStatus,
    OfferStatusContext, OfferTerms, PlacementLifecycleService, Recorded, SystemClock,
};
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Fixed annual compensation; the only billable component
    #[arg(long)]
    pub(crate) fixed_ctc: Decimal,
    /// Variable annual compensation (never billed)
    #[arg(long, default_value = "0")]
    pub(crate) variable_ctc: Decimal,
    /// Placement fee percentage agreed with the client
    #[arg(long, default_value = "8.33")]
    pub(crate) fee_percentage: Decimal,
    /// Joining date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) joining_date: Option<NaiveDate>,
    /// Client-specific replacement guarantee in days
    #[arg(long)]
    pub(crate) guarantee_days: Option<u32>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Joining date of the demo candidate (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) joining_date: Option<NaiveDate>,
    /// Fixed annual compensation offered to the demo candidate
    #[arg(long, default_value = "1200000")]
    pub(crate) fixed_ctc: Decimal,
    /// Placement fee percentage for the demo client
    #[arg(long, default_value = "8.33")]
    pub(crate) fee_percentage: Decimal,
    /// Record a renege this many days after joining instead of completing the guarantee
    #[arg(long)]
    pub(crate) renege_after_days: Option<i64>,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let request = QuoteRequest {
        fixed_ctc: args.fixed_ctc,
        variable_ctc: args.variable_ctc,
        fee_percentage: args.fee_percentage,
        joining_date: args
            .joining_date
            .unwrap_or_else(|| SystemClock.today()),
        guarantee_days: args.guarantee_days,
    };
    let quote = quote_placement(&request, &GuaranteePolicy::default())?;

    println!("Placement quote");
    println!("- Offered CTC: {}", quote.offered_ctc);
    println!(
        "- Billable CTC: {} (variable pay excluded)",
        quote.billable_ctc
    );
    println!(
        "- Revenue at {}%: {} booked to {:02}/{}",
        quote.fee_percentage, quote.recognized_revenue, quote.period.month, quote.period.year
    );
    println!(
        "- Guarantee: {} days, safe after {}",
        quote.guarantee_days, quote.guarantee_period_ends
    );

    Ok(())
}

type DemoService = PlacementLifecycleService<InMemoryPlacementStore, InMemoryAuditTrail>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        joining_date,
        fixed_ctc,
        fee_percentage,
        renege_after_days,
    } = args;

    let joining_date = joining_date.unwrap_or_else(|| SystemClock.today());
    let sourced_on = joining_date
        .checked_sub_days(Days::new(21))
        .unwrap_or(joining_date);
    let clock = Arc::new(FixedClock::at(sourced_on));
    let audit = Arc::new(InMemoryAuditTrail::default());
    let service: DemoService = PlacementLifecycleService::with_clock(
        Arc::new(InMemoryPlacementStore::default()),
        audit.clone(),
        GuaranteePolicy::default(),
        clock.clone(),
    );
    let recruiter = Actor::new("demo-recruiter", "recruiter");

    println!("Placement lifecycle demo");
    let client = report(service.upsert_client(
        ClientTerms {
            id: ClientId("client-demo".to_string()),
            name: "Northwind Systems".to_string(),
            fee_percentage,
            replacement_guarantee_days: None,
        },
        &recruiter,
    )?);
    println!(
        "- Client {} at {}% fee",
        client.name, client.fee_percentage
    );

    let candidate = report(service.register_candidate(
        CandidateProfile {
            name: "Ananya Kapoor".to_string(),
            email: "ananya.kapoor@example.com".to_string(),
            phone: None,
            client_id: client.id.clone(),
            job_title: Some("Platform Engineer".to_string()),
            expected_ctc: Some(fixed_ctc),
        },
        &recruiter,
    )?);
    println!("- Sourced {} as {}", candidate.name, candidate.id);

    for stage in [
        CandidateStage::Screening,
        CandidateStage::InterviewScheduled,
        CandidateStage::InterviewCompleted,
    ] {
        clock.advance_days(3);
        report(service.transition_stage(&candidate.id, stage, &recruiter, None)?);
        println!("- Moved to {stage}");
    }

    clock.advance_days(3);
    let offer = report(service.create_offer(
        &candidate.id,
        OfferTerms {
            fixed_ctc,
            variable_ctc: fixed_ctc / Decimal::TEN,
            expected_joining_date: joining_date,
            job_title: None,
        },
        &recruiter,
    )?);
    println!(
        "- Offer {} extended: {} offered, {} billable",
        offer.id, offer.offered_ctc, offer.billable_ctc
    );

    clock.advance_days(2);
    report(service.update_offer_status(
        &offer.id,
        OfferStatus::Accepted,
        &recruiter,
        OfferStatusContext::default(),
    )?);
    println!("- Offer accepted");

    clock.set_today(joining_date);
    report(service.transition_stage(
        &candidate.id,
        CandidateStage::Joined,
        &recruiter,
        Some(joining_date),
    )?);
    let joined = service.candidate(&candidate.id)?;
    println!(
        "- Joined on {joining_date}: revenue {} booked, guarantee until {}",
        joined
            .revenue_earned
            .map(|revenue| revenue.to_string())
            .unwrap_or_else(|| "-".to_string()),
        joined
            .guarantee_period_ends
            .map(|ends| ends.to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    match renege_after_days {
        Some(days) => {
            clock.advance_days(days);
            let outcome = report(service.record_renege(
                &candidate.id,
                "accepted a counter offer",
                &recruiter,
                None,
            )?);
            println!(
                "- Renege after {days} days: revenue {} ({})",
                outcome
                    .candidate
                    .revenue_earned
                    .map(|revenue| revenue.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                if outcome.revenue_reversed {
                    "reversed inside the guarantee window"
                } else {
                    "kept, guarantee already satisfied"
                }
            );
        }
        None => walk_guarantee_window(&service, &clock, &candidate.id)?,
    }

    println!("\nTimeline");
    for entry in service.timeline(&candidate.id)? {
        println!(
            "  {} [{}] {}",
            entry.recorded_at.date_naive(),
            entry.event.label(),
            entry.description
        );
    }
    println!("{} audit entries recorded", audit.len());

    Ok(())
}

fn walk_guarantee_window(
    service: &DemoService,
    clock: &FixedClock,
    candidate_id: &CandidateId,
) -> Result<(), AppError> {
    let system = Actor::system();
    loop {
        let classification = service.safety_classification(candidate_id)?;
        if classification.eligible_for_safe {
            let sweep = service.sweep_placements(&system)?;
            println!(
                "- Guarantee elapsed: {} placement(s) promoted to safe",
                sweep.promoted.len()
            );
            return Ok(());
        }

        println!(
            "- {} days remaining: {}",
            classification.days_remaining, classification.status
        );
        let step = if classification.days_remaining > 30 {
            classification.days_remaining - 30
        } else if classification.days_remaining > 7 {
            classification.days_remaining - 7
        } else {
            classification.days_remaining
        };
        clock.advance_days(i64::from(step.max(1)));
        service.sweep_placements(&system)?;
    }
}

fn report<T>(recorded: Recorded<T>) -> T {
    if let Some(reason) = recorded.audit.warning() {
        println!("  ! audit entry not recorded: {reason}");
    }
    recorded.into_record()
}
