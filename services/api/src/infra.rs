use chrono::NaiveDate;
use hire_ledger::workflows::placement::{
    revenue, AccountingPeriod, ClientId, ClientTerms, GuaranteePolicy, InMemoryAuditTrail,
    InMemoryPlacementStore, LifecycleError, OfferTerms, PlacementLifecycleService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type PlacementService =
    PlacementLifecycleService<InMemoryPlacementStore, InMemoryAuditTrail>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn in_memory_service(policy: GuaranteePolicy) -> Arc<PlacementService> {
    Arc::new(PlacementLifecycleService::new(
        Arc::new(InMemoryPlacementStore::default()),
        Arc::new(InMemoryAuditTrail::default()),
        policy,
    ))
}

/// Inputs for a revenue preview; nothing is stored.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuoteRequest {
    pub(crate) fixed_ctc: Decimal,
    #[serde(default)]
    pub(crate) variable_ctc: Decimal,
    pub(crate) fee_percentage: Decimal,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) joining_date: NaiveDate,
    #[serde(default)]
    pub(crate) guarantee_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct PlacementQuote {
    pub(crate) offered_ctc: Decimal,
    pub(crate) billable_ctc: Decimal,
    pub(crate) fee_percentage: Decimal,
    pub(crate) recognized_revenue: Decimal,
    pub(crate) period: AccountingPeriod,
    pub(crate) guarantee_days: u32,
    pub(crate) guarantee_period_ends: NaiveDate,
}

pub(crate) fn quote_placement(
    request: &QuoteRequest,
    policy: &GuaranteePolicy,
) -> Result<PlacementQuote, LifecycleError> {
    OfferTerms {
        fixed_ctc: request.fixed_ctc,
        variable_ctc: request.variable_ctc,
        expected_joining_date: request.joining_date,
        job_title: None,
    }
    .validate()?;
    revenue::validate_fee_percentage(request.fee_percentage)?;

    let client = ClientTerms {
        id: ClientId("quote".to_string()),
        name: "quote".to_string(),
        fee_percentage: request.fee_percentage,
        replacement_guarantee_days: request.guarantee_days,
    };
    let recognition = revenue::recognize(
        request.fixed_ctc,
        request.fee_percentage,
        request.joining_date,
    )?;

    Ok(PlacementQuote {
        offered_ctc: revenue::offered_ctc(request.fixed_ctc, request.variable_ctc)?,
        billable_ctc: recognition.billable_ctc,
        fee_percentage: request.fee_percentage,
        recognized_revenue: recognition.recognized_revenue,
        period: recognition.period,
        guarantee_days: policy.guarantee_days(&client),
        guarantee_period_ends: policy.period_end(request.joining_date, &client)?,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}
