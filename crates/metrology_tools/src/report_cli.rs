#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use metrology_contracts::compliance::{
    parse_calendar_date, CalibrationInterval, CalibrationObligation, ObligationKind, ObligationRef,
};
use metrology_contracts::uncertainty::{
    CoverageFactor, LimitCategory, RegulatoryLimit, UncertaintyBudget, UncertaintyContribution,
};
use metrology_contracts::Validate;
use metrology_engines::duedate::DueDateRuntime;
use metrology_engines::uncertainty::UncertaintyRuntime;
use metrology_wiring::compliance::{ComplianceWiring, ComplianceWiringOutcome};
use metrology_wiring::uncertainty::{LimitRegistry, UncertaintyWiring, UncertaintyWiringOutcome};
use metrology_wiring::MetrologyWiringConfig;

pub const USAGE: &str = "usage: metrology <classify|summary|combine|next-due> < input.json";

/// Partial override of the default thresholds; absent fields keep defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverride {
    pub critical_days: Option<i64>,
    pub warning_days: Option<i64>,
    pub upcoming_days: Option<i64>,
    pub coverage_factor: Option<f64>,
    pub display_decimals: Option<u32>,
    pub alerts_include_unknown: Option<bool>,
    pub max_alerts: Option<u32>,
}

impl ConfigOverride {
    pub fn apply(&self, base: MetrologyWiringConfig) -> Result<MetrologyWiringConfig, String> {
        let mut config = base;
        if let Some(v) = self.critical_days {
            config.due_date.critical_days = v;
        }
        if let Some(v) = self.warning_days {
            config.due_date.warning_days = v;
        }
        if let Some(v) = self.upcoming_days {
            config.due_date.upcoming_days = v;
        }
        if let Some(v) = self.coverage_factor {
            config.uncertainty.default_coverage_factor = v;
        }
        if let Some(v) = self.display_decimals {
            config.uncertainty.display_decimals = v;
        }
        if let Some(v) = self.alerts_include_unknown {
            config.alerts_include_unknown = v;
        }
        if let Some(v) = self.max_alerts {
            config.max_alerts = v;
        }
        config
            .validate()
            .map_err(|e| format!("invalid config: {e}"))?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassifyInput {
    as_of: String,
    due_date: Option<String>,
    #[serde(default)]
    config: Option<ConfigOverride>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObligationInput {
    reference_id: String,
    due_date: Option<String>,
    #[serde(default)]
    kind: Option<ObligationKind>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SummaryInput {
    as_of: String,
    obligations: Vec<ObligationInput>,
    #[serde(default)]
    config: Option<ConfigOverride>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CombineInput {
    contributions: Vec<UncertaintyContribution>,
    #[serde(default)]
    coverage_factor: Option<f64>,
    #[serde(default)]
    limit_pct: Option<f64>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    limits: Vec<RegulatoryLimit>,
    #[serde(default)]
    config: Option<ConfigOverride>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NextDueInput {
    last_calibration: String,
    interval: CalibrationInterval,
}

#[derive(Debug, Serialize)]
struct NextDueOutput {
    last_calibration: String,
    due_date: String,
}

pub fn execute_command(subcommand: &str, input: &str) -> Result<String, String> {
    match subcommand {
        "classify" => classify(parse_input(input)?),
        "summary" => summary(parse_input(input)?),
        "combine" => combine(parse_input(input)?),
        "next-due" => next_due(parse_input(input)?),
        _ => Err(format!(
            "unknown subcommand: {subcommand}. \
             expected one of: classify, summary, combine, next-due"
        )),
    }
}

fn parse_input<T>(input: &str) -> Result<T, String>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(input).map_err(|e| format!("invalid input json: {e}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("failed to encode output: {e}"))
}

fn resolve_config(config: Option<&ConfigOverride>) -> Result<MetrologyWiringConfig, String> {
    match config {
        Some(o) => o.apply(MetrologyWiringConfig::mvp_v1()),
        None => Ok(MetrologyWiringConfig::mvp_v1()),
    }
}

fn classify(input: ClassifyInput) -> Result<String, String> {
    let config = resolve_config(input.config.as_ref())?;
    let as_of = parse_calendar_date("as_of", &input.as_of).map_err(|e| e.to_string())?;
    let due_date = input
        .due_date
        .as_deref()
        .map(|raw| parse_calendar_date("due_date", raw))
        .transpose()
        .map_err(|e| e.to_string())?;
    let runtime = DueDateRuntime::new(config.due_date).map_err(|e| e.to_string())?;
    to_json(&runtime.classify(due_date, as_of))
}

fn summary(input: SummaryInput) -> Result<String, String> {
    let config = resolve_config(input.config.as_ref())?;
    let as_of = parse_calendar_date("as_of", &input.as_of).map_err(|e| e.to_string())?;
    let obligations = input
        .obligations
        .into_iter()
        .map(|o| {
            let reference_id = ObligationRef::new(o.reference_id)?;
            let due_date = o
                .due_date
                .as_deref()
                .map(|raw| parse_calendar_date("obligations.due_date", raw))
                .transpose()?;
            CalibrationObligation::v1(reference_id, o.kind, due_date)
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let runtime = DueDateRuntime::new(config.due_date).map_err(|e| e.to_string())?;
    let wiring = ComplianceWiring::new(config, runtime).map_err(|e| e.to_string())?;
    match wiring
        .build_dashboard(obligations, as_of)
        .map_err(|e| e.to_string())?
    {
        ComplianceWiringOutcome::Dashboard(dashboard) => to_json(&dashboard),
        ComplianceWiringOutcome::Refused(r) => Err(format!(
            "refused (reason_code=0x{:08X}): {}",
            r.reason_code.0, r.message
        )),
    }
}

fn combine(input: CombineInput) -> Result<String, String> {
    let config = resolve_config(input.config.as_ref())?;
    let budget = UncertaintyBudget::v1(input.contributions).map_err(|e| e.to_string())?;
    let coverage_factor = input
        .coverage_factor
        .map(CoverageFactor::new)
        .transpose()
        .map_err(|e| e.to_string())?;
    let registry = LimitRegistry::from_limits(input.limits).map_err(|e| e.to_string())?;
    let runtime = UncertaintyRuntime::new(config.uncertainty).map_err(|e| e.to_string())?;
    let wiring = UncertaintyWiring::new(registry, runtime).map_err(|e| e.to_string())?;

    let outcome = match input.category.as_deref() {
        Some(raw) => {
            if input.limit_pct.is_some() {
                return Err("limit_pct and category are mutually exclusive".to_string());
            }
            let category = LimitCategory::parse(raw)
                .ok_or_else(|| format!("unknown limit category '{raw}'"))?;
            wiring.assess(budget, category, coverage_factor)
        }
        None => wiring.combine(budget, coverage_factor, input.limit_pct),
    }
    .map_err(|e| e.to_string())?;

    match outcome {
        UncertaintyWiringOutcome::Combined(result) => to_json(&result),
        UncertaintyWiringOutcome::Assessed(assessment) => to_json(&assessment),
        UncertaintyWiringOutcome::Refused(r) => Err(format!(
            "refused (reason_code=0x{:08X}): {}",
            r.reason_code.0, r.message
        )),
    }
}

fn next_due(input: NextDueInput) -> Result<String, String> {
    let last = parse_calendar_date("last_calibration", &input.last_calibration)
        .map_err(|e| e.to_string())?;
    let due = DueDateRuntime::default()
        .next_due_date(last, input.interval)
        .map_err(|e| e.to_string())?;
    to_json(&NextDueOutput {
        last_calibration: last.format("%Y-%m-%d").to_string(),
        due_date: due.format("%Y-%m-%d").to_string(),
    })
}
