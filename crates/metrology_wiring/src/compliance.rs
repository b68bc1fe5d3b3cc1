#![forbid(unsafe_code)]

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use metrology_contracts::compliance::{
    CalibrationObligation, ClassifiedObligation, ComplianceCapabilityId, ComplianceRefuse,
    ComplianceRequest, ComplianceResponse, ComplianceStatus, ComplianceSummary,
    DueDateBatchRequest, ObligationKind, ObligationRef,
};
use metrology_contracts::{ContractViolation, Validate};

use crate::MetrologyWiringConfig;

pub mod reason_codes {
    use metrology_contracts::ReasonCodeId;

    // Compliance wiring reason-code namespace.
    pub const COMPLIANCE_WIRING_OUTPUT_DRIFT: ReasonCodeId = ReasonCodeId(0x4357_0101);
}

pub trait ComplianceEngine {
    fn run(&self, req: &ComplianceRequest) -> ComplianceResponse;
}

impl ComplianceEngine for metrology_engines::duedate::DueDateRuntime {
    fn run(&self, req: &ComplianceRequest) -> ComplianceResponse {
        self.run(req)
    }
}

/// One obligation that needs attention, as shown on the alert panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceAlert {
    pub reference_id: ObligationRef,
    pub kind: Option<ObligationKind>,
    pub due_date: Option<NaiveDate>,
    pub status: ComplianceStatus,
    pub days_remaining: Option<i64>,
}

impl ComplianceAlert {
    fn from_classified(entry: &ClassifiedObligation) -> Self {
        Self {
            reference_id: entry.obligation.reference_id.clone(),
            kind: entry.obligation.kind,
            due_date: entry.obligation.due_date,
            status: entry.classification.status,
            days_remaining: entry.classification.days_remaining,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceDashboard {
    pub as_of: NaiveDate,
    pub summary: ComplianceSummary,
    pub worst: Option<ComplianceStatus>,
    pub alerts: Vec<ComplianceAlert>,
    /// Alerts dropped by the `max_alerts` cap.
    pub alerts_omitted: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplianceWiringOutcome {
    Refused(ComplianceRefuse),
    Dashboard(ComplianceDashboard),
}

#[derive(Debug, Clone)]
pub struct ComplianceWiring<E>
where
    E: ComplianceEngine,
{
    config: MetrologyWiringConfig,
    engine: E,
}

impl<E> ComplianceWiring<E>
where
    E: ComplianceEngine,
{
    pub fn new(config: MetrologyWiringConfig, engine: E) -> Result<Self, ContractViolation> {
        config.validate()?;
        Ok(Self { config, engine })
    }

    pub fn build_dashboard(
        &self,
        obligations: Vec<CalibrationObligation>,
        as_of: NaiveDate,
    ) -> Result<ComplianceWiringOutcome, ContractViolation> {
        let req = DueDateBatchRequest::v1(obligations, as_of)?;
        let expected_refs: Vec<ObligationRef> = req
            .obligations
            .iter()
            .map(|o| o.reference_id.clone())
            .collect();

        let resp = self
            .engine
            .run(&ComplianceRequest::DueDateBatchClassify(req));
        resp.validate()?;

        let ok = match resp {
            ComplianceResponse::DueDateBatchOk(ok) => ok,
            ComplianceResponse::Refuse(r) => return Ok(ComplianceWiringOutcome::Refused(r)),
            ComplianceResponse::DueDateClassifyOk(_) | ComplianceResponse::NextDueDateOk(_) => {
                return self.drift("capability drift detected in due-date batch output");
            }
        };
        if ok.summary.as_of != as_of {
            return self.drift("as_of drift detected in due-date batch output");
        }
        let refs_match = ok.classified.len() == expected_refs.len()
            && ok
                .classified
                .iter()
                .zip(&expected_refs)
                .all(|(entry, expected)| &entry.obligation.reference_id == expected);
        if !refs_match {
            return self.drift("obligation drift detected in due-date batch output");
        }

        let (alerts, alerts_omitted) = self.alerts(&ok.classified);
        log::debug!(
            "compliance dashboard as_of={} total={} alerts={} omitted={}",
            as_of,
            ok.summary.total,
            alerts.len(),
            alerts_omitted
        );
        Ok(ComplianceWiringOutcome::Dashboard(ComplianceDashboard {
            as_of,
            worst: ok.summary.worst,
            summary: ok.summary,
            alerts,
            alerts_omitted,
        }))
    }

    fn alerts(&self, classified: &[ClassifiedObligation]) -> (Vec<ComplianceAlert>, u32) {
        let mut alerts: Vec<ComplianceAlert> = classified
            .iter()
            .filter(|entry| match entry.classification.status {
                ComplianceStatus::Ok => false,
                ComplianceStatus::Unknown => self.config.alerts_include_unknown,
                _ => true,
            })
            .map(ComplianceAlert::from_classified)
            .collect();
        alerts.sort_by(alert_order);

        let cap = self.config.max_alerts as usize;
        let omitted = alerts.len().saturating_sub(cap);
        alerts.truncate(cap);
        (alerts, u32::try_from(omitted).unwrap_or(u32::MAX))
    }

    fn drift(&self, message: &str) -> Result<ComplianceWiringOutcome, ContractViolation> {
        log::warn!("{message}");
        Ok(ComplianceWiringOutcome::Refused(ComplianceRefuse::v1(
            ComplianceCapabilityId::DueDateBatchClassify,
            reason_codes::COMPLIANCE_WIRING_OUTPUT_DRIFT,
            message.to_string(),
        )?))
    }
}

/// Most urgent first: severity, then fewest days remaining, then reference.
/// `UNKNOWN` sorts after every ranked status.
fn alert_order(a: &ComplianceAlert, b: &ComplianceAlert) -> Ordering {
    let severity = |alert: &ComplianceAlert| {
        alert
            .status
            .severity_rank()
            .map(i16::from)
            .unwrap_or(-1)
    };
    severity(b)
        .cmp(&severity(a))
        .then_with(|| match (a.days_remaining, b.days_remaining) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.reference_id.cmp(&b.reference_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrology_contracts::compliance::{
        DueDateBatchOk, DueDateClassification, StatusTable, COMPLIANCE_CONTRACT_VERSION,
    };
    use metrology_engines::duedate::{reason_codes as engine_codes, DueDateRuntime};
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obligation(id: &str, due: Option<NaiveDate>) -> CalibrationObligation {
        CalibrationObligation::v1(ObligationRef::new(id).unwrap(), None, due).unwrap()
    }

    #[derive(Debug, Clone)]
    struct StubEngine {
        response: ComplianceResponse,
    }

    impl ComplianceEngine for StubEngine {
        fn run(&self, _req: &ComplianceRequest) -> ComplianceResponse {
            self.response.clone()
        }
    }

    #[test]
    fn at_compliance_wiring_01_alerts_sorted_most_urgent_first() {
        let as_of = date(2025, 6, 15);
        let wiring =
            ComplianceWiring::new(MetrologyWiringConfig::mvp_v1(), DueDateRuntime::default())
                .unwrap();
        let outcome = wiring
            .build_dashboard(
                vec![
                    obligation("PT-3", Some(date(2025, 7, 1))),
                    obligation("PT-1", Some(date(2025, 6, 20))),
                    obligation("PT-2", Some(date(2025, 6, 1))),
                    obligation("PT-4", Some(date(2026, 1, 1))),
                    obligation("PT-5", None),
                    obligation("PT-0", Some(date(2025, 6, 20))),
                ],
                as_of,
            )
            .unwrap();
        let ComplianceWiringOutcome::Dashboard(dashboard) = outcome else {
            panic!("expected dashboard");
        };
        let order: Vec<&str> = dashboard
            .alerts
            .iter()
            .map(|a| a.reference_id.as_str())
            .collect();
        assert_eq!(order, vec!["PT-2", "PT-0", "PT-1", "PT-3"]);
        assert_eq!(dashboard.worst, Some(ComplianceStatus::Expired));
        assert_eq!(dashboard.summary.total, 6);
        assert_eq!(dashboard.alerts_omitted, 0);
    }

    #[test]
    fn at_compliance_wiring_02_unknown_alerts_are_opt_in_and_last() {
        let config = MetrologyWiringConfig {
            alerts_include_unknown: true,
            ..MetrologyWiringConfig::mvp_v1()
        };
        let wiring = ComplianceWiring::new(config, DueDateRuntime::default()).unwrap();
        let outcome = wiring
            .build_dashboard(
                vec![
                    obligation("A", None),
                    obligation("B", Some(date(2025, 9, 1))),
                ],
                date(2025, 6, 15),
            )
            .unwrap();
        let ComplianceWiringOutcome::Dashboard(dashboard) = outcome else {
            panic!("expected dashboard");
        };
        assert_eq!(dashboard.alerts.len(), 2);
        assert_eq!(dashboard.alerts[0].status, ComplianceStatus::Upcoming);
        assert_eq!(dashboard.alerts[1].status, ComplianceStatus::Unknown);
    }

    #[test]
    fn at_compliance_wiring_03_alert_cap_reports_omitted() {
        let config = MetrologyWiringConfig {
            max_alerts: 2,
            ..MetrologyWiringConfig::mvp_v1()
        };
        let wiring = ComplianceWiring::new(config, DueDateRuntime::default()).unwrap();
        let as_of = date(2025, 6, 15);
        let obligations = (1..=5)
            .map(|i| obligation(&format!("EQ-{i}"), Some(date(2025, 6, 15 + i))))
            .collect();
        let ComplianceWiringOutcome::Dashboard(dashboard) =
            wiring.build_dashboard(obligations, as_of).unwrap()
        else {
            panic!("expected dashboard");
        };
        assert_eq!(dashboard.alerts.len(), 2);
        assert_eq!(dashboard.alerts_omitted, 3);
        assert_eq!(dashboard.alerts[0].reference_id.as_str(), "EQ-1");
    }

    #[test]
    fn at_compliance_wiring_04_engine_refuse_is_forwarded() {
        let refuse = ComplianceRefuse::v1(
            ComplianceCapabilityId::DueDateBatchClassify,
            engine_codes::DUE_DATE_INTERNAL_PIPELINE_ERROR,
            "engine unavailable".to_string(),
        )
        .unwrap();
        let wiring = ComplianceWiring::new(
            MetrologyWiringConfig::mvp_v1(),
            StubEngine {
                response: ComplianceResponse::Refuse(refuse.clone()),
            },
        )
        .unwrap();
        let outcome = wiring
            .build_dashboard(vec![obligation("A", None)], date(2025, 6, 15))
            .unwrap();
        assert_eq!(outcome, ComplianceWiringOutcome::Refused(refuse));
    }

    #[test]
    fn at_compliance_wiring_05_as_of_drift_is_refused() {
        let stale = date(2025, 1, 1);
        let classified = vec![ClassifiedObligation {
            obligation: obligation("A", None),
            classification: DueDateClassification::unknown(),
        }];
        let mut counts = StatusTable::default();
        counts.unknown = 1;
        let mut percentages = StatusTable::default();
        percentages.unknown = Decimal::ONE_HUNDRED;
        let summary = ComplianceSummary::v1(stale, 1, counts, percentages).unwrap();
        let ok = DueDateBatchOk::v1(engine_codes::DUE_DATE_OK_BATCH_CLASSIFY, summary, classified)
            .unwrap();
        let wiring = ComplianceWiring::new(
            MetrologyWiringConfig::mvp_v1(),
            StubEngine {
                response: ComplianceResponse::DueDateBatchOk(ok),
            },
        )
        .unwrap();
        let outcome = wiring
            .build_dashboard(vec![obligation("A", None)], date(2025, 6, 15))
            .unwrap();
        let ComplianceWiringOutcome::Refused(r) = outcome else {
            panic!("expected refuse");
        };
        assert_eq!(r.reason_code, reason_codes::COMPLIANCE_WIRING_OUTPUT_DRIFT);
        assert_eq!(r.schema_version, COMPLIANCE_CONTRACT_VERSION);
    }

    #[test]
    fn at_compliance_wiring_06_invalid_config_rejected() {
        let config = MetrologyWiringConfig {
            due_date: metrology_engines::duedate::DueDateConfig {
                critical_days: 30,
                warning_days: 7,
                upcoming_days: 90,
            },
            ..MetrologyWiringConfig::mvp_v1()
        };
        assert!(ComplianceWiring::new(config, DueDateRuntime::default()).is_err());
    }
}
