#![forbid(unsafe_code)]

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use metrology_contracts::compliance::{
    CalibrationInterval, CalibrationObligation, ClassifiedObligation, ComplianceCapabilityId,
    ComplianceRefuse, ComplianceRequest, ComplianceResponse, ComplianceStatus, ComplianceSummary,
    DueDateBatchOk, DueDateBatchRequest, DueDateClassification, DueDateClassifyOk,
    DueDateClassifyRequest, NextDueDateOk, NextDueDateRequest, StatusTable,
    COMPLIANCE_CONTRACT_VERSION,
};
use metrology_contracts::{ContractViolation, ReasonCodeId, Validate};

use crate::EngineError;

pub mod reason_codes {
    use metrology_contracts::ReasonCodeId;

    // DUE_DATE reason-code namespace.
    pub const DUE_DATE_OK_CLASSIFY: ReasonCodeId = ReasonCodeId(0x4444_0001);
    pub const DUE_DATE_OK_BATCH_CLASSIFY: ReasonCodeId = ReasonCodeId(0x4444_0002);
    pub const DUE_DATE_OK_NEXT_DUE_DATE: ReasonCodeId = ReasonCodeId(0x4444_0003);

    pub const DUE_DATE_INPUT_SCHEMA_INVALID: ReasonCodeId = ReasonCodeId(0x4444_00F1);
    pub const DUE_DATE_CALENDAR_OVERFLOW: ReasonCodeId = ReasonCodeId(0x4444_00F2);
    pub const DUE_DATE_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x4444_00F4);
}

/// Upper bounds (inclusive, in days remaining) of the urgent bands. Anything
/// past `upcoming_days` is `OK`; anything at or below zero is `EXPIRED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDateConfig {
    pub critical_days: i64,
    pub warning_days: i64,
    pub upcoming_days: i64,
}

impl DueDateConfig {
    pub fn mvp_v1() -> Self {
        Self {
            critical_days: 7,
            warning_days: 30,
            upcoming_days: 90,
        }
    }
}

impl Default for DueDateConfig {
    fn default() -> Self {
        Self::mvp_v1()
    }
}

impl Validate for DueDateConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.critical_days <= 0 {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_config.critical_days",
                reason: "must be > 0",
            });
        }
        if self.warning_days <= self.critical_days {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_config.warning_days",
                reason: "must be > critical_days",
            });
        }
        if self.upcoming_days <= self.warning_days {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_config.upcoming_days",
                reason: "must be > warning_days",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DueDateRuntime {
    config: DueDateConfig,
}

impl DueDateRuntime {
    pub fn new(config: DueDateConfig) -> Result<Self, ContractViolation> {
        config.validate()?;
        Ok(Self { config })
    }

    /// First matching band wins; each threshold day belongs to the more
    /// urgent band.
    pub fn status_for_days(&self, days_remaining: i64) -> ComplianceStatus {
        if days_remaining <= 0 {
            ComplianceStatus::Expired
        } else if days_remaining <= self.config.critical_days {
            ComplianceStatus::Critical
        } else if days_remaining <= self.config.warning_days {
            ComplianceStatus::Warning
        } else if days_remaining <= self.config.upcoming_days {
            ComplianceStatus::Upcoming
        } else {
            ComplianceStatus::Ok
        }
    }

    pub fn classify(&self, due_date: Option<NaiveDate>, as_of: NaiveDate) -> DueDateClassification {
        match due_date {
            None => DueDateClassification::unknown(),
            Some(due) => {
                let days = days_remaining(due, as_of);
                DueDateClassification {
                    status: self.status_for_days(days),
                    days_remaining: Some(days),
                }
            }
        }
    }

    pub fn classify_obligation(
        &self,
        obligation: &CalibrationObligation,
        as_of: NaiveDate,
    ) -> DueDateClassification {
        self.classify(obligation.due_date, as_of)
    }

    pub fn classify_each(
        &self,
        obligations: &[CalibrationObligation],
        as_of: NaiveDate,
    ) -> Vec<ClassifiedObligation> {
        obligations
            .iter()
            .map(|o| ClassifiedObligation {
                obligation: o.clone(),
                classification: self.classify_obligation(o, as_of),
            })
            .collect()
    }

    pub fn classify_batch(
        &self,
        obligations: &[CalibrationObligation],
        as_of: NaiveDate,
    ) -> Result<ComplianceSummary, EngineError> {
        let mut counts: StatusTable<u32> = StatusTable::default();
        for obligation in obligations {
            *counts.get_mut(self.classify_obligation(obligation, as_of).status) += 1;
        }
        self.summarize(counts, as_of)
    }

    /// Builds the summary from per-bucket counts.
    pub fn summarize(
        &self,
        counts: StatusTable<u32>,
        as_of: NaiveDate,
    ) -> Result<ComplianceSummary, EngineError> {
        let total = counts
            .iter()
            .try_fold(0u32, |acc, (_, c)| acc.checked_add(*c))
            .ok_or(ContractViolation::InvalidValue {
                field: "compliance_summary.total",
                reason: "must fit in u32",
            })?;
        let percentages = bucket_percentages(&counts, total);
        let summary = ComplianceSummary::v1(as_of, total, counts, percentages)?;
        log::debug!(
            "due-date batch as_of={} total={} expired={} critical={} warning={} \
             upcoming={} ok={} unknown={}",
            as_of,
            total,
            counts.expired,
            counts.critical,
            counts.warning,
            counts.upcoming,
            counts.ok,
            counts.unknown
        );
        Ok(summary)
    }

    pub fn next_due_date(
        &self,
        last_calibration: NaiveDate,
        interval: CalibrationInterval,
    ) -> Result<NaiveDate, EngineError> {
        interval.validate()?;
        let due = match interval {
            CalibrationInterval::Months(m) => last_calibration.checked_add_months(Months::new(m)),
            CalibrationInterval::Days(d) => {
                last_calibration.checked_add_days(Days::new(u64::from(d)))
            }
        };
        due.ok_or_else(|| {
            EngineError::InvalidInput(ContractViolation::InvalidValue {
                field: "next_due_date.last_calibration",
                reason: "due date falls outside the supported calendar range",
            })
        })
    }

    pub fn run(&self, req: &ComplianceRequest) -> ComplianceResponse {
        if let Err(violation) = req.validate() {
            log::warn!(
                "{} request refused: {}",
                req.capability_id().as_str(),
                violation
            );
            return self.refuse(
                req.capability_id(),
                reason_codes::DUE_DATE_INPUT_SCHEMA_INVALID,
                "compliance request failed contract validation",
            );
        }

        match req {
            ComplianceRequest::DueDateClassify(r) => self.run_classify(r),
            ComplianceRequest::DueDateBatchClassify(r) => self.run_batch_classify(r),
            ComplianceRequest::NextDueDateCompute(r) => self.run_next_due_date(r),
        }
    }

    fn run_classify(&self, req: &DueDateClassifyRequest) -> ComplianceResponse {
        let classification = self.classify_obligation(&req.obligation, req.as_of);
        match DueDateClassifyOk::v1(
            reason_codes::DUE_DATE_OK_CLASSIFY,
            req.obligation.reference_id.clone(),
            classification,
        ) {
            Ok(ok) => ComplianceResponse::DueDateClassifyOk(ok),
            Err(_) => self.refuse(
                ComplianceCapabilityId::DueDateClassify,
                reason_codes::DUE_DATE_INTERNAL_PIPELINE_ERROR,
                "failed to construct due-date classification output",
            ),
        }
    }

    fn run_batch_classify(&self, req: &DueDateBatchRequest) -> ComplianceResponse {
        let classified = self.classify_each(&req.obligations, req.as_of);
        let mut counts: StatusTable<u32> = StatusTable::default();
        for entry in &classified {
            *counts.get_mut(entry.classification.status) += 1;
        }
        let summary = match self.summarize(counts, req.as_of) {
            Ok(summary) => summary,
            Err(_) => {
                return self.refuse(
                    ComplianceCapabilityId::DueDateBatchClassify,
                    reason_codes::DUE_DATE_INTERNAL_PIPELINE_ERROR,
                    "failed to summarize due-date batch",
                )
            }
        };
        match DueDateBatchOk::v1(reason_codes::DUE_DATE_OK_BATCH_CLASSIFY, summary, classified) {
            Ok(ok) => ComplianceResponse::DueDateBatchOk(ok),
            Err(_) => self.refuse(
                ComplianceCapabilityId::DueDateBatchClassify,
                reason_codes::DUE_DATE_INTERNAL_PIPELINE_ERROR,
                "failed to construct due-date batch output",
            ),
        }
    }

    fn run_next_due_date(&self, req: &NextDueDateRequest) -> ComplianceResponse {
        let due_date = match self.next_due_date(req.last_calibration, req.interval) {
            Ok(due) => due,
            Err(err) => {
                log::warn!("next due date refused: {err}");
                return self.refuse(
                    ComplianceCapabilityId::NextDueDateCompute,
                    reason_codes::DUE_DATE_CALENDAR_OVERFLOW,
                    "next due date falls outside the supported calendar range",
                );
            }
        };
        match NextDueDateOk::v1(
            reason_codes::DUE_DATE_OK_NEXT_DUE_DATE,
            req.reference_id.clone(),
            req.last_calibration,
            due_date,
        ) {
            Ok(ok) => ComplianceResponse::NextDueDateOk(ok),
            Err(_) => self.refuse(
                ComplianceCapabilityId::NextDueDateCompute,
                reason_codes::DUE_DATE_INTERNAL_PIPELINE_ERROR,
                "failed to construct next due date output",
            ),
        }
    }

    fn refuse(
        &self,
        capability_id: ComplianceCapabilityId,
        reason_code: ReasonCodeId,
        message: &'static str,
    ) -> ComplianceResponse {
        ComplianceResponse::Refuse(ComplianceRefuse {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            capability_id,
            reason_code,
            message: message.to_string(),
        })
    }
}

impl Default for DueDateRuntime {
    fn default() -> Self {
        Self {
            config: DueDateConfig::mvp_v1(),
        }
    }
}

/// Whole calendar days from `as_of` to `due_date`; negative once expired.
pub fn days_remaining(due_date: NaiveDate, as_of: NaiveDate) -> i64 {
    due_date.signed_duration_since(as_of).num_days()
}

/// Percent of `total` per bucket at one decimal place.
///
/// Uses largest-remainder apportionment over tenths of a percent so a
/// non-empty batch always sums to exactly 100.0. Ties go to the bucket that
/// comes first in `ComplianceStatus::ALL`. Empty buckets stay at 0.
fn bucket_percentages(counts: &StatusTable<u32>, total: u32) -> StatusTable<Decimal> {
    let mut out: StatusTable<Decimal> = StatusTable::default();
    if total == 0 {
        return out;
    }
    const SCALE: u64 = 1_000;
    let total = u64::from(total);

    let mut tenths: StatusTable<u64> = StatusTable::default();
    let mut remainders: Vec<(u64, ComplianceStatus)> = Vec::with_capacity(6);
    for (status, count) in counts.iter() {
        let scaled = u64::from(*count) * SCALE;
        *tenths.get_mut(status) = scaled / total;
        remainders.push((scaled % total, status));
    }
    let assigned: u64 = tenths.iter().map(|(_, t)| *t).sum();
    let mut leftover = SCALE.saturating_sub(assigned);

    remainders.sort_by(|a, b| b.0.cmp(&a.0));
    for (remainder, status) in remainders {
        if leftover == 0 || remainder == 0 {
            break;
        }
        *tenths.get_mut(status) += 1;
        leftover -= 1;
    }

    for (status, t) in tenths.iter() {
        *out.get_mut(status) = Decimal::new(*t as i64, 1);
    }
    out
}
