#![forbid(unsafe_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{validate_ascii_text, validate_label};
use crate::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};

pub const COMPLIANCE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

pub const OBLIGATION_REF_MAX_LEN: usize = 128;
pub const CALIBRATION_INTERVAL_MAX_MONTHS: u32 = 120;
pub const CALIBRATION_INTERVAL_MAX_DAYS: u32 = 3_660;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceCapabilityId {
    DueDateClassify,
    DueDateBatchClassify,
    NextDueDateCompute,
}

impl ComplianceCapabilityId {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceCapabilityId::DueDateClassify => "DUE_DATE_CLASSIFY",
            ComplianceCapabilityId::DueDateBatchClassify => "DUE_DATE_BATCH_CLASSIFY",
            ComplianceCapabilityId::NextDueDateCompute => "NEXT_DUE_DATE_COMPUTE",
        }
    }
}

/// Opaque identifier of the equipment or measurement point that owns an
/// obligation. Never interpreted beyond shape checks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObligationRef(String);

impl ObligationRef {
    pub fn new(value: impl Into<String>) -> Result<Self, ContractViolation> {
        let id = Self(value.into());
        id.validate()?;
        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for ObligationRef {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_label("obligation_ref", &self.0, OBLIGATION_REF_MAX_LEN)
    }
}

impl TryFrom<String> for ObligationRef {
    type Error = ContractViolation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObligationRef> for String {
    fn from(value: ObligationRef) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    EquipmentCalibration,
    OrificePlateInspection,
    WellTest,
    UncertaintyAnalysis,
    Other,
}

impl ObligationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObligationKind::EquipmentCalibration => "equipment_calibration",
            ObligationKind::OrificePlateInspection => "orifice_plate_inspection",
            ObligationKind::WellTest => "well_test",
            ObligationKind::UncertaintyAnalysis => "uncertainty_analysis",
            ObligationKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationObligation {
    pub reference_id: ObligationRef,
    #[serde(default)]
    pub kind: Option<ObligationKind>,
    pub due_date: Option<NaiveDate>,
}

impl CalibrationObligation {
    pub fn v1(
        reference_id: ObligationRef,
        kind: Option<ObligationKind>,
        due_date: Option<NaiveDate>,
    ) -> Result<Self, ContractViolation> {
        let obligation = Self {
            reference_id,
            kind,
            due_date,
        };
        obligation.validate()?;
        Ok(obligation)
    }
}

impl Validate for CalibrationObligation {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.reference_id.validate()
    }
}

/// Due-date severity bucket.
///
/// Variants are declared least to most urgent, with `Unknown` last. `Unknown`
/// has no severity rank and never wins a worst-case comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Ok,
    Upcoming,
    Warning,
    Critical,
    Expired,
    Unknown,
}

impl ComplianceStatus {
    pub const ALL: [ComplianceStatus; 6] = [
        ComplianceStatus::Ok,
        ComplianceStatus::Upcoming,
        ComplianceStatus::Warning,
        ComplianceStatus::Critical,
        ComplianceStatus::Expired,
        ComplianceStatus::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceStatus::Ok => "OK",
            ComplianceStatus::Upcoming => "UPCOMING",
            ComplianceStatus::Warning => "WARNING",
            ComplianceStatus::Critical => "CRITICAL",
            ComplianceStatus::Expired => "EXPIRED",
            ComplianceStatus::Unknown => "UNKNOWN",
        }
    }

    /// 0 for `Ok` up to 4 for `Expired`; `None` for `Unknown`.
    pub fn severity_rank(self) -> Option<u8> {
        match self {
            ComplianceStatus::Ok => Some(0),
            ComplianceStatus::Upcoming => Some(1),
            ComplianceStatus::Warning => Some(2),
            ComplianceStatus::Critical => Some(3),
            ComplianceStatus::Expired => Some(4),
            ComplianceStatus::Unknown => None,
        }
    }

    pub fn is_more_urgent_than(self, other: ComplianceStatus) -> bool {
        match (self.severity_rank(), other.severity_rank()) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        }
    }

    pub fn worst<I>(statuses: I) -> Option<ComplianceStatus>
    where
        I: IntoIterator<Item = ComplianceStatus>,
    {
        statuses
            .into_iter()
            .filter_map(|s| s.severity_rank().map(|rank| (rank, s)))
            .max_by_key(|(rank, _)| *rank)
            .map(|(_, s)| s)
    }
}

/// One value per status bucket, in `ComplianceStatus::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusTable<T> {
    pub ok: T,
    pub upcoming: T,
    pub warning: T,
    pub critical: T,
    pub expired: T,
    pub unknown: T,
}

impl<T> StatusTable<T> {
    pub fn get(&self, status: ComplianceStatus) -> &T {
        match status {
            ComplianceStatus::Ok => &self.ok,
            ComplianceStatus::Upcoming => &self.upcoming,
            ComplianceStatus::Warning => &self.warning,
            ComplianceStatus::Critical => &self.critical,
            ComplianceStatus::Expired => &self.expired,
            ComplianceStatus::Unknown => &self.unknown,
        }
    }

    pub fn get_mut(&mut self, status: ComplianceStatus) -> &mut T {
        match status {
            ComplianceStatus::Ok => &mut self.ok,
            ComplianceStatus::Upcoming => &mut self.upcoming,
            ComplianceStatus::Warning => &mut self.warning,
            ComplianceStatus::Critical => &mut self.critical,
            ComplianceStatus::Expired => &mut self.expired,
            ComplianceStatus::Unknown => &mut self.unknown,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComplianceStatus, &T)> + '_ {
        ComplianceStatus::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDateClassification {
    pub status: ComplianceStatus,
    pub days_remaining: Option<i64>,
}

impl DueDateClassification {
    pub fn v1(
        status: ComplianceStatus,
        days_remaining: Option<i64>,
    ) -> Result<Self, ContractViolation> {
        let out = Self {
            status,
            days_remaining,
        };
        out.validate()?;
        Ok(out)
    }

    pub fn unknown() -> Self {
        Self {
            status: ComplianceStatus::Unknown,
            days_remaining: None,
        }
    }
}

impl Validate for DueDateClassification {
    fn validate(&self) -> Result<(), ContractViolation> {
        match (self.status, self.days_remaining) {
            (ComplianceStatus::Unknown, None) => Ok(()),
            (ComplianceStatus::Unknown, Some(_)) => Err(ContractViolation::InvalidValue {
                field: "due_date_classification.days_remaining",
                reason: "must be absent when status=UNKNOWN",
            }),
            (_, None) => Err(ContractViolation::InvalidValue {
                field: "due_date_classification.days_remaining",
                reason: "must be present when status is not UNKNOWN",
            }),
            (ComplianceStatus::Expired, Some(days)) if days > 0 => {
                Err(ContractViolation::InvalidValue {
                    field: "due_date_classification.days_remaining",
                    reason: "must be <= 0 when status=EXPIRED",
                })
            }
            (status, Some(days)) if status != ComplianceStatus::Expired && days <= 0 => {
                Err(ContractViolation::InvalidValue {
                    field: "due_date_classification.days_remaining",
                    reason: "must be > 0 unless status=EXPIRED",
                })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedObligation {
    pub obligation: CalibrationObligation,
    pub classification: DueDateClassification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceSummary {
    pub schema_version: SchemaVersion,
    pub as_of: NaiveDate,
    pub total: u32,
    pub counts: StatusTable<u32>,
    pub percentages: StatusTable<Decimal>,
    pub worst: Option<ComplianceStatus>,
}

impl ComplianceSummary {
    pub fn v1(
        as_of: NaiveDate,
        total: u32,
        counts: StatusTable<u32>,
        percentages: StatusTable<Decimal>,
    ) -> Result<Self, ContractViolation> {
        let worst = ComplianceStatus::worst(
            counts
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(status, _)| status),
        );
        let out = Self {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            as_of,
            total,
            counts,
            percentages,
            worst,
        };
        out.validate()?;
        Ok(out)
    }

    pub fn empty(as_of: NaiveDate) -> Self {
        Self {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            as_of,
            total: 0,
            counts: StatusTable::default(),
            percentages: StatusTable::default(),
            worst: None,
        }
    }
}

impl Validate for ComplianceSummary {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != COMPLIANCE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "compliance_summary.schema_version",
                reason: "must match COMPLIANCE_CONTRACT_VERSION",
            });
        }
        let count_sum: u64 = self.counts.iter().map(|(_, c)| u64::from(*c)).sum();
        if count_sum != u64::from(self.total) {
            return Err(ContractViolation::InvalidValue {
                field: "compliance_summary.counts",
                reason: "bucket counts must sum to total",
            });
        }
        let hundred = Decimal::ONE_HUNDRED;
        for (status, pct) in self.percentages.iter() {
            if pct.is_sign_negative() || *pct > hundred {
                return Err(ContractViolation::InvalidValue {
                    field: "compliance_summary.percentages",
                    reason: "each percentage must be within 0..=100",
                });
            }
            if *self.counts.get(status) == 0 && !pct.is_zero() {
                return Err(ContractViolation::InvalidValue {
                    field: "compliance_summary.percentages",
                    reason: "empty bucket must report 0 percent",
                });
            }
        }
        let pct_sum: Decimal = self.percentages.iter().map(|(_, p)| *p).sum();
        if self.total == 0 {
            if !pct_sum.is_zero() {
                return Err(ContractViolation::InvalidValue {
                    field: "compliance_summary.percentages",
                    reason: "must all be 0 when total=0",
                });
            }
        } else if pct_sum != hundred {
            return Err(ContractViolation::InvalidValue {
                field: "compliance_summary.percentages",
                reason: "must sum to 100 when total > 0",
            });
        }
        let expected_worst = ComplianceStatus::worst(
            self.counts
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(status, _)| status),
        );
        if self.worst != expected_worst {
            return Err(ContractViolation::InvalidValue {
                field: "compliance_summary.worst",
                reason: "must be the most severe non-empty bucket",
            });
        }
        Ok(())
    }
}

/// Recertification period of a device, as recorded on its calibration plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationInterval {
    Months(u32),
    Days(u32),
}

impl Validate for CalibrationInterval {
    fn validate(&self) -> Result<(), ContractViolation> {
        match *self {
            CalibrationInterval::Months(m) if m == 0 || m > CALIBRATION_INTERVAL_MAX_MONTHS => {
                Err(ContractViolation::InvalidRange {
                    field: "calibration_interval.months",
                    min: 1.0,
                    max: f64::from(CALIBRATION_INTERVAL_MAX_MONTHS),
                    got: f64::from(m),
                })
            }
            CalibrationInterval::Days(d) if d == 0 || d > CALIBRATION_INTERVAL_MAX_DAYS => {
                Err(ContractViolation::InvalidRange {
                    field: "calibration_interval.days",
                    min: 1.0,
                    max: f64::from(CALIBRATION_INTERVAL_MAX_DAYS),
                    got: f64::from(d),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Parses a strict ISO `YYYY-MM-DD` calendar date.
///
/// Day-first and slash-separated forms are rejected instead of guessed, as
/// are timestamps and surrounding whitespace.
pub fn parse_calendar_date(
    field: &'static str,
    raw: &str,
) -> Result<NaiveDate, ContractViolation> {
    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shape_ok {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be a calendar date in YYYY-MM-DD form",
        });
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ContractViolation::InvalidValue {
        field,
        reason: "must name an existing calendar day",
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDateClassifyRequest {
    pub schema_version: SchemaVersion,
    pub obligation: CalibrationObligation,
    pub as_of: NaiveDate,
}

impl DueDateClassifyRequest {
    pub fn v1(
        obligation: CalibrationObligation,
        as_of: NaiveDate,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            obligation,
            as_of,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for DueDateClassifyRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != COMPLIANCE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_classify_request.schema_version",
                reason: "must match COMPLIANCE_CONTRACT_VERSION",
            });
        }
        self.obligation.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDateBatchRequest {
    pub schema_version: SchemaVersion,
    pub obligations: Vec<CalibrationObligation>,
    pub as_of: NaiveDate,
}

impl DueDateBatchRequest {
    pub fn v1(
        obligations: Vec<CalibrationObligation>,
        as_of: NaiveDate,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            obligations,
            as_of,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for DueDateBatchRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != COMPLIANCE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_batch_request.schema_version",
                reason: "must match COMPLIANCE_CONTRACT_VERSION",
            });
        }
        if u32::try_from(self.obligations.len()).is_err() {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_batch_request.obligations",
                reason: "must contain at most u32::MAX entries",
            });
        }
        for obligation in &self.obligations {
            obligation.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextDueDateRequest {
    pub schema_version: SchemaVersion,
    pub reference_id: ObligationRef,
    pub last_calibration: NaiveDate,
    pub interval: CalibrationInterval,
}

impl NextDueDateRequest {
    pub fn v1(
        reference_id: ObligationRef,
        last_calibration: NaiveDate,
        interval: CalibrationInterval,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            reference_id,
            last_calibration,
            interval,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for NextDueDateRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != COMPLIANCE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "next_due_date_request.schema_version",
                reason: "must match COMPLIANCE_CONTRACT_VERSION",
            });
        }
        self.reference_id.validate()?;
        self.interval.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueDateClassifyOk {
    pub schema_version: SchemaVersion,
    pub capability_id: ComplianceCapabilityId,
    pub reason_code: ReasonCodeId,
    pub reference_id: ObligationRef,
    pub classification: DueDateClassification,
}

impl DueDateClassifyOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        reference_id: ObligationRef,
        classification: DueDateClassification,
    ) -> Result<Self, ContractViolation> {
        let out = Self {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            capability_id: ComplianceCapabilityId::DueDateClassify,
            reason_code,
            reference_id,
            classification,
        };
        out.validate()?;
        Ok(out)
    }
}

impl Validate for DueDateClassifyOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != COMPLIANCE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_classify_ok.schema_version",
                reason: "must match COMPLIANCE_CONTRACT_VERSION",
            });
        }
        if self.capability_id != ComplianceCapabilityId::DueDateClassify {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_classify_ok.capability_id",
                reason: "must be DUE_DATE_CLASSIFY",
            });
        }
        self.reference_id.validate()?;
        self.classification.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueDateBatchOk {
    pub schema_version: SchemaVersion,
    pub capability_id: ComplianceCapabilityId,
    pub reason_code: ReasonCodeId,
    pub summary: ComplianceSummary,
    pub classified: Vec<ClassifiedObligation>,
}

impl DueDateBatchOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        summary: ComplianceSummary,
        classified: Vec<ClassifiedObligation>,
    ) -> Result<Self, ContractViolation> {
        let out = Self {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            capability_id: ComplianceCapabilityId::DueDateBatchClassify,
            reason_code,
            summary,
            classified,
        };
        out.validate()?;
        Ok(out)
    }
}

impl Validate for DueDateBatchOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != COMPLIANCE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_batch_ok.schema_version",
                reason: "must match COMPLIANCE_CONTRACT_VERSION",
            });
        }
        if self.capability_id != ComplianceCapabilityId::DueDateBatchClassify {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_batch_ok.capability_id",
                reason: "must be DUE_DATE_BATCH_CLASSIFY",
            });
        }
        self.summary.validate()?;
        if self.classified.len() != self.summary.total as usize {
            return Err(ContractViolation::InvalidValue {
                field: "due_date_batch_ok.classified",
                reason: "must hold one entry per obligation in the summary",
            });
        }
        for entry in &self.classified {
            entry.classification.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextDueDateOk {
    pub schema_version: SchemaVersion,
    pub capability_id: ComplianceCapabilityId,
    pub reason_code: ReasonCodeId,
    pub reference_id: ObligationRef,
    pub last_calibration: NaiveDate,
    pub due_date: NaiveDate,
}

impl NextDueDateOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        reference_id: ObligationRef,
        last_calibration: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<Self, ContractViolation> {
        let out = Self {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            capability_id: ComplianceCapabilityId::NextDueDateCompute,
            reason_code,
            reference_id,
            last_calibration,
            due_date,
        };
        out.validate()?;
        Ok(out)
    }
}

impl Validate for NextDueDateOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != COMPLIANCE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "next_due_date_ok.schema_version",
                reason: "must match COMPLIANCE_CONTRACT_VERSION",
            });
        }
        if self.capability_id != ComplianceCapabilityId::NextDueDateCompute {
            return Err(ContractViolation::InvalidValue {
                field: "next_due_date_ok.capability_id",
                reason: "must be NEXT_DUE_DATE_COMPUTE",
            });
        }
        self.reference_id.validate()?;
        if self.due_date <= self.last_calibration {
            return Err(ContractViolation::InvalidValue {
                field: "next_due_date_ok.due_date",
                reason: "must be after last_calibration",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceRefuse {
    pub schema_version: SchemaVersion,
    pub capability_id: ComplianceCapabilityId,
    pub reason_code: ReasonCodeId,
    pub message: String,
}

impl ComplianceRefuse {
    pub fn v1(
        capability_id: ComplianceCapabilityId,
        reason_code: ReasonCodeId,
        message: String,
    ) -> Result<Self, ContractViolation> {
        let out = Self {
            schema_version: COMPLIANCE_CONTRACT_VERSION,
            capability_id,
            reason_code,
            message,
        };
        out.validate()?;
        Ok(out)
    }
}

impl Validate for ComplianceRefuse {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != COMPLIANCE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "compliance_refuse.schema_version",
                reason: "must match COMPLIANCE_CONTRACT_VERSION",
            });
        }
        validate_ascii_text("compliance_refuse.message", &self.message, 192)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplianceRequest {
    DueDateClassify(DueDateClassifyRequest),
    DueDateBatchClassify(DueDateBatchRequest),
    NextDueDateCompute(NextDueDateRequest),
}

impl ComplianceRequest {
    pub fn capability_id(&self) -> ComplianceCapabilityId {
        match self {
            ComplianceRequest::DueDateClassify(_) => ComplianceCapabilityId::DueDateClassify,
            ComplianceRequest::DueDateBatchClassify(_) => {
                ComplianceCapabilityId::DueDateBatchClassify
            }
            ComplianceRequest::NextDueDateCompute(_) => ComplianceCapabilityId::NextDueDateCompute,
        }
    }
}

impl Validate for ComplianceRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            ComplianceRequest::DueDateClassify(req) => req.validate(),
            ComplianceRequest::DueDateBatchClassify(req) => req.validate(),
            ComplianceRequest::NextDueDateCompute(req) => req.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ComplianceResponse {
    DueDateClassifyOk(DueDateClassifyOk),
    DueDateBatchOk(DueDateBatchOk),
    NextDueDateOk(NextDueDateOk),
    Refuse(ComplianceRefuse),
}

impl Validate for ComplianceResponse {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            ComplianceResponse::DueDateClassifyOk(out) => out.validate(),
            ComplianceResponse::DueDateBatchOk(out) => out.validate(),
            ComplianceResponse::NextDueDateOk(out) => out.validate(),
            ComplianceResponse::Refuse(out) => out.validate(),
        }
    }
}
