#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{validate_ascii_text, validate_label};
use crate::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};

pub const UNCERTAINTY_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

pub const CONTRIBUTION_NAME_MAX_LEN: usize = 96;

/// Gap, in units of f64 epsilon relative to the larger operand, within which
/// an expanded value counts as sitting on its limit.
pub const LIMIT_BOUNDARY_ULPS: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UncertaintyCapabilityId {
    UncertaintyCombine,
}

impl UncertaintyCapabilityId {
    pub fn as_str(self) -> &'static str {
        match self {
            UncertaintyCapabilityId::UncertaintyCombine => "UNCERTAINTY_COMBINE",
        }
    }
}

/// Links of a flow-measurement chain that usually carry their own standard
/// uncertainty on the calibration certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainComponent {
    PrimaryMeter,
    PressureTransmitter,
    TemperatureTransmitter,
    DensityAnalysis,
}

impl ChainComponent {
    pub fn as_str(self) -> &'static str {
        match self {
            ChainComponent::PrimaryMeter => "primary_meter",
            ChainComponent::PressureTransmitter => "pressure_transmitter",
            ChainComponent::TemperatureTransmitter => "temperature_transmitter",
            ChainComponent::DensityAnalysis => "density_analysis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UncertaintyContribution {
    pub name: String,
    /// Standard uncertainty in percent of reading. `None` counts as 0.
    pub value_pct: Option<f64>,
}

impl UncertaintyContribution {
    pub fn v1(name: impl Into<String>, value_pct: Option<f64>) -> Result<Self, ContractViolation> {
        let c = Self {
            name: name.into(),
            value_pct,
        };
        c.validate()?;
        Ok(c)
    }

    pub fn effective_pct(&self) -> f64 {
        self.value_pct.unwrap_or(0.0)
    }
}

impl Validate for UncertaintyContribution {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_label(
            "uncertainty_contribution.name",
            &self.name,
            CONTRIBUTION_NAME_MAX_LEN,
        )?;
        if let Some(value) = self.value_pct {
            if !value.is_finite() {
                return Err(ContractViolation::NotFinite {
                    field: "uncertainty_contribution.value_pct",
                });
            }
            if value < 0.0 {
                return Err(ContractViolation::InvalidValue {
                    field: "uncertainty_contribution.value_pct",
                    reason: "uncertainty must be >= 0",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UncertaintyBudget {
    pub contributions: Vec<UncertaintyContribution>,
}

impl UncertaintyBudget {
    pub fn v1(contributions: Vec<UncertaintyContribution>) -> Result<Self, ContractViolation> {
        let budget = Self { contributions };
        budget.validate()?;
        Ok(budget)
    }

    /// Four-term budget of a conventional flow-measurement system.
    pub fn standard_chain(
        primary_meter_pct: Option<f64>,
        pressure_pct: Option<f64>,
        temperature_pct: Option<f64>,
        density_pct: Option<f64>,
    ) -> Result<Self, ContractViolation> {
        Self::v1(vec![
            UncertaintyContribution::v1(ChainComponent::PrimaryMeter.as_str(), primary_meter_pct)?,
            UncertaintyContribution::v1(
                ChainComponent::PressureTransmitter.as_str(),
                pressure_pct,
            )?,
            UncertaintyContribution::v1(
                ChainComponent::TemperatureTransmitter.as_str(),
                temperature_pct,
            )?,
            UncertaintyContribution::v1(ChainComponent::DensityAnalysis.as_str(), density_pct)?,
        ])
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }
}

impl Validate for UncertaintyBudget {
    fn validate(&self) -> Result<(), ContractViolation> {
        if u32::try_from(self.contributions.len()).is_err() {
            return Err(ContractViolation::InvalidValue {
                field: "uncertainty_budget.contributions",
                reason: "must contain at most u32::MAX entries",
            });
        }
        for c in &self.contributions {
            c.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct CoverageFactor(f64);

impl CoverageFactor {
    pub fn new(k: f64) -> Result<Self, ContractViolation> {
        let k = Self(k);
        k.validate()?;
        Ok(k)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Validate for CoverageFactor {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !self.0.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "coverage_factor",
            });
        }
        if self.0 <= 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "coverage_factor",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

impl TryFrom<f64> for CoverageFactor {
    type Error = ContractViolation;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CoverageFactor> for f64 {
    fn from(value: CoverageFactor) -> Self {
        value.0
    }
}

/// Regulatory classification of a measurement point. Each carries its own
/// acceptance ceiling for expanded uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitCategory {
    Fiscal,
    #[serde(alias = "apropriacao", alias = "apropriação")]
    Appropriation,
    #[serde(alias = "operacional")]
    Operational,
}

impl LimitCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitCategory::Fiscal => "fiscal",
            LimitCategory::Appropriation => "appropriation",
            LimitCategory::Operational => "operational",
        }
    }

    /// Accepts the English names and the Portuguese labels used on records.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fiscal" => Some(LimitCategory::Fiscal),
            "appropriation" | "apropriacao" | "apropriação" => Some(LimitCategory::Appropriation),
            "operational" | "operacional" => Some(LimitCategory::Operational),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegulatoryLimit {
    pub category: LimitCategory,
    pub limit_pct: f64,
    #[serde(default)]
    pub reference_standard: Option<String>,
}

impl RegulatoryLimit {
    pub fn v1(
        category: LimitCategory,
        limit_pct: f64,
        reference_standard: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let limit = Self {
            category,
            limit_pct,
            reference_standard,
        };
        limit.validate()?;
        Ok(limit)
    }
}

impl Validate for RegulatoryLimit {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_limit_pct("regulatory_limit.limit_pct", self.limit_pct)?;
        if let Some(reference) = &self.reference_standard {
            validate_label("regulatory_limit.reference_standard", reference, 128)?;
        }
        Ok(())
    }
}

pub fn validate_limit_pct(field: &'static str, limit_pct: f64) -> Result<(), ContractViolation> {
    if !limit_pct.is_finite() {
        return Err(ContractViolation::NotFinite { field });
    }
    if limit_pct < 0.0 {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be >= 0",
        });
    }
    Ok(())
}

/// Combined and expanded uncertainty of one budget.
///
/// `combined_pct` and `expanded_pct` keep full precision for chaining; the
/// `*_display` values are rounded for presentation only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncertaintyResult {
    pub schema_version: SchemaVersion,
    pub term_count: u32,
    pub combined_pct: f64,
    pub expanded_pct: f64,
    pub coverage_factor: f64,
    pub combined_display: Decimal,
    pub expanded_display: Decimal,
    pub limit_pct: Option<f64>,
    pub within_limit: Option<bool>,
}

impl UncertaintyResult {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        term_count: u32,
        combined_pct: f64,
        expanded_pct: f64,
        coverage_factor: f64,
        combined_display: Decimal,
        expanded_display: Decimal,
        limit_pct: Option<f64>,
        within_limit: Option<bool>,
    ) -> Result<Self, ContractViolation> {
        let out = Self {
            schema_version: UNCERTAINTY_CONTRACT_VERSION,
            term_count,
            combined_pct,
            expanded_pct,
            coverage_factor,
            combined_display,
            expanded_display,
            limit_pct,
            within_limit,
        };
        out.validate()?;
        Ok(out)
    }

    /// Feeds this stage's full-precision combined value into another budget.
    pub fn as_contribution(
        &self,
        name: impl Into<String>,
    ) -> Result<UncertaintyContribution, ContractViolation> {
        UncertaintyContribution::v1(name, Some(self.combined_pct))
    }
}

impl Validate for UncertaintyResult {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != UNCERTAINTY_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "uncertainty_result.schema_version",
                reason: "must match UNCERTAINTY_CONTRACT_VERSION",
            });
        }
        for (field, value) in [
            ("uncertainty_result.combined_pct", self.combined_pct),
            ("uncertainty_result.expanded_pct", self.expanded_pct),
        ] {
            if !value.is_finite() {
                return Err(ContractViolation::NotFinite { field });
            }
            if value < 0.0 {
                return Err(ContractViolation::InvalidValue {
                    field,
                    reason: "must be >= 0",
                });
            }
        }
        CoverageFactor::new(self.coverage_factor)?;
        if self.combined_display.is_sign_negative() || self.expanded_display.is_sign_negative() {
            return Err(ContractViolation::InvalidValue {
                field: "uncertainty_result.display",
                reason: "display values must be >= 0",
            });
        }
        match (self.limit_pct, self.within_limit) {
            (None, None) => {}
            (Some(limit), Some(within)) => {
                validate_limit_pct("uncertainty_result.limit_pct", limit)?;
                let gap = (self.expanded_pct - limit).abs();
                let on_boundary =
                    gap <= LIMIT_BOUNDARY_ULPS * f64::EPSILON * self.expanded_pct.max(limit);
                if !on_boundary && within != (self.expanded_pct <= limit) {
                    return Err(ContractViolation::InvalidValue {
                        field: "uncertainty_result.within_limit",
                        reason: "must equal expanded_pct <= limit_pct",
                    });
                }
            }
            (None, Some(_)) => {
                return Err(ContractViolation::InvalidValue {
                    field: "uncertainty_result.within_limit",
                    reason: "must be absent when no limit was supplied",
                });
            }
            (Some(_), None) => {
                return Err(ContractViolation::InvalidValue {
                    field: "uncertainty_result.within_limit",
                    reason: "must be present when a limit was supplied",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyCombineRequest {
    pub schema_version: SchemaVersion,
    pub budget: UncertaintyBudget,
    pub coverage_factor: Option<CoverageFactor>,
    pub limit_pct: Option<f64>,
}

impl UncertaintyCombineRequest {
    pub fn v1(
        budget: UncertaintyBudget,
        coverage_factor: Option<CoverageFactor>,
        limit_pct: Option<f64>,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: UNCERTAINTY_CONTRACT_VERSION,
            budget,
            coverage_factor,
            limit_pct,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for UncertaintyCombineRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != UNCERTAINTY_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "uncertainty_combine_request.schema_version",
                reason: "must match UNCERTAINTY_CONTRACT_VERSION",
            });
        }
        self.budget.validate()?;
        if let Some(k) = &self.coverage_factor {
            k.validate()?;
        }
        if let Some(limit) = self.limit_pct {
            validate_limit_pct("uncertainty_combine_request.limit_pct", limit)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncertaintyCombineOk {
    pub schema_version: SchemaVersion,
    pub capability_id: UncertaintyCapabilityId,
    pub reason_code: ReasonCodeId,
    pub result: UncertaintyResult,
}

impl UncertaintyCombineOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        result: UncertaintyResult,
    ) -> Result<Self, ContractViolation> {
        let out = Self {
            schema_version: UNCERTAINTY_CONTRACT_VERSION,
            capability_id: UncertaintyCapabilityId::UncertaintyCombine,
            reason_code,
            result,
        };
        out.validate()?;
        Ok(out)
    }
}

impl Validate for UncertaintyCombineOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != UNCERTAINTY_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "uncertainty_combine_ok.schema_version",
                reason: "must match UNCERTAINTY_CONTRACT_VERSION",
            });
        }
        if self.capability_id != UncertaintyCapabilityId::UncertaintyCombine {
            return Err(ContractViolation::InvalidValue {
                field: "uncertainty_combine_ok.capability_id",
                reason: "must be UNCERTAINTY_COMBINE",
            });
        }
        self.result.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncertaintyRefuse {
    pub schema_version: SchemaVersion,
    pub capability_id: UncertaintyCapabilityId,
    pub reason_code: ReasonCodeId,
    pub message: String,
}

impl UncertaintyRefuse {
    pub fn v1(
        capability_id: UncertaintyCapabilityId,
        reason_code: ReasonCodeId,
        message: String,
    ) -> Result<Self, ContractViolation> {
        let out = Self {
            schema_version: UNCERTAINTY_CONTRACT_VERSION,
            capability_id,
            reason_code,
            message,
        };
        out.validate()?;
        Ok(out)
    }
}

impl Validate for UncertaintyRefuse {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != UNCERTAINTY_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "uncertainty_refuse.schema_version",
                reason: "must match UNCERTAINTY_CONTRACT_VERSION",
            });
        }
        validate_ascii_text("uncertainty_refuse.message", &self.message, 192)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UncertaintyRequest {
    UncertaintyCombine(UncertaintyCombineRequest),
}

impl Validate for UncertaintyRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            UncertaintyRequest::UncertaintyCombine(req) => req.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UncertaintyResponse {
    UncertaintyCombineOk(UncertaintyCombineOk),
    Refuse(UncertaintyRefuse),
}

impl Validate for UncertaintyResponse {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            UncertaintyResponse::UncertaintyCombineOk(out) => out.validate(),
            UncertaintyResponse::Refuse(out) => out.validate(),
        }
    }
}
