#![forbid(unsafe_code)]

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use metrology_contracts::uncertainty::{
    validate_limit_pct, CoverageFactor, UncertaintyBudget, UncertaintyCapabilityId,
    UncertaintyCombineOk, UncertaintyCombineRequest, UncertaintyContribution, UncertaintyRefuse,
    UncertaintyRequest, UncertaintyResponse, UncertaintyResult, UNCERTAINTY_CONTRACT_VERSION,
};
use metrology_contracts::{ContractViolation, ReasonCodeId, Validate};

use crate::EngineError;

pub mod reason_codes {
    use metrology_contracts::ReasonCodeId;

    // UNCERTAINTY reason-code namespace.
    pub const UNCERTAINTY_OK_NO_LIMIT: ReasonCodeId = ReasonCodeId(0x554E_0001);
    pub const UNCERTAINTY_OK_WITHIN_LIMIT: ReasonCodeId = ReasonCodeId(0x554E_0002);
    pub const UNCERTAINTY_OK_LIMIT_EXCEEDED: ReasonCodeId = ReasonCodeId(0x554E_0003);

    pub const UNCERTAINTY_INPUT_SCHEMA_INVALID: ReasonCodeId = ReasonCodeId(0x554E_00F1);
    pub const UNCERTAINTY_NUMERIC_OVERFLOW: ReasonCodeId = ReasonCodeId(0x554E_00F2);
    pub const UNCERTAINTY_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x554E_00F4);
}

pub const DISPLAY_DECIMALS_MAX: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyConfig {
    /// k = 2 gives roughly 95% coverage under a normal distribution.
    pub default_coverage_factor: f64,
    pub display_decimals: u32,
}

impl UncertaintyConfig {
    pub fn mvp_v1() -> Self {
        Self {
            default_coverage_factor: 2.0,
            display_decimals: 3,
        }
    }
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self::mvp_v1()
    }
}

impl Validate for UncertaintyConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        CoverageFactor::new(self.default_coverage_factor)?;
        if self.display_decimals > DISPLAY_DECIMALS_MAX {
            return Err(ContractViolation::InvalidRange {
                field: "uncertainty_config.display_decimals",
                min: 0.0,
                max: f64::from(DISPLAY_DECIMALS_MAX),
                got: f64::from(self.display_decimals),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UncertaintyRuntime {
    config: UncertaintyConfig,
}

impl UncertaintyRuntime {
    pub fn new(config: UncertaintyConfig) -> Result<Self, ContractViolation> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Root-sum-square combination, expansion by `k`, and an optional verdict
    /// against `limit_pct`. Either the whole result or `InvalidInput`.
    pub fn combine(
        &self,
        contributions: &[UncertaintyContribution],
        coverage_factor: Option<f64>,
        limit_pct: Option<f64>,
    ) -> Result<UncertaintyResult, EngineError> {
        for contribution in contributions {
            if let Err(violation) = contribution.validate() {
                log::warn!(
                    "uncertainty contribution '{}' rejected: {}",
                    contribution.name,
                    violation
                );
                return Err(violation.into());
            }
        }
        let k = match coverage_factor {
            Some(k) => CoverageFactor::new(k)?.value(),
            None => self.config.default_coverage_factor,
        };
        if let Some(limit) = limit_pct {
            validate_limit_pct("limit_pct", limit)?;
        }
        let term_count = u32::try_from(contributions.len()).map_err(|_| {
            ContractViolation::InvalidValue {
                field: "uncertainty_budget.contributions",
                reason: "must contain at most u32::MAX entries",
            }
        })?;

        let values: Vec<f64> = contributions.iter().map(|c| c.effective_pct()).collect();
        let combined = root_sum_square(values.iter().copied());
        let expanded = combined * k;
        if !combined.is_finite() || !expanded.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "uncertainty_result.expanded_pct",
            }
            .into());
        }
        let within_limit = limit_pct.map(|limit| {
            decimal_within_limit(&values, k, limit).unwrap_or(expanded <= limit)
        });

        let result = UncertaintyResult::v1(
            term_count,
            combined,
            expanded,
            k,
            self.display(combined, "uncertainty_result.combined_display")?,
            self.display(expanded, "uncertainty_result.expanded_display")?,
            limit_pct,
            within_limit,
        )?;
        log::debug!(
            "uncertainty combined terms={} combined_pct={} expanded_pct={} k={} within_limit={:?}",
            term_count,
            result.combined_display,
            result.expanded_display,
            k,
            within_limit
        );
        Ok(result)
    }

    pub fn combine_budget(
        &self,
        budget: &UncertaintyBudget,
        coverage_factor: Option<CoverageFactor>,
        limit_pct: Option<f64>,
    ) -> Result<UncertaintyResult, EngineError> {
        self.combine(
            &budget.contributions,
            coverage_factor.map(CoverageFactor::value),
            limit_pct,
        )
    }

    pub fn run(&self, req: &UncertaintyRequest) -> UncertaintyResponse {
        if let Err(violation) = req.validate() {
            log::warn!("uncertainty request refused: {violation}");
            return self.refuse(
                UncertaintyCapabilityId::UncertaintyCombine,
                reason_codes::UNCERTAINTY_INPUT_SCHEMA_INVALID,
                "uncertainty request failed contract validation",
            );
        }

        match req {
            UncertaintyRequest::UncertaintyCombine(r) => self.run_combine(r),
        }
    }

    fn run_combine(&self, req: &UncertaintyCombineRequest) -> UncertaintyResponse {
        let result = match self.combine_budget(&req.budget, req.coverage_factor, req.limit_pct) {
            Ok(result) => result,
            Err(EngineError::InvalidInput(v)) if v.field().starts_with("uncertainty_result.") => {
                return self.refuse(
                    UncertaintyCapabilityId::UncertaintyCombine,
                    reason_codes::UNCERTAINTY_NUMERIC_OVERFLOW,
                    "combined uncertainty is not representable",
                )
            }
            Err(_) => {
                return self.refuse(
                    UncertaintyCapabilityId::UncertaintyCombine,
                    reason_codes::UNCERTAINTY_INPUT_SCHEMA_INVALID,
                    "uncertainty budget failed validation",
                )
            }
        };
        let reason_code = match result.within_limit {
            None => reason_codes::UNCERTAINTY_OK_NO_LIMIT,
            Some(true) => reason_codes::UNCERTAINTY_OK_WITHIN_LIMIT,
            Some(false) => reason_codes::UNCERTAINTY_OK_LIMIT_EXCEEDED,
        };
        match UncertaintyCombineOk::v1(reason_code, result) {
            Ok(ok) => UncertaintyResponse::UncertaintyCombineOk(ok),
            Err(_) => self.refuse(
                UncertaintyCapabilityId::UncertaintyCombine,
                reason_codes::UNCERTAINTY_INTERNAL_PIPELINE_ERROR,
                "failed to construct uncertainty output",
            ),
        }
    }

    fn display(&self, value: f64, field: &'static str) -> Result<Decimal, ContractViolation> {
        round_for_display(value, self.config.display_decimals, field)
    }

    fn refuse(
        &self,
        capability_id: UncertaintyCapabilityId,
        reason_code: ReasonCodeId,
        message: &'static str,
    ) -> UncertaintyResponse {
        UncertaintyResponse::Refuse(UncertaintyRefuse {
            schema_version: UNCERTAINTY_CONTRACT_VERSION,
            capability_id,
            reason_code,
            message: message.to_string(),
        })
    }
}

impl Default for UncertaintyRuntime {
    fn default() -> Self {
        Self {
            config: UncertaintyConfig::mvp_v1(),
        }
    }
}

/// `sqrt(sum(x_i^2))`. Terms are summed in ascending order so the result does
/// not depend on the order the caller listed them in.
pub fn root_sum_square<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut squares: Vec<f64> = values.into_iter().map(|v| v * v).collect();
    squares.sort_by(f64::total_cmp);
    squares.iter().sum::<f64>().sqrt()
}

/// `k * sqrt(sum(x^2)) <= limit`, decided as `k^2 * sum(x^2) <= limit^2` on
/// the decimal values the caller wrote, so binary rounding cannot flip a
/// value that sits exactly on its limit. `None` outside the decimal range.
pub fn decimal_within_limit(values: &[f64], k: f64, limit: f64) -> Option<bool> {
    let mut sum_sq = Decimal::ZERO;
    for value in values {
        let d = Decimal::from_f64(*value)?;
        sum_sq = sum_sq.checked_add(d.checked_mul(d)?)?;
    }
    let k = Decimal::from_f64(k)?;
    let limit = Decimal::from_f64(limit)?;
    let lhs = k.checked_mul(k)?.checked_mul(sum_sq)?;
    let rhs = limit.checked_mul(limit)?;
    Some(lhs <= rhs)
}

pub fn round_for_display(
    value: f64,
    decimals: u32,
    field: &'static str,
) -> Result<Decimal, ContractViolation> {
    if !value.is_finite() {
        return Err(ContractViolation::NotFinite { field });
    }
    let exact = Decimal::from_f64(value).ok_or(ContractViolation::InvalidRange {
        field,
        min: 0.0,
        max: Decimal::MAX.to_f64().unwrap_or(f64::MAX),
        got: value,
    })?;
    Ok(exact.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero))
}
