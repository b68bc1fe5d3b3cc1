#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::Serialize;

use metrology_contracts::uncertainty::{
    CoverageFactor, LimitCategory, RegulatoryLimit, UncertaintyBudget, UncertaintyCapabilityId,
    UncertaintyCombineRequest, UncertaintyRefuse, UncertaintyRequest, UncertaintyResponse,
    UncertaintyResult,
};
use metrology_contracts::{ContractViolation, Validate};

pub mod reason_codes {
    use metrology_contracts::ReasonCodeId;

    // Uncertainty wiring reason-code namespace.
    pub const UNCERTAINTY_WIRING_OUTPUT_DRIFT: ReasonCodeId = ReasonCodeId(0x5557_0101);
}

pub trait UncertaintyEngine {
    fn run(&self, req: &UncertaintyRequest) -> UncertaintyResponse;
}

impl UncertaintyEngine for metrology_engines::uncertainty::UncertaintyRuntime {
    fn run(&self, req: &UncertaintyRequest) -> UncertaintyResponse {
        self.run(req)
    }
}

/// Acceptance ceilings for expanded uncertainty, one per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LimitRegistry {
    limits: BTreeMap<LimitCategory, RegulatoryLimit>,
}

impl LimitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_limits<I>(limits: I) -> Result<Self, ContractViolation>
    where
        I: IntoIterator<Item = RegulatoryLimit>,
    {
        let mut registry = Self::new();
        for limit in limits {
            registry.register(limit)?;
        }
        Ok(registry)
    }

    /// Returns the limit it replaced, if any.
    pub fn register(
        &mut self,
        limit: RegulatoryLimit,
    ) -> Result<Option<RegulatoryLimit>, ContractViolation> {
        limit.validate()?;
        Ok(self.limits.insert(limit.category, limit))
    }

    pub fn get(&self, category: LimitCategory) -> Option<&RegulatoryLimit> {
        self.limits.get(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegulatoryLimit> {
        self.limits.values()
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitAssessment {
    pub category: LimitCategory,
    /// `None` when no limit is registered for `category`.
    pub limit: Option<RegulatoryLimit>,
    pub result: UncertaintyResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UncertaintyWiringOutcome {
    Refused(UncertaintyRefuse),
    Combined(UncertaintyResult),
    Assessed(LimitAssessment),
}

#[derive(Debug, Clone)]
pub struct UncertaintyWiring<E>
where
    E: UncertaintyEngine,
{
    registry: LimitRegistry,
    engine: E,
}

impl<E> UncertaintyWiring<E>
where
    E: UncertaintyEngine,
{
    pub fn new(registry: LimitRegistry, engine: E) -> Result<Self, ContractViolation> {
        for limit in registry.iter() {
            limit.validate()?;
        }
        Ok(Self { registry, engine })
    }

    pub fn combine(
        &self,
        budget: UncertaintyBudget,
        coverage_factor: Option<CoverageFactor>,
        limit_pct: Option<f64>,
    ) -> Result<UncertaintyWiringOutcome, ContractViolation> {
        match self.run_engine(budget, coverage_factor, limit_pct)? {
            Ok(result) => Ok(UncertaintyWiringOutcome::Combined(result)),
            Err(refuse) => Ok(UncertaintyWiringOutcome::Refused(refuse)),
        }
    }

    /// Combines `budget` and checks it against the registered limit for
    /// `category`. An unregistered category yields no verdict.
    pub fn assess(
        &self,
        budget: UncertaintyBudget,
        category: LimitCategory,
        coverage_factor: Option<CoverageFactor>,
    ) -> Result<UncertaintyWiringOutcome, ContractViolation> {
        let limit = self.registry.get(category).cloned();
        if limit.is_none() {
            log::debug!("no limit registered for category {}", category.as_str());
        }
        let limit_pct = limit.as_ref().map(|l| l.limit_pct);
        match self.run_engine(budget, coverage_factor, limit_pct)? {
            Ok(result) => Ok(UncertaintyWiringOutcome::Assessed(LimitAssessment {
                category,
                limit,
                result,
            })),
            Err(refuse) => Ok(UncertaintyWiringOutcome::Refused(refuse)),
        }
    }

    fn run_engine(
        &self,
        budget: UncertaintyBudget,
        coverage_factor: Option<CoverageFactor>,
        limit_pct: Option<f64>,
    ) -> Result<Result<UncertaintyResult, UncertaintyRefuse>, ContractViolation> {
        let term_count = budget.len();
        let req = UncertaintyRequest::UncertaintyCombine(UncertaintyCombineRequest::v1(
            budget,
            coverage_factor,
            limit_pct,
        )?);

        let resp = self.engine.run(&req);
        resp.validate()?;

        match resp {
            UncertaintyResponse::Refuse(r) => Ok(Err(r)),
            UncertaintyResponse::UncertaintyCombineOk(ok) => {
                if ok.result.term_count as usize != term_count
                    || ok.result.limit_pct != limit_pct
                    || coverage_factor.is_some_and(|k| k.value() != ok.result.coverage_factor)
                {
                    log::warn!("uncertainty engine output drifted from its request");
                    return Ok(Err(UncertaintyRefuse::v1(
                        UncertaintyCapabilityId::UncertaintyCombine,
                        reason_codes::UNCERTAINTY_WIRING_OUTPUT_DRIFT,
                        "request drift detected in uncertainty output".to_string(),
                    )?));
                }
                Ok(Ok(ok.result))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrology_contracts::uncertainty::{UncertaintyCombineOk, UncertaintyContribution};
    use metrology_engines::uncertainty::{reason_codes as engine_codes, UncertaintyRuntime};
    use rust_decimal::Decimal;

    fn registry() -> LimitRegistry {
        LimitRegistry::from_limits([
            RegulatoryLimit::v1(LimitCategory::Fiscal, 0.3, Some("RTM-1".to_string())).unwrap(),
            RegulatoryLimit::v1(LimitCategory::Appropriation, 1.0, None).unwrap(),
        ])
        .unwrap()
    }

    fn budget() -> UncertaintyBudget {
        UncertaintyBudget::standard_chain(Some(0.25), Some(0.15), Some(0.10), Some(0.05)).unwrap()
    }

    #[derive(Debug, Clone)]
    struct StubEngine {
        response: UncertaintyResponse,
    }

    impl UncertaintyEngine for StubEngine {
        fn run(&self, _req: &UncertaintyRequest) -> UncertaintyResponse {
            self.response.clone()
        }
    }

    #[test]
    fn at_uncertainty_wiring_01_register_replaces_same_category() {
        let mut registry = registry();
        let previous = registry
            .register(RegulatoryLimit::v1(LimitCategory::Fiscal, 0.5, None).unwrap())
            .unwrap();
        assert_eq!(previous.map(|l| l.limit_pct), Some(0.3));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(LimitCategory::Fiscal).unwrap().limit_pct, 0.5);
    }

    #[test]
    fn at_uncertainty_wiring_02_assess_against_registered_limits() {
        let wiring = UncertaintyWiring::new(registry(), UncertaintyRuntime::default()).unwrap();

        let UncertaintyWiringOutcome::Assessed(fiscal) =
            wiring.assess(budget(), LimitCategory::Fiscal, None).unwrap()
        else {
            panic!("expected assessment");
        };
        assert_eq!(fiscal.result.within_limit, Some(false));

        let UncertaintyWiringOutcome::Assessed(appropriation) = wiring
            .assess(budget(), LimitCategory::Appropriation, None)
            .unwrap()
        else {
            panic!("expected assessment");
        };
        assert_eq!(appropriation.result.within_limit, Some(true));
        assert_eq!(appropriation.result.expanded_display, Decimal::new(624, 3));
    }

    #[test]
    fn at_uncertainty_wiring_03_unregistered_category_has_no_verdict() {
        let wiring = UncertaintyWiring::new(registry(), UncertaintyRuntime::default()).unwrap();
        let UncertaintyWiringOutcome::Assessed(out) = wiring
            .assess(budget(), LimitCategory::Operational, None)
            .unwrap()
        else {
            panic!("expected assessment");
        };
        assert!(out.limit.is_none());
        assert_eq!(out.result.within_limit, None);
    }

    #[test]
    fn at_uncertainty_wiring_04_invalid_budget_fails_before_engine() {
        let wiring = UncertaintyWiring::new(LimitRegistry::new(), UncertaintyRuntime::default())
            .unwrap();
        let bad = UncertaintyBudget {
            contributions: vec![UncertaintyContribution {
                name: "primary_meter".to_string(),
                value_pct: Some(-0.2),
            }],
        };
        assert!(wiring.combine(bad, None, None).is_err());
    }

    #[test]
    fn at_uncertainty_wiring_05_engine_drift_is_refused() {
        let stale = UncertaintyRuntime::default()
            .combine(
                &[UncertaintyContribution::v1("primary_meter", Some(0.2)).unwrap()],
                None,
                None,
            )
            .unwrap();
        let ok = UncertaintyCombineOk::v1(engine_codes::UNCERTAINTY_OK_NO_LIMIT, stale).unwrap();
        let wiring = UncertaintyWiring::new(
            LimitRegistry::new(),
            StubEngine {
                response: UncertaintyResponse::UncertaintyCombineOk(ok),
            },
        )
        .unwrap();
        let UncertaintyWiringOutcome::Refused(r) = wiring.combine(budget(), None, None).unwrap()
        else {
            panic!("expected refuse");
        };
        assert_eq!(r.reason_code, reason_codes::UNCERTAINTY_WIRING_OUTPUT_DRIFT);
    }
}
