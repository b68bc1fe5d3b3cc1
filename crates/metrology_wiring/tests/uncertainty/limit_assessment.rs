#![forbid(unsafe_code)]

use rust_decimal::Decimal;

use metrology_contracts::uncertainty::{
    CoverageFactor, LimitCategory, RegulatoryLimit, UncertaintyBudget, UncertaintyContribution,
};
use metrology_engines::uncertainty::UncertaintyRuntime;
use metrology_wiring::uncertainty::{LimitRegistry, UncertaintyWiring, UncertaintyWiringOutcome};

const LIMITS_FIXTURE: &str = r#"[
    { "category": "fiscal", "limit_pct": 0.3, "reference_standard": "RTM-1" },
    { "category": "appropriation", "limit_pct": 1.0 },
    { "category": "operational", "limit_pct": 2.0 }
]"#;

fn wiring() -> UncertaintyWiring<UncertaintyRuntime> {
    let limits: Vec<RegulatoryLimit> = serde_json::from_str(LIMITS_FIXTURE).unwrap();
    let registry = LimitRegistry::from_limits(limits).unwrap();
    UncertaintyWiring::new(registry, UncertaintyRuntime::default()).unwrap()
}

fn assessed(outcome: UncertaintyWiringOutcome) -> metrology_wiring::uncertainty::LimitAssessment {
    match outcome {
        UncertaintyWiringOutcome::Assessed(a) => a,
        other => panic!("expected assessment, got {other:?}"),
    }
}

#[test]
fn at_limit_01_flow_chain_against_each_category() {
    let w = wiring();
    let budget =
        UncertaintyBudget::standard_chain(Some(0.25), Some(0.15), Some(0.10), Some(0.05)).unwrap();

    let fiscal = assessed(w.assess(budget.clone(), LimitCategory::Fiscal, None).unwrap());
    assert_eq!(fiscal.result.within_limit, Some(false));
    assert_eq!(
        fiscal.limit.and_then(|l| l.reference_standard).as_deref(),
        Some("RTM-1")
    );

    let operational = assessed(w.assess(budget, LimitCategory::Operational, None).unwrap());
    assert_eq!(operational.result.within_limit, Some(true));
}

#[test]
fn at_limit_02_record_labels_resolve_to_categories() {
    let w = wiring();
    let category = LimitCategory::parse("apropriacao").unwrap();
    let budget = UncertaintyBudget::v1(vec![
        UncertaintyContribution::v1("primary_meter", Some(0.5)).unwrap(),
    ])
    .unwrap();
    let a = assessed(w.assess(budget, category, None).unwrap());
    assert_eq!(a.category, LimitCategory::Appropriation);
    assert_eq!(a.result.expanded_pct, 1.0);
    assert_eq!(a.result.within_limit, Some(true));
}

#[test]
fn at_limit_03_coverage_factor_changes_verdict() {
    let w = wiring();
    let budget = UncertaintyBudget::v1(vec![
        UncertaintyContribution::v1("primary_meter", Some(0.4)).unwrap(),
    ])
    .unwrap();
    let k2 = assessed(
        w.assess(budget.clone(), LimitCategory::Appropriation, None)
            .unwrap(),
    );
    assert_eq!(k2.result.within_limit, Some(true));
    let k3 = assessed(
        w.assess(
            budget,
            LimitCategory::Appropriation,
            Some(CoverageFactor::new(3.0).unwrap()),
        )
        .unwrap(),
    );
    assert_eq!(k3.result.within_limit, Some(false));
    assert_eq!(k3.result.expanded_display, Decimal::new(1200, 3));
}

#[test]
fn at_limit_04_two_stage_chain() {
    let w = wiring();
    let UncertaintyWiringOutcome::Combined(stage) = w
        .combine(
            UncertaintyBudget::standard_chain(Some(0.25), Some(0.15), Some(0.10), Some(0.05))
                .unwrap(),
            None,
            None,
        )
        .unwrap()
    else {
        panic!("expected combined result");
    };
    let budget = UncertaintyBudget::v1(vec![
        stage.as_contribution("metering_stage").unwrap(),
        UncertaintyContribution::v1("sampling", Some(0.1)).unwrap(),
    ])
    .unwrap();
    let a = assessed(w.assess(budget, LimitCategory::Appropriation, None).unwrap());
    let expected_combined = (0.0975f64 + 0.01).sqrt();
    assert!((a.result.combined_pct - expected_combined).abs() < 1e-12);
    assert_eq!(a.result.combined_display, Decimal::new(328, 3));
}

#[test]
fn at_limit_05_negative_limit_rejected_on_parse() {
    let raw = r#"{ "category": "fiscal", "limit_pct": -0.3 }"#;
    let limit: RegulatoryLimit = serde_json::from_str(raw).unwrap();
    assert!(LimitRegistry::from_limits([limit]).is_err());
}
