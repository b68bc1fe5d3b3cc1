#![forbid(unsafe_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use metrology_contracts::compliance::{CalibrationObligation, ComplianceStatus, ObligationKind};
use metrology_engines::duedate::{DueDateConfig, DueDateRuntime};
use metrology_wiring::compliance::{ComplianceDashboard, ComplianceWiring, ComplianceWiringOutcome};
use metrology_wiring::MetrologyWiringConfig;

const FLEET_FIXTURE: &str = r#"[
    { "reference_id": "FT-101", "kind": "equipment_calibration", "due_date": "2025-06-01" },
    { "reference_id": "FT-102", "kind": "equipment_calibration", "due_date": "2025-06-20" },
    { "reference_id": "PO-201", "kind": "orifice_plate_inspection", "due_date": "2026-06-20" },
    { "reference_id": "PT-301", "due_date": null },
    { "reference_id": "TT-401", "kind": "well_test", "due_date": "2025-08-01" },
    { "reference_id": "AN-501", "kind": "uncertainty_analysis", "due_date": "2026-01-01" }
]"#;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

fn fleet() -> Vec<CalibrationObligation> {
    serde_json::from_str(FLEET_FIXTURE).unwrap()
}

fn dashboard(config: MetrologyWiringConfig) -> ComplianceDashboard {
    let engine = DueDateRuntime::new(config.due_date).unwrap();
    let wiring = ComplianceWiring::new(config, engine).unwrap();
    match wiring.build_dashboard(fleet(), as_of()).unwrap() {
        ComplianceWiringOutcome::Dashboard(d) => d,
        ComplianceWiringOutcome::Refused(r) => panic!("unexpected refuse: {}", r.message),
    }
}

#[test]
fn at_dashboard_01_fixture_fleet_summary() {
    let d = dashboard(MetrologyWiringConfig::mvp_v1());
    let s = &d.summary;
    assert_eq!(s.total, 6);
    assert_eq!(s.counts.ok, 2);
    assert_eq!(s.counts.upcoming, 1);
    assert_eq!(s.counts.warning, 0);
    assert_eq!(s.counts.critical, 1);
    assert_eq!(s.counts.expired, 1);
    assert_eq!(s.counts.unknown, 1);
    assert_eq!(s.percentages.ok, Decimal::new(333, 1));
    assert_eq!(s.percentages.warning, Decimal::ZERO);
    let pct_sum: Decimal = s.percentages.iter().map(|(_, p)| *p).sum();
    assert_eq!(pct_sum, Decimal::ONE_HUNDRED);
    assert_eq!(d.worst, Some(ComplianceStatus::Expired));
}

#[test]
fn at_dashboard_02_alerts_carry_kind_and_skip_ok_and_unknown() {
    let d = dashboard(MetrologyWiringConfig::mvp_v1());
    let refs: Vec<&str> = d.alerts.iter().map(|a| a.reference_id.as_str()).collect();
    assert_eq!(refs, vec!["FT-101", "FT-102", "TT-401"]);
    assert_eq!(d.alerts[0].kind, Some(ObligationKind::EquipmentCalibration));
    assert_eq!(d.alerts[0].days_remaining, Some(-14));
    assert_eq!(d.alerts[2].status, ComplianceStatus::Upcoming);
}

#[test]
fn at_dashboard_03_custom_thresholds_move_bands() {
    let config = MetrologyWiringConfig {
        due_date: DueDateConfig {
            critical_days: 15,
            warning_days: 60,
            upcoming_days: 365,
        },
        ..MetrologyWiringConfig::mvp_v1()
    };
    let d = dashboard(config);
    assert_eq!(d.summary.counts.critical, 1);
    assert_eq!(d.summary.counts.warning, 1);
    assert_eq!(d.summary.counts.upcoming, 1);
    assert_eq!(d.summary.counts.ok, 1);
}

#[test]
fn at_dashboard_04_serialises_status_tags_for_presentation() {
    let d = dashboard(MetrologyWiringConfig::mvp_v1());
    let json = serde_json::to_value(&d).unwrap();
    assert_eq!(json["worst"], "EXPIRED");
    assert_eq!(json["as_of"], "2025-06-15");
    assert_eq!(json["summary"]["counts"]["unknown"], 1);
    assert_eq!(json["alerts"][0]["status"], "EXPIRED");
    assert_eq!(json["alerts"][0]["kind"], "equipment_calibration");
}

#[test]
fn at_dashboard_05_empty_fleet_is_all_zero() {
    let wiring = ComplianceWiring::new(MetrologyWiringConfig::mvp_v1(), DueDateRuntime::default())
        .unwrap();
    let ComplianceWiringOutcome::Dashboard(d) = wiring.build_dashboard(Vec::new(), as_of()).unwrap()
    else {
        panic!("expected dashboard");
    };
    assert_eq!(d.summary.total, 0);
    assert!(d.summary.percentages.iter().all(|(_, p)| p.is_zero()));
    assert_eq!(d.worst, None);
    assert!(d.alerts.is_empty());
}

#[test]
fn at_dashboard_06_blank_reference_rejected_on_parse() {
    let raw = r#"[{ "reference_id": "  ", "due_date": "2025-06-01" }]"#;
    assert!(serde_json::from_str::<Vec<CalibrationObligation>>(raw).is_err());
}
