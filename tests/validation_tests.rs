//! Workbook validation against a generated model

use statement_forge::config::ModelConfig;
use statement_forge::core::pipeline::{apply_stage, Stage};
use statement_forge::core::{validate_workbook, IssueKind};
use statement_forge::error::ForgeError;
use statement_forge::types::{CellValue, Workbook};

fn full_model() -> Workbook {
    let cfg = ModelConfig::default();
    let mut workbook = None;
    for stage in Stage::ALL {
        let (wb, _) = apply_stage(workbook, stage, &cfg).unwrap();
        workbook = Some(wb);
    }
    workbook.unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// CLEAN MODEL
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_generated_model_is_clean() {
    let report = validate_workbook(&full_model()).unwrap();
    assert!(report.is_clean(), "{:?}", report.issues);
    assert!(report.references > report.formulas);
}

#[test]
fn test_every_scenario_validates() {
    for name in ["Base", "Upside", "Downside"] {
        let mut workbook = full_model();
        workbook
            .sheet_mut("Assumptions & Drivers")
            .unwrap()
            .set(3, 1, CellValue::Text(name.into()));
        assert!(validate_workbook(&workbook).unwrap().is_clean(), "{}", name);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BROKEN MODELS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_removed_sheet_reported() {
    let mut workbook = full_model();
    workbook.remove_sheet("Debt Schedule");

    let report = validate_workbook(&workbook).unwrap();
    assert!(report.count(IssueKind::MissingSheet) > 0);
    assert!(report
        .issues
        .iter()
        .any(|i| i.message.contains("Debt Schedule")));
}

#[test]
fn test_cleared_input_reported_as_dangling() {
    let mut workbook = full_model();
    let checks = workbook.sheet_mut("Checks").unwrap();
    checks.set(0, 0, CellValue::formula("'Cash Flow'!ZZ900"));

    let report = validate_workbook(&workbook).unwrap();
    assert_eq!(report.count(IssueKind::DanglingReference), 1);
    assert_eq!(report.issues[0].location, "Checks!A1");
}

#[test]
fn test_cross_sheet_cycle_reported() {
    let mut workbook = full_model();
    workbook
        .sheet_mut("Checks")
        .unwrap()
        .set(0, 5, CellValue::formula("'Balance Sheet'!Z1+1"));
    workbook
        .sheet_mut("Balance Sheet")
        .unwrap()
        .set(0, 25, CellValue::formula("Checks!F1*2"));

    let report = validate_workbook(&workbook).unwrap();
    assert_eq!(report.count(IssueKind::Cycle), 1);
    assert!(matches!(
        report.into_result(),
        Err(ForgeError::Validation(message)) if message.contains("circular")
    ));
}

#[test]
fn test_typo_in_scenario_literal_reported() {
    let mut workbook = full_model();
    workbook.sheet_mut("Summary").unwrap().set(
        0,
        8,
        CellValue::formula("IF('Assumptions & Drivers'!B4=\"Upsde\",1,0)"),
    );

    let report = validate_workbook(&workbook).unwrap();
    assert_eq!(report.count(IssueKind::ScenarioLiteral), 1);
    assert!(report.issues[0].message.contains("Upsde"));
}

#[test]
fn test_status_literal_beside_selector_accepted() {
    let mut workbook = full_model();
    workbook
        .sheet_mut("Checks")
        .unwrap()
        .set(0, 25, CellValue::Text("ALL CHECKS PASS".into()));
    workbook.sheet_mut("Summary").unwrap().set(
        0,
        8,
        CellValue::formula(
            "IF(AND('Assumptions & Drivers'!$B$4=\"Base\",Checks!Z1=\"ALL CHECKS PASS\"),1,0)",
        ),
    );

    let report = validate_workbook(&workbook).unwrap();
    assert!(report.is_clean(), "{:?}", report.issues);
}
