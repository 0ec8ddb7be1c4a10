//! Checks sheet: integrity tests that should all read zero or PASS

use super::{year_grid, Level};
use crate::config::ModelConfig;
use crate::core::layout::{CellSource, Line, Period, SheetDef};
use crate::types::SheetId;

/// Tolerance for the balance and cash ties
const TIE_TOLERANCE: f64 = 0.1;

pub fn definition(level: Level, cfg: &ModelConfig) -> SheetDef {
    let mut def = SheetDef::new(SheetId::Checks, Some(year_grid(cfg)));

    let statements_pass =
        "COUNTIF({balance_status:first..cash_status:last},\"FAIL\")=0".to_string();
    let all_pass = match level {
        Level::Valuation => format!(
            "AND({},COUNTIF({{dcf_wacc_check:C..dcf_equity_check:C}},\"FAIL\")=0)",
            statements_pass
        ),
        _ => statements_pass,
    };

    def.push(Line::text("MODEL CHECKS"))
        .push(Line::text("All checks should equal zero or show \"PASS\""))
        .push(Line::blank())
        .push(Line::year_header("Check"))
        .push(
            Line::item("balance_check", "Balance Sheet Balances (A - L - E)")
                .years(|_| CellSource::formula("{bs.balance_check}")),
        )
        .push(
            Line::item("cash_check", "Cash Ties (CF vs BS)")
                .years(|_| CellSource::formula("{cf.ending_cash}-{bs.cash}")),
        )
        .push(Line::blank())
        .push(status("balance_status", "Balance Check Status", "balance_check"))
        .push(status("cash_status", "Cash Check Status", "cash_check"))
        .push(Line::blank())
        .push(Line::text("OVERALL MODEL STATUS"))
        .push(Line::item("integrity", "Model Integrity").at(
            1,
            CellSource::formula(format!(
                "IF({},\"ALL CHECKS PASS\",\"ERRORS DETECTED\")",
                all_pass
            )),
        ));

    if level == Level::Valuation {
        def.push(Line::blank())
            .push(Line::text("DCF CHECKS"))
            .push(dcf_check(
                "dcf_wacc_check",
                "WACC Reasonable (5% - 20%)",
                "{dcf.wacc:C}",
                "AND({dcf_wacc_check:B}>0.05,{dcf_wacc_check:B}<0.2)",
            ))
            .push(dcf_check(
                "dcf_growth_check",
                "Terminal Growth < WACC",
                "{dcf.terminal_growth:C}",
                "{dcf_growth_check:B}<{dcf.wacc:C}",
            ))
            .push(dcf_check(
                "dcf_ev_check",
                "Enterprise Value > 0",
                "{dcf.ev_pg:C}",
                "{dcf_ev_check:B}>0",
            ))
            .push(dcf_check(
                "dcf_equity_check",
                "Equity Value > 0",
                "{dcf.equity_pg:C}",
                "{dcf_equity_check:B}>0",
            ));
    }

    def
}

fn status(key: &str, label: &str, check: &'static str) -> Line {
    Line::item(key, label).years(move |_: &Period| {
        CellSource::formula(format!(
            "IF(ABS({{{}}})<{},\"PASS\",\"FAIL\")",
            check, TIE_TOLERANCE
        ))
    })
}

/// Value in B, PASS/FAIL in C
fn dcf_check(key: &str, label: &str, value: &str, test: &str) -> Line {
    Line::item(key, label)
        .at(1, CellSource::formula(value))
        .at(
            2,
            CellSource::formula(format!("IF({},\"PASS\",\"FAIL\")", test)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::{render_sheet, ModelLayout};
    use crate::model::definitions;
    use crate::types::{CellValue, Sheet};

    fn render(level: Level) -> Sheet {
        let cfg = ModelConfig::default();
        let defs = definitions(level, &cfg);
        let layout = ModelLayout::from_defs(&defs).unwrap();
        let def = defs.iter().find(|d| d.id == SheetId::Checks).unwrap();
        render_sheet(def, &layout, None).unwrap()
    }

    #[test]
    fn test_status_rows_use_tolerance() {
        let sheet = render(Level::Enhance);
        let row = sheet.find_row("Balance Check Status").unwrap();
        assert_eq!(
            sheet.get(row, 3),
            Some(&CellValue::Formula("=IF(ABS(D5)<0.1,\"PASS\",\"FAIL\")".into()))
        );
    }

    #[test]
    fn test_integrity_counts_failures() {
        let sheet = render(Level::Enhance);
        let row = sheet.find_row("Model Integrity").unwrap();
        assert_eq!(
            sheet.get(row, 1),
            Some(&CellValue::Formula(
                "=IF(COUNTIF(B8:J9,\"FAIL\")=0,\"ALL CHECKS PASS\",\"ERRORS DETECTED\")".into()
            ))
        );
    }

    #[test]
    fn test_valuation_adds_dcf_checks() {
        let enhance = render(Level::Enhance);
        let valuation = render(Level::Valuation);
        assert!(enhance.find_row("DCF CHECKS").is_none());

        let row = valuation.find_row("Terminal Growth < WACC").unwrap();
        let Some(CellValue::Formula(test)) = valuation.get(row, 2) else {
            panic!("growth check missing");
        };
        assert!(test.starts_with(&format!("=IF(B{}<DCF!C", row + 1)));

        let integrity = valuation.find_row("Model Integrity").unwrap();
        let f = valuation.get(integrity, 1).and_then(CellValue::as_formula).unwrap();
        assert!(f.contains("AND(COUNTIF(B8:J9,\"FAIL\")=0,COUNTIF(C"));
    }
}
