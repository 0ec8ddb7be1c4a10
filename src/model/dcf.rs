//! DCF sheet: unlevered free cash flow valuation
//!
//! The year grid covers forecast years only and starts in column C. Single
//! values (WACC inputs, terminal values, equity bridge) sit in column C.
//! Both sensitivity grids hold live formulas that recompute value per share
//! for each (WACC, growth) and (WACC, exit multiple) pair.

use crate::config::{ModelConfig, SensitivityAxes};
use crate::core::layout::{CellSource, Grid, Line, Period, SheetDef};
use crate::excel::address::column_letter;
use crate::types::SheetId;

/// Column of single-value rows
const VALUE_COL: u16 = 2;

pub fn definition(cfg: &ModelConfig) -> SheetDef {
    let t = &cfg.timeline;
    let grid = Grid::new(VALUE_COL, &t.forecast(), t.first_forecast_year());
    let mut def = SheetDef::new(SheetId::Dcf, Some(grid));

    def.push(Line::text("DISCOUNTED CASH FLOW VALUATION"))
        .push(Line::text("Unlevered Free Cash Flow Method"))
        .push(Line::item("scenario", "Scenario:").at(1, CellSource::formula("{$asm.scenario:B}")))
        .push(Line::blank());

    free_cash_flow(&mut def);
    wacc(&mut def);
    terminal_value(&mut def);
    perpetuity_growth(&mut def);
    exit_multiple(&mut def);
    sensitivity(&mut def, cfg);

    def
}

fn value(key: &str, label: &str, template: &str) -> Line {
    Line::item(key, label).at(VALUE_COL, CellSource::formula(template))
}

fn free_cash_flow(def: &mut SheetDef) {
    def.push(Line::text("UNLEVERED FREE CASH FLOW"))
        .push(Line::year_header("Period"))
        .push(Line::item("ebit", "EBIT").years(|_| CellSource::formula("{is.ebit}")))
        .push(Line::item("tax_rate", "Tax Rate").years(|_| CellSource::formula("{$asm.tax_rate:B}")))
        .push(
            Line::item("nopat", "NOPAT (EBIT × (1-Tax))")
                .years(|_| CellSource::formula("{ebit}*(1-{tax_rate})")),
        )
        .push(Line::item("da", "Plus: D&A").years(|_| CellSource::formula("{is.da}")))
        // Already negative on the cash flow statement
        .push(Line::item("capex", "Less: CapEx").years(|_| CellSource::formula("{cf.capex}")))
        .push(
            Line::item("nwc", "Less: Increase in NWC")
                .years(|_| CellSource::formula("SUM({cf.change_ar..change_other_cl})")),
        )
        .push(
            Line::item("ufcf", "Unlevered Free Cash Flow")
                .years(|_| CellSource::formula("{nopat}+{da}+{capex}+{nwc}")),
        )
        .push(Line::blank());
}

fn wacc(def: &mut SheetDef) {
    def.push(Line::text("WACC CALCULATION"))
        .push(value("risk_free_rate", "Risk-Free Rate", "{$asm.risk_free_rate:B}"))
        .push(value(
            "equity_risk_premium",
            "Equity Risk Premium",
            "{$asm.equity_risk_premium:B}",
        ))
        .push(value("beta", "Beta", "{$asm.beta:B}"))
        .push(value(
            "cost_of_equity",
            "Cost of Equity (CAPM)",
            "{risk_free_rate:C}+{beta:C}*{equity_risk_premium:C}",
        ))
        .push(value(
            "pretax_cost_of_debt",
            "Pre-Tax Cost of Debt",
            "({$asm.term_loan_rate:B}+{$asm.revolver_rate:B})/2",
        ))
        .push(value("debt_tax_rate", "Tax Shield Rate", "{$asm.tax_rate:B}"))
        .push(value(
            "after_tax_cost_of_debt",
            "After-Tax Cost of Debt",
            "{pretax_cost_of_debt:C}*(1-{debt_tax_rate:C})",
        ))
        .push(value(
            "target_debt_pct",
            "Target Debt / Capital",
            "{$asm.target_debt_pct:B}",
        ))
        .push(value(
            "target_equity_pct",
            "Target Equity / Capital",
            "1-{target_debt_pct:C}",
        ))
        .push(value(
            "wacc",
            "WACC",
            "{target_equity_pct:C}*{cost_of_equity:C}+{target_debt_pct:C}*{after_tax_cost_of_debt:C}",
        ))
        .push(Line::blank());
}

fn terminal_value(def: &mut SheetDef) {
    def.push(Line::text("TERMINAL VALUE"))
        .push(value("terminal_fcf", "Terminal Year UFCF", "{ufcf:last}"))
        .push(value(
            "terminal_growth",
            "Terminal Growth Rate",
            "{$asm.terminal_growth:B}",
        ))
        .push(value(
            "tv_pg",
            "Terminal Value (Perpetuity Growth)",
            "{terminal_fcf:C}*(1+{terminal_growth:C})/({wacc:C}-{terminal_growth:C})",
        ))
        .push(value("terminal_ebitda", "Terminal Year EBITDA", "{is.ebitda:last}"))
        .push(value(
            "exit_multiple",
            "Exit EV/EBITDA Multiple",
            "{$asm.exit_multiple:B}",
        ))
        .push(value(
            "tv_em",
            "Terminal Value (Exit Multiple)",
            "{terminal_ebitda:C}*{exit_multiple:C}",
        ))
        .push(Line::blank());
}

fn perpetuity_growth(def: &mut SheetDef) {
    def.push(Line::text("PERPETUITY GROWTH METHOD"))
        .push(Line::year_header("Period"))
        .push(
            Line::item("discount_period", "Discount Period")
                .years(|p: &Period| CellSource::Number((p.index + 1) as f64)),
        )
        .push(Line::item("discount_fcf", "Unlevered FCF").years(|_| CellSource::formula("{ufcf}")))
        .push(
            Line::item("discount_factor", "Discount Factor")
                .years(|_| CellSource::formula("1/(1+{$wacc:C})^{discount_period}")),
        )
        .push(
            Line::item("pv_fcf", "PV of FCF")
                .years(|_| CellSource::formula("{discount_fcf}*{discount_factor}")),
        )
        .push(Line::item("terminal_value", "Terminal Value").years(|p| match p.last {
            true => CellSource::formula("{$tv_pg:C}"),
            false => CellSource::Blank,
        }))
        .push(Line::item("pv_terminal", "PV of Terminal Value").years(|p| match p.last {
            true => CellSource::formula("{terminal_value}*{discount_factor}"),
            false => CellSource::Blank,
        }))
        .push(Line::blank())
        .push(value("sum_pv_fcf", "Sum of PV of FCF", "SUM({pv_fcf:first..pv_fcf:last})"))
        .push(value("sum_pv_tv", "Plus: PV of Terminal Value", "{pv_terminal:last}"))
        .push(value(
            "ev_pg",
            "Enterprise Value",
            "{sum_pv_fcf:C}+{sum_pv_tv:C}",
        ))
        .push(value(
            "net_debt",
            "Less: Net Debt",
            "{ds.total_debt:last}-{bs.cash:last}",
        ))
        .push(value("equity_pg", "Equity Value", "{ev_pg:C}-{net_debt:C}"))
        .push(value("shares", "Shares Outstanding (mm)", "{$asm.shares:B}"))
        .push(value("per_share_pg", "Value per Share", "{equity_pg:C}/{shares:C}"))
        .push(Line::blank());
}

fn exit_multiple(def: &mut SheetDef) {
    def.push(Line::text("EXIT MULTIPLE METHOD"))
        .push(value("em_pv_fcf", "PV of Forecast FCF", "{sum_pv_fcf:C}"))
        .push(value("em_tv", "Exit Terminal Value", "{tv_em:C}"))
        .push(value(
            "em_pv_tv",
            "PV of Exit Terminal Value",
            "{em_tv:C}*{discount_factor:last}",
        ))
        .push(value(
            "ev_em",
            "Enterprise Value (Exit Multiple)",
            "{em_pv_fcf:C}+{em_pv_tv:C}",
        ))
        .push(value("em_net_debt", "Less: Net Debt (Exit Multiple)", "{net_debt:C}"))
        .push(value(
            "equity_em",
            "Equity Value (Exit Multiple)",
            "{ev_em:C}-{em_net_debt:C}",
        ))
        .push(value(
            "per_share_em",
            "Value per Share (Exit Multiple)",
            "{equity_em:C}/{shares:C}",
        ))
        .push(Line::blank());
}

fn sensitivity(def: &mut SheetDef, cfg: &ModelConfig) {
    let axes = &cfg.sensitivity;

    def.push(Line::text("SENSITIVITY ANALYSIS"))
        .push(Line::text("Value per Share: WACC vs Terminal Growth"))
        .push(axis_header("sens_pg_head", "WACC / Growth Rate", &axes.growth_rates))
        .extend(sensitivity_rows("sens_pg", "sens_pg_head", axes, &axes.growth_rates, |w, g| {
            format!("{{$terminal_fcf:C}}*(1+{g})/({w}-{g})")
        }))
        .push(Line::blank())
        .push(Line::text("Value per Share: WACC vs Exit Multiple"))
        .push(axis_header("sens_em_head", "WACC / Exit Multiple", &axes.exit_multiples))
        .extend(sensitivity_rows("sens_em", "sens_em_head", axes, &axes.exit_multiples, |_, m| {
            format!("{{$terminal_ebitda:C}}*{m}")
        }));
}

fn axis_header(key: &str, label: &str, values: &[f64]) -> Line {
    values
        .iter()
        .enumerate()
        .fold(Line::item(key, label), |line, (i, v)| {
            line.at(VALUE_COL + i as u16, CellSource::Number(*v))
        })
        .input()
}

/// One row per WACC: the rate in column A, value per share across the axis
///
/// `terminal` builds the undiscounted terminal value from the row's WACC
/// reference and the column's axis reference.
fn sensitivity_rows(
    prefix: &str,
    head: &str,
    axes: &SensitivityAxes,
    columns: &[f64],
    terminal: impl Fn(&str, &str) -> String,
) -> Vec<Line> {
    axes.wacc_rates
        .iter()
        .enumerate()
        .map(|(i, rate)| {
            let key = format!("{}_{}", prefix, i);
            let w = format!("{{{}:A}}", key);
            (0..columns.len()).fold(
                Line::unlabeled(key.clone()).at(0, CellSource::Number(*rate)),
                |line, j| {
                    let col = VALUE_COL + j as u16;
                    let axis = format!("{{{}:{}}}", head, column_letter(col));
                    let formula = format!(
                        "(NPV({w},{{$ufcf:first..ufcf:last}})+{tv}/(1+{w})^{{$discount_period:last}}-{{$net_debt:C}})/{{$shares:C}}",
                        w = w,
                        tv = terminal(&w, &axis),
                    );
                    line.at(col, CellSource::formula(formula))
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::{render_sheet, ModelLayout};
    use crate::model::{definitions, Level};
    use crate::types::{CellValue, Sheet};

    fn render() -> Sheet {
        let cfg = ModelConfig::default();
        let defs = definitions(Level::Valuation, &cfg);
        let layout = ModelLayout::from_defs(&defs).unwrap();
        render_sheet(&definition(&cfg), &layout, None).unwrap()
    }

    fn formula(sheet: &Sheet, label: &str, col: u16) -> String {
        let row = sheet.find_row(label).unwrap();
        sheet
            .get(row, col)
            .and_then(CellValue::as_formula)
            .unwrap_or_else(|| panic!("no formula for {} in column {}", label, col))
            .to_string()
    }

    #[test]
    fn test_forecast_columns_map_to_statement_years() {
        let sheet = render();
        let header = sheet.find_row("Period").unwrap();
        assert_eq!(sheet.get(header, 2), Some(&CellValue::Number(2025.0)));
        assert_eq!(sheet.get(header, 6), Some(&CellValue::Number(2029.0)));
        // 2025 is column F on the Income Statement
        assert_eq!(formula(&sheet, "EBIT", 2), "='Income Statement'!F16");
        assert_eq!(formula(&sheet, "EBIT", 6), "='Income Statement'!J16");
    }

    #[test]
    fn test_working_capital_keeps_cash_flow_sign() {
        let sheet = render();
        let nwc = formula(&sheet, "Less: Increase in NWC", 2);
        assert!(nwc.starts_with("=SUM('Cash Flow'!F"), "{}", nwc);
        let ufcf = formula(&sheet, "Unlevered Free Cash Flow", 2);
        assert!(!ufcf.contains('-'), "{}", ufcf);
    }

    #[test]
    fn test_terminal_value_only_in_last_year() {
        let sheet = render();
        let row = sheet.find_row("Terminal Value").unwrap();
        assert_eq!(sheet.get(row, 5), None);
        let tv_row = sheet.find_row("Terminal Value (Perpetuity Growth)").unwrap() + 1;
        assert_eq!(
            sheet.get(row, 6),
            Some(&CellValue::Formula(format!("=$C${}", tv_row)))
        );
    }

    #[test]
    fn test_discount_factor_uses_absolute_wacc() {
        let sheet = render();
        let wacc = sheet.find_row("WACC").unwrap() + 1;
        let period = sheet.find_row("Discount Period").unwrap() + 1;
        assert_eq!(
            formula(&sheet, "Discount Factor", 3),
            format!("=1/(1+$C${})^D{}", wacc, period)
        );
    }

    #[test]
    fn test_sensitivity_grid_is_live() {
        let sheet = render();
        let head = sheet.find_row("WACC / Growth Rate").unwrap();
        let first = head + 1;
        assert_eq!(sheet.get(first, 0), Some(&CellValue::Number(0.08)));
        assert_eq!(sheet.get(head, 2), Some(&CellValue::Number(0.015)));

        let Some(CellValue::Formula(cell)) = sheet.get(first, 2) else {
            panic!("sensitivity cell missing");
        };
        let a = format!("A{}", first + 1);
        assert!(cell.starts_with(&format!("=(NPV({},$C$", a)));
        assert!(cell.contains(&format!("*(1+C{h})/({a}-C{h})", h = head + 1, a = a)));

        let em_head = sheet.find_row("WACC / Exit Multiple").unwrap();
        assert_eq!(sheet.get(em_head, 8), Some(&CellValue::Number(10.0)));
        assert!(sheet.get(em_head + 5, 8).is_some_and(CellValue::is_formula));
        assert!(sheet.get(em_head + 6, 2).is_none());
    }
}
