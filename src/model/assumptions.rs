//! Assumptions & Drivers sheet

use super::{scenario_switch, year_grid, Level};
use crate::config::{ModelConfig, ScenarioValues};
use crate::core::layout::{CellSource, Line, Period, SheetDef};
use crate::types::SheetId;

pub fn definition(level: Level, cfg: &ModelConfig) -> SheetDef {
    let mut def = SheetDef::new(SheetId::Assumptions, Some(year_grid(cfg)));
    def.push(Line::text("3-STATEMENT FINANCIAL MODEL"))
        .push(Line::text("ASSUMPTIONS & DRIVERS"))
        .push(Line::blank())
        .push(
            Line::item("scenario", "Scenario Selection:")
                .at(1, CellSource::text(cfg.scenario.as_str()))
                .input(),
        )
        .push(Line::text("(Change to Base, Upside, or Downside)"))
        .push(Line::year_header("INPUTS (in $mm)"));

    match level {
        Level::Build => build_drivers(&mut def, cfg),
        Level::Enhance | Level::Valuation => scenario_drivers(&mut def, cfg),
    }

    if level == Level::Valuation {
        valuation_inputs(&mut def, cfg);
    }

    def
}

fn switch(values: &ScenarioValues) -> CellSource {
    CellSource::formula(scenario_switch(
        &values.base.to_string(),
        &values.upside.to_string(),
        &values.downside.to_string(),
    ))
}

fn historical_seed(key: &str, label: &str, seeds: &[f64]) -> Line {
    let seeds = seeds.to_vec();
    Line::item(key, label)
        .years(move |p| match seeds.get(p.index) {
            Some(v) if p.historical => CellSource::Number(*v),
            _ => CellSource::Blank,
        })
        .input()
}

/// Historical literal, forecast scenario switch
fn per_year_driver(key: &str, label: &str, historical: f64, forecast: ScenarioValues) -> Line {
    Line::item(key, label)
        .years(move |p| match p.historical {
            true => CellSource::Number(historical),
            false => switch(&forecast),
        })
        .input()
}

fn constant_driver(key: &str, label: &str, value: f64) -> Line {
    Line::item(key, label)
        .years(move |_| CellSource::Number(value))
        .input()
}

fn growth_driver(key: &str, label: &str, first: ScenarioValues, later: ScenarioValues) -> Line {
    Line::item(key, label).years(move |p: &Period| {
        if p.historical {
            CellSource::Blank
        } else if p.first_forecast {
            switch(&first)
        } else {
            switch(&later)
        }
    })
}

fn single_input(key: &str, label: impl Into<String>, value: f64) -> Line {
    Line::item(key, label)
        .at(1, CellSource::Number(value))
        .input()
}

//==============================================================================
// Build level: one column per year
//==============================================================================

fn build_drivers(def: &mut SheetDef, cfg: &ModelConfig) {
    let sc = &cfg.scenarios;
    let fx = &cfg.fixed;
    let fy = cfg.timeline.first_year;

    def.push(Line::text("REVENUE ASSUMPTIONS"))
        .push(historical_seed("product_revenue", "Product Revenue", &cfg.revenue.product))
        .push(historical_seed("service_revenue", "Service Revenue", &cfg.revenue.service))
        .push(growth_driver(
            "product_growth",
            "Product Revenue Growth %",
            sc.product_growth_first,
            sc.product_growth_later,
        ))
        .push(growth_driver(
            "service_growth",
            "Service Revenue Growth %",
            sc.service_growth_first,
            sc.service_growth_later,
        ))
        .push(Line::blank())
        .push(Line::text("OPERATING ASSUMPTIONS"))
        .push(per_year_driver("gross_margin", "Gross Margin %", fx.gross_margin, sc.gross_margin))
        .push(per_year_driver("sga_pct", "SG&A % of Revenue", fx.sga_pct, sc.sga_pct))
        .push(per_year_driver("rnd_pct", "R&D % of Revenue", fx.rnd_pct, sc.rnd_pct))
        .push(constant_driver("da_pct", "D&A % of Revenue", fx.da_pct))
        .push(constant_driver("tax_rate", "Tax Rate", fx.tax_rate))
        .push(Line::blank())
        .push(Line::text("BALANCE SHEET ASSUMPTIONS"))
        .push(per_year_driver("ar_days", "AR Days", fx.ar_days, sc.ar_days))
        .push(per_year_driver("inventory_days", "Inventory Days", fx.inventory_days, sc.inventory_days))
        .push(per_year_driver("ap_days", "AP Days", fx.ap_days, sc.ap_days))
        .push(constant_driver("other_ca_pct", "Other Current Assets % of Rev", fx.other_ca_pct))
        .push(constant_driver("other_cl_pct", "Other Current Liab % of Rev", fx.other_cl_pct))
        .push(per_year_driver("capex_pct", "CapEx % of Revenue", fx.capex_pct, sc.capex_pct))
        .push(Line::blank())
        .push(Line::text("DEBT ASSUMPTIONS"))
        .push(single_input(
            "opening_debt",
            format!("Beginning Debt ({})", fy),
            cfg.debt.term_loan,
        ))
        .push(constant_driver("revolver_rate", "Revolver Interest Rate", cfg.debt.revolver_rate))
        .push(single_input(
            "opening_cash",
            format!("Beginning Cash ({})", fy),
            cfg.opening.cash,
        ))
        .push(single_input(
            "opening_ppe",
            format!("Beginning PP&E ({})", fy),
            cfg.opening.ppe,
        ));
}

//==============================================================================
// Enhance level: scenario table plus fixed assumptions
//==============================================================================

/// Row of the scenario table: Base / Upside / Downside inputs and the
/// selected value in column E
fn scenario_row(key: &str, label: impl Into<String>, values: ScenarioValues) -> Line {
    let selected = scenario_switch(
        &format!("{{{}:B}}", key),
        &format!("{{{}:C}}", key),
        &format!("{{{}:D}}", key),
    );
    Line::item(key, label)
        .at(1, CellSource::Number(values.base))
        .at(2, CellSource::Number(values.upside))
        .at(3, CellSource::Number(values.downside))
        .at(4, CellSource::formula(selected))
        .input()
}

fn scenario_drivers(def: &mut SheetDef, cfg: &ModelConfig) {
    let sc = &cfg.scenarios;
    let fx = &cfg.fixed;
    let fy = cfg.timeline.first_year;
    let ffy = cfg.timeline.first_forecast_year();

    def.push(
        historical_seed(
            "product_revenue",
            "Product Revenue (Historical)",
            &cfg.revenue.product,
        )
        .legacy("Product Revenue"),
    )
    .push(
        historical_seed(
            "service_revenue",
            "Service Revenue (Historical)",
            &cfg.revenue.service,
        )
        .legacy("Service Revenue"),
    )
    .push(Line::blank())
    .push(Line::text("SCENARIO ASSUMPTIONS"))
    .push(
        Line::text("Assumption")
            .at(1, CellSource::text("Base"))
            .at(2, CellSource::text("Upside"))
            .at(3, CellSource::text("Downside"))
            .at(4, CellSource::text("SELECTED →")),
    )
    .push(scenario_row(
        "product_growth_first",
        format!("Product Growth % ({})", ffy),
        sc.product_growth_first,
    ))
    .push(scenario_row(
        "product_growth_later",
        format!("Product Growth % ({}+)", ffy + 1),
        sc.product_growth_later,
    ))
    .push(scenario_row(
        "service_growth_first",
        format!("Service Growth % ({})", ffy),
        sc.service_growth_first,
    ))
    .push(scenario_row(
        "service_growth_later",
        format!("Service Growth % ({}+)", ffy + 1),
        sc.service_growth_later,
    ))
    .push(scenario_row("gross_margin_fc", "Gross Margin % (Forecast)", sc.gross_margin))
    .push(scenario_row("sga_pct_fc", "SG&A % (Forecast)", sc.sga_pct))
    .push(scenario_row("rnd_pct_fc", "R&D % (Forecast)", sc.rnd_pct))
    .push(scenario_row("capex_pct_fc", "CapEx % (Forecast)", sc.capex_pct))
    .push(scenario_row("ar_days_fc", "AR Days (Forecast)", sc.ar_days))
    .push(scenario_row("inventory_days_fc", "Inventory Days (Forecast)", sc.inventory_days))
    .push(scenario_row("ap_days_fc", "AP Days (Forecast)", sc.ap_days))
    .push(Line::blank())
    .push(Line::text("FIXED ASSUMPTIONS"))
    .push(single_input("gross_margin_hist", "Gross Margin % (Historical)", fx.gross_margin).legacy("Gross Margin %"))
    .push(single_input("sga_pct_hist", "SG&A % (Historical)", fx.sga_pct).legacy("SG&A % of Revenue"))
    .push(single_input("rnd_pct_hist", "R&D % (Historical)", fx.rnd_pct).legacy("R&D % of Revenue"))
    .push(single_input("da_pct", "D&A % of Revenue", fx.da_pct))
    .push(single_input("tax_rate", "Tax Rate", fx.tax_rate))
    .push(single_input("ar_days_hist", "AR Days (Historical)", fx.ar_days).legacy("AR Days"))
    .push(single_input("inventory_days_hist", "Inventory Days (Historical)", fx.inventory_days).legacy("Inventory Days"))
    .push(single_input("ap_days_hist", "AP Days (Historical)", fx.ap_days).legacy("AP Days"))
    .push(single_input("other_ca_pct", "Other Current Assets % of Rev", fx.other_ca_pct))
    .push(single_input("other_cl_pct", "Other Current Liab % of Rev", fx.other_cl_pct))
    .push(single_input("capex_pct_hist", "CapEx % (Historical)", fx.capex_pct).legacy("CapEx % of Revenue"))
    .push(Line::blank())
    .push(Line::text("DEBT ASSUMPTIONS"))
    .push(
        single_input(
            "term_loan",
            format!("Beginning Term Loan ({})", fy),
            cfg.debt.term_loan,
        )
        .legacy(format!("Beginning Debt ({})", fy)),
    )
    .push(single_input("term_loan_rate", "Term Loan Interest Rate", cfg.debt.term_loan_rate))
    .push(single_input(
        "term_loan_repayment",
        "Annual Term Loan Repayment",
        cfg.debt.term_loan_repayment,
    ))
    .push(single_input("revolver_rate", "Revolver Interest Rate", cfg.debt.revolver_rate))
    .push(single_input("minimum_cash", "Minimum Cash Balance", cfg.debt.minimum_cash))
    .push(Line::blank())
    .push(Line::text(format!("INITIAL BALANCE SHEET ({})", fy)))
    .push(single_input("opening_cash", "Beginning Cash", cfg.opening.cash).legacy(format!("Beginning Cash ({})", fy)))
    .push(single_input("opening_ppe", "Beginning PP&E", cfg.opening.ppe).legacy(format!("Beginning PP&E ({})", fy)));
}

//==============================================================================
// Valuation level: DCF inputs appended below everything else
//==============================================================================

fn valuation_inputs(def: &mut SheetDef, cfg: &ModelConfig) {
    let v = &cfg.valuation;
    def.push(Line::blank())
        .push(Line::text("DCF / VALUATION ASSUMPTIONS"))
        .push(single_input("shares", "Fully Diluted Shares (mm)", v.shares))
        .push(single_input("risk_free_rate", "Risk-Free Rate", v.risk_free_rate))
        .push(single_input("equity_risk_premium", "Equity Risk Premium", v.equity_risk_premium))
        .push(single_input("beta", "Beta", v.beta))
        .push(single_input("target_debt_pct", "Target Debt %", v.target_debt_pct))
        .push(single_input("terminal_growth", "Terminal Growth Rate", v.terminal_growth))
        .push(single_input("exit_multiple", "Exit EV/EBITDA Multiple", v.exit_multiple));
}
