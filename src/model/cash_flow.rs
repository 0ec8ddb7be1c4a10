//! Cash Flow sheet
//!
//! At build level any cash shortfall is covered by a single revolver that
//! sweeps surplus cash. From the enhance level on, financing flows come from
//! the Debt Schedule and the revolver tops cash up to the minimum balance.

use super::{driver, year_grid, Level};
use crate::config::ModelConfig;
use crate::core::layout::{CellSource, Line, Period, SheetDef};
use crate::types::SheetId;

pub fn definition(level: Level, cfg: &ModelConfig) -> SheetDef {
    let mut def = SheetDef::new(SheetId::CashFlow, Some(year_grid(cfg)));
    let d = move |p: &Period, key: &str, scenario: bool| driver(level, p, key, scenario);

    def.push(Line::text("CASH FLOW STATEMENT"))
        .push(Line::text("($ in millions)"))
        .push(Line::blank())
        .push(Line::year_header("Period"))
        .push(Line::text("OPERATING ACTIVITIES"))
        .push(Line::item("net_income", "Net Income").years(|_| CellSource::formula("{is.net_income}")))
        .push(Line::item("da", "D&A").years(|_| CellSource::formula("{is.da}")))
        .push(Line::text("Changes in Working Capital:"))
        .push(working_capital("change_ar", "Change in AR", "ar", true))
        .push(working_capital("change_inventory", "Change in Inventory", "inventory", true))
        .push(working_capital("change_other_ca", "Change in Other Current Assets", "other_ca", true))
        .push(working_capital("change_ap", "Change in AP", "ap", false))
        .push(working_capital("change_other_cl", "Change in Other Current Liab", "other_cl", false))
        .push(
            Line::item("cfo", "Cash from Operations")
                .years(|_| CellSource::formula("SUM({net_income..change_other_cl})")),
        )
        .push(Line::blank())
        .push(Line::text("INVESTING ACTIVITIES"))
        .push(Line::item("capex", "CapEx").years(move |p| {
            CellSource::formula(format!(
                "-({{is.total_revenue}}*{})",
                d(p, "capex_pct", true)
            ))
        }))
        .push(Line::item("cfi", "Cash from Investing").years(|_| CellSource::formula("{capex}")))
        .push(Line::blank())
        .push(Line::text("FINANCING ACTIVITIES"));

    match level {
        Level::Build => revolver_sweep(&mut def),
        Level::Enhance | Level::Valuation => scheduled_financing(&mut def),
    }

    def.push(Line::blank())
        .push(Line::text("KEY METRICS"))
        .push(
            Line::item("fcf", "Free Cash Flow")
                .years(|_| CellSource::formula("{cfo}+{capex}")),
        );

    def
}

/// Assets reduce cash when they grow, liabilities add to it
fn working_capital(key: &str, label: &str, bs_key: &'static str, asset: bool) -> Line {
    Line::item(key, label).years(move |p| {
        if p.first {
            CellSource::Number(0.0)
        } else if asset {
            CellSource::formula(format!("-({{bs.{0}}}-{{bs.{0}:prev}})", bs_key))
        } else {
            CellSource::formula(format!("{{bs.{0}}}-{{bs.{0}:prev}}", bs_key))
        }
    })
}

fn opening_or_prior(opening: &'static str, prior: &'static str) -> impl Fn(&Period) -> CellSource {
    move |p: &Period| match p.first {
        true => CellSource::formula(opening),
        false => CellSource::formula(prior),
    }
}

fn revolver_sweep(def: &mut SheetDef) {
    def.push(
        Line::item("net_borrowing", "Net Borrowing / (Repayment)")
            .years(|_| CellSource::formula("{ending_debt}-{beginning_debt}")),
    )
    .push(Line::item("cff", "Cash from Financing").years(|_| CellSource::formula("{net_borrowing}")))
    .push(Line::blank())
    .push(
        Line::item("net_change", "Net Change in Cash")
            .years(|_| CellSource::formula("{cfo}+{cfi}+{cff}")),
    )
    .push(
        Line::item("beginning_cash", "Beginning Cash")
            .years(opening_or_prior("{$asm.opening_cash:B}", "{ending_cash:prev}")),
    )
    .push(
        Line::item("ending_cash", "Ending Cash")
            .years(|_| CellSource::formula("{beginning_cash}+{net_change}")),
    )
    .push(Line::blank())
    .push(Line::text("REVOLVER LOGIC"))
    .push(
        Line::item("cash_before_financing", "Cash Before Financing")
            .years(|_| CellSource::formula("{beginning_cash}+{cfo}+{cfi}")),
    )
    .push(
        Line::item("beginning_debt", "Beginning Debt")
            .years(opening_or_prior("{$asm.opening_debt:B}", "{ending_debt:prev}")),
    )
    .push(
        Line::item("ending_debt", "Ending Debt")
            .years(|_| CellSource::formula("MAX(0,{beginning_debt}-{cash_before_financing})")),
    );
}

fn scheduled_financing(def: &mut SheetDef) {
    def.push(
        Line::item("term_loan_flow", "Term Loan Borrowing / (Repayment)")
            .years(|_| CellSource::formula("{ds.tl_borrowing}-{ds.tl_repayment}")),
    )
    .push(
        Line::item("cash_before_revolver", "Cash Before Revolver")
            .years(|_| CellSource::formula("{beginning_cash}+{cfo}+{cfi}+{term_loan_flow}")),
    )
    .push(Line::item("revolver_draw", "Revolver Draw / (Paydown)").years(|p| {
        match p.first {
            true => CellSource::Number(0.0),
            false => CellSource::formula(
                "MAX(-{ds.rv_beginning},{$asm.minimum_cash:B}-{cash_before_revolver})",
            ),
        }
    }))
    .push(
        Line::item("cff", "Cash from Financing")
            .years(|_| CellSource::formula("{term_loan_flow}+{revolver_draw}")),
    )
    .push(Line::blank())
    .push(
        Line::item("net_change", "Net Change in Cash")
            .years(|_| CellSource::formula("{cfo}+{cfi}+{cff}")),
    )
    .push(
        Line::item("beginning_cash", "Beginning Cash")
            .years(opening_or_prior("{$asm.opening_cash:B}", "{ending_cash:prev}")),
    )
    .push(
        Line::item("ending_cash", "Ending Cash")
            .years(|_| CellSource::formula("{beginning_cash}+{net_change}")),
    );
}
