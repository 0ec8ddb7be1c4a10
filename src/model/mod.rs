//! Sheet definitions of the 3-statement model
//!
//! Each module declares one sheet. The content of a sheet depends on the
//! model [`Level`]: the build level has per-year drivers and a simple
//! revolver sweep, the enhance level adds the scenario table and debt
//! schedule, and the valuation level adds the DCF.

pub mod assumptions;
pub mod balance_sheet;
pub mod cash_flow;
pub mod charts;
pub mod checks;
pub mod dcf;
pub mod debt_schedule;
pub mod income_statement;
pub mod summary;

use crate::config::ModelConfig;
use crate::core::layout::{Grid, Period, SheetDef};
use crate::types::{SheetId, Workbook};
use serde::Serialize;
use std::fmt;

/// How far the pipeline has taken a workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Level {
    Build,
    Enhance,
    Valuation,
}

impl Level {
    /// Sheets present at this level, in workbook order
    pub fn sheets(&self) -> &'static [SheetId] {
        match self {
            Level::Build => &[
                SheetId::Assumptions,
                SheetId::IncomeStatement,
                SheetId::BalanceSheet,
                SheetId::CashFlow,
                SheetId::Charts,
            ],
            Level::Enhance => &[
                SheetId::Assumptions,
                SheetId::Summary,
                SheetId::IncomeStatement,
                SheetId::BalanceSheet,
                SheetId::DebtSchedule,
                SheetId::CashFlow,
                SheetId::Checks,
            ],
            Level::Valuation => &[
                SheetId::Assumptions,
                SheetId::Summary,
                SheetId::IncomeStatement,
                SheetId::BalanceSheet,
                SheetId::DebtSchedule,
                SheetId::CashFlow,
                SheetId::Dcf,
                SheetId::Checks,
            ],
        }
    }

    /// Level of an existing workbook, judged by its sheets
    pub fn detect(workbook: &Workbook) -> Option<Level> {
        if workbook.has_sheet(SheetId::Dcf.name()) {
            Some(Level::Valuation)
        } else if workbook.has_sheet(SheetId::DebtSchedule.name()) {
            Some(Level::Enhance)
        } else if workbook.has_sheet(SheetId::IncomeStatement.name()) {
            Some(Level::Build)
        } else {
            None
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Build => "build",
            Level::Enhance => "enhance",
            Level::Valuation => "valuation",
        })
    }
}

/// Definitions of every sheet at `level`
pub fn definitions(level: Level, cfg: &ModelConfig) -> Vec<SheetDef> {
    level
        .sheets()
        .iter()
        .map(|id| match id {
            SheetId::Assumptions => assumptions::definition(level, cfg),
            SheetId::Summary => summary::definition(level, cfg),
            SheetId::IncomeStatement => income_statement::definition(level, cfg),
            SheetId::BalanceSheet => balance_sheet::definition(level, cfg),
            SheetId::DebtSchedule => debt_schedule::definition(cfg),
            SheetId::CashFlow => cash_flow::definition(level, cfg),
            SheetId::Dcf => dcf::definition(cfg),
            SheetId::Checks => checks::definition(level, cfg),
            SheetId::Charts => charts::definition(cfg),
        })
        .collect()
}

/// All model years starting in column B
pub(crate) fn year_grid(cfg: &ModelConfig) -> Grid {
    let t = &cfg.timeline;
    Grid::new(1, &t.years(), t.first_forecast_year())
}

/// `IF(selector="Base",base,IF(selector="Upside",upside,downside))`
///
/// Any selector value other than the first two falls through to `downside`.
pub(crate) fn scenario_switch(base: &str, upside: &str, downside: &str) -> String {
    format!(
        "IF({{$asm.scenario:B}}=\"Base\",{},IF({{$asm.scenario:B}}=\"Upside\",{},{}))",
        base, upside, downside
    )
}

/// Reference to an operating driver for the given period
///
/// At build level drivers are per-year cells on the Assumptions sheet. From
/// the enhance level on, historical years read the fixed column and forecast
/// years read the selected scenario column.
pub(crate) fn driver(level: Level, period: &Period, key: &str, scenario_driven: bool) -> String {
    match level {
        Level::Build => format!("{{asm.{}}}", key),
        _ if !scenario_driven => format!("{{$asm.{}:B}}", key),
        _ if period.historical => format!("{{$asm.{}_hist:B}}", key),
        _ => format!("{{$asm.{}_fc:E}}", key),
    }
}
