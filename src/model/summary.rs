//! Summary sheet: scenario comparison, data table and valuation recap

use super::Level;
use crate::config::ModelConfig;
use crate::core::layout::{CellSource, Line, SheetDef};
use crate::types::SheetId;

pub fn definition(level: Level, cfg: &ModelConfig) -> SheetDef {
    let mut def = SheetDef::new(SheetId::Summary, None);
    let last_year = cfg.timeline.last_year();

    def.push(Line::text("EXECUTIVE SUMMARY"))
        .push(
            Line::item("current_scenario", "Current Scenario:")
                .at(1, CellSource::formula("{$asm.scenario:B}")),
        )
        .push(Line::blank())
        .push(Line::text("SCENARIO COMPARISON"))
        .push(header(
            &format!("Key Metric ({})", last_year),
            &["Base", "Upside", "Downside", "Current"],
        ))
        .push(comparison("revenue", "Revenue", "{is.total_revenue:last}"))
        .push(comparison("ebitda", "EBITDA", "{is.ebitda:last}"))
        .push(comparison("ebitda_margin", "EBITDA Margin %", "{is.ebitda_margin:last}"))
        .push(comparison("net_income", "Net Income", "{is.net_income:last}"))
        .push(comparison("fcf", "Free Cash Flow", "{cf.fcf:last}"))
        .push(comparison("total_debt", "Total Debt", "{ds.total_debt:last}"))
        .push(Line::blank())
        .push(Line::text(
            "Note: \"Current\" follows the scenario selected on the Assumptions sheet.",
        ))
        .push(Line::text(
            "Switch scenarios and record each result to fill the comparison.",
        ))
        .push(Line::blank())
        .push(Line::text("HISTORICAL & FORECAST DATA"))
        .push(header("Year", &["Revenue", "EBITDA", "Free Cash Flow"]))
        .extend(data_rows(cfg));

    if level == Level::Valuation {
        valuation_summary(&mut def);
    }

    def
}

fn header(label: &str, columns: &[&str]) -> Line {
    columns
        .iter()
        .enumerate()
        .fold(Line::text(label), |line, (i, name)| {
            line.at(i as u16 + 1, CellSource::text(*name))
        })
}

/// Columns B-D are left for the user, E links to the live model
fn comparison(key: &str, label: &str, current: &str) -> Line {
    Line::item(key, label)
        .at(1, CellSource::Blank)
        .at(2, CellSource::Blank)
        .at(3, CellSource::Blank)
        .at(4, CellSource::formula(current))
        .input()
}

/// Year, revenue, EBITDA and free cash flow for every model year
pub(crate) fn data_rows(cfg: &ModelConfig) -> Vec<Line> {
    cfg.timeline
        .years()
        .into_iter()
        .map(|year| {
            Line::unlabeled(format!("data_{}", year))
                .at(0, CellSource::Number(year as f64))
                .at(1, CellSource::formula(format!("{{is.total_revenue:y{}}}", year)))
                .at(2, CellSource::formula(format!("{{is.ebitda:y{}}}", year)))
                .at(3, CellSource::formula(format!("{{cf.fcf:y{}}}", year)))
        })
        .collect()
}

fn valuation_summary(def: &mut SheetDef) {
    let method = |key: &str, label: &str, suffix: &str| {
        Line::item(key, label)
            .at(1, CellSource::formula(format!("{{dcf.ev_{}:C}}", suffix)))
            .at(2, CellSource::formula(format!("{{dcf.equity_{}:C}}", suffix)))
            .at(3, CellSource::formula(format!("{{dcf.per_share_{}:C}}", suffix)))
    };

    def.push(Line::blank())
        .push(Line::text("DCF VALUATION SUMMARY"))
        .push(header(
            "Method",
            &["Enterprise Value", "Equity Value", "Value per Share"],
        ))
        .push(method("val_pg", "DCF - Perpetuity Growth", "pg"))
        .push(method("val_em", "DCF - Exit Multiple", "em"))
        .push(
            Line::item("val_mid", "Midpoint")
                .at(1, CellSource::formula("({val_pg:B}+{val_em:B})/2"))
                .at(2, CellSource::formula("({val_pg:C}+{val_em:C})/2"))
                .at(3, CellSource::formula("({val_pg:D}+{val_em:D})/2")),
        )
        .push(Line::blank())
        .push(Line::text("KEY ASSUMPTIONS"))
        .push(Line::item("ka_wacc", "WACC").at(1, CellSource::formula("{dcf.wacc:C}")))
        .push(
            Line::item("ka_growth", "Terminal Growth Rate")
                .at(1, CellSource::formula("{dcf.terminal_growth:C}")),
        )
        .push(
            Line::item("ka_multiple", "Exit EV/EBITDA Multiple")
                .at(1, CellSource::formula("{dcf.exit_multiple:C}")),
        )
        .push(
            Line::item("ka_ebitda", "Terminal Year EBITDA")
                .at(1, CellSource::formula("{dcf.terminal_ebitda:C}")),
        );
}
