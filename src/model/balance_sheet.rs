//! Balance Sheet sheet

use super::{driver, year_grid, Level};
use crate::config::ModelConfig;
use crate::core::layout::{CellSource, Line, Period, SheetDef};
use crate::types::SheetId;

pub fn definition(level: Level, cfg: &ModelConfig) -> SheetDef {
    let mut def = SheetDef::new(SheetId::BalanceSheet, Some(year_grid(cfg)));
    let d = move |p: &Period, key: &str, scenario: bool| driver(level, p, key, scenario);

    let debt = match level {
        Level::Build => Line::item("debt", "Revolver / Debt")
            .years(|_| CellSource::formula("{cf.ending_debt}")),
        _ => Line::item("debt", "Total Debt").years(|_| CellSource::formula("{ds.total_debt}")),
    };

    def.push(Line::text("BALANCE SHEET"))
        .push(Line::text("($ in millions)"))
        .push(Line::blank())
        .push(Line::year_header("Period Ending"))
        .push(Line::text("ASSETS"))
        .push(Line::text("Current Assets"))
        .push(Line::item("cash", "Cash").years(|_| CellSource::formula("{cf.ending_cash}")))
        .push(Line::item("ar", "Accounts Receivable").years(move |p| {
            CellSource::formula(format!(
                "{{is.total_revenue}}*{}/365",
                d(p, "ar_days", true)
            ))
        }))
        .push(Line::item("inventory", "Inventory").years(move |p| {
            CellSource::formula(format!("{{is.cogs}}*{}/365", d(p, "inventory_days", true)))
        }))
        .push(Line::item("other_ca", "Other Current Assets").years(move |p| {
            CellSource::formula(format!(
                "{{is.total_revenue}}*{}",
                d(p, "other_ca_pct", false)
            ))
        }))
        .push(
            Line::item("total_ca", "Total Current Assets")
                .years(|_| CellSource::formula("SUM({cash..other_ca})")),
        )
        // CapEx is negative on the cash flow statement
        .push(Line::item("ppe", "PP&E, Net").years(|p| match p.first {
            true => CellSource::formula("{$asm.opening_ppe:B}-{cf.capex}-{is.da}"),
            false => CellSource::formula("{ppe:prev}-{cf.capex}-{is.da}"),
        }))
        .push(
            Line::item("total_assets", "Total Assets")
                .years(|_| CellSource::formula("{total_ca}+{ppe}")),
        )
        .push(Line::blank())
        .push(Line::text("LIABILITIES & EQUITY"))
        .push(Line::text("Current Liabilities"))
        .push(Line::item("ap", "Accounts Payable").years(move |p| {
            CellSource::formula(format!("{{is.cogs}}*{}/365", d(p, "ap_days", true)))
        }))
        .push(Line::item("other_cl", "Other Current Liabilities").years(move |p| {
            CellSource::formula(format!(
                "{{is.total_revenue}}*{}",
                d(p, "other_cl_pct", false)
            ))
        }))
        .push(
            Line::item("total_cl", "Total Current Liabilities")
                .years(|_| CellSource::formula("SUM({ap..other_cl})")),
        )
        .push(debt)
        .push(
            Line::item("total_liabilities", "Total Liabilities")
                .years(|_| CellSource::formula("{total_cl}+{debt}")),
        )
        // Opening equity is the balancing figure
        .push(Line::item("equity", "Shareholders' Equity").years(|p| match p.first {
            true => CellSource::formula("{total_assets}-{total_liabilities}"),
            false => CellSource::formula("{equity:prev}+{is.net_income}"),
        }))
        .push(
            Line::item("total_le", "Total Liabilities & Equity")
                .years(|_| CellSource::formula("{total_liabilities}+{equity}")),
        )
        .push(Line::blank())
        .push(
            Line::item("balance_check", "Balance Check")
                .years(|_| CellSource::formula("{total_assets}-{total_le}")),
        );

    def
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
        let def = defs.iter().find(|d| d.id == SheetId::BalanceSheet).unwrap();
        render_sheet(def, &layout, None).unwrap()
    }

    #[test]
    fn test_ppe_rolls_forward_net_of_capex_and_da() {
        let sheet = render(Level::Enhance);
        let row = sheet.find_row("PP&E, Net").unwrap();
        let Some(CellValue::Formula(later)) = sheet.get(row, 3) else {
            panic!("PP&E formula missing");
        };
        assert!(later.starts_with(&format!("=C{}-'Cash Flow'!D", row + 1)));
        assert!(later.ends_with("-'Income Statement'!D14"));
    }

    #[test]
    fn test_equity_plug_only_in_first_year() {
        let sheet = render(Level::Build);
        let row = sheet.find_row("Shareholders' Equity").unwrap();
        let first = sheet.get(row, 1).and_then(CellValue::as_formula).unwrap();
        let second = sheet.get(row, 2).and_then(CellValue::as_formula).unwrap();
        assert_eq!(first, "=B13-B21");
        assert_eq!(second, format!("=B{}+'Income Statement'!C20", row + 1));
    }

    #[test]
    fn test_debt_source_by_level() {
        let build = render(Level::Build);
        let enhance = render(Level::Enhance);
        assert!(build.find_row("Revolver / Debt").is_some());
        let row = enhance.find_row("Total Debt").unwrap();
        assert_eq!(
            enhance.get(row, 1),
            Some(&CellValue::Formula("='Debt Schedule'!B19".into()))
        );
    }
}
