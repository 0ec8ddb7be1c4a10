//! Income Statement sheet

use super::{driver, year_grid, Level};
use crate::config::ModelConfig;
use crate::core::layout::{CellSource, Line, Period, SheetDef};
use crate::types::SheetId;

pub fn definition(level: Level, cfg: &ModelConfig) -> SheetDef {
    let mut def = SheetDef::new(SheetId::IncomeStatement, Some(year_grid(cfg)));
    let d = move |p: &Period, key: &str, scenario: bool| driver(level, p, key, scenario);

    def.push(Line::text("INCOME STATEMENT"))
        .push(Line::text("($ in millions)"))
        .push(Line::blank())
        .push(Line::year_header("Period"))
        .push(Line::text("Revenue"))
        .push(revenue_line(level, "product_revenue", "Product Revenue", "product"))
        .push(revenue_line(level, "service_revenue", "Service Revenue", "service"))
        .push(
            Line::item("total_revenue", "Total Revenue")
                .years(|_| CellSource::formula("SUM({product_revenue..service_revenue})")),
        )
        .push(Line::item("cogs", "Cost of Goods Sold").years(move |p| {
            CellSource::formula(format!("{{total_revenue}}*(1-{})", d(p, "gross_margin", true)))
        }))
        .push(
            Line::item("gross_profit", "Gross Profit")
                .years(|_| CellSource::formula("{total_revenue}-{cogs}")),
        )
        .push(Line::text("Operating Expenses"))
        .push(Line::item("sga", "SG&A").years(move |p| {
            CellSource::formula(format!("{{total_revenue}}*{}", d(p, "sga_pct", true)))
        }))
        .push(Line::item("rnd", "R&D").years(move |p| {
            CellSource::formula(format!("{{total_revenue}}*{}", d(p, "rnd_pct", true)))
        }))
        .push(Line::item("da", "D&A").years(move |p| {
            CellSource::formula(format!("{{total_revenue}}*{}", d(p, "da_pct", false)))
        }))
        .push(
            Line::item("total_opex", "Total Operating Expenses")
                .years(|_| CellSource::formula("SUM({sga..da})")),
        )
        .push(
            Line::item("ebit", "EBIT")
                .years(|_| CellSource::formula("{gross_profit}-{total_opex}")),
        )
        .push(Line::item("interest", "Interest Expense").years(move |_| match level {
            Level::Build => CellSource::formula("{cf.beginning_debt}*{asm.revolver_rate}"),
            _ => CellSource::formula("{ds.total_interest}"),
        }))
        .push(Line::item("ebt", "EBT").years(|_| CellSource::formula("{ebit}-{interest}")))
        .push(Line::item("taxes", "Taxes").years(move |p| {
            CellSource::formula(format!("{{ebt}}*{}", d(p, "tax_rate", false)))
        }))
        .push(
            Line::item("net_income", "Net Income")
                .years(|_| CellSource::formula("{ebt}-{taxes}")),
        )
        .push(Line::blank())
        .push(Line::text("KEY METRICS"))
        .push(Line::item("ebitda", "EBITDA").years(|_| CellSource::formula("{ebit}+{da}")))
        .push(
            Line::item("ebitda_margin", "EBITDA Margin")
                .years(|_| CellSource::formula("{ebitda}/{total_revenue}")),
        )
        .push(
            Line::item("ni_margin", "Net Income Margin")
                .years(|_| CellSource::formula("{net_income}/{total_revenue}")),
        );

    def
}

/// Historical years link to the seeds, forecast years grow the prior year
fn revenue_line(level: Level, key: &'static str, label: &str, segment: &'static str) -> Line {
    Line::item(key, label).years(move |p| {
        if p.historical {
            return CellSource::formula(format!("{{asm.{}}}", key));
        }
        let growth = match level {
            Level::Build => format!("{{asm.{}_growth}}", segment),
            _ if p.first_forecast => format!("{{$asm.{}_growth_first:E}}", segment),
            _ => format!("{{$asm.{}_growth_later:E}}", segment),
        };
        CellSource::formula(format!("{{{}:prev}}*(1+{})", key, growth))
    })
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
        let def = defs
            .iter()
            .find(|d| d.id == SheetId::IncomeStatement)
            .unwrap();
        render_sheet(def, &layout, None).unwrap()
    }

    fn formula(sheet: &Sheet, label: &str, col: u16) -> String {
        let row = sheet.find_row(label).unwrap();
        match sheet.get(row, col) {
            Some(CellValue::Formula(f)) => f.clone(),
            other => panic!("no formula at {} col {}: {:?}", label, col, other),
        }
    }

    #[test]
    fn test_build_revenue_growth() {
        let sheet = render(Level::Build);
        assert_eq!(
            formula(&sheet, "Product Revenue", 1),
            "='Assumptions & Drivers'!B8"
        );
        assert_eq!(
            formula(&sheet, "Product Revenue", 5),
            "=E6*(1+'Assumptions & Drivers'!F10)"
        );
    }

    #[test]
    fn test_enhance_uses_scenario_column() {
        let sheet = render(Level::Enhance);
        let first = formula(&sheet, "Product Revenue", 5);
        let later = formula(&sheet, "Product Revenue", 6);
        assert!(first.starts_with("=E6*(1+'Assumptions & Drivers'!$E$"));
        assert_ne!(first, later.replace("F6", "E6"));
        assert!(formula(&sheet, "Cost of Goods Sold", 1).contains("$B$"));
        assert!(formula(&sheet, "Cost of Goods Sold", 5).contains("$E$"));
        assert_eq!(formula(&sheet, "Interest Expense", 3), "='Debt Schedule'!D20");
    }

    #[test]
    fn test_build_interest_on_opening_debt() {
        let sheet = render(Level::Build);
        let f = formula(&sheet, "Interest Expense", 2);
        assert!(f.starts_with("='Cash Flow'!C"));
        assert!(f.ends_with("*'Assumptions & Drivers'!C30"));
    }
}
