//! Debt Schedule sheet: term loan and revolver roll-forwards
//!
//! Term loan interest accrues on the average balance, which never depends on
//! the year's cash flow. Revolver interest accrues on the opening balance so
//! that interest, net income and the revolver draw stay acyclic.

use super::year_grid;
use crate::config::ModelConfig;
use crate::core::layout::{CellSource, Line, SheetDef};
use crate::types::SheetId;

pub fn definition(cfg: &ModelConfig) -> SheetDef {
    let mut def = SheetDef::new(SheetId::DebtSchedule, Some(year_grid(cfg)));

    def.push(Line::text("DEBT SCHEDULE"))
        .push(Line::text("($ in millions)"))
        .push(Line::blank())
        .push(Line::year_header("Period"))
        .push(Line::text("TERM LOAN"))
        .push(Line::item("tl_beginning", "Beginning Balance").years(|p| match p.first {
            true => CellSource::formula("{$asm.term_loan:B}"),
            false => CellSource::formula("{tl_ending:prev}"),
        }))
        .push(
            Line::item("tl_borrowing", "Borrowing")
                .years(|_| CellSource::Number(0.0))
                .input(),
        )
        .push(
            Line::item("tl_repayment", "Repayment").years(|_| {
                CellSource::formula("MIN({tl_beginning}+{tl_borrowing},{$asm.term_loan_repayment:B})")
            }),
        )
        .push(
            Line::item("tl_ending", "Ending Balance")
                .years(|_| CellSource::formula("{tl_beginning}+{tl_borrowing}-{tl_repayment}")),
        )
        .push(
            Line::item("tl_average", "Average Balance")
                .years(|_| CellSource::formula("({tl_beginning}+{tl_ending})/2")),
        )
        .push(
            Line::item("tl_interest", "Interest Expense")
                .years(|_| CellSource::formula("{tl_average}*{$asm.term_loan_rate:B}")),
        )
        .push(Line::blank())
        .push(Line::text("REVOLVER"))
        .push(Line::item("rv_beginning", "Beginning Balance").years(|p| match p.first {
            true => CellSource::Number(0.0),
            false => CellSource::formula("{rv_ending:prev}"),
        }))
        .push(
            Line::item("rv_draw", "Draw / (Paydown)")
                .years(|_| CellSource::formula("{cf.revolver_draw}")),
        )
        .push(
            Line::item("rv_ending", "Ending Balance")
                .years(|_| CellSource::formula("MAX(0,{rv_beginning}+{rv_draw})")),
        )
        .push(
            Line::item("rv_interest", "Revolver Interest Expense")
                .years(|_| CellSource::formula("{rv_beginning}*{$asm.revolver_rate:B}")),
        )
        .push(Line::blank())
        .push(
            Line::item("total_debt", "Total Debt")
                .years(|_| CellSource::formula("{tl_ending}+{rv_ending}")),
        )
        .push(
            Line::item("total_interest", "Total Interest Expense")
                .years(|_| CellSource::formula("{tl_interest}+{rv_interest}")),
        );

    def
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::{render_sheet, ModelLayout};
    use crate::model::{definitions, Level};
    use crate::types::CellValue;

    #[test]
    fn test_revolver_interest_on_opening_balance() {
        let cfg = ModelConfig::default();
        let defs = definitions(Level::Enhance, &cfg);
        let layout = ModelLayout::from_defs(&defs).unwrap();
        let sheet = render_sheet(&definition(&cfg), &layout, None).unwrap();

        let row = sheet.find_row("Revolver Interest Expense").unwrap();
        let f = sheet.get(row, 4).and_then(CellValue::as_formula).unwrap();
        assert!(f.starts_with("=E14*'Assumptions & Drivers'!$B$"));

        let repay = sheet.find_row("Repayment").unwrap();
        let f = sheet.get(repay, 2).and_then(CellValue::as_formula).unwrap();
        assert!(f.starts_with("=MIN(C6+C7,"));
    }
}
