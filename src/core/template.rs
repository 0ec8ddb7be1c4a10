//! Formula templates
//!
//! A template is an Excel formula (without the leading '=') whose cell
//! references are written as placeholders naming rows by key:
//!
//! ```text
//! {[$][sheet.]key[:col][..key[:col]]}
//! ```
//!
//! - `sheet` is a sheet prefix (`is`, `bs`, `cf`, ...); defaults to the sheet
//!   being rendered
//! - `$` makes the reference absolute
//! - `col` is omitted (the current period's year), `prev`, `first`, `last`,
//!   `y2027` (an explicit year) or a column letter such as `B`
//! - `..key[:col]` turns the reference into a range on the same sheet
//!
//! Years map across sheets with different grids, so `{is.ebit}` on a DCF
//! column for 2025 resolves to the Income Statement's 2025 column.

use super::layout::{ModelLayout, Period};
use crate::error::{ForgeError, ForgeResult};
use crate::excel::address::{absolute_cell_name, cell_name, column_index, quote_sheet_name};
use crate::types::SheetId;

/// Where a template is being rendered
pub struct TemplateContext<'a> {
    pub layout: &'a ModelLayout,
    pub sheet: SheetId,
    /// Period of the cell's column, if the column belongs to the sheet's grid
    pub period: Option<&'a Period>,
}

#[derive(Debug, PartialEq)]
enum ColumnSpec {
    Current,
    Previous,
    First,
    Last,
    Year(i32),
    Fixed(u16),
}

#[derive(Debug, PartialEq)]
struct Endpoint {
    sheet: Option<SheetId>,
    key: String,
    col: ColumnSpec,
}

#[derive(Debug, PartialEq)]
struct Placeholder {
    absolute: bool,
    start: Endpoint,
    end: Option<Endpoint>,
}

/// Expand every placeholder of `template`
pub fn render(template: &str, ctx: &TemplateContext) -> ForgeResult<String> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(open) = rest.find(|c| c == '{' || c == '}') {
        if rest[open..].starts_with('}') {
            return Err(ForgeError::Template(format!(
                "unmatched '}}' in '{}'",
                template
            )));
        }
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            ForgeError::Template(format!("unterminated placeholder in '{}'", template))
        })?;
        let placeholder = parse_placeholder(&after[..close])?;
        out.push_str(&resolve(&placeholder, ctx)?);
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

fn parse_placeholder(body: &str) -> ForgeResult<Placeholder> {
    let (absolute, body) = match body.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (start, end) = match body.split_once("..") {
        Some((s, e)) => (s, Some(e)),
        None => (body, None),
    };
    Ok(Placeholder {
        absolute,
        start: parse_endpoint(start)?,
        end: end.map(parse_endpoint).transpose()?,
    })
}

fn parse_endpoint(text: &str) -> ForgeResult<Endpoint> {
    let (reference, col) = match text.split_once(':') {
        Some((r, c)) => (r, parse_column_spec(c)?),
        None => (text, ColumnSpec::Current),
    };
    let (sheet, key) = match reference.split_once('.') {
        Some((prefix, key)) => {
            let sheet = SheetId::from_prefix(prefix).ok_or_else(|| {
                ForgeError::Template(format!("unknown sheet prefix '{}'", prefix))
            })?;
            (Some(sheet), key)
        }
        None => (None, reference),
    };
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(ForgeError::Template(format!("invalid row key '{}'", key)));
    }
    Ok(Endpoint {
        sheet,
        key: key.to_string(),
        col,
    })
}

fn parse_column_spec(spec: &str) -> ForgeResult<ColumnSpec> {
    match spec {
        "prev" => Ok(ColumnSpec::Previous),
        "first" => Ok(ColumnSpec::First),
        "last" => Ok(ColumnSpec::Last),
        _ => {
            if let Some(year) = spec.strip_prefix('y') {
                return year
                    .parse()
                    .map(ColumnSpec::Year)
                    .map_err(|_| ForgeError::Template(format!("invalid year '{}'", spec)));
            }
            if !spec.is_empty() && spec.chars().all(|c| c.is_ascii_uppercase()) {
                return Ok(ColumnSpec::Fixed(column_index(spec)?));
            }
            Err(ForgeError::Template(format!("invalid column '{}'", spec)))
        }
    }
}

fn resolve(placeholder: &Placeholder, ctx: &TemplateContext) -> ForgeResult<String> {
    let sheet = placeholder.start.sheet.unwrap_or(ctx.sheet);
    let start = cell(&placeholder.start, sheet, placeholder.absolute, ctx)?;

    let mut reference = String::new();
    if sheet != ctx.sheet {
        reference.push_str(&quote_sheet_name(sheet.name()));
        reference.push('!');
    }
    reference.push_str(&start);

    if let Some(end) = &placeholder.end {
        if end.sheet.is_some_and(|s| s != sheet) {
            return Err(ForgeError::Template(format!(
                "range '{}..{}' spans two sheets",
                placeholder.start.key, end.key
            )));
        }
        reference.push(':');
        reference.push_str(&cell(end, sheet, placeholder.absolute, ctx)?);
    }

    Ok(reference)
}

fn cell(
    endpoint: &Endpoint,
    sheet: SheetId,
    absolute: bool,
    ctx: &TemplateContext,
) -> ForgeResult<String> {
    let target = ctx.layout.sheet(sheet)?;
    let row = target.row(&endpoint.key)?;

    let current_period = || {
        ctx.period.ok_or_else(|| {
            ForgeError::Template(format!(
                "'{}' needs a year column but the cell is outside the grid",
                endpoint.key
            ))
        })
    };
    let year_col = |year: i32| -> ForgeResult<u16> {
        target.grid()?.col_of_year(year).ok_or_else(|| {
            ForgeError::Template(format!("year {} is not a column of '{}'", year, sheet.name()))
        })
    };

    let col = match endpoint.col {
        ColumnSpec::Current => year_col(current_period()?.year)?,
        ColumnSpec::Previous => year_col(current_period()?.year - 1)?,
        ColumnSpec::First => target.grid()?.first_col(),
        ColumnSpec::Last => target.grid()?.last_col(),
        ColumnSpec::Year(year) => year_col(year)?,
        ColumnSpec::Fixed(col) => col,
    };

    Ok(if absolute {
        absolute_cell_name(row, col)
    } else {
        cell_name(row, col)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::{Grid, Line, SheetDef};

    fn layout() -> ModelLayout {
        let mut asm = SheetDef::new(SheetId::Assumptions, None);
        asm.push(Line::text("ASSUMPTIONS"))
            .push(Line::item("tax_rate", "Tax Rate"));

        let mut is = SheetDef::new(
            SheetId::IncomeStatement,
            Some(Grid::new(1, &[2021, 2022, 2023, 2024], 2023)),
        );
        is.push(Line::text("IS"))
            .push(Line::item("revenue", "Revenue"))
            .push(Line::item("ebit", "EBIT"));

        let mut dcf = SheetDef::new(SheetId::Dcf, Some(Grid::new(2, &[2023, 2024], 2023)));
        dcf.push(Line::item("ufcf", "UFCF"));

        let mut cf = SheetDef::new(
            SheetId::CashFlow,
            Some(Grid::new(1, &[2021, 2022, 2023, 2024], 2023)),
        );
        cf.extend((0..6).map(|i| Line::item(format!("line_{}", i), format!("Line {}", i))));

        ModelLayout::from_defs(&[asm, is, dcf, cf]).unwrap()
    }

    fn period(grid: &Grid, year: i32) -> Period {
        grid.periods
            .iter()
            .find(|p| p.year == year)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_same_sheet_current_and_prev() {
        let layout = layout();
        let grid = Grid::new(1, &[2021, 2022, 2023, 2024], 2023);
        let p = period(&grid, 2023);
        let ctx = TemplateContext {
            layout: &layout,
            sheet: SheetId::IncomeStatement,
            period: Some(&p),
        };
        assert_eq!(render("{revenue:prev}*(1+0.1)", &ctx).unwrap(), "C2*(1+0.1)");
        assert_eq!(render("{revenue}-{ebit}", &ctx).unwrap(), "D2-D3");
    }

    #[test]
    fn test_cross_sheet_absolute() {
        let layout = layout();
        let ctx = TemplateContext {
            layout: &layout,
            sheet: SheetId::IncomeStatement,
            period: None,
        };
        assert_eq!(
            render("{$asm.tax_rate:B}", &ctx).unwrap(),
            "'Assumptions & Drivers'!$B$2"
        );
    }

    #[test]
    fn test_year_mapping_across_grids() {
        let layout = layout();
        let dcf_grid = Grid::new(2, &[2023, 2024], 2023);
        let p = period(&dcf_grid, 2023);
        let ctx = TemplateContext {
            layout: &layout,
            sheet: SheetId::Dcf,
            period: Some(&p),
        };
        // DCF column C (2023) reads Income Statement column D (2023)
        assert_eq!(render("{is.ebit}", &ctx).unwrap(), "'Income Statement'!D3");
        assert_eq!(render("{ufcf}", &ctx).unwrap(), "C1");
        assert_eq!(render("{is.ebit:last}", &ctx).unwrap(), "'Income Statement'!E3");
        assert_eq!(render("{is.revenue:y2021}", &ctx).unwrap(), "'Income Statement'!B2");
    }

    #[test]
    fn test_ranges() {
        let layout = layout();
        let dcf_grid = Grid::new(2, &[2023, 2024], 2023);
        let p = period(&dcf_grid, 2024);
        let ctx = TemplateContext {
            layout: &layout,
            sheet: SheetId::Dcf,
            period: Some(&p),
        };
        assert_eq!(
            render("SUM({cf.line_1..line_4})", &ctx).unwrap(),
            "SUM('Cash Flow'!E2:E5)"
        );
        assert_eq!(render("SUM({ufcf:first..ufcf:last})", &ctx).unwrap(), "SUM(C1:D1)");
    }

    #[test]
    fn test_errors() {
        let layout = layout();
        let ctx = TemplateContext {
            layout: &layout,
            sheet: SheetId::IncomeStatement,
            period: None,
        };
        assert!(matches!(render("{ebit}", &ctx), Err(ForgeError::Template(_))));
        assert!(matches!(
            render("{is.nope:B}", &ctx),
            Err(ForgeError::UnknownKey { .. })
        ));
        assert!(matches!(render("{xx.ebit:B}", &ctx), Err(ForgeError::Template(_))));
        assert!(matches!(render("{ebit:B", &ctx), Err(ForgeError::Template(_))));
        assert!(matches!(render("ebit}", &ctx), Err(ForgeError::Template(_))));
        assert!(matches!(
            render("{ebit:y1999}", &ctx),
            Err(ForgeError::Template(_))
        ));
        assert!(matches!(
            render("{chk.anything:B}", &ctx),
            Err(ForgeError::MissingSheet(_))
        ));
    }

    #[test]
    fn test_plain_text_passes_through() {
        let layout = layout();
        let ctx = TemplateContext {
            layout: &layout,
            sheet: SheetId::IncomeStatement,
            period: None,
        };
        assert_eq!(render("IF(1>0,\"PASS\",\"FAIL\")", &ctx).unwrap(), "IF(1>0,\"PASS\",\"FAIL\")");
    }
}
