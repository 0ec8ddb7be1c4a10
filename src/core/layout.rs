//! Sheet definitions and row layout
//!
//! A sheet is declared as an ordered list of [`Line`]s. Row numbers come from
//! position alone, so formulas never hardcode them: templates name rows by key
//! and [`ModelLayout`] resolves keys to rows for every sheet at once.

use super::template::{self, TemplateContext};
use crate::error::{ForgeError, ForgeResult};
use crate::types::{CellValue, Sheet, SheetId};
use std::collections::HashMap;
use tracing::debug;

//==============================================================================
// Periods & Grids
//==============================================================================

/// One year column of a sheet's grid
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub year: i32,
    /// Position within the grid (0 = first column)
    pub index: usize,
    pub historical: bool,
    pub first: bool,
    pub last: bool,
    pub first_forecast: bool,
}

/// Years laid out left to right starting at `first_col`
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub first_col: u16,
    pub periods: Vec<Period>,
}

impl Grid {
    pub fn new(first_col: u16, years: &[i32], first_forecast_year: i32) -> Self {
        let periods = years
            .iter()
            .enumerate()
            .map(|(index, &year)| Period {
                year,
                index,
                historical: year < first_forecast_year,
                first: index == 0,
                last: index + 1 == years.len(),
                first_forecast: year == first_forecast_year,
            })
            .collect();
        Self { first_col, periods }
    }

    pub fn col_of(&self, period: &Period) -> u16 {
        self.first_col + period.index as u16
    }

    pub fn col_of_year(&self, year: i32) -> Option<u16> {
        self.periods
            .iter()
            .find(|p| p.year == year)
            .map(|p| self.col_of(p))
    }

    pub fn period_at(&self, col: u16) -> Option<&Period> {
        let offset = col.checked_sub(self.first_col)? as usize;
        self.periods.get(offset)
    }

    pub fn first_col(&self) -> u16 {
        self.first_col
    }

    pub fn last_col(&self) -> u16 {
        self.first_col + self.periods.len().saturating_sub(1) as u16
    }
}

//==============================================================================
// Lines
//==============================================================================

/// What to put in a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellSource {
    Number(f64),
    Text(String),
    /// Formula template, see [`template::render`]
    Formula(String),
    Blank,
}

impl CellSource {
    pub fn formula(template: impl Into<String>) -> Self {
        CellSource::Formula(template.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        CellSource::Text(text.into())
    }
}

type PeriodRule = Box<dyn Fn(&Period) -> CellSource>;

/// Cells of a line beyond its column-A label
pub enum Cells {
    None,
    /// The grid's years as numbers
    YearHeader,
    /// One cell per grid period
    Years(PeriodRule),
    /// Explicit (column, source) pairs
    At(Vec<(u16, CellSource)>),
}

/// One worksheet row
pub struct Line {
    pub key: Option<String>,
    pub label: Option<String>,
    pub cells: Cells,
    /// Literal cells are user inputs and survive rewrites
    pub input: bool,
    /// Former labels of this row, used to locate inputs on older sheets
    pub legacy_labels: Vec<String>,
}

impl Line {
    pub fn blank() -> Self {
        Self {
            key: None,
            label: None,
            cells: Cells::None,
            input: false,
            legacy_labels: Vec::new(),
        }
    }

    /// Title, subtitle or section heading
    pub fn text(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::blank()
        }
    }

    /// Label followed by the grid's years
    pub fn year_header(label: impl Into<String>) -> Self {
        Self {
            cells: Cells::YearHeader,
            ..Self::text(label)
        }
    }

    /// Addressable row
    pub fn item(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::text(label)
        }
    }

    /// Addressable row without a column-A label
    pub fn unlabeled(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::blank()
        }
    }

    pub fn years(mut self, rule: impl Fn(&Period) -> CellSource + 'static) -> Self {
        self.cells = Cells::Years(Box::new(rule));
        self
    }

    pub fn at(mut self, col: u16, source: CellSource) -> Self {
        match &mut self.cells {
            Cells::At(list) => list.push((col, source)),
            _ => self.cells = Cells::At(vec![(col, source)]),
        }
        self
    }

    pub fn input(mut self) -> Self {
        self.input = true;
        self
    }

    pub fn legacy(mut self, label: impl Into<String>) -> Self {
        self.legacy_labels.push(label.into());
        self
    }
}

/// Declarative description of one sheet
pub struct SheetDef {
    pub id: SheetId,
    pub grid: Option<Grid>,
    pub lines: Vec<Line>,
}

impl SheetDef {
    pub fn new(id: SheetId, grid: Option<Grid>) -> Self {
        Self {
            id,
            grid,
            lines: Vec::new(),
        }
    }

    pub fn push(&mut self, line: Line) -> &mut Self {
        self.lines.push(line);
        self
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = Line>) -> &mut Self {
        self.lines.extend(lines);
        self
    }
}

//==============================================================================
// Layout
//==============================================================================

/// Key → row map of one sheet
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub id: SheetId,
    pub grid: Option<Grid>,
    rows: HashMap<String, u32>,
    labels: Vec<(u32, String, String)>,
}

impl SheetLayout {
    /// Zero-based row of `key`
    pub fn row(&self, key: &str) -> ForgeResult<u32> {
        self.rows
            .get(key)
            .copied()
            .ok_or_else(|| ForgeError::UnknownKey {
                sheet: self.id.name().to_string(),
                key: key.to_string(),
            })
    }

    pub fn grid(&self) -> ForgeResult<&Grid> {
        self.grid.as_ref().ok_or_else(|| {
            ForgeError::Template(format!("sheet '{}' has no year columns", self.id.name()))
        })
    }

    /// Check that an existing sheet still has every keyed label where the
    /// layout expects it
    pub fn verify(&self, sheet: &Sheet) -> ForgeResult<()> {
        for (row, key, label) in &self.labels {
            let found = sheet.text_at(*row, 0).unwrap_or("");
            if found != label {
                return Err(ForgeError::LayoutMismatch {
                    sheet: self.id.name().to_string(),
                    row: row + 1,
                    expected: label.clone(),
                    found: found.to_string(),
                });
            }
            debug!(sheet = self.id.name(), key = key.as_str(), row = row + 1, "verified");
        }
        Ok(())
    }
}

/// Row layout of every sheet at one model level
#[derive(Debug, Clone, Default)]
pub struct ModelLayout {
    sheets: HashMap<SheetId, SheetLayout>,
}

impl ModelLayout {
    pub fn from_defs(defs: &[SheetDef]) -> ForgeResult<Self> {
        let mut sheets = HashMap::new();
        for def in defs {
            let mut rows = HashMap::new();
            let mut labels = Vec::new();
            for (idx, line) in def.lines.iter().enumerate() {
                let Some(key) = &line.key else { continue };
                let row = idx as u32;
                if rows.insert(key.clone(), row).is_some() {
                    return Err(ForgeError::DuplicateKey {
                        sheet: def.id.name().to_string(),
                        key: key.clone(),
                    });
                }
                if let Some(label) = &line.label {
                    labels.push((row, key.clone(), label.clone()));
                }
            }
            sheets.insert(
                def.id,
                SheetLayout {
                    id: def.id,
                    grid: def.grid.clone(),
                    rows,
                    labels,
                },
            );
        }
        Ok(Self { sheets })
    }

    pub fn sheet(&self, id: SheetId) -> ForgeResult<&SheetLayout> {
        self.sheets
            .get(&id)
            .ok_or_else(|| ForgeError::MissingSheet(id.name().to_string()))
    }

    pub fn row(&self, id: SheetId, key: &str) -> ForgeResult<u32> {
        self.sheet(id)?.row(key)
    }
}

//==============================================================================
// Rendering
//==============================================================================

/// Render a sheet definition into cells
///
/// When `previous` holds an older version of the sheet, literal cells of
/// input lines are taken from it (matched by label, then by column).
pub fn render_sheet(
    def: &SheetDef,
    layout: &ModelLayout,
    previous: Option<&Sheet>,
) -> ForgeResult<Sheet> {
    let mut sheet = Sheet::new(def.id.name());

    for (idx, line) in def.lines.iter().enumerate() {
        let row = idx as u32;
        if let Some(label) = &line.label {
            sheet.set(row, 0, CellValue::Text(label.clone()));
        }

        let mut sources: Vec<(u16, Option<&Period>, CellSource)> = Vec::new();
        match &line.cells {
            Cells::None => {}
            Cells::YearHeader => {
                let grid = grid_for(def)?;
                for p in &grid.periods {
                    sources.push((grid.col_of(p), Some(p), CellSource::Number(p.year as f64)));
                }
            }
            Cells::Years(rule) => {
                let grid = grid_for(def)?;
                for p in &grid.periods {
                    sources.push((grid.col_of(p), Some(p), rule(p)));
                }
            }
            Cells::At(list) => {
                for (col, source) in list {
                    let period = def.grid.as_ref().and_then(|g| g.period_at(*col));
                    sources.push((*col, period, source.clone()));
                }
            }
        }

        let carried_row = match (line.input, previous) {
            (true, Some(old)) => find_previous_row(line, old),
            _ => None,
        };

        for (col, period, source) in sources {
            let value = match source {
                CellSource::Blank => {
                    let carried = match (carried_row, previous) {
                        (Some(old_row), Some(old)) => carry_input(old, old_row, col),
                        _ => None,
                    };
                    if let Some(value) = carried {
                        sheet.set(row, col, value);
                    }
                    continue;
                }
                CellSource::Number(n) => CellValue::Number(n),
                CellSource::Text(s) => CellValue::Text(s),
                CellSource::Formula(tpl) => {
                    let ctx = TemplateContext {
                        layout,
                        sheet: def.id,
                        period,
                    };
                    CellValue::Formula(format!("={}", template::render(&tpl, &ctx)?))
                }
            };
            let value = match (carried_row, previous) {
                (Some(old_row), Some(old)) if !value.is_formula() => {
                    carry_input(old, old_row, col).unwrap_or(value)
                }
                _ => value,
            };
            sheet.set(row, col, value);
        }
    }

    debug!(sheet = def.id.name(), cells = sheet.cells.len(), "rendered");
    Ok(sheet)
}

fn grid_for(def: &SheetDef) -> ForgeResult<&Grid> {
    def.grid.as_ref().ok_or_else(|| {
        ForgeError::Template(format!(
            "sheet '{}' uses year columns but has no grid",
            def.id.name()
        ))
    })
}

fn find_previous_row(line: &Line, old: &Sheet) -> Option<u32> {
    line.label
        .iter()
        .chain(line.legacy_labels.iter())
        .find_map(|label| old.find_row(label))
}

fn carry_input(old: &Sheet, row: u32, col: u16) -> Option<CellValue> {
    match old.get(row, col)? {
        CellValue::Formula(_) => None,
        value => {
            debug!(sheet = old.name.as_str(), row = row + 1, col, "carried input");
            Some(value.clone())
        }
    }
}
