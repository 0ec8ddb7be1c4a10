use crate::error::{ForgeError, ForgeResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

//==============================================================================
// Cell Values
//==============================================================================

/// Content of a single worksheet cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
    /// Formula text, always including the leading '='
    Formula(String),
}

impl CellValue {
    /// Build a formula cell, adding the leading '=' if missing
    pub fn formula(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.starts_with('=') {
            CellValue::Formula(text)
        } else {
            CellValue::Formula(format!("={}", text))
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula(_))
    }

    /// Formula text including '=' (None for literals)
    pub fn as_formula(&self) -> Option<&str> {
        match self {
            CellValue::Formula(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Formula(s) => write!(f, "{}", s),
        }
    }
}

//==============================================================================
// Model Sheets
//==============================================================================

/// Every sheet the model can contain, in workbook order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SheetId {
    Assumptions,
    Summary,
    IncomeStatement,
    BalanceSheet,
    DebtSchedule,
    CashFlow,
    Dcf,
    Checks,
    Charts,
}

impl SheetId {
    pub const ALL: [SheetId; 9] = [
        SheetId::Assumptions,
        SheetId::Summary,
        SheetId::IncomeStatement,
        SheetId::BalanceSheet,
        SheetId::DebtSchedule,
        SheetId::CashFlow,
        SheetId::Dcf,
        SheetId::Checks,
        SheetId::Charts,
    ];

    /// Worksheet tab name
    pub fn name(&self) -> &'static str {
        match self {
            SheetId::Assumptions => "Assumptions & Drivers",
            SheetId::Summary => "Summary",
            SheetId::IncomeStatement => "Income Statement",
            SheetId::BalanceSheet => "Balance Sheet",
            SheetId::DebtSchedule => "Debt Schedule",
            SheetId::CashFlow => "Cash Flow",
            SheetId::Dcf => "DCF",
            SheetId::Checks => "Checks",
            SheetId::Charts => "Charts",
        }
    }

    /// Short id used in formula templates (`{is.ebit}`)
    pub fn prefix(&self) -> &'static str {
        match self {
            SheetId::Assumptions => "asm",
            SheetId::Summary => "sum",
            SheetId::IncomeStatement => "is",
            SheetId::BalanceSheet => "bs",
            SheetId::DebtSchedule => "ds",
            SheetId::CashFlow => "cf",
            SheetId::Dcf => "dcf",
            SheetId::Checks => "chk",
            SheetId::Charts => "charts",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.prefix() == prefix)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//==============================================================================
// Sheets & Workbooks
//==============================================================================

/// A named worksheet: sparse grid of cells keyed by zero-based (row, col)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub cells: BTreeMap<(u32, u16), CellValue>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    pub fn set(&mut self, row: u32, col: u16, value: CellValue) {
        self.cells.insert((row, col), value);
    }

    /// Text content of a cell, trimmed (None for non-text cells)
    pub fn text_at(&self, row: u32, col: u16) -> Option<&str> {
        self.get(row, col).and_then(CellValue::as_text).map(str::trim)
    }

    /// First row whose column-A text equals `label`
    pub fn find_row(&self, label: &str) -> Option<u32> {
        self.cells
            .iter()
            .find(|((_, col), value)| *col == 0 && value.as_text().map(str::trim) == Some(label))
            .map(|((row, _), _)| *row)
    }

    /// Iterate over formula cells as (row, col, formula)
    pub fn formulas(&self) -> impl Iterator<Item = (u32, u16, &str)> {
        self.cells
            .iter()
            .filter_map(|((row, col), value)| value.as_formula().map(|f| (*row, *col, f)))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Ordered collection of sheets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.iter().any(|s| s.name == name)
    }

    pub fn sheet(&self, name: &str) -> ForgeResult<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ForgeError::MissingSheet(name.to_string()))
    }

    pub fn sheet_mut(&mut self, name: &str) -> ForgeResult<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| ForgeError::MissingSheet(name.to_string()))
    }

    /// Replace a sheet of the same name in place, or append it
    pub fn upsert_sheet(&mut self, sheet: Sheet) {
        match self.sheets.iter_mut().find(|s| s.name == sheet.name) {
            Some(existing) => *existing = sheet,
            None => self.sheets.push(sheet),
        }
    }

    pub fn remove_sheet(&mut self, name: &str) -> Option<Sheet> {
        let idx = self.sheets.iter().position(|s| s.name == name)?;
        Some(self.sheets.remove(idx))
    }

    /// Reorder sheets: names in `order` first (in that order), others after
    pub fn order_by(&mut self, order: &[&str]) {
        let rank = |name: &str| order.iter().position(|n| *n == name).unwrap_or(order.len());
        self.sheets.sort_by_key(|s| rank(&s.name));
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_constructor_adds_equals() {
        assert_eq!(CellValue::formula("A1+B1"), CellValue::Formula("=A1+B1".into()));
        assert_eq!(CellValue::formula("=A1"), CellValue::Formula("=A1".into()));
    }

    #[test]
    fn test_find_row_matches_column_a_only() {
        let mut sheet = Sheet::new("IS");
        sheet.set(3, 1, CellValue::Text("EBIT".into()));
        sheet.set(7, 0, CellValue::Text("EBIT ".into()));
        assert_eq!(sheet.find_row("EBIT"), Some(7));
        assert_eq!(sheet.find_row("EBITDA"), None);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut wb = Workbook::new();
        wb.upsert_sheet(Sheet::new("A"));
        wb.upsert_sheet(Sheet::new("B"));
        let mut replacement = Sheet::new("A");
        replacement.set(0, 0, CellValue::Number(1.0));
        wb.upsert_sheet(replacement);

        assert_eq!(wb.sheet_names(), vec!["A", "B"]);
        assert_eq!(wb.sheet("A").unwrap().get(0, 0), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_order_by_keeps_unknown_sheets_last() {
        let mut wb = Workbook::new();
        for name in ["Z", "C", "A", "B"] {
            wb.upsert_sheet(Sheet::new(name));
        }
        wb.order_by(&["A", "B", "C"]);
        assert_eq!(wb.sheet_names(), vec!["A", "B", "C", "Z"]);
    }

    #[test]
    fn test_missing_sheet_error() {
        let wb = Workbook::new();
        assert!(matches!(wb.sheet("Nope"), Err(ForgeError::MissingSheet(name)) if name == "Nope"));
    }
}
