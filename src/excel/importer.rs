//! Excel importer implementation - .xlsx → Workbook

use crate::error::{ForgeError, ForgeResult};
use crate::types::{CellValue, Sheet, Workbook};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reads an .xlsx file into a [`Workbook`]
///
/// Formula cells come back as formulas (with a leading '='), not as their
/// cached results.
pub struct ExcelImporter {
    path: PathBuf,
}

impl ExcelImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn import(&self) -> ForgeResult<Workbook> {
        let mut xlsx: Xlsx<_> = open_workbook(&self.path).map_err(|e| {
            ForgeError::Import(format!(
                "Failed to open Excel file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let mut workbook = Workbook::new();
        for name in xlsx.sheet_names().to_vec() {
            let values = xlsx.worksheet_range(&name).map_err(|e| {
                ForgeError::Import(format!("Failed to read sheet '{}': {}", name, e))
            })?;
            let formulas = match xlsx.worksheet_formula(&name) {
                Ok(range) => Some(range),
                Err(e) => {
                    warn!(sheet = name.as_str(), error = %e, "could not read formulas");
                    None
                }
            };

            let sheet = Self::read_sheet(&name, &values, formulas.as_ref());
            debug!(sheet = name.as_str(), cells = sheet.cells.len(), "imported sheet");
            workbook.sheets.push(sheet);
        }

        Ok(workbook)
    }

    fn read_sheet(name: &str, values: &Range<Data>, formulas: Option<&Range<String>>) -> Sheet {
        let mut sheet = Sheet::new(name);

        if let Some((start_row, start_col)) = values.start() {
            for (r, c, data) in values.used_cells() {
                let row = start_row + r as u32;
                let col = (start_col as usize + c) as u16;
                if let Some(value) = Self::convert(name, row, col, data) {
                    sheet.set(row, col, value);
                }
            }
        }

        // Formulas override cached values
        let Some(formulas) = formulas else {
            return sheet;
        };
        if let Some((start_row, start_col)) = formulas.start() {
            for (r, c, formula) in formulas.used_cells() {
                if formula.is_empty() {
                    continue;
                }
                let row = start_row + r as u32;
                let col = (start_col as usize + c) as u16;
                sheet.set(row, col, CellValue::formula(formula.as_str()));
            }
        }

        sheet
    }

    fn convert(sheet: &str, row: u32, col: u16, data: &Data) -> Option<CellValue> {
        match data {
            Data::Empty => None,
            Data::Float(f) => Some(CellValue::Number(*f)),
            Data::Int(i) => Some(CellValue::Number(*i as f64)),
            Data::String(s) => Some(CellValue::Text(s.clone())),
            Data::Bool(b) => Some(CellValue::Bool(*b)),
            Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
            Data::Error(e) => {
                warn!(sheet, row = row + 1, col = col + 1, error = ?e, "skipping error cell");
                None
            }
        }
    }
}
