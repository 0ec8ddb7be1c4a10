//! Excel exporter implementation - Workbook → .xlsx

use crate::error::{ForgeError, ForgeResult};
use crate::types::{CellValue, Sheet, Workbook};
use rust_xlsxwriter::{Formula, Workbook as XlsxWorkbook, Worksheet};
use std::path::Path;
use tracing::debug;

/// Writes a [`Workbook`] to disk, sheets in their current order
pub struct ExcelExporter<'a> {
    workbook: &'a Workbook,
}

impl<'a> ExcelExporter<'a> {
    pub fn new(workbook: &'a Workbook) -> Self {
        Self { workbook }
    }

    /// Export every sheet to an .xlsx file, replacing it if present
    pub fn export(&self, output_path: &Path) -> ForgeResult<()> {
        let mut xlsx = XlsxWorkbook::new();

        for sheet in &self.workbook.sheets {
            let worksheet = xlsx.add_worksheet();
            worksheet.set_name(&sheet.name).map_err(|e| {
                ForgeError::Export(format!(
                    "Failed to set worksheet name '{}': {}",
                    sheet.name, e
                ))
            })?;
            self.export_sheet(worksheet, sheet)?;
        }

        // Write beside the target, then rename over it
        let temp_path = output_path.with_extension("xlsx.tmp");
        let saved = xlsx
            .save(&temp_path)
            .map_err(|e| ForgeError::Export(format!("Failed to save Excel file: {}", e)))
            .and_then(|()| {
                std::fs::rename(&temp_path, output_path).map_err(|e| {
                    ForgeError::Export(format!(
                        "Failed to replace {}: {}",
                        output_path.display(),
                        e
                    ))
                })
            });
        if saved.is_err() {
            let _ = std::fs::remove_file(&temp_path);
        }
        saved?;

        debug!(
            path = %output_path.display(),
            sheets = self.workbook.sheets.len(),
            "exported workbook"
        );
        Ok(())
    }

    fn export_sheet(&self, worksheet: &mut Worksheet, sheet: &Sheet) -> ForgeResult<()> {
        for (&(row, col), value) in &sheet.cells {
            Self::write_cell(worksheet, row, col, value).map_err(|e| match e {
                ForgeError::Export(msg) => ForgeError::Export(format!(
                    "{} (sheet '{}', row {}, column {})",
                    msg,
                    sheet.name,
                    row + 1,
                    col + 1
                )),
                other => other,
            })?;
        }

        Ok(())
    }

    /// Write a single cell as a literal or a formula
    fn write_cell(
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: &CellValue,
    ) -> ForgeResult<()> {
        match value {
            CellValue::Number(n) => {
                worksheet
                    .write_number(row, col, *n)
                    .map_err(|e| ForgeError::Export(format!("Failed to write number: {}", e)))?;
            }
            CellValue::Text(s) => {
                worksheet
                    .write_string(row, col, s)
                    .map_err(|e| ForgeError::Export(format!("Failed to write text: {}", e)))?;
            }
            CellValue::Bool(b) => {
                worksheet
                    .write_boolean(row, col, *b)
                    .map_err(|e| ForgeError::Export(format!("Failed to write boolean: {}", e)))?;
            }
            CellValue::Formula(f) => {
                worksheet
                    .write_formula(row, col, Formula::new(f))
                    .map_err(|e| ForgeError::Export(format!("Failed to write formula: {}", e)))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut sheet = Sheet::new("Cash Flow");
        sheet.set(0, 0, CellValue::Text("CASH FLOW STATEMENT".into()));
        sheet.set(1, 1, CellValue::Number(10.0));
        sheet.set(1, 2, CellValue::formula("B2*2"));
        let mut wb = Workbook::new();
        wb.upsert_sheet(sheet);

        ExcelExporter::new(&wb).export(&path).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("out.xlsx.tmp").exists());
    }

    #[test]
    fn test_failed_export_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        std::fs::write(&path, b"previous model").unwrap();

        let mut wb = Workbook::new();
        wb.upsert_sheet(Sheet::new("Bad[Name]"));
        assert!(ExcelExporter::new(&wb).export(&path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"previous model");
    }

    #[test]
    fn test_failed_replace_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.xlsx");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep.txt"), b"x").unwrap();

        let mut wb = Workbook::new();
        wb.upsert_sheet(Sheet::new("Cash Flow"));
        let result = ExcelExporter::new(&wb).export(&target);

        assert!(matches!(result, Err(ForgeError::Export(_))));
        assert!(target.join("keep.txt").exists());
        assert!(!dir.path().join("out.xlsx.tmp").exists());
    }

    #[test]
    fn test_invalid_sheet_name_rejected() {
        let dir = TempDir::new().unwrap();
        let mut wb = Workbook::new();
        wb.upsert_sheet(Sheet::new("Bad[Name]"));

        let result = ExcelExporter::new(&wb).export(&dir.path().join("out.xlsx"));
        assert!(matches!(result, Err(ForgeError::Export(_))));
    }
}
