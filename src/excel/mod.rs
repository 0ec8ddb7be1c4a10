//! Excel file I/O
//!
//! - Export: Workbook → .xlsx with live formulas (rust_xlsxwriter)
//! - Import: .xlsx → Workbook, formulas preferred over cached values (calamine)

pub mod address;
mod exporter;
mod importer;

pub use exporter::ExcelExporter;
pub use importer::ExcelImporter;
