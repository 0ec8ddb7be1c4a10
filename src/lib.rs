//! Statement Forge - 3-statement financial model generator
//!
//! Builds an Excel workbook holding a linked Income Statement, Balance Sheet
//! and Cash Flow, then upgrades it in place with a scenario table, debt
//! schedule, integrity checks and a DCF valuation. Every cell the model
//! computes is a live Excel formula.
//!
//! # Features
//!
//! - Sheets declared as ordered lines; formulas name rows by key, never by number
//! - Three stages (build, enhance, add-dcf) that carry user inputs forward
//! - Reference, cycle and scenario validation before every save
//! - YAML configuration of every seed value
//!
//! # Example
//!
//! ```no_run
//! use statement_forge::config::ModelConfig;
//! use statement_forge::core::pipeline::run_pipeline;
//! use std::path::Path;
//!
//! let cfg = ModelConfig::default();
//! let outcomes = run_pipeline(Path::new("model.xlsx"), &cfg)?;
//!
//! for outcome in &outcomes {
//!     println!("{}: {}", outcome.stage, outcome.sheets.join(", "));
//! }
//! # Ok::<(), statement_forge::error::ForgeError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod model;
pub mod types;

// Re-export commonly used types
pub use config::{ModelConfig, Scenario};
pub use error::{ForgeError, ForgeResult};
pub use types::{CellValue, Sheet, SheetId, Workbook};
