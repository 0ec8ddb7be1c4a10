//! CLI command handlers

pub mod commands;

pub use commands::{
    add_dcf, build, check, collect_formulas, enhance, formulas, pipeline, sheets, FormulaEntry,
};
