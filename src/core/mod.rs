//! Model engine: sheet layouts, formula templates, pipeline stages and
//! workbook validation

pub mod layout;
pub mod pipeline;
pub mod template;
pub mod validator;

pub use layout::{ModelLayout, SheetDef};
pub use pipeline::{apply_stage, run_pipeline, run_stage, Stage, StageOutcome};
pub use validator::{validate_workbook, IssueKind, ValidationIssue, ValidationReport};
