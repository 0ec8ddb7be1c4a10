use thiserror::Error;

pub type ForgeResult<T> = Result<T, ForgeError>;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Sheet not found: {0}")]
    MissingSheet(String),

    #[error("Unknown row key '{key}' on sheet '{sheet}'")]
    UnknownKey { sheet: String, key: String },

    #[error("Duplicate row key '{key}' on sheet '{sheet}'")]
    DuplicateKey { sheet: String, key: String },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("Layout mismatch on '{sheet}' row {row}: expected '{expected}', found '{found}'")]
    LayoutMismatch {
        sheet: String,
        row: u32,
        expected: String,
        found: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
