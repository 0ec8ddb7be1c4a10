//! Pipeline stages: build, enhance and add-dcf
//!
//! A stage renders the sheets it owns, checks the sheets it leaves alone
//! against the current layout, validates the result and only then saves.
//! Nothing is written when any step fails.

use super::layout::{render_sheet, ModelLayout};
use super::validator::{validate_workbook, ValidationReport};
use crate::config::ModelConfig;
use crate::error::{ForgeError, ForgeResult};
use crate::excel::{ExcelExporter, ExcelImporter};
use crate::model::{definitions, Level};
use crate::types::{SheetId, Workbook};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Default workbook file name
pub const DEFAULT_WORKBOOK: &str = "3_Statement_Financial_Model.xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Build,
    Enhance,
    AddDcf,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Build, Stage::Enhance, Stage::AddDcf];

    /// Level this stage brings a workbook to
    pub fn level(&self) -> Level {
        match self {
            Stage::Build => Level::Build,
            Stage::Enhance => Level::Enhance,
            Stage::AddDcf => Level::Valuation,
        }
    }

    /// Level the input workbook must already have
    pub fn requires(&self) -> Option<Level> {
        match self {
            Stage::Build => None,
            Stage::Enhance => Some(Level::Build),
            Stage::AddDcf => Some(Level::Enhance),
        }
    }

    /// Sheets this stage (re)writes
    pub fn sheets(&self) -> &'static [SheetId] {
        match self {
            Stage::Build => &[
                SheetId::Assumptions,
                SheetId::IncomeStatement,
                SheetId::BalanceSheet,
                SheetId::CashFlow,
                SheetId::Charts,
            ],
            Stage::Enhance => &[
                SheetId::Assumptions,
                SheetId::Summary,
                SheetId::IncomeStatement,
                SheetId::BalanceSheet,
                SheetId::DebtSchedule,
                SheetId::CashFlow,
                SheetId::Checks,
            ],
            Stage::AddDcf => &[
                SheetId::Assumptions,
                SheetId::Summary,
                SheetId::Dcf,
                SheetId::Checks,
            ],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Build => "build",
            Stage::Enhance => "enhance",
            Stage::AddDcf => "add-dcf",
        })
    }
}

/// What a stage did to the workbook
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub level: Level,
    pub written: Vec<String>,
    pub verified: Vec<String>,
    pub removed: Vec<String>,
    pub sheets: Vec<String>,
    pub report: ValidationReport,
}

/// Apply a stage to an in-memory workbook
///
/// `Build` ignores `existing` and starts from scratch. The other stages need
/// a workbook that has reached [`Stage::requires`].
pub fn apply_stage(
    existing: Option<Workbook>,
    stage: Stage,
    cfg: &ModelConfig,
) -> ForgeResult<(Workbook, StageOutcome)> {
    let (mut workbook, level) = match (stage.requires(), existing) {
        (None, _) => (Workbook::new(), stage.level()),
        (Some(required), Some(workbook)) => {
            let detected = Level::detect(&workbook);
            match detected {
                Some(found) if found >= required => {
                    let level = stage.level().max(found);
                    (workbook, level)
                }
                _ => {
                    return Err(ForgeError::Validation(format!(
                        "'{}' needs a workbook at {} level or later (found {}); run the earlier stage first",
                        stage,
                        required,
                        detected.map_or("no model".to_string(), |l| l.to_string())
                    )))
                }
            }
        }
        (Some(required), None) => {
            return Err(ForgeError::Validation(format!(
                "'{}' needs an existing workbook at {} level",
                stage, required
            )))
        }
    };
    info!(%stage, %level, "applying stage");

    let defs = definitions(level, cfg);
    let layout = ModelLayout::from_defs(&defs)?;

    let mut verified = Vec::new();
    for def in defs.iter().filter(|d| !stage.sheets().contains(&d.id)) {
        let sheet = workbook.sheet(def.id.name())?;
        layout.sheet(def.id)?.verify(sheet)?;
        verified.push(def.id.name().to_string());
    }

    let mut written = Vec::new();
    for def in defs.iter().filter(|d| stage.sheets().contains(&d.id)) {
        let sheet = render_sheet(def, &layout, workbook.sheet(def.id.name()).ok())?;
        workbook.upsert_sheet(sheet);
        written.push(def.id.name().to_string());
    }

    // Model sheets that belong to an earlier level only
    let obsolete: Vec<String> = workbook
        .sheet_names()
        .into_iter()
        .filter(|name| SheetId::from_name(name).is_some_and(|id| !level.sheets().contains(&id)))
        .map(str::to_string)
        .collect();
    for name in &obsolete {
        workbook.remove_sheet(name);
        debug!(sheet = name.as_str(), "removed obsolete sheet");
    }

    let order: Vec<&str> = level.sheets().iter().map(|id| id.name()).collect();
    workbook.order_by(&order);

    let report = validate_workbook(&workbook)?.into_result()?;
    let sheets = workbook.sheet_names().iter().map(|s| s.to_string()).collect();

    Ok((
        workbook,
        StageOutcome {
            stage,
            level,
            written,
            verified,
            removed: obsolete,
            sheets,
            report,
        },
    ))
}

/// Run a stage against a workbook file, saving it in place
pub fn run_stage(stage: Stage, path: &Path, cfg: &ModelConfig) -> ForgeResult<StageOutcome> {
    let existing = match stage {
        Stage::Build => None,
        _ => {
            if !path.exists() {
                return Err(ForgeError::Validation(format!(
                    "'{}' not found; run build first",
                    path.display()
                )));
            }
            Some(ExcelImporter::new(path).import()?)
        }
    };

    let (workbook, outcome) = apply_stage(existing, stage, cfg)?;
    ExcelExporter::new(&workbook).export(path)?;
    info!(%stage, path = %path.display(), "saved workbook");
    Ok(outcome)
}

/// Run every stage in order against one file
pub fn run_pipeline(path: &Path, cfg: &ModelConfig) -> ForgeResult<Vec<StageOutcome>> {
    Stage::ALL
        .iter()
        .map(|stage| run_stage(*stage, path, cfg))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use pretty_assertions::assert_eq;

    fn staged(stages: &[Stage]) -> Workbook {
        let cfg = ModelConfig::default();
        let mut workbook = None;
        for stage in stages {
            let (wb, _) = apply_stage(workbook, *stage, &cfg).unwrap();
            workbook = Some(wb);
        }
        workbook.unwrap()
    }

    #[test]
    fn test_stages_in_order() {
        let build = staged(&[Stage::Build]);
        assert_eq!(
            build.sheet_names(),
            vec![
                "Assumptions & Drivers",
                "Income Statement",
                "Balance Sheet",
                "Cash Flow",
                "Charts"
            ]
        );

        let full = staged(&Stage::ALL);
        assert_eq!(
            full.sheet_names(),
            vec![
                "Assumptions & Drivers",
                "Summary",
                "Income Statement",
                "Balance Sheet",
                "Debt Schedule",
                "Cash Flow",
                "DCF",
                "Checks"
            ]
        );
    }

    #[test]
    fn test_enhance_requires_build() {
        let cfg = ModelConfig::default();
        assert!(matches!(
            apply_stage(None, Stage::Enhance, &cfg),
            Err(ForgeError::Validation(_))
        ));
        let build = staged(&[Stage::Build]);
        assert!(matches!(
            apply_stage(Some(build), Stage::AddDcf, &cfg),
            Err(ForgeError::Validation(_))
        ));
    }

    #[test]
    fn test_rerunning_enhance_keeps_valuation_content() {
        let cfg = ModelConfig::default();
        let full = staged(&Stage::ALL);
        let (again, outcome) = apply_stage(Some(full.clone()), Stage::Enhance, &cfg).unwrap();
        assert_eq!(outcome.level, Level::Valuation);
        assert_eq!(outcome.verified, vec!["DCF".to_string()]);
        assert_eq!(again, full);
    }

    #[test]
    fn test_user_inputs_survive_upgrade() {
        let cfg = ModelConfig::default();
        let mut build = staged(&[Stage::Build]);
        let asm = build.sheet_mut("Assumptions & Drivers").unwrap();
        asm.set(3, 1, CellValue::Text("Upside".into()));
        let row = asm.find_row("Tax Rate").unwrap();
        asm.set(row, 1, CellValue::Number(0.21));

        let (enhanced, _) = apply_stage(Some(build), Stage::Enhance, &cfg).unwrap();
        let asm = enhanced.sheet("Assumptions & Drivers").unwrap();
        assert_eq!(asm.get(3, 1), Some(&CellValue::Text("Upside".into())));
        let row = asm.find_row("Tax Rate").unwrap();
        assert_eq!(asm.get(row, 1), Some(&CellValue::Number(0.21)));
    }

    #[test]
    fn test_layout_drift_blocks_stage() {
        let cfg = ModelConfig::default();
        let mut enhanced = staged(&[Stage::Build, Stage::Enhance]);
        let is = enhanced.sheet_mut("Income Statement").unwrap();
        is.set(15, 0, CellValue::Text("Operating Income".into()));

        assert!(matches!(
            apply_stage(Some(enhanced), Stage::AddDcf, &cfg),
            Err(ForgeError::LayoutMismatch { row: 16, .. })
        ));
    }

    #[test]
    fn test_invalid_selector_blocks_save() {
        let cfg = ModelConfig::default();
        let mut build = staged(&[Stage::Build]);
        build
            .sheet_mut("Assumptions & Drivers")
            .unwrap()
            .set(3, 1, CellValue::Text("Sideways".into()));
        assert!(matches!(
            apply_stage(Some(build), Stage::Enhance, &cfg),
            Err(ForgeError::Validation(msg)) if msg.contains("invalid scenario")
        ));
    }
}
