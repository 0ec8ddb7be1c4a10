use crate::config::{ModelConfig, Scenario};
use crate::core::pipeline::{run_pipeline, run_stage, Stage, StageOutcome};
use crate::core::validator::validate_workbook;
use crate::error::{ForgeError, ForgeResult};
use crate::excel::address::{cell_name, quote_sheet_name};
use crate::excel::ExcelImporter;
use crate::types::Workbook;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One formula cell, as printed by `formulas`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaEntry {
    pub sheet: String,
    pub cell: String,
    pub formula: String,
}

/// Every formula of the workbook in sheet, row, column order
pub fn collect_formulas(workbook: &Workbook, only: Option<&str>) -> Vec<FormulaEntry> {
    workbook
        .sheets
        .iter()
        .filter(|s| only.map_or(true, |name| s.name == name))
        .flat_map(|sheet| {
            sheet.formulas().map(move |(row, col, formula)| FormulaEntry {
                sheet: sheet.name.clone(),
                cell: cell_name(row, col),
                formula: formula.to_string(),
            })
        })
        .collect()
}

/// Load the config file (if any) and apply a scenario override
fn load_config(config: Option<&Path>, scenario: Option<&str>) -> ForgeResult<ModelConfig> {
    let mut cfg = ModelConfig::load_or_default(config)?;
    if let Some(name) = scenario {
        cfg.scenario = name.parse::<Scenario>()?;
    }
    Ok(cfg)
}

fn print_outcome(outcome: &StageOutcome, verbose: bool) {
    if verbose {
        for name in &outcome.verified {
            println!("   {} {}", "✓ verified".cyan(), name);
        }
        for name in &outcome.written {
            println!("   {} {}", "✎ wrote".cyan(), name);
        }
        for name in &outcome.removed {
            println!("   {} {}", "✗ removed".yellow(), name);
        }
    }
    println!(
        "   {} stage complete ({} level, {} formulas, {} references checked)",
        outcome.stage.to_string().bold(),
        outcome.level,
        outcome.report.formulas,
        outcome.report.references
    );
    println!("   Sheets: {}", outcome.sheets.join(", "));
}

fn stage(stage: Stage, file: &Path, cfg: &ModelConfig, verbose: bool) -> ForgeResult<()> {
    println!("{}", format!("🔥 Statement Forge - {}", stage).bold().green());
    println!("   File: {}\n", file.display());

    let outcome = run_stage(stage, file, cfg)?;
    print_outcome(&outcome, verbose);

    println!("\n{}", "✅ Workbook saved".bold().green());
    Ok(())
}

/// Execute the build command
pub fn build(
    output: PathBuf,
    config: Option<PathBuf>,
    scenario: Option<String>,
    verbose: bool,
) -> ForgeResult<()> {
    let cfg = load_config(config.as_deref(), scenario.as_deref())?;
    if verbose {
        println!("{}", format!("📖 Scenario: {}", cfg.scenario).cyan());
    }
    stage(Stage::Build, &output, &cfg, verbose)
}

/// Execute the enhance command
pub fn enhance(file: PathBuf, config: Option<PathBuf>, verbose: bool) -> ForgeResult<()> {
    let cfg = load_config(config.as_deref(), None)?;
    stage(Stage::Enhance, &file, &cfg, verbose)
}

/// Execute the add-dcf command
pub fn add_dcf(file: PathBuf, config: Option<PathBuf>, verbose: bool) -> ForgeResult<()> {
    let cfg = load_config(config.as_deref(), None)?;
    stage(Stage::AddDcf, &file, &cfg, verbose)
}

/// Execute all stages in sequence
pub fn pipeline(
    output: PathBuf,
    config: Option<PathBuf>,
    scenario: Option<String>,
    verbose: bool,
) -> ForgeResult<()> {
    let cfg = load_config(config.as_deref(), scenario.as_deref())?;
    println!("{}", "🔥 Statement Forge - Pipeline".bold().green());
    println!("   File: {}\n", output.display());

    let outcomes = run_pipeline(&output, &cfg)?;
    for outcome in &outcomes {
        print_outcome(outcome, verbose);
    }

    println!("\n{}", "✅ 3-statement model with DCF complete".bold().green());
    Ok(())
}

/// Validate a workbook without modifying it
pub fn check(file: PathBuf) -> ForgeResult<()> {
    println!("{}", "✅ Checking workbook".bold().green());
    println!("   File: {}\n", file.display());

    let workbook = ExcelImporter::new(&file).import()?;
    let report = validate_workbook(&workbook)?;

    println!(
        "   {} sheets, {} formulas, {} references",
        workbook.sheets.len(),
        report.formulas,
        report.references
    );

    if report.is_clean() {
        println!("\n{}", "✅ No issues found".bold().green());
        return Ok(());
    }

    println!(
        "\n{}",
        format!("❌ Found {} issue(s)", report.issues.len()).bold().red()
    );
    for issue in &report.issues {
        println!(
            "   {} [{}] {}",
            issue.location.bright_blue().bold(),
            issue.kind.to_string().yellow(),
            issue.message
        );
    }

    Err(ForgeError::Validation(format!(
        "{} issue(s) found in {}",
        report.issues.len(),
        file.display()
    )))
}

/// List sheet names in workbook order
pub fn sheets(file: PathBuf) -> ForgeResult<()> {
    let workbook = ExcelImporter::new(&file).import()?;
    for name in workbook.sheet_names() {
        println!("{}", name);
    }
    Ok(())
}

/// Dump formulas as `Sheet!A1<TAB>formula` lines, or JSON
pub fn formulas(file: PathBuf, sheet: Option<String>, json: bool) -> ForgeResult<()> {
    let workbook = ExcelImporter::new(&file).import()?;
    if let Some(name) = &sheet {
        workbook.sheet(name)?;
    }

    let entries = collect_formulas(&workbook, sheet.as_deref());
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!(
                "{}!{}\t{}",
                quote_sheet_name(&entry.sheet),
                entry.cell,
                entry.formula
            );
        }
    }
    Ok(())
}
