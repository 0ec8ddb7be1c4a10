use clap::{Parser, Subcommand};
use statement_forge::cli;
use statement_forge::core::pipeline::DEFAULT_WORKBOOK;
use statement_forge::error::ForgeResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "statement-forge")]
#[command(about = "Generate a linked 3-statement financial model with DCF as an Excel workbook")]
#[command(long_about = "Statement Forge - 3-statement financial model generator

Builds an .xlsx workbook with live formulas in three stages:

STAGES:
  build    - Assumptions, Income Statement, Balance Sheet, Cash Flow, Charts
  enhance  - Scenario table, Debt Schedule, Checks, Summary (drops Charts)
  add-dcf  - DCF valuation with sensitivity tables

Each stage keeps the inputs already in the workbook (scenario selection,
edited assumptions) and refuses to save if any formula reference is broken.

INSPECTION:
  check    - Validate references, cycles and the scenario selector
  sheets   - List sheets in order
  formulas - Dump every formula (diff two runs to compare)

EXAMPLES:
  statement-forge pipeline                       # All three stages
  statement-forge build -s Upside -c model.yaml  # Start from a config
  statement-forge formulas --sheet DCF --json")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new base model (overwrites the file)
    Build {
        /// Workbook to write
        #[arg(short, long, default_value = DEFAULT_WORKBOOK)]
        output: PathBuf,

        /// YAML file overriding the default model inputs
        #[arg(short, long, env = "STATEMENT_FORGE_CONFIG")]
        config: Option<PathBuf>,

        /// Initial scenario (Base, Upside or Downside)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Show each sheet as it is written
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Upgrade a built model in place.

Rewrites Assumptions as a Base/Upside/Downside table, adds the Debt
Schedule, relinks the statements, and adds Checks and Summary. Charts is
removed. Edited inputs and the scenario selection are carried over.

Running enhance on a workbook that already has a DCF keeps the DCF.")]
    /// Add scenarios, debt schedule, checks and summary
    Enhance {
        /// Workbook to upgrade
        #[arg(short, long, default_value = DEFAULT_WORKBOOK)]
        file: PathBuf,

        #[arg(short, long, env = "STATEMENT_FORGE_CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Add the DCF valuation sheet
    AddDcf {
        /// Workbook to upgrade (must be enhanced)
        #[arg(short, long, default_value = DEFAULT_WORKBOOK)]
        file: PathBuf,

        #[arg(short, long, env = "STATEMENT_FORGE_CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Run build, enhance and add-dcf in sequence
    Pipeline {
        #[arg(short, long, default_value = DEFAULT_WORKBOOK)]
        output: PathBuf,

        #[arg(short, long, env = "STATEMENT_FORGE_CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long)]
        scenario: Option<String>,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workbook without modifying it
    Check {
        #[arg(default_value = DEFAULT_WORKBOOK)]
        file: PathBuf,
    },

    /// List sheet names in order
    Sheets {
        #[arg(default_value = DEFAULT_WORKBOOK)]
        file: PathBuf,
    },

    /// Print every formula as Sheet!Cell<TAB>formula
    Formulas {
        #[arg(default_value = DEFAULT_WORKBOOK)]
        file: PathBuf,

        /// Only this sheet
        #[arg(long)]
        sheet: Option<String>,

        /// Print JSON instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Build { verbose, .. }
            | Commands::Enhance { verbose, .. }
            | Commands::AddDcf { verbose, .. }
            | Commands::Pipeline { verbose, .. } => *verbose,
            _ => false,
        }
    }
}

fn main() -> ForgeResult<()> {
    let cli = Cli::parse();

    let default_filter = if cli.command.verbose() {
        "statement_forge=debug"
    } else {
        "statement_forge=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            output,
            config,
            scenario,
            verbose,
        } => cli::build(output, config, scenario, verbose),

        Commands::Enhance {
            file,
            config,
            verbose,
        } => cli::enhance(file, config, verbose),

        Commands::AddDcf {
            file,
            config,
            verbose,
        } => cli::add_dcf(file, config, verbose),

        Commands::Pipeline {
            output,
            config,
            scenario,
            verbose,
        } => cli::pipeline(output, config, scenario, verbose),

        Commands::Check { file } => cli::check(file),

        Commands::Sheets { file } => cli::sheets(file),

        Commands::Formulas { file, sheet, json } => cli::formulas(file, sheet, json),
    }
}
