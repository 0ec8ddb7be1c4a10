//! Model configuration: every seed value written into the workbook
//!
//! Defaults reproduce the reference model (2021-2024 actuals, 2025-2029
//! forecast). A YAML file may override any subset of fields.

use crate::error::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

//==============================================================================
// Scenarios
//==============================================================================

/// Operating scenario selected in the Assumptions sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scenario {
    #[default]
    #[serde(alias = "base")]
    Base,
    #[serde(alias = "upside")]
    Upside,
    #[serde(alias = "downside")]
    Downside,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Base, Scenario::Upside, Scenario::Downside];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Base => "Base",
            Scenario::Upside => "Upside",
            Scenario::Downside => "Downside",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ForgeError::Config(format!(
                    "Unknown scenario '{}' (expected Base, Upside or Downside)",
                    s
                ))
            })
    }
}

/// One driver value per scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioValues {
    pub base: f64,
    pub upside: f64,
    pub downside: f64,
}

impl ScenarioValues {
    pub const fn new(base: f64, upside: f64, downside: f64) -> Self {
        Self {
            base,
            upside,
            downside,
        }
    }
}

//==============================================================================
// Config sections
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeline {
    pub first_year: i32,
    pub historical_years: usize,
    pub forecast_years: usize,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            first_year: 2021,
            historical_years: 4,
            forecast_years: 5,
        }
    }
}

impl Timeline {
    pub fn years(&self) -> Vec<i32> {
        let total = (self.historical_years + self.forecast_years) as i32;
        (self.first_year..self.first_year + total).collect()
    }

    pub fn forecast(&self) -> Vec<i32> {
        self.years().into_iter().skip(self.historical_years).collect()
    }

    pub fn last_year(&self) -> i32 {
        self.first_year + (self.historical_years + self.forecast_years) as i32 - 1
    }

    pub fn first_forecast_year(&self) -> i32 {
        self.first_year + self.historical_years as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalRevenue {
    pub product: Vec<f64>,
    pub service: Vec<f64>,
}

impl Default for HistoricalRevenue {
    fn default() -> Self {
        Self {
            product: vec![100.0, 110.0, 125.0, 140.0],
            service: vec![50.0, 55.0, 62.0, 70.0],
        }
    }
}

/// Forecast drivers that vary by scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioDrivers {
    /// Growth in the first forecast year
    pub product_growth_first: ScenarioValues,
    /// Growth in every later forecast year
    pub product_growth_later: ScenarioValues,
    pub service_growth_first: ScenarioValues,
    pub service_growth_later: ScenarioValues,
    pub gross_margin: ScenarioValues,
    pub sga_pct: ScenarioValues,
    pub rnd_pct: ScenarioValues,
    pub capex_pct: ScenarioValues,
    pub ar_days: ScenarioValues,
    pub inventory_days: ScenarioValues,
    pub ap_days: ScenarioValues,
}

impl Default for ScenarioDrivers {
    fn default() -> Self {
        Self {
            product_growth_first: ScenarioValues::new(0.08, 0.12, 0.05),
            product_growth_later: ScenarioValues::new(0.06, 0.10, 0.03),
            service_growth_first: ScenarioValues::new(0.10, 0.15, 0.07),
            service_growth_later: ScenarioValues::new(0.08, 0.12, 0.05),
            gross_margin: ScenarioValues::new(0.67, 0.70, 0.64),
            sga_pct: ScenarioValues::new(0.24, 0.23, 0.26),
            rnd_pct: ScenarioValues::new(0.12, 0.13, 0.10),
            capex_pct: ScenarioValues::new(0.07, 0.09, 0.06),
            ar_days: ScenarioValues::new(45.0, 42.0, 48.0),
            inventory_days: ScenarioValues::new(60.0, 55.0, 65.0),
            ap_days: ScenarioValues::new(30.0, 35.0, 28.0),
        }
    }
}

/// Rates applied to historical years (and to every year where not scenario-driven)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedAssumptions {
    pub gross_margin: f64,
    pub sga_pct: f64,
    pub rnd_pct: f64,
    pub da_pct: f64,
    pub tax_rate: f64,
    pub ar_days: f64,
    pub inventory_days: f64,
    pub ap_days: f64,
    pub other_ca_pct: f64,
    pub other_cl_pct: f64,
    pub capex_pct: f64,
}

impl Default for FixedAssumptions {
    fn default() -> Self {
        Self {
            gross_margin: 0.65,
            sga_pct: 0.25,
            rnd_pct: 0.12,
            da_pct: 0.05,
            tax_rate: 0.25,
            ar_days: 45.0,
            inventory_days: 60.0,
            ap_days: 30.0,
            other_ca_pct: 0.03,
            other_cl_pct: 0.02,
            capex_pct: 0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebtAssumptions {
    /// Opening term loan (also the opening debt at build level)
    pub term_loan: f64,
    pub term_loan_rate: f64,
    /// Scheduled repayment per year
    pub term_loan_repayment: f64,
    pub revolver_rate: f64,
    pub minimum_cash: f64,
}

impl Default for DebtAssumptions {
    fn default() -> Self {
        Self {
            term_loan: 50.0,
            term_loan_rate: 0.06,
            term_loan_repayment: 0.0,
            revolver_rate: 0.05,
            minimum_cash: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningBalances {
    pub cash: f64,
    pub ppe: f64,
}

impl Default for OpeningBalances {
    fn default() -> Self {
        Self {
            cash: 30.0,
            ppe: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationAssumptions {
    pub shares: f64,
    pub risk_free_rate: f64,
    pub equity_risk_premium: f64,
    pub beta: f64,
    pub target_debt_pct: f64,
    pub terminal_growth: f64,
    pub exit_multiple: f64,
}

impl Default for ValuationAssumptions {
    fn default() -> Self {
        Self {
            shares: 100.0,
            risk_free_rate: 0.045,
            equity_risk_premium: 0.065,
            beta: 1.2,
            target_debt_pct: 0.30,
            terminal_growth: 0.025,
            exit_multiple: 8.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityAxes {
    pub growth_rates: Vec<f64>,
    pub wacc_rates: Vec<f64>,
    pub exit_multiples: Vec<f64>,
}

impl Default for SensitivityAxes {
    fn default() -> Self {
        Self {
            growth_rates: vec![0.015, 0.020, 0.025, 0.030, 0.035],
            wacc_rates: vec![0.08, 0.09, 0.10, 0.11, 0.12],
            exit_multiples: vec![7.0, 7.5, 8.0, 8.5, 9.0, 9.5, 10.0],
        }
    }
}

//==============================================================================
// ModelConfig
//==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub timeline: Timeline,
    /// Initial value of the scenario selector on a fresh build
    pub scenario: Scenario,
    pub revenue: HistoricalRevenue,
    pub scenarios: ScenarioDrivers,
    pub fixed: FixedAssumptions,
    pub debt: DebtAssumptions,
    pub opening: OpeningBalances,
    pub valuation: ValuationAssumptions,
    pub sensitivity: SensitivityAxes,
}

impl ModelConfig {
    /// Load and validate a YAML config file
    pub fn load(path: &Path) -> ForgeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ModelConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional path, falling back to defaults
    pub fn load_or_default(path: Option<&Path>) -> ForgeResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> ForgeResult<()> {
        let t = &self.timeline;
        if t.historical_years == 0 {
            return Err(ForgeError::Config(
                "timeline.historical_years must be at least 1".into(),
            ));
        }
        if t.forecast_years < 2 {
            return Err(ForgeError::Config(
                "timeline.forecast_years must be at least 2".into(),
            ));
        }
        for (name, seeds) in [
            ("revenue.product", &self.revenue.product),
            ("revenue.service", &self.revenue.service),
        ] {
            if seeds.len() != t.historical_years {
                return Err(ForgeError::Config(format!(
                    "{} has {} values but timeline.historical_years is {}",
                    name,
                    seeds.len(),
                    t.historical_years
                )));
            }
        }
        let axes = &self.sensitivity;
        if axes.growth_rates.is_empty()
            || axes.wacc_rates.is_empty()
            || axes.exit_multiples.is_empty()
        {
            return Err(ForgeError::Config(
                "sensitivity axes must not be empty".into(),
            ));
        }
        let min_wacc = axes.wacc_rates.iter().copied().fold(f64::INFINITY, f64::min);
        let max_growth = axes
            .growth_rates
            .iter()
            .copied()
            .fold(self.valuation.terminal_growth, f64::max);
        if max_growth >= min_wacc {
            return Err(ForgeError::Config(format!(
                "terminal growth {} must stay below the lowest sensitivity WACC {}",
                max_growth, min_wacc
            )));
        }
        if self.valuation.shares <= 0.0 {
            return Err(ForgeError::Config("valuation.shares must be positive".into()));
        }
        Ok(())
    }
}
