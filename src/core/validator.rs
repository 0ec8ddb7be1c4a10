//! Workbook validation run before every save
//!
//! Checks that every formula reference lands on an existing sheet and a
//! non-empty cell, that the cell dependency graph is acyclic, and that the
//! scenario selector is only ever compared against the literals the model
//! understands.

use crate::config::Scenario;
use crate::excel::address::{cell_name, parse_cell, quote_sheet_name, unquote_sheet_name};
use crate::error::{ForgeError, ForgeResult};
use crate::types::{CellValue, SheetId, Workbook};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Label in column A of the Assumptions sheet; the selector sits in column B
pub const SCENARIO_LABEL: &str = "Scenario Selection:";

/// Literals a selector comparison may use; anything else is the fallback branch
const COMPARED_SCENARIOS: [Scenario; 2] = [Scenario::Base, Scenario::Upside];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    MissingSheet,
    DanglingReference,
    Cycle,
    ScenarioLiteral,
    InvalidScenario,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IssueKind::MissingSheet => "missing sheet",
            IssueKind::DanglingReference => "dangling reference",
            IssueKind::Cycle => "circular reference",
            IssueKind::ScenarioLiteral => "scenario literal",
            IssueKind::InvalidScenario => "invalid scenario",
        })
    }
}

/// One problem found in the workbook
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Cell the problem was found in, e.g. `'Cash Flow'!C14`
    pub location: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.location, self.kind, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub formulas: usize,
    pub references: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Turn a non-clean report into a `Validation` error
    pub fn into_result(self) -> ForgeResult<Self> {
        if self.is_clean() {
            return Ok(self);
        }
        let shown: Vec<String> = self.issues.iter().take(10).map(|i| i.to_string()).collect();
        let more = self.issues.len().saturating_sub(shown.len());
        let mut message = format!("{} issue(s) found:\n  {}", self.issues.len(), shown.join("\n  "));
        if more > 0 {
            message.push_str(&format!("\n  ... and {} more", more));
        }
        Err(ForgeError::Validation(message))
    }
}

/// A reference found in a formula, resolved to zero-based coordinates
#[derive(Debug, Clone, PartialEq)]
struct CellRef {
    sheet: String,
    start: (u32, u16),
    end: (u32, u16),
}

impl CellRef {
    fn contains(&self, row: u32, col: u16) -> bool {
        let (r0, r1) = (self.start.0.min(self.end.0), self.start.0.max(self.end.0));
        let (c0, c1) = (self.start.1.min(self.end.1), self.start.1.max(self.end.1));
        (r0..=r1).contains(&row) && (c0..=c1).contains(&col)
    }

    fn corners(&self) -> Vec<(u32, u16)> {
        if self.start == self.end {
            vec![self.start]
        } else {
            vec![self.start, self.end]
        }
    }
}

/// Optional sheet prefix followed by a single cell
const CELL_PATTERN: &str = r"(?:('(?:[^']|'')+'|[A-Za-z_][A-Za-z0-9_.]*)!)?(\$?[A-Z]{1,3}\$?[0-9]+)";

/// Formula reference scanner
struct ReferenceScanner {
    reference: Regex,
    string: Regex,
    /// Cell compared with whatever follows: `B4 =` at the end of the text
    left_operand: Regex,
    /// Cell compared with whatever precedes: `= B4` at the start of the text
    right_operand: Regex,
}

impl ReferenceScanner {
    fn new() -> ForgeResult<Self> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ForgeError::Validation(format!("Regex error: {}", e)))
        };
        Ok(Self {
            reference: build(&[CELL_PATTERN, r"(?::(\$?[A-Z]{1,3}\$?[0-9]+))?"].concat())?,
            string: build(r#""(?:[^"]|"")*""#)?,
            left_operand: build(&[CELL_PATTERN, r"\s*(?:=|<>)\s*$"].concat())?,
            right_operand: build(&[r"^\s*(?:=|<>)\s*", CELL_PATTERN].concat())?,
        })
    }

    /// Cell references of `formula`, relative ones resolved against `home`
    fn references(&self, formula: &str, home: &str) -> Vec<CellRef> {
        let stripped = self.string.replace_all(formula, "\"\"");
        let mut refs = Vec::new();

        for caps in self.reference.captures_iter(&stripped) {
            let Some(whole) = caps.get(0) else { continue };
            if !standalone(&stripped, whole.start(), whole.end()) {
                continue;
            }
            let Some(start) = cell_ref(&caps, home) else {
                continue;
            };
            let end = caps
                .get(3)
                .and_then(|m| parse_cell(m.as_str()).ok())
                .unwrap_or(start.start);
            refs.push(CellRef { end, ..start });
        }

        refs
    }

    /// Every `cell = "literal"` or `"literal" <> cell` comparison of `formula`
    fn compared_literals(&self, formula: &str, home: &str) -> Vec<(CellRef, String)> {
        let mut pairs = Vec::new();

        for lit in self.string.find_iter(formula) {
            let text = lit.as_str();
            let literal = text[1..text.len() - 1].replace("\"\"", "\"");
            let before = &formula[..lit.start()];
            let after = &formula[lit.end()..];

            let operands = [
                self.left_operand.captures(before),
                self.right_operand.captures(after),
            ];
            for (caps, offset) in operands.iter().zip([0, lit.end()]) {
                let Some(caps) = caps else { continue };
                let Some(cell) = caps.get(2) else { continue };
                let start = caps.get(1).map_or(cell.start(), |m| m.start()) + offset;
                if !standalone(formula, start, cell.end() + offset) {
                    continue;
                }
                if let Some(r) = cell_ref(caps, home) {
                    pairs.push((r, literal.clone()));
                }
            }
        }

        pairs
    }
}

/// Single-cell reference from the sheet (1) and cell (2) groups
fn cell_ref(caps: &Captures, home: &str) -> Option<CellRef> {
    let sheet = caps
        .get(1)
        .map(|m| unquote_sheet_name(m.as_str()))
        .unwrap_or_else(|| home.to_string());
    let start = caps.get(2).and_then(|m| parse_cell(m.as_str()).ok())?;
    Some(CellRef {
        sheet,
        start,
        end: start,
    })
}

/// False when `text[start..end]` is part of a longer identifier, or a
/// function name such as LOG10(
fn standalone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !(before.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        || after.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '('))
}

fn location(sheet: &str, row: u32, col: u16) -> String {
    format!("{}!{}", quote_sheet_name(sheet), cell_name(row, col))
}

/// Zero-based (row, col) of the scenario selector, if the Assumptions sheet
/// has one
pub fn find_selector(workbook: &Workbook) -> Option<(u32, u16)> {
    let sheet = workbook.sheet(SheetId::Assumptions.name()).ok()?;
    sheet.find_row(SCENARIO_LABEL).map(|row| (row, 1))
}

/// Validate every formula of the workbook
pub fn validate_workbook(workbook: &Workbook) -> ForgeResult<ValidationReport> {
    let scanner = ReferenceScanner::new()?;
    let selector = find_selector(workbook);
    let mut report = ValidationReport::default();

    let mut graph: DiGraph<(usize, u32, u16), ()> = DiGraph::new();
    let mut nodes: HashMap<(usize, u32, u16), NodeIndex> = HashMap::new();
    let sheet_index: HashMap<&str, usize> = workbook
        .sheets
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();

    for (si, sheet) in workbook.sheets.iter().enumerate() {
        for (row, col, formula) in sheet.formulas() {
            report.formulas += 1;
            let here = location(&sheet.name, row, col);
            let refs = scanner.references(formula, &sheet.name);
            report.references += refs.len();

            for r in &refs {
                let Some(&ti) = sheet_index.get(r.sheet.as_str()) else {
                    report.issues.push(ValidationIssue {
                        kind: IssueKind::MissingSheet,
                        location: here.clone(),
                        message: format!("references sheet '{}' which does not exist", r.sheet),
                    });
                    continue;
                };
                let target = &workbook.sheets[ti];

                for (tr, tc) in r.corners() {
                    if target.get(tr, tc).is_none() {
                        report.issues.push(ValidationIssue {
                            kind: IssueKind::DanglingReference,
                            location: here.clone(),
                            message: format!("{} is empty", location(&target.name, tr, tc)),
                        });
                    }
                }

                // Edges from every formula cell the reference covers
                let to = node(&mut graph, &mut nodes, (si, row, col));
                for (fr, fc, _) in target.formulas().filter(|(fr, fc, _)| r.contains(*fr, *fc)) {
                    let from = node(&mut graph, &mut nodes, (ti, fr, fc));
                    graph.add_edge(from, to, ());
                }
            }

            let Some((sr, sc)) = selector else { continue };
            for (r, literal) in scanner.compared_literals(formula, &sheet.name) {
                let on_selector = r.sheet == SheetId::Assumptions.name() && r.contains(sr, sc);
                let allowed = COMPARED_SCENARIOS.iter().any(|s| s.as_str() == literal);
                if on_selector && !allowed {
                    report.issues.push(ValidationIssue {
                        kind: IssueKind::ScenarioLiteral,
                        location: here.clone(),
                        message: format!(
                            "scenario selector compared with \"{}\" (expected \"Base\" or \"Upside\")",
                            literal
                        ),
                    });
                }
            }
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        if let Some(&(si, row, col)) = graph.node_weight(cycle.node_id()) {
            report.issues.push(ValidationIssue {
                kind: IssueKind::Cycle,
                location: location(&workbook.sheets[si].name, row, col),
                message: "cell is part of a circular reference".to_string(),
            });
        }
    }

    if let Some((row, col)) = selector {
        check_selector(workbook, row, col, &mut report);
    }

    debug!(
        formulas = report.formulas,
        references = report.references,
        issues = report.issues.len(),
        "validated workbook"
    );
    Ok(report)
}

fn node(
    graph: &mut DiGraph<(usize, u32, u16), ()>,
    nodes: &mut HashMap<(usize, u32, u16), NodeIndex>,
    key: (usize, u32, u16),
) -> NodeIndex {
    *nodes.entry(key).or_insert_with(|| graph.add_node(key))
}

fn check_selector(workbook: &Workbook, row: u32, col: u16, report: &mut ValidationReport) {
    let Ok(sheet) = workbook.sheet(SheetId::Assumptions.name()) else {
        return;
    };
    let valid = match sheet.get(row, col) {
        Some(CellValue::Text(s)) => s.parse::<Scenario>().is_ok(),
        _ => false,
    };
    if !valid {
        let found = sheet
            .get(row, col)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(empty)".to_string());
        report.issues.push(ValidationIssue {
            kind: IssueKind::InvalidScenario,
            location: location(&sheet.name, row, col),
            message: format!("selector holds '{}' (expected Base, Upside or Downside)", found),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sheet;

    fn scanner() -> ReferenceScanner {
        ReferenceScanner::new().unwrap()
    }

    fn assumptions(selector: &str) -> Sheet {
        let mut sheet = Sheet::new("Assumptions & Drivers");
        sheet.set(3, 0, CellValue::Text(SCENARIO_LABEL.into()));
        sheet.set(3, 1, CellValue::Text(selector.into()));
        sheet.set(7, 1, CellValue::Number(0.25));
        sheet
    }

    #[test]
    fn test_reference_extraction() {
        let s = scanner();
        let refs = s.references(
            "='Cash Flow'!C8+$B$4*SUM(D2:D5)+DCF!C30-LOG10(B2)",
            "Income Statement",
        );
        let found: Vec<(&str, (u32, u16), (u32, u16))> = refs
            .iter()
            .map(|r| (r.sheet.as_str(), r.start, r.end))
            .collect();
        assert_eq!(
            found,
            vec![
                ("Cash Flow", (7, 2), (7, 2)),
                ("Income Statement", (3, 1), (3, 1)),
                ("Income Statement", (1, 3), (4, 3)),
                ("DCF", (29, 2), (29, 2)),
                ("Income Statement", (1, 1), (1, 1)),
            ]
        );
    }

    #[test]
    fn test_string_literals_ignored() {
        let s = scanner();
        assert!(s.references("=IF(A1>0,\"B2 is fine\",\"\")", "X").len() == 1);
        let pairs = s.compared_literals(
            "=IF($B$4=\"Base\",1,IF(\"Up\"\"side\" <> X!C2,2,3))&\"B4=\"",
            "Home",
        );
        let found: Vec<(&str, (u32, u16), &str)> = pairs
            .iter()
            .map(|(r, lit)| (r.sheet.as_str(), r.start, lit.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![("Home", (3, 1), "Base"), ("X", (1, 2), "Up\"side")]
        );
    }

    #[test]
    fn test_literal_compared_with_other_cell_ignored() {
        let mut wb = Workbook::new();
        let mut asm = assumptions("Base");
        asm.set(11, 1, CellValue::Text("ALL CHECKS PASS".into()));
        asm.set(
            10,
            1,
            CellValue::formula(
                "IF(AND('Assumptions & Drivers'!$B$4=\"Base\",$B$12=\"ALL CHECKS PASS\"),1,0)",
            ),
        );
        wb.upsert_sheet(asm);

        let report = validate_workbook(&wb).unwrap();
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn test_literal_before_selector_reported() {
        let mut wb = Workbook::new();
        let mut asm = assumptions("Upside");
        asm.set(
            10,
            1,
            CellValue::formula("IF(\"Upsde\"='Assumptions & Drivers'!$B$4,1,0)"),
        );
        wb.upsert_sheet(asm);

        let report = validate_workbook(&wb).unwrap();
        assert_eq!(report.count(IssueKind::ScenarioLiteral), 1);
        assert!(report.issues[0].message.contains("Upsde"));
    }

    #[test]
    fn test_clean_workbook() {
        let mut wb = Workbook::new();
        let mut is = Sheet::new("Income Statement");
        is.set(0, 1, CellValue::Number(100.0));
        is.set(
            1,
            1,
            CellValue::formula(
                "B1*(1-'Assumptions & Drivers'!$B$8)*IF('Assumptions & Drivers'!$B$4=\"Base\",1,2)",
            ),
        );
        wb.upsert_sheet(assumptions("Upside"));
        wb.upsert_sheet(is);

        let report = validate_workbook(&wb).unwrap();
        assert!(report.is_clean(), "{:?}", report.issues);
        assert_eq!(report.formulas, 1);
        assert_eq!(report.references, 3);
    }

    #[test]
    fn test_missing_sheet_and_dangling() {
        let mut wb = Workbook::new();
        let mut is = Sheet::new("Income Statement");
        is.set(0, 0, CellValue::formula("'Debt Schedule'!B19+C9"));
        wb.upsert_sheet(is);

        let report = validate_workbook(&wb).unwrap();
        assert_eq!(report.count(IssueKind::MissingSheet), 1);
        assert_eq!(report.count(IssueKind::DanglingReference), 1);
        assert_eq!(report.issues[1].message, "'Income Statement'!C9 is empty");
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_cycle_detected_through_ranges() {
        let mut wb = Workbook::new();
        let mut cf = Sheet::new("Cash Flow");
        cf.set(0, 0, CellValue::formula("SUM(A2:A3)"));
        cf.set(1, 0, CellValue::Number(1.0));
        cf.set(2, 0, CellValue::formula("A1*2"));
        wb.upsert_sheet(cf);

        let report = validate_workbook(&wb).unwrap();
        assert_eq!(report.count(IssueKind::Cycle), 1);
    }

    #[test]
    fn test_scenario_checks() {
        let mut wb = Workbook::new();
        let mut asm = assumptions("Sideways");
        asm.set(
            10,
            1,
            CellValue::formula("IF($B$4=\"Base\",1,IF($B$4=\"Downside\",2,3))"),
        );
        wb.upsert_sheet(asm);

        let report = validate_workbook(&wb).unwrap();
        assert_eq!(report.count(IssueKind::ScenarioLiteral), 1);
        assert_eq!(report.count(IssueKind::InvalidScenario), 1);
        let literal = report
            .issues
            .iter()
            .find(|i| i.kind == IssueKind::ScenarioLiteral)
            .unwrap();
        assert_eq!(literal.location, "'Assumptions & Drivers'!B11");
    }
}
