//! Scan findings: one reported issue each.
//!
//! Findings are ephemeral. They are recomputed on every scan and never stored
//! as authoritative state.

use crate::rules::{FactValue, TermCategory};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How urgently a finding needs attention.
///
/// Ordered so that `Blocking` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Must be fixed before export.
    Blocking,
    /// Should be reviewed.
    Warning,
    /// Optional suggestion.
    Advisory,
}

impl Severity {
    /// All severities, most urgent first.
    pub const ALL: [Severity; 3] = [Severity::Blocking, Severity::Warning, Severity::Advisory];

    /// Lowercase tag used in reports.
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Blocking => "blocking",
            Severity::Warning => "warning",
            Severity::Advisory => "advisory",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Where a finding sits in the scanned text.
///
/// `start`/`end` are byte offsets; `line` and `column` are 1-based, with the
/// column counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Resolve a byte span of `text` into a location.
    ///
    /// Offsets past the end of the text or inside a character are clamped
    /// to the nearest preceding boundary for the line/column computation.
    pub fn resolve(text: &str, start: usize, end: usize) -> Self {
        let mut boundary = start.min(text.len());
        while !text.is_char_boundary(boundary) {
            boundary -= 1;
        }
        let before = &text[..boundary];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;

        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// Which rule triggered a finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleReference {
    /// A prohibited term from the rule set.
    Term {
        category: TermCategory,
        pattern: String,
    },
    /// A phrase flagged for one chapter only.
    ChapterPhrase { chapter: String, pattern: String },
    /// Text asserts a value that differs from the current canon value.
    Contradiction {
        key: String,
        expected: FactValue,
        observed: FactValue,
        version: u32,
    },
    /// Text asserts a value for a key nobody has declared.
    UndeclaredFact { key: String, observed: FactValue },
}

impl RuleReference {
    /// Category label used for per-category counts.
    pub fn category_label(&self) -> &'static str {
        match self {
            RuleReference::Term { category, .. } => category.tag(),
            RuleReference::ChapterPhrase { .. } => TermCategory::PovScope.tag(),
            RuleReference::Contradiction { .. } => "canon-contradiction",
            RuleReference::UndeclaredFact { .. } => "canon-undeclared",
        }
    }

    /// Pattern or key that identifies the rule, for ordering and de-duplication.
    pub fn identifier(&self) -> &str {
        match self {
            RuleReference::Term { pattern, .. } | RuleReference::ChapterPhrase { pattern, .. } => {
                pattern
            }
            RuleReference::Contradiction { key, .. } | RuleReference::UndeclaredFact { key, .. } => {
                key
            }
        }
    }
}

/// One detected issue from a scan, not yet acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanFinding {
    pub location: Location,
    /// The exact substring found.
    pub matched_text: String,
    pub rule: RuleReference,
    pub severity: Severity,
    pub suggestion: Option<String>,
}

impl ScanFinding {
    /// Key used to order findings by position, then urgency, then rule.
    pub(crate) fn sort_key(&self) -> (usize, usize, Severity, &'static str, &str) {
        (
            self.location.start,
            self.location.end,
            self.severity,
            self.rule.category_label(),
            self.rule.identifier(),
        )
    }
}
