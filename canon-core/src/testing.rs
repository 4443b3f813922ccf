//! Testing utilities for governance checks.
//!
//! This module provides tools for integration testing:
//! - `ScriptedExtractor` for deterministic observations without a model
//! - `ScanHarness` for building a rule store and linting text in a few lines
//! - Assertion helpers for verifying reports
//!
//! Harness setup methods panic on rejected input, like assertions do.

use crate::error::Result;
use crate::extract::{CanonObservation, Extractor, Span};
use crate::finding::ScanFinding;
use crate::report::{build_report, Report, Verdict};
use crate::rules::{ChapterRuleScope, FactValue, RuleSet, RuleStore, TermCategory};
use crate::scanner::{ScopeResolution, Scanner};

/// One scripted claim: every occurrence of `needle` asserts `value` for `key`.
#[derive(Debug, Clone)]
pub struct ScriptedClaim {
    pub needle: String,
    pub key: String,
    pub value: FactValue,
}

/// An extractor that proposes exactly the scripted claims.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExtractor {
    claims: Vec<ScriptedClaim>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a claim.
    pub fn claim(
        mut self,
        needle: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<FactValue>,
    ) -> Self {
        self.push(needle, key, value);
        self
    }

    fn push(&mut self, needle: impl Into<String>, key: impl Into<String>, value: impl Into<FactValue>) {
        self.claims.push(ScriptedClaim {
            needle: needle.into(),
            key: key.into(),
            value: value.into(),
        });
    }
}

impl Extractor for ScriptedExtractor {
    fn extract(&self, text: &str, _rules: &RuleSet) -> Vec<CanonObservation> {
        let mut observations = Vec::new();
        for claim in self.claims.iter().filter(|c| !c.needle.is_empty()) {
            for (start, matched) in text.match_indices(claim.needle.as_str()) {
                observations.push(CanonObservation {
                    key: claim.key.clone(),
                    observed: claim.value.clone(),
                    span: Span::new(start, start + matched.len()),
                });
            }
        }
        observations
    }
}

/// Test harness for scripted governance scenarios.
pub struct ScanHarness {
    store: RuleStore,
    extractor: ScriptedExtractor,
    resolution: ScopeResolution,
    last_report: Option<Report>,
}

impl ScanHarness {
    /// A harness over an empty store.
    pub fn new() -> Self {
        Self::with_store(RuleStore::new())
    }

    /// A harness over a store seeded with the era lexicon.
    pub fn with_lexicon() -> Self {
        Self::with_store(RuleStore::with_era_lexicon())
    }

    pub fn with_store(store: RuleStore) -> Self {
        Self {
            store,
            extractor: ScriptedExtractor::new(),
            resolution: ScopeResolution::default(),
            last_report: None,
        }
    }

    /// Declare a canon fact.
    pub fn fact(&mut self, key: &str, value: impl Into<FactValue>, source: &str) -> &mut Self {
        if let Err(err) = self.store.set_fact(key, value, source) {
            panic!("harness could not set fact '{key}': {err}");
        }
        self
    }

    /// Add a prohibited term.
    pub fn term(&mut self, pattern: &str, category: TermCategory) -> &mut Self {
        if let Err(err) = self.store.add_prohibited(pattern, category, Vec::new()) {
            panic!("harness could not add term '{pattern}': {err}");
        }
        self
    }

    /// Declare a chapter scope.
    pub fn scope(&mut self, scope: ChapterRuleScope) -> &mut Self {
        if let Err(err) = self.store.declare_scope(scope) {
            panic!("harness could not declare scope: {err}");
        }
        self
    }

    /// Script a claim the extractor will report.
    pub fn observe(
        &mut self,
        needle: &str,
        key: &str,
        value: impl Into<FactValue>,
    ) -> &mut Self {
        self.extractor.push(needle, key, value);
        self
    }

    /// Scan undeclared chapters only if they have a scope.
    pub fn strict(&mut self) -> &mut Self {
        self.resolution = ScopeResolution::DeclaredOnly;
        self
    }

    fn scanner(&self) -> Scanner {
        Scanner::new(self.store.snapshot()).with_resolution(self.resolution)
    }

    /// Raw findings for a chapter.
    pub fn findings(&self, chapter: &str, text: &str) -> Result<Vec<ScanFinding>> {
        self.scanner().scan_with(chapter, text, &self.extractor)
    }

    /// Lint a chapter and keep the report.
    pub fn lint_chapter(&mut self, chapter: &str, text: &str) -> Result<&Report> {
        let report = build_report(self.findings(chapter, text)?);
        Ok(&*self.last_report.insert(report))
    }

    /// Lint text outside any declared chapter.
    pub fn lint(&mut self, text: &str) -> &Report {
        let report = build_report(self.scanner().scan(text));
        self.last_report.insert(report)
    }

    pub fn last_report(&self) -> Option<&Report> {
        self.last_report.as_ref()
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RuleStore {
        &mut self.store
    }
}

impl Default for ScanHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that a report has no findings.
pub fn assert_clean(report: &Report) {
    assert_eq!(
        report.verdict,
        Verdict::Clean,
        "expected a clean report, got {} finding(s)",
        report.total()
    );
}

/// Assert that some finding matched `text` under `category` (a category label).
pub fn assert_finding(report: &Report, text: &str, category: &str) {
    assert!(
        report
            .iter()
            .any(|f| f.matched_text == text && f.rule.category_label() == category),
        "no [{category}] finding for '{text}'; found: {:?}",
        report
            .iter()
            .map(|f| (f.matched_text.as_str(), f.rule.category_label()))
            .collect::<Vec<_>>()
    );
}

/// Assert that no finding matched `text`.
pub fn assert_no_finding(report: &Report, text: &str) {
    assert!(
        !report.iter().any(|f| f.matched_text == text),
        "unexpected finding for '{text}'"
    );
}

/// Assert the report's verdict.
pub fn assert_verdict(report: &Report, verdict: Verdict) {
    assert_eq!(report.verdict, verdict);
}
