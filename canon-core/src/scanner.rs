//! Scanner: checks one piece of text against a rule snapshot.
//!
//! A scan is a pure function of the text, the snapshot, the chapter and the
//! supplied observations. It never edits the text and never touches the
//! store. Identical inputs give identical findings in identical order.

use crate::error::{GovernanceError, Result};
use crate::extract::{CanonObservation, Extractor};
use crate::finding::{Location, RuleReference, ScanFinding, Severity};
use crate::rules::{ChapterRuleScope, RuleSnapshot, TermCategory};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// What to do when a chapter has no declared scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeResolution {
    /// Scan with every category active.
    #[default]
    DefaultWhenUndeclared,
    /// Refuse to scan; the chapter must be declared first.
    DeclaredOnly,
}

/// Build a case-insensitive matcher for a literal phrase.
///
/// Word boundaries are only required on sides where the phrase starts or
/// ends with a word character, so `24/7` and `heads-up` behave. Runs of
/// whitespace inside the phrase match any whitespace, including line breaks.
pub(crate) fn phrase_regex(phrase: &str, allow_prefix: bool) -> std::result::Result<Regex, regex::Error> {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    let body = words.join(r"\s+");
    let starts_word = phrase.trim_start().chars().next().is_some_and(is_word_char);
    let ends_word = phrase.trim_end().chars().last().is_some_and(is_word_char);

    let mut pattern = String::new();
    if starts_word {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&body);
    if allow_prefix {
        pattern.push_str(r"\w*");
    } else if ends_word {
        pattern.push_str(r"\b");
    }
    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: RuleReference,
    category: TermCategory,
    suggestion: Option<String>,
    regex: Regex,
}

/// Scans text against one rule snapshot.
///
/// Term matchers are compiled once, so a scanner can be reused across
/// chapters. Mutations made to the store after the snapshot was taken are
/// not seen.
#[derive(Debug, Clone)]
pub struct Scanner {
    snapshot: RuleSnapshot,
    resolution: ScopeResolution,
    compiled: Vec<CompiledRule>,
}

impl Scanner {
    pub fn new(snapshot: RuleSnapshot) -> Self {
        let compiled = snapshot
            .list_prohibited(None)
            .into_iter()
            .filter_map(|term| match phrase_regex(term.stem(), term.allows_prefix()) {
                Ok(regex) => Some(CompiledRule {
                    rule: RuleReference::Term {
                        category: term.category,
                        pattern: term.pattern.clone(),
                    },
                    category: term.category,
                    suggestion: term.suggestion(),
                    regex,
                }),
                Err(err) => {
                    warn!(pattern = %term.pattern, error = %err, "skipping unmatchable pattern");
                    None
                }
            })
            .collect();

        Self {
            snapshot,
            resolution: ScopeResolution::default(),
            compiled,
        }
    }

    pub fn with_resolution(mut self, resolution: ScopeResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn snapshot(&self) -> &RuleSnapshot {
        &self.snapshot
    }

    /// The scope a chapter is scanned under.
    pub fn resolve_scope(&self, chapter: &str) -> Result<ChapterRuleScope> {
        match (self.snapshot.declared_scope(chapter), self.resolution) {
            (Some(scope), _) => Ok(scope.clone()),
            (None, ScopeResolution::DefaultWhenUndeclared) => {
                Ok(ChapterRuleScope::default_for(chapter.trim()))
            }
            (None, ScopeResolution::DeclaredOnly) => {
                Err(GovernanceError::InvalidScope(chapter.trim().to_string()))
            }
        }
    }

    /// Scan text outside any chapter: every category active, no observations.
    pub fn scan(&self, text: &str) -> Vec<ScanFinding> {
        let scope = ChapterRuleScope::default_for("");
        self.run(text, &scope, &[])
    }

    /// Scan one chapter's text with caller-supplied observations.
    pub fn scan_chapter(
        &self,
        chapter: &str,
        text: &str,
        observations: &[CanonObservation],
    ) -> Result<Vec<ScanFinding>> {
        let scope = self.resolve_scope(chapter)?;
        Ok(self.run(text, &scope, observations))
    }

    /// Scan one chapter, letting an extractor propose the observations.
    pub fn scan_with<E>(&self, chapter: &str, text: &str, extractor: &E) -> Result<Vec<ScanFinding>>
    where
        E: Extractor + ?Sized,
    {
        let scope = self.resolve_scope(chapter)?;
        let observations = extractor.extract(text, &self.snapshot);
        Ok(self.run(text, &scope, &observations))
    }

    fn run(
        &self,
        text: &str,
        scope: &ChapterRuleScope,
        observations: &[CanonObservation],
    ) -> Vec<ScanFinding> {
        let mut findings = Vec::new();
        if text.is_empty() {
            return findings;
        }

        for compiled in self.compiled.iter().filter(|c| scope.is_active(c.category)) {
            let severity = if scope.is_high_risk(compiled.category) {
                Severity::Blocking
            } else {
                compiled.category.default_severity()
            };
            for m in compiled.regex.find_iter(text) {
                findings.push(ScanFinding {
                    location: Location::resolve(text, m.start(), m.end()),
                    matched_text: m.as_str().to_string(),
                    rule: compiled.rule.clone(),
                    severity,
                    suggestion: compiled.suggestion.clone(),
                });
            }
        }

        for phrase in &scope.flagged_phrases {
            let regex = match phrase_regex(phrase, false) {
                Ok(regex) => regex,
                Err(err) => {
                    warn!(%phrase, error = %err, "skipping unmatchable chapter phrase");
                    continue;
                }
            };
            for m in regex.find_iter(text) {
                findings.push(ScanFinding {
                    location: Location::resolve(text, m.start(), m.end()),
                    matched_text: m.as_str().to_string(),
                    rule: RuleReference::ChapterPhrase {
                        chapter: scope.chapter.clone(),
                        pattern: phrase.clone(),
                    },
                    severity: Severity::Blocking,
                    suggestion: Some("Outside this chapter's point of view".to_string()),
                });
            }
        }

        let term_count = findings.len();
        findings.extend(observations.iter().filter_map(|o| self.check_observation(text, o)));

        let mut seen = HashSet::new();
        findings.retain(|f| seen.insert(f.clone()));
        findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        debug!(
            chapter = %scope.chapter,
            terms = term_count,
            canon = findings.len().saturating_sub(term_count),
            total = findings.len(),
            "scan complete"
        );
        findings
    }

    fn check_observation(&self, text: &str, observation: &CanonObservation) -> Option<ScanFinding> {
        let (start, end) = (observation.span.start, observation.span.end);
        let location = Location::resolve(text, start, end);
        let matched_text = text
            .get(start..end)
            .map(str::to_string)
            .unwrap_or_else(|| observation.observed.to_string());

        match self.snapshot.get_fact(&observation.key) {
            Ok(fact) if fact.value.agrees_with(&observation.observed) => None,
            Ok(fact) => Some(ScanFinding {
                location,
                matched_text,
                suggestion: Some(format!(
                    "Canon says '{}' (v{}, from {}); text says '{}'",
                    fact.value, fact.version, fact.source, observation.observed
                )),
                rule: RuleReference::Contradiction {
                    key: fact.key.clone(),
                    expected: fact.value.clone(),
                    observed: observation.observed.clone(),
                    version: fact.version,
                },
                severity: Severity::Blocking,
            }),
            Err(_) => Some(ScanFinding {
                location,
                matched_text,
                suggestion: Some(format!(
                    "'{}' is not declared in canon; declare it or revise the text",
                    observation.key.trim()
                )),
                rule: RuleReference::UndeclaredFact {
                    key: observation.key.trim().to_string(),
                    observed: observation.observed.clone(),
                },
                severity: Severity::Advisory,
            }),
        }
    }
}

/// Scan text against a snapshot with the default scope.
pub fn scan(text: &str, snapshot: &RuleSnapshot) -> Vec<ScanFinding> {
    Scanner::new(snapshot.clone()).scan(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Span;
    use crate::rules::{FactValue, RuleStore};

    fn therapy_store() -> RuleStore {
        let mut store = RuleStore::new();
        store
            .add_prohibited("trauma", TermCategory::TherapySpeak, vec![])
            .unwrap();
        store
    }

    #[test]
    fn test_single_term_match() {
        let store = therapy_store();
        let findings = scan("She carried the trauma quietly.", &store.snapshot());

        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.matched_text, "trauma");
        assert_eq!((f.location.start, f.location.end), (16, 22));
        assert_eq!(f.location.line, 1);
        assert_eq!(f.location.column, 17);
        assert!(matches!(
            &f.rule,
            RuleReference::Term { category: TermCategory::TherapySpeak, pattern } if pattern == "trauma"
        ));
    }

    #[test]
    fn test_word_boundaries() {
        let store = therapy_store();
        assert!(scan("The traumatic night.", &store.snapshot()).is_empty());

        let mut store = RuleStore::new();
        store
            .add_prohibited("trauma*", TermCategory::TherapySpeak, vec![])
            .unwrap();
        let findings = scan("The traumatic night.", &store.snapshot());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].matched_text, "traumatic");
    }

    #[test]
    fn test_case_insensitive_keeps_source_casing() {
        let store = therapy_store();
        let findings = scan("TRAUMA, Trauma and trauma.", &store.snapshot());
        let matched: Vec<&str> = findings.iter().map(|f| f.matched_text.as_str()).collect();
        assert_eq!(matched, vec!["TRAUMA", "Trauma", "trauma"]);
    }

    #[test]
    fn test_non_word_edges_and_line_breaks() {
        let mut store = RuleStore::new();
        store
            .add_prohibited("24/7", TermCategory::ContemporarySlang, vec![])
            .unwrap();
        store
            .add_prohibited("circle back", TermCategory::CorporateJargon, vec![])
            .unwrap();
        let text = "He worked 24/7 and said he'd circle\nback.";
        let findings = scan(text, &store.snapshot());
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[1].matched_text, "circle\nback");
        assert_eq!(findings[1].severity, Severity::Warning);
    }

    #[test]
    fn test_scope_excludes_inactive_category() {
        let mut store = therapy_store();
        store
            .declare_scope(ChapterRuleScope::new("ch01").with_active(TermCategory::Anachronism))
            .unwrap();
        let scanner = Scanner::new(store.snapshot());
        let findings = scanner
            .scan_chapter("ch01", "She carried the trauma quietly.", &[])
            .unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_high_risk_category_blocks() {
        let mut store = therapy_store();
        store
            .declare_scope(ChapterRuleScope::new("ch03").with_high_risk(TermCategory::TherapySpeak))
            .unwrap();
        let findings = Scanner::new(store.snapshot())
            .scan_chapter("ch03", "All that trauma.", &[])
            .unwrap();
        assert_eq!(findings[0].severity, Severity::Blocking);
    }

    #[test]
    fn test_chapter_flagged_phrase() {
        let mut store = RuleStore::new();
        store
            .declare_scope(ChapterRuleScope::new("ch02").with_flagged_phrase("she would later learn"))
            .unwrap();
        let text = "Tommy waited. She would later learn why.";
        let scanner = Scanner::new(store.snapshot());

        let findings = scanner.scan_chapter("ch02", text, &[]).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Blocking);
        assert_eq!(findings[0].rule.category_label(), "pov-scope");

        assert!(scanner.scan_chapter("ch03", text, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_contradiction_and_undeclared() {
        let mut store = RuleStore::new();
        store.set_fact("tommy.instrument", "trombone", "ch1").unwrap();
        let text = "Tommy raised his trumpet.";
        let observations = vec![
            CanonObservation::at_first(text, "trumpet", "tommy.instrument", "trumpet").unwrap(),
            CanonObservation::at_first(text, "Tommy", "tommy.hair", "red").unwrap(),
        ];

        let findings = Scanner::new(store.snapshot())
            .scan_chapter("ch07", text, &observations)
            .unwrap();
        assert_eq!(findings.len(), 2);

        let undeclared = &findings[0];
        assert_eq!(undeclared.severity, Severity::Advisory);
        assert_eq!(undeclared.rule.category_label(), "canon-undeclared");

        let contradiction = &findings[1];
        assert_eq!(contradiction.matched_text, "trumpet");
        assert_eq!(contradiction.severity, Severity::Blocking);
        match &contradiction.rule {
            RuleReference::Contradiction {
                expected, observed, version, ..
            } => {
                assert_eq!(expected, &FactValue::from("trombone"));
                assert_eq!(observed, &FactValue::from("trumpet"));
                assert_eq!(*version, 1);
            }
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn test_agreeing_observation_is_silent() {
        let mut store = RuleStore::new();
        store.set_fact("tommy.age.1954", 17, "bible").unwrap();
        let observations = vec![CanonObservation::new("tommy.age.1954", "17", Span::new(0, 2))];
        let findings = Scanner::new(store.snapshot())
            .scan_chapter("ch01", "17 and restless.", &observations)
            .unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_bad_span_falls_back_to_observed_value() {
        let mut store = RuleStore::new();
        store.set_fact("tommy.instrument", "trombone", "ch1").unwrap();
        let observations = vec![CanonObservation::new(
            "tommy.instrument",
            "trumpet",
            Span::new(500, 507),
        )];
        let findings = Scanner::new(store.snapshot())
            .scan_chapter("ch01", "short", &observations)
            .unwrap();
        assert_eq!(findings[0].matched_text, "trumpet");
    }

    #[test]
    fn test_declared_only_resolution() {
        let store = therapy_store();
        let scanner = Scanner::new(store.snapshot()).with_resolution(ScopeResolution::DeclaredOnly);
        assert!(matches!(
            scanner.scan_chapter("ch09", "trauma", &[]),
            Err(GovernanceError::InvalidScope(_))
        ));
    }

    #[test]
    fn test_empty_text_and_empty_rules() {
        let store = therapy_store();
        assert!(scan("", &store.snapshot()).is_empty());
        assert!(scan("Anything at all.", &RuleStore::new().snapshot()).is_empty());
    }

    #[test]
    fn test_overlapping_patterns_all_kept() {
        let mut store = RuleStore::new();
        store
            .add_prohibited("red flag", TermCategory::TherapySpeak, vec![])
            .unwrap();
        store
            .add_prohibited("flag", TermCategory::Anachronism, vec![])
            .unwrap();
        let findings = scan("That was a red flag.", &store.snapshot());
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].matched_text, "red flag");
        assert_eq!(findings[1].matched_text, "flag");
    }

    #[test]
    fn test_scan_is_idempotent() {
        let store = RuleStore::with_era_lexicon();
        let text = "At the end of the day, his anxiety was basically a red flag.";
        let scanner = Scanner::new(store.snapshot());
        assert_eq!(scanner.scan(text), scanner.scan(text));
        assert!(!scanner.scan(text).is_empty());
    }

    #[test]
    fn test_suggestions_from_alternatives() {
        let store = RuleStore::with_era_lexicon();
        let findings = scan("She felt anxious.", &store.snapshot());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].suggestion.as_deref().unwrap().contains("nervy"));
    }
}
