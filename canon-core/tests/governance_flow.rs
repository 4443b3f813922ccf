//! End-to-end governance scenarios: declare canon, lint chapters, review.

use canon_core::testing::{assert_clean, assert_finding, assert_no_finding, assert_verdict};
use canon_core::{
    build_report, render_text, AgeExtractor, CanonObservation, ChapterRuleScope, ChapterState,
    FactValue, GovernanceError, RuleReference, RuleStore, ScanHarness, Scanner, ScopeResolution,
    SharedRuleStore, TermCategory, Verdict,
};

// =============================================================================
// Core scenarios
// =============================================================================

#[test]
fn test_single_prohibited_term() {
    let mut store = RuleStore::new();
    store
        .add_prohibited_tagged("trauma", "therapy-speak", vec![])
        .unwrap();

    let findings = Scanner::new(store.snapshot()).scan("She felt the trauma of it.");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].matched_text, "trauma");
    assert_eq!(findings[0].rule.category_label(), "therapy-speak");
}

#[test]
fn test_instrument_contradiction() {
    let mut store = RuleStore::new();
    assert_eq!(store.set_fact("tommy.instrument", "trombone", "ch1").unwrap(), 1);

    let text = "Tommy wiped the valves of his trumpet.";
    let observation =
        CanonObservation::at_first(text, "trumpet", "tommy.instrument", "trumpet").unwrap();
    let findings = Scanner::new(store.snapshot())
        .scan_chapter("ch07", text, &[observation])
        .unwrap();

    assert_eq!(findings.len(), 1);
    match &findings[0].rule {
        RuleReference::Contradiction {
            key,
            expected,
            observed,
            ..
        } => {
            assert_eq!(key, "tommy.instrument");
            assert_eq!(expected, &FactValue::from("trombone"));
            assert_eq!(observed, &FactValue::from("trumpet"));
        }
        other => panic!("expected a contradiction, got {other:?}"),
    }
    let suggestion = findings[0].suggestion.as_deref().unwrap();
    assert!(suggestion.contains("trombone") && suggestion.contains("trumpet"));
}

#[test]
fn test_unchanged_fact_is_not_logged() {
    let mut store = RuleStore::new();
    store.set_fact("tommy.instrument", "trombone", "ch1").unwrap();
    let logged = store.audit_log().len();

    assert_eq!(store.set_fact("tommy.instrument", "trombone", "ch1").unwrap(), 1);
    assert_eq!(store.audit_log().len(), logged);
}

#[test]
fn test_duplicate_pattern_rejected() {
    let mut store = RuleStore::new();
    store
        .add_prohibited_tagged("trauma", "therapy-speak", vec![])
        .unwrap();
    let err = store
        .add_prohibited_tagged("Trauma ", "therapy-speak", vec![])
        .unwrap_err();
    assert!(matches!(err, GovernanceError::DuplicatePattern { .. }));
    assert_eq!(store.list_prohibited(None).len(), 1);
}

#[test]
fn test_empty_text_is_not_an_error() {
    let store = RuleStore::with_era_lexicon();
    let findings = Scanner::new(store.snapshot())
        .scan_chapter("ch01", "", &[])
        .unwrap();
    assert!(findings.is_empty());
}

// =============================================================================
// Chapters and scopes
// =============================================================================

#[test]
fn test_chapter_scopes_change_what_is_reported() {
    let mut harness = ScanHarness::with_lexicon();
    harness
        .scope(ChapterRuleScope::new("ch01").with_active(TermCategory::Anachronism))
        .scope(
            ChapterRuleScope::new("ch02")
                .with_high_risk(TermCategory::TherapySpeak)
                .with_flagged_phrase("little did he know"),
        );

    let text = "Little did he know the computer would cause him such anxiety.";

    let ch01 = harness.lint_chapter("ch01", text).unwrap().clone();
    assert_finding(&ch01, "computer", "anachronism");
    assert_no_finding(&ch01, "anxiety");

    let ch02 = harness.lint_chapter("ch02", text).unwrap().clone();
    assert_finding(&ch02, "Little did he know", "pov-scope");
    assert_finding(&ch02, "anxiety", "therapy-speak");
    assert_no_finding(&ch02, "computer");
    assert!(ch02.is_blocking());
    assert_eq!(ch02.blocking.len(), 2);
}

#[test]
fn test_strict_scopes_require_declaration() {
    let mut harness = ScanHarness::new();
    harness.term("leverage", TermCategory::CorporateJargon).strict();

    let err = harness.lint_chapter("ch12", "leverage").unwrap_err();
    assert_eq!(err, GovernanceError::InvalidScope("ch12".to_string()));

    let scanner = Scanner::new(harness.store().snapshot())
        .with_resolution(ScopeResolution::DefaultWhenUndeclared);
    assert_eq!(scanner.scan_chapter("ch12", "leverage", &[]).unwrap().len(), 1);
}

#[test]
fn test_locked_chapter_workflow() {
    let mut store = RuleStore::new().with_actor("editor");
    store
        .set_chapter_state("ch04", ChapterState::Revised, None)
        .unwrap();
    store
        .set_chapter_state("ch04", ChapterState::CanonLocked, Some("Canon review done"))
        .unwrap();

    assert!(matches!(
        store.set_chapter_state("ch04", ChapterState::Published, None),
        Err(GovernanceError::ChapterLocked { .. })
    ));
    assert!(store.unlock_chapter("ch04", "typo").is_err());

    let lock = store
        .unlock_chapter("ch04", "Circus name changed in the bible")
        .unwrap();
    assert_eq!(lock.state, ChapterState::Revised);
    assert_eq!(lock.revision_count, 2);
    store
        .set_chapter_state("ch04", ChapterState::Published, None)
        .unwrap();
    assert!(!store.is_editable("ch04"));
    assert_eq!(store.audit_log().len(), 4);
}

// =============================================================================
// Canon history and extraction
// =============================================================================

#[test]
fn test_conflicting_declarations_are_exposed() {
    let mut store = RuleStore::new();
    store
        .set_fact("circus.name", "Wallace Brothers", "character bible")
        .unwrap();
    store
        .set_fact("circus.name", "Clyde Beatty-Cole Bros.", "timeline")
        .unwrap();

    let history = store.fact_history("circus.name").unwrap();
    let sources: Vec<&str> = history.iter().map(|v| v.source).collect();
    assert_eq!(sources, vec!["character bible", "timeline"]);
    assert_eq!(store.contested_facts().len(), 1);
    assert_eq!(store.audit_for("circus.name").count(), 2);
}

#[test]
fn test_age_extraction_proposes_contradiction() {
    let mut store = RuleStore::new();
    store.set_fact("tommy.age.1954", 17, "character bible").unwrap();

    let text = "That summer Tommy was 19 years old and restless.";
    let scanner = Scanner::new(store.snapshot());
    let findings = scanner
        .scan_with("ch03", text, &AgeExtractor::new().with_story_year(1954))
        .unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].matched_text, "19 years old");
    assert_eq!(findings[0].rule.category_label(), "canon-contradiction");

    let agreeing = "That summer Tommy was 17 years old and restless.";
    assert!(scanner
        .scan_with("ch03", agreeing, &AgeExtractor::new().with_story_year(1954))
        .unwrap()
        .is_empty());
}

#[test]
fn test_undeclared_observation_is_advisory() {
    let mut harness = ScanHarness::new();
    harness.observe("red hair", "tommy.hair", "red");
    let report = harness.lint_chapter("ch01", "Tommy ran a hand through his red hair.").unwrap();

    assert_finding(report, "red hair", "canon-undeclared");
    assert_verdict(report, Verdict::Minor);
    assert!(!report.is_blocking());
}

// =============================================================================
// Sessions
// =============================================================================

#[test]
fn test_shared_store_scans_see_whole_rule_sets() {
    let shared = SharedRuleStore::new(RuleStore::new());
    shared
        .write(|s| s.add_prohibited("synergy", TermCategory::CorporateJargon, vec![]))
        .unwrap();

    let scanner = Scanner::new(shared.snapshot());
    shared
        .write(|s| s.add_prohibited("leverage", TermCategory::CorporateJargon, vec![]))
        .unwrap();

    let text = "Synergy, leverage.";
    assert_eq!(scanner.scan(text).len(), 1);
    assert_eq!(Scanner::new(shared.snapshot()).scan(text).len(), 2);
}

#[test]
fn test_clean_chapter_report() {
    let mut harness = ScanHarness::with_lexicon();
    let report = harness.lint("The band played on while the tent sagged in the rain.");
    assert_clean(report);
    assert!(render_text(report).starts_with("Verdict: CLEAN"));
}

#[test]
fn test_report_over_many_findings() {
    let store = RuleStore::with_era_lexicon();
    let text = "Basically, we need to leverage synergy, circle back, touch base, \
                and reach out to the stakeholders to optimize the deliverables.";
    let report = build_report(Scanner::new(store.snapshot()).scan(text));
    assert_eq!(report.verdict, Verdict::NeedsWork);
    assert!(report.by_category["corporate-jargon"] >= 4);
}
