//! Property tests for scanning and the rule store.

use canon_core::{build_report, RuleStore, Scanner, Severity, TermCategory};
use lazy_static::lazy_static;
use proptest::prelude::*;

lazy_static! {
    static ref LEXICON_STORE: RuleStore = RuleStore::with_era_lexicon();
    static ref LEXICON_SCANNER: Scanner = Scanner::new(LEXICON_STORE.snapshot());
}

fn category() -> impl Strategy<Value = TermCategory> {
    prop::sample::select(TermCategory::ALL.to_vec())
}

// ── Scanning is idempotent ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn scanning_twice_gives_identical_findings(text in "[a-zA-Z ,.\n]{0,200}") {
        let scanner = &*LEXICON_SCANNER;
        prop_assert_eq!(scanner.scan(&text), scanner.scan(&text));
    }

    #[test]
    fn findings_are_sorted_and_point_at_matches(text in "[a-z ]{0,120}( trauma | leverage | awesome )[a-z ]{0,120}") {
        let findings = LEXICON_SCANNER.scan(&text);
        prop_assert!(!findings.is_empty());
        for pair in findings.windows(2) {
            prop_assert!(pair[0].location.start <= pair[1].location.start);
        }
        for f in &findings {
            prop_assert_eq!(&text[f.location.start..f.location.end], f.matched_text.as_str());
        }
    }
}

// ── Adding a rule never removes earlier findings ───────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn rule_growth_only_adds_findings(
        text in "[a-z ]{0,80}(synergy|anxious|computer)[a-z ]{0,80}",
        extra in "[a-z]{3,10}",
        extra_category in category(),
    ) {
        let mut store = LEXICON_STORE.clone();
        let before = LEXICON_SCANNER.scan(&text);

        // Duplicates are rejected; either way the earlier findings must survive.
        let _ = store.add_prohibited(&extra, extra_category, vec![]);
        let after = Scanner::new(store.snapshot()).scan(&text);

        for finding in &before {
            prop_assert!(after.contains(finding));
        }
        let retained: Vec<_> = after.iter().filter(|f| before.contains(f)).cloned().collect();
        prop_assert_eq!(retained, before);
    }
}

// ── Versions only move forward ─────────────────────────────────────────────

proptest! {
    #[test]
    fn fact_versions_are_monotonic(values in prop::collection::vec("[a-d]{1,2}", 1..20)) {
        let mut store = RuleStore::new();
        let mut last = 0;
        for value in &values {
            let version = store.set_fact("tommy.instrument", value.as_str(), "ch1").unwrap();
            prop_assert!(version >= last);
            prop_assert!(version <= last + 1);
            last = version;
        }
        let history = store.fact_history("tommy.instrument").unwrap();
        prop_assert_eq!(history.len() as u32, last);
        prop_assert_eq!(store.audit_log().len() as u32, last);
    }

    #[test]
    fn normalized_duplicates_always_rejected(
        word in "[a-z]{3,12}",
        pad_left in " {0,3}",
        pad_right in " {0,3}",
        upper in any::<bool>(),
        cat in category(),
    ) {
        let mut store = RuleStore::new();
        store.add_prohibited(&word, cat, vec![]).unwrap();
        let variant = if upper { word.to_uppercase() } else { word.clone() };
        let variant = format!("{pad_left}{variant}{pad_right}");
        prop_assert!(store.add_prohibited(&variant, cat, vec![]).is_err());
        prop_assert_eq!(store.list_prohibited(Some(cat)).len(), 1);
    }

    #[test]
    fn report_groups_hold_only_their_severity(text in "[a-z ,.]{0,60}(trauma|leverage|awesome|computer)[a-z ,.]{0,60}") {
        let findings = LEXICON_SCANNER.scan(&text);
        let report = build_report(findings.clone());
        for severity in Severity::ALL {
            prop_assert!(report.group(severity).iter().all(|f| f.severity == severity));
        }
        prop_assert_eq!(report.total(), findings.len());
        prop_assert_eq!(report.by_category.values().sum::<usize>(), findings.len());
    }
}
