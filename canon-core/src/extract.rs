//! Extraction seam: turning prose into proposed canon observations.
//!
//! The scanner never guesses what a sentence asserts. Whatever reads the
//! text (a person, a model, a heuristic) hands the scanner a list of
//! [`CanonObservation`]s and the scanner compares them with canon.

use crate::rules::{FactValue, RuleSet};
use crate::scanner::phrase_regex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Byte span in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A claim the text appears to make about a canon key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonObservation {
    pub key: String,
    pub observed: FactValue,
    pub span: Span,
}

impl CanonObservation {
    pub fn new(key: impl Into<String>, observed: impl Into<FactValue>, span: Span) -> Self {
        Self {
            key: key.into(),
            observed: observed.into(),
            span,
        }
    }

    /// Observation spanning the first occurrence of `needle` in `text`.
    pub fn at_first(
        text: &str,
        needle: &str,
        key: impl Into<String>,
        observed: impl Into<FactValue>,
    ) -> Option<Self> {
        let start = text.find(needle)?;
        Some(Self::new(key, observed, Span::new(start, start + needle.len())))
    }
}

/// Something that proposes observations for a piece of text.
pub trait Extractor {
    fn extract(&self, text: &str, rules: &RuleSet) -> Vec<CanonObservation>;
}

impl<F> Extractor for F
where
    F: Fn(&str, &RuleSet) -> Vec<CanonObservation>,
{
    fn extract(&self, text: &str, rules: &RuleSet) -> Vec<CanonObservation> {
        self(text, rules)
    }
}

/// A fixed list, typically produced ahead of time by an external tool.
impl Extractor for Vec<CanonObservation> {
    fn extract(&self, _text: &str, _rules: &RuleSet) -> Vec<CanonObservation> {
        self.clone()
    }
}

/// Default number of bytes searched on each side of an age mention.
pub const DEFAULT_CONTEXT_WINDOW: usize = 50;

lazy_static::lazy_static! {
    static ref AGE_PATTERNS: Vec<Regex> = [
        r"(?i)\b(\d{1,3})\s+years?\s+old\b",
        r"(?i)\baged\s+(\d{1,3})\b",
        r"(?i)\b(\d{1,3})-years?-old\b",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();
}

/// Heuristic age extractor.
///
/// Finds `N years old`, `aged N` and `N-year-old`, and attributes each one
/// to the nearest subject named within the context window whose age is
/// declared in canon as `<subject>.age` or `<subject>.age.<year>`.
#[derive(Debug, Clone)]
pub struct AgeExtractor {
    context_window: usize,
    story_year: Option<i32>,
}

impl Default for AgeExtractor {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            story_year: None,
        }
    }
}

impl AgeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_window(mut self, bytes: usize) -> Self {
        self.context_window = bytes;
        self
    }

    /// Prefer `<subject>.age.<year>` keys for this year.
    pub fn with_story_year(mut self, year: i32) -> Self {
        self.story_year = Some(year);
        self
    }

    /// Age keys in canon, one per subject, with the names that identify it.
    fn age_subjects(&self, rules: &RuleSet) -> Vec<(String, Vec<Regex>)> {
        let mut chosen: BTreeMap<&str, &str> = BTreeMap::new();
        let mut candidates: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for fact in rules.facts() {
            let parts: Vec<&str> = fact.key.split('.').collect();
            match parts.as_slice() {
                [subject, "age"] | [subject, "age", _] => {
                    candidates.entry(*subject).or_default().push(&fact.key);
                }
                _ => {}
            }
        }
        for (subject, keys) in &candidates {
            let by_year = self
                .story_year
                .map(|y| format!("{subject}.age.{y}"))
                .and_then(|k| keys.iter().find(|key| **key == k).copied());
            let plain = keys.iter().find(|key| key.split('.').count() == 2).copied();
            let key = by_year.or(plain).or(match keys.as_slice() {
                [only] => Some(*only),
                _ => None,
            });
            if let Some(key) = key {
                chosen.insert(*subject, key);
            }
        }

        chosen
            .into_iter()
            .map(|(subject, key)| {
                let mut names = vec![subject.replace('_', " ")];
                if let Ok(fact) = rules.get_fact(&format!("{subject}.name")) {
                    let full = fact.value.to_string();
                    if let Some(first) = full.split_whitespace().next() {
                        names.push(first.to_string());
                    }
                    names.push(full);
                }
                let patterns = names
                    .iter()
                    .filter_map(|n| phrase_regex(n, false).ok())
                    .collect();
                (key.to_string(), patterns)
            })
            .collect()
    }
}

impl Extractor for AgeExtractor {
    fn extract(&self, text: &str, rules: &RuleSet) -> Vec<CanonObservation> {
        let subjects = self.age_subjects(rules);
        if subjects.is_empty() || text.is_empty() {
            return Vec::new();
        }

        let mut observations: Vec<CanonObservation> = Vec::new();
        for pattern in AGE_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let Ok(age) = number.as_str().parse::<i64>() else {
                    continue;
                };

                let lo = floor_boundary(text, whole.start().saturating_sub(self.context_window));
                let hi = ceil_boundary(text, whole.end().saturating_add(self.context_window));
                let window = &text[lo..hi];

                let nearest = subjects
                    .iter()
                    .filter_map(|(key, names)| {
                        names
                            .iter()
                            .flat_map(|re| re.find_iter(window))
                            .map(|m| distance(lo + m.start(), lo + m.end(), whole.start(), whole.end()))
                            .min()
                            .map(|d| (d, key))
                    })
                    .min();

                if let Some((_, key)) = nearest {
                    let observation = CanonObservation::new(
                        key.clone(),
                        age,
                        Span::new(whole.start(), whole.end()),
                    );
                    if !observations.contains(&observation) {
                        observations.push(observation);
                    }
                }
            }
        }
        observations.sort_by_key(|o| o.span);
        debug!(count = observations.len(), "age observations proposed");
        observations
    }
}

pub(crate) fn distance(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> usize {
    if a_end <= b_start {
        b_start - a_end
    } else if b_end <= a_start {
        a_start - b_end
    } else {
        0
    }
}

pub(crate) fn floor_boundary(text: &str, mut at: usize) -> usize {
    at = at.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

pub(crate) fn ceil_boundary(text: &str, mut at: usize) -> usize {
    at = at.min(text.len());
    while !text.is_char_boundary(at) {
        at += 1;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleStore;

    fn store_with_ages() -> RuleStore {
        let mut store = RuleStore::new();
        store.set_fact("tommy.age.1954", 17, "character bible").unwrap();
        store.set_fact("tommy.age.1952", 15, "character bible").unwrap();
        store.set_fact("jenny.age", 19, "character bible").unwrap();
        store.set_fact("tommy.instrument", "trombone", "ch1").unwrap();
        store
    }

    #[test]
    fn test_age_attributed_to_named_subject() {
        let store = store_with_ages();
        let text = "Tommy was 19 years old that summer.";
        let found = AgeExtractor::new()
            .with_story_year(1954)
            .extract(text, store.rules());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "tommy.age.1954");
        assert_eq!(found[0].observed, FactValue::Integer(19));
        assert_eq!(&text[found[0].span.start..found[0].span.end], "19 years old");
    }

    #[test]
    fn test_nearest_subject_wins() {
        let store = store_with_ages();
        let text = "Tommy watched Jenny, aged 19, climb the rigging.";
        let found = AgeExtractor::new()
            .with_story_year(1954)
            .extract(text, store.rules());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "jenny.age");
    }

    #[test]
    fn test_no_subject_in_window() {
        let store = store_with_ages();
        let text = "The elephant was a 40-year-old matriarch.";
        assert!(AgeExtractor::new().extract(text, store.rules()).is_empty());
    }

    #[test]
    fn test_window_limits_attribution() {
        let store = store_with_ages();
        let text = format!("Jenny left.{}She was 20 years old.", " ".repeat(80));
        assert!(AgeExtractor::new()
            .with_context_window(20)
            .extract(&text, store.rules())
            .is_empty());
        assert_eq!(
            AgeExtractor::new()
                .with_context_window(120)
                .extract(&text, store.rules())
                .len(),
            1
        );
    }

    #[test]
    fn test_ambiguous_year_keys_skipped_without_story_year() {
        let store = store_with_ages();
        let text = "Tommy, a 16-year-old, ran.";
        assert!(AgeExtractor::new().extract(text, store.rules()).is_empty());
    }

    #[test]
    fn test_closure_and_list_extractors() {
        let store = RuleStore::new();
        let text = "Tommy lifted his trumpet.";
        let list = vec![CanonObservation::at_first(text, "trumpet", "tommy.instrument", "trumpet")
            .unwrap()];
        assert_eq!(list.extract(text, store.rules()).len(), 1);

        let closure = |t: &str, _: &RuleSet| {
            CanonObservation::at_first(t, "trumpet", "tommy.instrument", "trumpet")
                .into_iter()
                .collect::<Vec<_>>()
        };
        assert_eq!(closure.extract(text, store.rules()), list);
    }
}
