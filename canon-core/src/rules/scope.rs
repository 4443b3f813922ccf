//! Per-chapter rule scopes.

use super::term::{normalize_pattern, validate_pattern, TermCategory};
use crate::error::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which rule categories apply to one chapter, and which phrases are
/// forbidden there specifically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRuleScope {
    pub chapter: String,
    /// Categories scanned in this chapter.
    pub active: BTreeSet<TermCategory>,
    /// Active categories whose findings block export in this chapter.
    #[serde(default)]
    pub high_risk: BTreeSet<TermCategory>,
    /// Phrases forbidden in this chapter only.
    #[serde(default)]
    pub flagged_phrases: Vec<String>,
}

impl ChapterRuleScope {
    /// A scope with no categories active.
    pub fn new(chapter: impl Into<String>) -> Self {
        Self {
            chapter: chapter.into(),
            active: BTreeSet::new(),
            high_risk: BTreeSet::new(),
            flagged_phrases: Vec::new(),
        }
    }

    /// The scope used for chapters nobody declared: every category active,
    /// nothing high-risk, no extra phrases.
    pub fn default_for(chapter: impl Into<String>) -> Self {
        Self {
            active: TermCategory::ALL.into_iter().collect(),
            ..Self::new(chapter)
        }
    }

    /// Activate a category.
    pub fn with_active(mut self, category: TermCategory) -> Self {
        self.active.insert(category);
        self
    }

    /// Activate a category and mark it high-risk.
    pub fn with_high_risk(mut self, category: TermCategory) -> Self {
        self.active.insert(category);
        self.high_risk.insert(category);
        self
    }

    /// Add a chapter-specific forbidden phrase.
    pub fn with_flagged_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.flagged_phrases.push(phrase.into());
        self
    }

    /// Whether the category is scanned in this chapter.
    pub fn is_active(&self, category: TermCategory) -> bool {
        self.active.contains(&category)
    }

    /// Whether findings in the category block export in this chapter.
    pub fn is_high_risk(&self, category: TermCategory) -> bool {
        self.high_risk.contains(&category)
    }

    /// Check the scope and return it with trimmed, de-duplicated phrases.
    pub(crate) fn validated(mut self) -> Result<Self> {
        let chapter = self.chapter.trim();
        if chapter.is_empty() {
            return Err(GovernanceError::validation("chapter id must not be empty"));
        }
        self.chapter = chapter.to_string();

        if let Some(stray) = self.high_risk.difference(&self.active).next() {
            return Err(GovernanceError::validation(format!(
                "high-risk category {stray} is not active in chapter '{}'",
                self.chapter
            )));
        }

        let mut seen = BTreeSet::new();
        let mut phrases = Vec::with_capacity(self.flagged_phrases.len());
        for phrase in &self.flagged_phrases {
            let phrase = validate_pattern(phrase)?;
            if seen.insert(normalize_pattern(&phrase)) {
                phrases.push(phrase);
            }
        }
        self.flagged_phrases = phrases;
        Ok(self)
    }
}
