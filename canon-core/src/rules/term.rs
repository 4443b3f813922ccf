//! Prohibited vocabulary entries.

use crate::error::{GovernanceError, Result};
use crate::finding::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of vocabulary categories.
///
/// New categories are a code change, never something a caller can invent
/// at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TermCategory {
    /// Modern clinical or self-help vocabulary ("trauma", "closure").
    TherapySpeak,
    /// Office and management vocabulary ("leverage", "circle back").
    CorporateJargon,
    /// Later-decade idioms and intensifiers ("game-changer", "awesome").
    ContemporarySlang,
    /// Technology or objects that do not fit the period.
    Anachronism,
    /// Phrases that break a chapter's point-of-view boundary.
    PovScope,
}

impl TermCategory {
    /// Every category, in report order.
    pub const ALL: [TermCategory; 5] = [
        TermCategory::TherapySpeak,
        TermCategory::CorporateJargon,
        TermCategory::ContemporarySlang,
        TermCategory::Anachronism,
        TermCategory::PovScope,
    ];

    /// The tag used in files and on the command line.
    pub fn tag(&self) -> &'static str {
        match self {
            TermCategory::TherapySpeak => "therapy-speak",
            TermCategory::CorporateJargon => "corporate-jargon",
            TermCategory::ContemporarySlang => "contemporary-slang",
            TermCategory::Anachronism => "anachronism",
            TermCategory::PovScope => "pov-scope",
        }
    }

    /// Get the display name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            TermCategory::TherapySpeak => "Therapy Speak",
            TermCategory::CorporateJargon => "Corporate Jargon",
            TermCategory::ContemporarySlang => "Contemporary Slang",
            TermCategory::Anachronism => "Anachronism",
            TermCategory::PovScope => "POV Scope",
        }
    }

    /// Severity of a match when the chapter does not mark the category high-risk.
    pub fn default_severity(&self) -> Severity {
        match self {
            TermCategory::TherapySpeak | TermCategory::CorporateJargon | TermCategory::PovScope => {
                Severity::Warning
            }
            TermCategory::ContemporarySlang | TermCategory::Anachronism => Severity::Advisory,
        }
    }
}

impl fmt::Display for TermCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for TermCategory {
    type Err = GovernanceError;

    /// Accepts the kebab-case tag, with `_` treated as `-` and case ignored.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        TermCategory::ALL
            .into_iter()
            .find(|c| c.tag() == wanted)
            .ok_or_else(|| {
                GovernanceError::validation(format!(
                    "unknown term category '{}' (expected one of: {})",
                    s.trim(),
                    TermCategory::ALL.map(|c| c.tag()).join(", ")
                ))
            })
    }
}

/// Normalize a pattern for duplicate detection: trimmed and lowercased.
pub fn normalize_pattern(pattern: &str) -> String {
    pattern.trim().to_lowercase()
}

/// Check a pattern and return its trimmed form.
///
/// A single trailing `*` allows prefix matches; `*` anywhere else is rejected.
pub(crate) fn validate_pattern(pattern: &str) -> Result<String> {
    let trimmed = pattern.trim();
    let stem = trimmed.strip_suffix('*').unwrap_or(trimmed).trim_end();
    if stem.is_empty() {
        return Err(GovernanceError::validation("pattern must not be empty"));
    }
    if stem.contains('*') {
        return Err(GovernanceError::validation(format!(
            "pattern '{trimmed}' may only use '*' as a trailing prefix marker"
        )));
    }
    Ok(trimmed.to_string())
}

/// A banned vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProhibitedTerm {
    pub category: TermCategory,
    /// Literal phrase as entered (trimmed). A trailing `*` allows prefixes.
    pub pattern: String,
    /// Replacement suggestions, in preference order.
    pub suggested_alternatives: Vec<String>,
    /// Who or what added the entry.
    pub source: String,
    pub added_at: DateTime<Utc>,
}

impl ProhibitedTerm {
    /// Normalized pattern used for uniqueness.
    pub fn normalized(&self) -> String {
        normalize_pattern(&self.pattern)
    }

    /// Whether the pattern explicitly allows prefix matches.
    pub fn allows_prefix(&self) -> bool {
        self.pattern.ends_with('*')
    }

    /// The literal text to search for, without the prefix marker.
    pub fn stem(&self) -> &str {
        self.pattern
            .strip_suffix('*')
            .unwrap_or(&self.pattern)
            .trim_end()
    }

    /// Human-readable suggestion text, if there are alternatives.
    pub fn suggestion(&self) -> Option<String> {
        if self.suggested_alternatives.is_empty() {
            None
        } else {
            Some(format!(
                "Consider: {}",
                self.suggested_alternatives.join(", ")
            ))
        }
    }
}
