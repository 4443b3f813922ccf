//! Append-only audit log of every accepted change.

use super::fact::FactValue;
use super::scope::ChapterRuleScope;
use super::term::TermCategory;
use crate::chapter::ChapterState;
use crate::documents::DocumentClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What a mutation changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditAction {
    FactDeclared {
        key: String,
        value: FactValue,
        source: String,
    },
    FactRevised {
        key: String,
        old_value: FactValue,
        new_value: FactValue,
        source: String,
        version: u32,
    },
    TermAdded {
        category: TermCategory,
        pattern: String,
        #[serde(default)]
        suggested_alternatives: Vec<String>,
        #[serde(default)]
        source: String,
    },
    ScopeDeclared {
        scope: ChapterRuleScope,
        /// The declaration this one replaced, if any.
        #[serde(default)]
        previous: Option<ChapterRuleScope>,
    },
    ChapterStateChanged {
        chapter: String,
        from: ChapterState,
        to: ChapterState,
        reason: Option<String>,
    },
    DocumentRegistered {
        id: Uuid,
        title: String,
        class: DocumentClass,
    },
    DocumentReclassified {
        id: Uuid,
        from: DocumentClass,
        to: DocumentClass,
        reason: String,
    },
}

impl AuditAction {
    /// Canon key the action touched, if any.
    pub fn fact_key(&self) -> Option<&str> {
        match self {
            AuditAction::FactDeclared { key, .. } | AuditAction::FactRevised { key, .. } => {
                Some(key.as_str())
            }
            _ => None,
        }
    }

    /// Short uppercase label for changelogs.
    pub fn label(&self) -> &'static str {
        match self {
            AuditAction::FactDeclared { .. } => "ADD_FACT",
            AuditAction::FactRevised { .. } => "UPDATE_FACT",
            AuditAction::TermAdded { .. } => "ADD_TERM",
            AuditAction::ScopeDeclared { .. } => "DECLARE_SCOPE",
            AuditAction::ChapterStateChanged { .. } => "CHAPTER_STATE_CHANGE",
            AuditAction::DocumentRegistered { .. } => "REGISTER_DOCUMENT",
            AuditAction::DocumentReclassified { .. } => "RECLASSIFY_DOCUMENT",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::FactDeclared { key, value, source } => {
                write!(f, "Declared {key} = '{value}' (source: {source})")
            }
            AuditAction::FactRevised {
                key,
                old_value,
                new_value,
                source,
                version,
            } => write!(
                f,
                "Changed {key}: '{old_value}' -> '{new_value}' (source: {source}, v{version})"
            ),
            AuditAction::TermAdded {
                category,
                pattern,
                suggested_alternatives,
                source,
            } => {
                write!(f, "Prohibited '{pattern}' in {category}")?;
                if !suggested_alternatives.is_empty() {
                    write!(f, ", alternatives [{}]", suggested_alternatives.join(", "))?;
                }
                if !source.is_empty() {
                    write!(f, " (source: {source})")?;
                }
                Ok(())
            }
            AuditAction::ScopeDeclared { scope, previous } => {
                write!(f, "Scope for {}: {}", scope.chapter, describe_scope(scope))?;
                if let Some(previous) = previous {
                    write!(f, "; replaced {}", describe_scope(previous))?;
                }
                Ok(())
            }
            AuditAction::ChapterStateChanged {
                chapter,
                from,
                to,
                reason,
            } => {
                write!(f, "{chapter}: {from} -> {to}")?;
                if let Some(reason) = reason {
                    write!(f, " (reason: {reason})")?;
                }
                Ok(())
            }
            AuditAction::DocumentRegistered { id, title, class } => {
                write!(f, "Registered '{title}' as {class} ({id})")
            }
            AuditAction::DocumentReclassified {
                id,
                from,
                to,
                reason,
            } => write!(f, "Reclassified {id}: {from} -> {to} (reason: {reason})"),
        }
    }
}

fn describe_scope(scope: &ChapterRuleScope) -> String {
    let tags = |cats: &std::collections::BTreeSet<TermCategory>| {
        cats.iter().map(|c| c.tag()).collect::<Vec<_>>().join(", ")
    };
    let phrases = scope
        .flagged_phrases
        .iter()
        .map(|p| format!("'{p}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "active [{}], high-risk [{}], flagged [{phrases}]",
        tags(&scope.active),
        tags(&scope.high_risk)
    )
}

/// One entry in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, starting at 1.
    pub sequence: u64,
    pub at: DateTime<Utc>,
    /// Who made the change.
    pub actor: String,
    pub action: AuditAction,
}

/// The append-only log. Entries are never edited or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its sequence number.
    pub(crate) fn append(
        &mut self,
        actor: &str,
        action: AuditAction,
        at: DateTime<Utc>,
    ) -> u64 {
        let sequence = self.entries.last().map(|e| e.sequence + 1).unwrap_or(1);
        self.entries.push(AuditEntry {
            sequence,
            at,
            actor: actor.to_string(),
            action,
        });
        sequence
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that touched a canon key.
    pub fn for_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a AuditEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.action.fact_key() == Some(key))
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[AuditEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Render the log as a markdown changelog.
    pub fn to_changelog(&self) -> String {
        let mut out = String::from("# Canon Changelog\n");
        for entry in &self.entries {
            out.push_str(&format!(
                "\n## {} (#{})\n\n**Action:** {}\n\n**By:** {}\n\n**Details:** {}\n\n---\n",
                entry.at.format("%Y-%m-%d %H:%M:%S"),
                entry.sequence,
                entry.action.label(),
                entry.actor,
                entry.action
            ));
        }
        out
    }
}
