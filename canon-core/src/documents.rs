//! Research documents and their governance class.
//!
//! Classification is a human decision. A document's class only changes
//! through an explicit reclassification, and registering a document never
//! creates canon facts.

use crate::error::{GovernanceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The four research classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentClass {
    /// Facts that appear on the page.
    Canon,
    /// Background that informs but is never narrated.
    Context,
    /// Objects inside the story world (letters, programs, ticket stubs).
    Artifact,
    /// Guidance on how to write, never narrative content.
    Craft,
}

impl DocumentClass {
    pub const ALL: [DocumentClass; 4] = [
        DocumentClass::Canon,
        DocumentClass::Context,
        DocumentClass::Artifact,
        DocumentClass::Craft,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            DocumentClass::Canon => "canon",
            DocumentClass::Context => "context",
            DocumentClass::Artifact => "artifact",
            DocumentClass::Craft => "craft",
        }
    }

    /// Suggested subtypes for this class.
    pub fn subtypes(&self) -> &'static [&'static str] {
        match self {
            DocumentClass::Canon => &["characters", "timeline", "locations", "terminology", "rules"],
            DocumentClass::Context => &["historical", "social", "operational", "geographic"],
            DocumentClass::Artifact => &["letters", "programs", "ephemera", "photographs"],
            DocumentClass::Craft => &["style", "influences", "process"],
        }
    }
}

impl fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DocumentClass {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        DocumentClass::ALL
            .into_iter()
            .find(|c| c.tag() == wanted)
            .ok_or_else(|| GovernanceError::validation(format!("unknown document class '{s}'")))
    }
}

/// A previous class of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassChange {
    pub from: DocumentClass,
    pub to: DocumentClass,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// A registered research document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchDocument {
    pub id: Uuid,
    pub title: String,
    pub class: DocumentClass,
    pub subtype: Option<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub class_history: Vec<ClassChange>,
}

impl ResearchDocument {
    pub(crate) fn new(
        title: &str,
        class: DocumentClass,
        subtype: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(GovernanceError::validation("document title must not be empty"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            class,
            subtype: subtype
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            registered_at: at,
            class_history: Vec::new(),
        })
    }

    /// Move the document to another class. Returns the previous class, or
    /// `None` when the class was already `to`.
    pub(crate) fn reclassify(
        &mut self,
        to: DocumentClass,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<DocumentClass>> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(GovernanceError::validation(
                "reclassification requires a reason",
            ));
        }
        if self.class == to {
            return Ok(None);
        }
        let from = std::mem::replace(&mut self.class, to);
        self.class_history.push(ClassChange {
            from,
            to,
            reason: reason.to_string(),
            at,
        });
        Ok(Some(from))
    }
}
