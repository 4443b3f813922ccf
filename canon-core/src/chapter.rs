//! Chapter lock states.
//!
//! Chapters move `draft -> revised -> canon-locked -> published`. A locked
//! chapter can only go back to `revised` through an explicit unlock with a
//! reason; a published chapter never changes.

use crate::error::{GovernanceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum length of an unlock reason.
pub const MIN_UNLOCK_REASON_CHARS: usize = 10;

/// Lock state of a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterState {
    /// Free editing.
    #[default]
    Draft,
    /// After a revision pass.
    Revised,
    /// Protected; unlock requires a reason.
    CanonLocked,
    /// Final and read-only.
    Published,
}

impl ChapterState {
    pub const ALL: [ChapterState; 4] = [
        ChapterState::Draft,
        ChapterState::Revised,
        ChapterState::CanonLocked,
        ChapterState::Published,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ChapterState::Draft => "draft",
            ChapterState::Revised => "revised",
            ChapterState::CanonLocked => "canon-locked",
            ChapterState::Published => "published",
        }
    }

    /// Whether text in this state may be edited.
    pub fn is_editable(&self) -> bool {
        matches!(self, ChapterState::Draft | ChapterState::Revised)
    }

    /// Whether this state records who locked it and why.
    pub fn is_locked(&self) -> bool {
        !self.is_editable()
    }

    /// States reachable with `set_chapter_state` (unlock is separate).
    pub fn allowed_transitions(&self) -> &'static [ChapterState] {
        match self {
            ChapterState::Draft => &[ChapterState::Revised, ChapterState::CanonLocked],
            ChapterState::Revised => &[
                ChapterState::Draft,
                ChapterState::CanonLocked,
                ChapterState::Published,
            ],
            ChapterState::CanonLocked | ChapterState::Published => &[],
        }
    }
}

impl fmt::Display for ChapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ChapterState {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        ChapterState::ALL
            .into_iter()
            .find(|state| state.tag() == wanted)
            .ok_or_else(|| GovernanceError::validation(format!("unknown chapter state '{s}'")))
    }
}

/// Lock record for one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterLock {
    pub chapter: String,
    pub state: ChapterState,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub lock_reason: Option<String>,
    pub last_modified: DateTime<Utc>,
    /// Number of times the chapter entered `revised`.
    pub revision_count: u32,
}

impl ChapterLock {
    /// A fresh draft record.
    pub fn draft(chapter: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            chapter: chapter.into(),
            state: ChapterState::Draft,
            locked_at: None,
            locked_by: None,
            lock_reason: None,
            last_modified: at,
            revision_count: 0,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.state.is_editable()
    }

    /// Apply a transition from the table, or explain why it is refused.
    pub(crate) fn transition(
        &mut self,
        to: ChapterState,
        reason: Option<String>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.state.allowed_transitions().contains(&to) {
            return Err(match self.state {
                ChapterState::CanonLocked | ChapterState::Published => {
                    GovernanceError::ChapterLocked {
                        chapter: self.chapter.clone(),
                        state: self.state,
                    }
                }
                from => GovernanceError::InvalidTransition {
                    chapter: self.chapter.clone(),
                    from,
                    to,
                },
            });
        }
        self.enter(to, reason, actor, at);
        Ok(())
    }

    /// Return a locked chapter to `revised`.
    pub(crate) fn unlock(&mut self, reason: &str, actor: &str, at: DateTime<Utc>) -> Result<()> {
        if self.state != ChapterState::CanonLocked {
            return Err(GovernanceError::InvalidTransition {
                chapter: self.chapter.clone(),
                from: self.state,
                to: ChapterState::Revised,
            });
        }
        if reason.trim().chars().count() < MIN_UNLOCK_REASON_CHARS {
            return Err(GovernanceError::validation(format!(
                "unlock requires a meaningful reason ({MIN_UNLOCK_REASON_CHARS}+ characters)"
            )));
        }
        self.enter(
            ChapterState::Revised,
            Some(format!("Unlocked: {}", reason.trim())),
            actor,
            at,
        );
        Ok(())
    }

    fn enter(&mut self, to: ChapterState, reason: Option<String>, actor: &str, at: DateTime<Utc>) {
        if to.is_locked() {
            self.locked_at = Some(at);
            self.locked_by = Some(actor.to_string());
            self.lock_reason = reason;
        } else {
            self.locked_at = None;
            self.locked_by = None;
            self.lock_reason = None;
        }
        if to == ChapterState::Revised {
            self.revision_count += 1;
        }
        self.state = to;
        self.last_modified = at;
    }
}
