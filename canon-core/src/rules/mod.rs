//! Rule store for canon governance.
//!
//! Holds the facts declared true for the story, the vocabulary the period
//! voice forbids, and per-chapter scopes, together with an append-only log
//! of who changed what.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         RuleStore                               │
//! │                                                                 │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │ Arc<RuleSet>  (copy-on-write, snapshotted for scans)      │  │
//! │  │  ┌────────────┐  ┌─────────────────┐  ┌────────────────┐  │  │
//! │  │  │ CanonFacts │  │ ProhibitedTerms │  │ ChapterScopes  │  │  │
//! │  │  │ (key→fact) │  │ (category+pat)  │  │ (chapter→set)  │  │  │
//! │  │  └────────────┘  └─────────────────┘  └────────────────┘  │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │  ┌──────────────┐  ┌─────────────────┐  ┌────────────────────┐  │
//! │  │ ChapterLocks │  │ ResearchDocs    │  │ AuditLog (append)  │  │
//! │  └──────────────┘  └─────────────────┘  └────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod audit;
mod fact;
mod scope;
mod store;
mod term;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use fact::{CanonFact, FactRevision, FactValue};
pub use scope::ChapterRuleScope;
pub use store::{
    FactVersion, RuleSet, RuleSnapshot, RuleStore, SharedRuleStore, DEFAULT_ACTOR, LEXICON_SOURCE,
};
pub use term::{normalize_pattern, ProhibitedTerm, TermCategory};
