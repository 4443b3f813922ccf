//! Canon governance for a historical-fiction manuscript.
//!
//! This crate provides:
//! - A versioned rule store of canon facts, prohibited vocabulary and
//!   per-chapter scopes, with an append-only audit log
//! - A scanner that reports era-language, point-of-view and canon violations
//!   without ever editing the text
//! - Reports grouped by severity, in plain text or markdown
//! - Whole-manuscript runs with per-chapter reports and a summary
//! - Chapter locks, research document classes and ledger persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use canon_core::{build_report, render_text, RuleStore, Scanner, TermCategory};
//!
//! let mut store = RuleStore::with_era_lexicon();
//! store.set_fact("tommy.instrument", "trombone", "ch1")?;
//! store.add_prohibited("wingman", TermCategory::ContemporarySlang, vec![])?;
//!
//! let scanner = Scanner::new(store.snapshot());
//! let findings = scanner.scan_chapter("ch03", &chapter_text, &[])?;
//! println!("{}", render_text(&build_report(findings)));
//! ```

pub mod chapter;
pub mod config;
pub mod documents;
pub mod error;
pub mod extract;
pub mod finding;
pub mod lexicon;
pub mod manuscript;
pub mod persist;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod testing;
pub mod timeline;

// Primary public API
pub use chapter::{ChapterLock, ChapterState};
pub use config::{ConfigError, GovernanceConfig};
pub use documents::{DocumentClass, ResearchDocument};
pub use error::{GovernanceError, Result};
pub use extract::{AgeExtractor, CanonObservation, Extractor, Span};
pub use finding::{Location, RuleReference, ScanFinding, Severity};
pub use manuscript::{discover_chapters, lint_manuscript, ChapterFile};
pub use persist::{PersistError, SavedLedger};
pub use report::{
    build_report, render_manuscript_markdown, render_manuscript_summary, render_markdown,
    render_text, ChapterReport, ManuscriptReport, Report, Verdict,
};
pub use rules::{
    CanonFact, ChapterRuleScope, FactValue, ProhibitedTerm, RuleSnapshot, RuleStore,
    SharedRuleStore, TermCategory,
};
pub use scanner::{scan, ScopeResolution, Scanner};
pub use testing::{ScanHarness, ScriptedExtractor};
pub use timeline::{MentionedDate, TimelineExtractor};
