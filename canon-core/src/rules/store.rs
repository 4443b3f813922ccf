//! Rule store: the single source of truth the scanner consults.

use super::audit::{AuditAction, AuditEntry, AuditLog};
use super::fact::{CanonFact, FactValue};
use super::scope::ChapterRuleScope;
use super::term::{normalize_pattern, validate_pattern, ProhibitedTerm, TermCategory};
use crate::chapter::{ChapterLock, ChapterState};
use crate::documents::{DocumentClass, ResearchDocument};
use crate::error::{GovernanceError, Result};
use crate::lexicon::ERA_LEXICON;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Actor recorded on audit entries when none is configured.
pub const DEFAULT_ACTOR: &str = "author";

/// Source recorded for terms seeded from the built-in lexicon.
pub const LEXICON_SOURCE: &str = "era lexicon";

/// Canon facts, prohibited terms and chapter scopes.
///
/// This is the part of the store a scan reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    facts: BTreeMap<String, CanonFact>,
    terms: Vec<ProhibitedTerm>,
    scopes: BTreeMap<String, ChapterRuleScope>,
}

impl RuleSet {
    /// Current value of a canon key.
    pub fn get_fact(&self, key: &str) -> Result<&CanonFact> {
        self.facts
            .get(key.trim())
            .ok_or_else(|| GovernanceError::NotFound(key.trim().to_string()))
    }

    /// All current facts, ordered by key.
    pub fn facts(&self) -> impl Iterator<Item = &CanonFact> {
        self.facts.values()
    }

    /// Prohibited terms, optionally restricted to one category.
    pub fn list_prohibited(&self, category: Option<TermCategory>) -> Vec<&ProhibitedTerm> {
        self.terms
            .iter()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .collect()
    }

    /// The declared scope for a chapter, or the default scope.
    pub fn scope_for_chapter(&self, chapter: &str) -> ChapterRuleScope {
        self.declared_scope(chapter)
            .cloned()
            .unwrap_or_else(|| ChapterRuleScope::default_for(chapter.trim()))
    }

    /// The declared scope for a chapter, if any.
    pub fn declared_scope(&self, chapter: &str) -> Option<&ChapterRuleScope> {
        self.scopes.get(chapter.trim())
    }

    /// All declared scopes, ordered by chapter id.
    pub fn scopes(&self) -> impl Iterator<Item = &ChapterRuleScope> {
        self.scopes.values()
    }

    fn contains_pattern(&self, category: TermCategory, normalized: &str) -> bool {
        self.terms
            .iter()
            .any(|t| t.category == category && t.normalized() == normalized)
    }
}

/// An immutable view of the rule set taken at one moment.
///
/// Later store mutations never show up in an existing snapshot.
#[derive(Debug, Clone)]
pub struct RuleSnapshot(Arc<RuleSet>);

impl RuleSnapshot {
    /// Snapshot an owned rule set.
    pub fn new(rules: RuleSet) -> Self {
        Self(Arc::new(rules))
    }
}

impl Deref for RuleSnapshot {
    type Target = RuleSet;

    fn deref(&self) -> &RuleSet {
        &self.0
    }
}

/// One version of a canon fact, as returned by [`RuleStore::fact_history`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactVersion<'a> {
    pub version: u32,
    pub value: &'a FactValue,
    pub source: &'a str,
    pub recorded_at: DateTime<Utc>,
    pub current: bool,
}

/// Durable, versioned governance state.
///
/// Every accepted mutation appends to the audit log. Rejected mutations
/// change nothing and are returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleStore {
    rules: Arc<RuleSet>,
    #[serde(default)]
    chapters: BTreeMap<String, ChapterLock>,
    #[serde(default)]
    documents: Vec<ResearchDocument>,
    #[serde(default)]
    audit: AuditLog,
    #[serde(skip, default = "default_actor")]
    actor: String,
}

fn default_actor() -> String {
    DEFAULT_ACTOR.to_string()
}

impl Default for RuleStore {
    fn default() -> Self {
        Self {
            rules: Arc::new(RuleSet::default()),
            chapters: BTreeMap::new(),
            documents: Vec::new(),
            audit: AuditLog::new(),
            actor: default_actor(),
        }
    }
}

impl RuleStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the built-in era lexicon.
    pub fn with_era_lexicon() -> Self {
        let mut store = Self::new();
        store.seed_era_lexicon();
        store
    }

    /// Set who is recorded on audit entries.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.set_actor(actor);
        self
    }

    /// Change who is recorded on audit entries.
    pub fn set_actor(&mut self, actor: impl Into<String>) {
        let actor = actor.into();
        let actor = actor.trim();
        self.actor = if actor.is_empty() {
            default_actor()
        } else {
            actor.to_string()
        };
    }

    /// Who is recorded on audit entries.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Add every lexicon entry not already present. Returns how many were added.
    pub fn seed_era_lexicon(&mut self) -> usize {
        let mut added = 0;
        for entry in ERA_LEXICON.iter() {
            if self
                .rules
                .contains_pattern(entry.category, &normalize_pattern(entry.pattern))
            {
                continue;
            }
            let alternatives = entry.alternatives.iter().map(|a| a.to_string()).collect();
            if self
                .insert_term(entry.pattern, entry.category, alternatives, LEXICON_SOURCE)
                .is_ok()
            {
                added += 1;
            }
        }
        info!(added, "seeded era lexicon");
        added
    }

    /// Take an immutable snapshot of the rule set for scanning.
    pub fn snapshot(&self) -> RuleSnapshot {
        RuleSnapshot(Arc::clone(&self.rules))
    }

    /// Read access to the current rule set.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn record(&mut self, action: AuditAction, at: DateTime<Utc>) -> u64 {
        self.audit.append(&self.actor, action, at)
    }

    // =========================================================================
    // Canon Facts
    // =========================================================================

    /// Current value of a canon key.
    pub fn get_fact(&self, key: &str) -> Result<&CanonFact> {
        self.rules.get_fact(key)
    }

    /// Declare or change a canon fact. Returns the resulting version.
    ///
    /// Setting the current value again is a no-op: the version stays and
    /// nothing is logged. A blank source is always rejected.
    pub fn set_fact(
        &mut self,
        key: &str,
        value: impl Into<FactValue>,
        source: &str,
    ) -> Result<u32> {
        let key = key.trim();
        let source = source.trim();
        if key.is_empty() {
            return Err(rejected(GovernanceError::validation(
                "canon key must not be empty",
            )));
        }
        if source.is_empty() {
            return Err(rejected(GovernanceError::validation(format!(
                "canon fact '{key}' needs an explicit source"
            ))));
        }
        let value = match value.into() {
            FactValue::Text(text) => FactValue::Text(text.trim().to_string()),
            typed => typed,
        };
        if let FactValue::Text(text) = &value {
            if text.is_empty() {
                return Err(rejected(GovernanceError::validation(format!(
                    "canon fact '{key}' needs a value"
                ))));
            }
        }

        let now = Utc::now();
        if let Some(existing) = self.rules.facts.get(key) {
            if existing.value == value {
                debug!(key, version = existing.version, "canon fact unchanged");
                return Ok(existing.version);
            }
            let old_value = existing.value.clone();
            let rules = Arc::make_mut(&mut self.rules);
            let fact = rules
                .facts
                .get_mut(key)
                .ok_or_else(|| GovernanceError::NotFound(key.to_string()))?;
            fact.revise(value.clone(), source.to_string(), now);
            let version = fact.version;
            self.record(
                AuditAction::FactRevised {
                    key: key.to_string(),
                    old_value,
                    new_value: value,
                    source: source.to_string(),
                    version,
                },
                now,
            );
            info!(key, version, source, "canon fact revised");
            return Ok(version);
        }

        let fact = CanonFact::new(key.to_string(), value.clone(), source.to_string(), now);
        Arc::make_mut(&mut self.rules)
            .facts
            .insert(key.to_string(), fact);
        self.record(
            AuditAction::FactDeclared {
                key: key.to_string(),
                value,
                source: source.to_string(),
            },
            now,
        );
        info!(key, source, "canon fact declared");
        Ok(1)
    }

    /// Every version of a fact, oldest first, ending with the current one.
    pub fn fact_history(&self, key: &str) -> Result<Vec<FactVersion<'_>>> {
        let fact = self.get_fact(key)?;
        let mut versions: Vec<FactVersion<'_>> = fact
            .history
            .iter()
            .map(|r| FactVersion {
                version: r.version,
                value: &r.value,
                source: &r.source,
                recorded_at: r.recorded_at,
                current: false,
            })
            .collect();
        versions.push(FactVersion {
            version: fact.version,
            value: &fact.value,
            source: &fact.source,
            recorded_at: fact.recorded_at,
            current: true,
        });
        Ok(versions)
    }

    /// Facts whose history holds more than one distinct source.
    ///
    /// These are the declarations that disagree across documents and need a
    /// human decision.
    pub fn contested_facts(&self) -> Vec<&CanonFact> {
        self.rules
            .facts()
            .filter(|f| !f.history.is_empty() && f.sources().len() > 1)
            .collect()
    }

    // =========================================================================
    // Prohibited Terms
    // =========================================================================

    /// Prohibited terms, optionally restricted to one category.
    pub fn list_prohibited(&self, category: Option<TermCategory>) -> Vec<&ProhibitedTerm> {
        self.rules.list_prohibited(category)
    }

    /// Add a prohibited term.
    pub fn add_prohibited(
        &mut self,
        pattern: &str,
        category: TermCategory,
        alternatives: Vec<String>,
    ) -> Result<()> {
        let source = self.actor.clone();
        self.insert_term(pattern, category, alternatives, &source)
            .map_err(rejected)
    }

    /// Add a prohibited term by category tag, as typed by a person.
    ///
    /// Tags outside the fixed set fail with a validation error.
    pub fn add_prohibited_tagged(
        &mut self,
        pattern: &str,
        category: &str,
        alternatives: Vec<String>,
    ) -> Result<()> {
        let category = category.parse::<TermCategory>().map_err(rejected)?;
        self.add_prohibited(pattern, category, alternatives)
    }

    fn insert_term(
        &mut self,
        pattern: &str,
        category: TermCategory,
        alternatives: Vec<String>,
        source: &str,
    ) -> Result<()> {
        let pattern = validate_pattern(pattern)?;
        let normalized = normalize_pattern(&pattern);
        if self.rules.contains_pattern(category, &normalized) {
            return Err(GovernanceError::DuplicatePattern {
                pattern: pattern.trim().to_string(),
                category,
            });
        }

        let now = Utc::now();
        let suggested_alternatives: Vec<String> = alternatives
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        Arc::make_mut(&mut self.rules).terms.push(ProhibitedTerm {
            category,
            pattern: pattern.clone(),
            suggested_alternatives: suggested_alternatives.clone(),
            source: source.to_string(),
            added_at: now,
        });
        self.record(
            AuditAction::TermAdded {
                category,
                pattern,
                suggested_alternatives,
                source: source.to_string(),
            },
            now,
        );
        Ok(())
    }

    // =========================================================================
    // Chapter Scopes
    // =========================================================================

    /// The declared scope for a chapter, or the default scope.
    pub fn scope_for_chapter(&self, chapter: &str) -> ChapterRuleScope {
        self.rules.scope_for_chapter(chapter)
    }

    /// Declare or replace a chapter's scope.
    pub fn declare_scope(&mut self, scope: ChapterRuleScope) -> Result<()> {
        let scope = scope.validated().map_err(rejected)?;
        if self.rules.declared_scope(&scope.chapter) == Some(&scope) {
            return Ok(());
        }

        let now = Utc::now();
        info!(chapter = %scope.chapter, "chapter scope declared");
        let previous = Arc::make_mut(&mut self.rules)
            .scopes
            .insert(scope.chapter.clone(), scope.clone());
        self.record(AuditAction::ScopeDeclared { scope, previous }, now);
        Ok(())
    }

    // =========================================================================
    // Chapter Locks
    // =========================================================================

    /// Lock record for a chapter (a fresh draft if never touched).
    pub fn chapter_state(&self, chapter: &str) -> ChapterLock {
        self.chapters
            .get(chapter.trim())
            .cloned()
            .unwrap_or_else(|| ChapterLock::draft(chapter.trim(), Utc::now()))
    }

    /// Whether a chapter may be edited.
    pub fn is_editable(&self, chapter: &str) -> bool {
        self.chapters
            .get(chapter.trim())
            .map_or(true, ChapterLock::is_editable)
    }

    /// All tracked chapters, ordered by id.
    pub fn chapters(&self) -> impl Iterator<Item = &ChapterLock> {
        self.chapters.values()
    }

    /// Move a chapter along the transition table.
    pub fn set_chapter_state(
        &mut self,
        chapter: &str,
        to: ChapterState,
        reason: Option<&str>,
    ) -> Result<ChapterLock> {
        let chapter = chapter.trim();
        if chapter.is_empty() {
            return Err(rejected(GovernanceError::validation(
                "chapter id must not be empty",
            )));
        }
        let now = Utc::now();
        let mut lock = self.chapter_state(chapter);
        let from = lock.state;
        let reason = reason.map(str::trim).filter(|r| !r.is_empty()).map(String::from);
        lock.transition(to, reason.clone(), &self.actor, now)
            .map_err(rejected)?;
        self.commit_chapter(lock, from, reason, now)
    }

    /// Return a canon-locked chapter to `revised`. The reason is required.
    pub fn unlock_chapter(&mut self, chapter: &str, reason: &str) -> Result<ChapterLock> {
        let now = Utc::now();
        let mut lock = self.chapter_state(chapter);
        let from = lock.state;
        lock.unlock(reason, &self.actor, now).map_err(rejected)?;
        self.commit_chapter(lock, from, Some(reason.trim().to_string()), now)
    }

    fn commit_chapter(
        &mut self,
        lock: ChapterLock,
        from: ChapterState,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ChapterLock> {
        info!(chapter = %lock.chapter, %from, to = %lock.state, "chapter state changed");
        self.record(
            AuditAction::ChapterStateChanged {
                chapter: lock.chapter.clone(),
                from,
                to: lock.state,
                reason,
            },
            at,
        );
        self.chapters.insert(lock.chapter.clone(), lock.clone());
        Ok(lock)
    }

    // =========================================================================
    // Research Documents
    // =========================================================================

    /// Register a research document under a class.
    pub fn register_document(
        &mut self,
        title: &str,
        class: DocumentClass,
        subtype: Option<&str>,
    ) -> Result<Uuid> {
        let now = Utc::now();
        let doc = ResearchDocument::new(title, class, subtype.map(String::from), now)
            .map_err(rejected)?;
        let id = doc.id;
        self.record(
            AuditAction::DocumentRegistered {
                id,
                title: doc.title.clone(),
                class,
            },
            now,
        );
        info!(%id, %class, "research document registered");
        self.documents.push(doc);
        Ok(id)
    }

    /// Move a document to another class. The reason is required.
    pub fn reclassify_document(
        &mut self,
        id: Uuid,
        to: DocumentClass,
        reason: &str,
    ) -> Result<()> {
        let now = Utc::now();
        let doc = self
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| rejected(GovernanceError::DocumentNotFound(id.to_string())))?;
        if let Some(from) = doc.reclassify(to, reason, now).map_err(rejected)? {
            info!(%id, %from, %to, "research document reclassified");
            self.record(
                AuditAction::DocumentReclassified {
                    id,
                    from,
                    to,
                    reason: reason.trim().to_string(),
                },
                now,
            );
        }
        Ok(())
    }

    /// A registered document.
    pub fn document(&self, id: Uuid) -> Option<&ResearchDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Registered documents, optionally restricted to one class.
    pub fn documents(&self, class: Option<DocumentClass>) -> Vec<&ResearchDocument> {
        self.documents
            .iter()
            .filter(|d| class.map_or(true, |c| d.class == c))
            .collect()
    }

    // =========================================================================
    // Audit & Summary
    // =========================================================================

    /// The append-only audit log.
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Audit entries about one canon key, oldest first.
    pub fn audit_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a AuditEntry> + 'a {
        self.audit.for_key(key.trim())
    }

    /// Markdown summary of current canon, grouped by key subject.
    pub fn canon_summary(&self) -> String {
        let mut lines = vec![
            "# Canon Summary".to_string(),
            format!(
                "{} fact(s), {} prohibited term(s), {} audit entries",
                self.rules.facts.len(),
                self.rules.terms.len(),
                self.audit.len()
            ),
        ];

        let mut current_subject: Option<&str> = None;
        for fact in self.rules.facts() {
            if current_subject != Some(fact.subject()) {
                current_subject = Some(fact.subject());
                lines.push(String::new());
                lines.push(format!("## {}", fact.subject()));
            }
            lines.push(format!(
                "- **{}**: {} (from {}, v{})",
                fact.key, fact.value, fact.source, fact.version
            ));
        }
        lines.join("\n")
    }
}

fn rejected(err: GovernanceError) -> GovernanceError {
    warn!(error = %err, "governance change rejected");
    err
}

/// A rule store shared across a session.
///
/// Writers hold the lock for the length of a mutation; scans take a
/// snapshot under the read lock and release it before matching, so a scan
/// sees either the old or the new rule set in full.
#[derive(Debug, Clone, Default)]
pub struct SharedRuleStore {
    inner: Arc<RwLock<RuleStore>>,
}

impl SharedRuleStore {
    pub fn new(store: RuleStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Snapshot the current rule set.
    pub fn snapshot(&self) -> RuleSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Run a read-only closure against the store.
    pub fn read<T>(&self, f: impl FnOnce(&RuleStore) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&*guard)
    }

    /// Run a mutation against the store.
    pub fn write<T>(&self, f: impl FnOnce(&mut RuleStore) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_creation() {
        let store = RuleStore::new();
        assert!(store.list_prohibited(None).is_empty());
        assert!(store.audit_log().is_empty());
        assert_eq!(store.actor(), DEFAULT_ACTOR);
    }

    #[test]
    fn test_set_fact_versions() {
        let mut store = RuleStore::new();
        assert_eq!(store.set_fact("tommy.instrument", "trombone", "ch1").unwrap(), 1);
        assert_eq!(store.set_fact("tommy.instrument", "trombone", "ch1").unwrap(), 1);
        assert_eq!(store.audit_log().len(), 1);

        assert_eq!(store.set_fact("tommy.instrument", "trumpet", "ch7").unwrap(), 2);
        assert_eq!(store.audit_log().len(), 2);

        let history = store.fact_history("tommy.instrument").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].value, &FactValue::from("trombone"));
        assert!(history[1].current);
    }

    #[test]
    fn test_set_fact_ignores_surrounding_whitespace() {
        let mut store = RuleStore::new();
        assert_eq!(store.set_fact("tommy.instrument", " trombone ", "ch1").unwrap(), 1);
        assert_eq!(store.set_fact("tommy.instrument", "trombone", "ch2").unwrap(), 1);
        assert_eq!(
            store.get_fact("tommy.instrument").unwrap().value,
            FactValue::from("trombone")
        );
        assert_eq!(store.audit_log().len(), 1);
    }

    #[test]
    fn test_set_fact_requires_source() {
        let mut store = RuleStore::new();
        assert!(matches!(
            store.set_fact("tommy.age.1954", 17, "  "),
            Err(GovernanceError::Validation(_))
        ));
        assert!(matches!(
            store.get_fact("tommy.age.1954"),
            Err(GovernanceError::NotFound(_))
        ));
        assert!(store.audit_log().is_empty());
    }

    #[test]
    fn test_set_fact_rejects_blank_key_and_value() {
        let mut store = RuleStore::new();
        assert!(store.set_fact(" ", "x", "ch1").is_err());
        assert!(store.set_fact("jenny.surname", " ", "ch1").is_err());
    }

    #[test]
    fn test_add_prohibited_duplicates() {
        let mut store = RuleStore::new();
        store
            .add_prohibited("trauma", TermCategory::TherapySpeak, vec![])
            .unwrap();

        let err = store
            .add_prohibited("Trauma ", TermCategory::TherapySpeak, vec![])
            .unwrap_err();
        assert!(matches!(err, GovernanceError::DuplicatePattern { .. }));

        // Same pattern in another category is allowed.
        store
            .add_prohibited("trauma", TermCategory::Anachronism, vec![])
            .unwrap();
        assert_eq!(store.list_prohibited(None).len(), 2);
        assert_eq!(
            store
                .list_prohibited(Some(TermCategory::TherapySpeak))
                .len(),
            1
        );
    }

    #[test]
    fn test_add_prohibited_unknown_tag() {
        let mut store = RuleStore::new();
        let err = store
            .add_prohibited_tagged("groovy", "sixties-slang", vec![])
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Validation(_)));
        assert!(store.list_prohibited(None).is_empty());
    }

    #[test]
    fn test_snapshot_isolation() {
        let mut store = RuleStore::new();
        store
            .add_prohibited("leverage", TermCategory::CorporateJargon, vec![])
            .unwrap();
        let before = store.snapshot();

        store
            .add_prohibited("synergy", TermCategory::CorporateJargon, vec![])
            .unwrap();
        store.set_fact("tommy.instrument", "trombone", "ch1").unwrap();

        assert_eq!(before.list_prohibited(None).len(), 1);
        assert!(before.get_fact("tommy.instrument").is_err());
        assert_eq!(store.snapshot().list_prohibited(None).len(), 2);
    }

    #[test]
    fn test_scope_default_and_declared() {
        let mut store = RuleStore::new();
        let default = store.scope_for_chapter("ch09");
        assert_eq!(default.active.len(), TermCategory::ALL.len());

        store
            .declare_scope(
                ChapterRuleScope::new("ch01")
                    .with_active(TermCategory::Anachronism)
                    .with_flagged_phrase("she would later learn"),
            )
            .unwrap();
        let declared = store.scope_for_chapter("ch01");
        assert!(declared.is_active(TermCategory::Anachronism));
        assert!(!declared.is_active(TermCategory::TherapySpeak));
        assert_eq!(store.audit_log().len(), 1);
    }

    #[test]
    fn test_scope_redeclaration_keeps_replaced_scope_in_log() {
        let mut store = RuleStore::new();
        store
            .declare_scope(
                ChapterRuleScope::new("ch02")
                    .with_active(TermCategory::PovScope)
                    .with_flagged_phrase("she would later learn"),
            )
            .unwrap();
        store
            .declare_scope(
                ChapterRuleScope::new("ch02")
                    .with_active(TermCategory::PovScope)
                    .with_flagged_phrase("little did he know"),
            )
            .unwrap();

        let entries = store.audit_log().entries();
        assert_eq!(entries.len(), 2);
        match &entries[1].action {
            AuditAction::ScopeDeclared { scope, previous } => {
                assert_eq!(scope.flagged_phrases, vec!["little did he know".to_string()]);
                let previous = previous.as_ref().expect("replaced scope recorded");
                assert_eq!(previous.flagged_phrases, vec!["she would later learn".to_string()]);
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert!(matches!(
            &entries[0].action,
            AuditAction::ScopeDeclared { previous: None, .. }
        ));

        let json = serde_json::to_string(store.audit_log()).unwrap();
        assert!(json.contains("she would later learn"));
        assert!(store.audit_log().to_changelog().contains("she would later learn"));
    }

    #[test]
    fn test_term_audit_carries_alternatives_and_source() {
        let mut store = RuleStore::new().with_actor("editor");
        store
            .add_prohibited("closure", TermCategory::TherapySpeak, vec!["peace".to_string()])
            .unwrap();

        match &store.audit_log().entries()[0].action {
            AuditAction::TermAdded {
                pattern,
                suggested_alternatives,
                source,
                ..
            } => {
                assert_eq!(pattern, "closure");
                assert_eq!(suggested_alternatives, &vec!["peace".to_string()]);
                assert_eq!(source, "editor");
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert!(store.audit_log().to_changelog().contains("alternatives [peace]"));
    }

    #[test]
    fn test_era_lexicon_seed_is_idempotent() {
        let mut store = RuleStore::with_era_lexicon();
        let seeded = store.list_prohibited(None).len();
        assert_eq!(seeded, ERA_LEXICON.len());
        assert_eq!(store.seed_era_lexicon(), 0);
        assert_eq!(store.list_prohibited(None).len(), seeded);
    }

    #[test]
    fn test_chapter_locking_is_audited() {
        let mut store = RuleStore::new().with_actor("editor");
        store
            .set_chapter_state("ch05", ChapterState::CanonLocked, Some("Canon finalized"))
            .unwrap();
        assert!(!store.is_editable("ch05"));

        let err = store
            .set_chapter_state("ch05", ChapterState::Draft, None)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::ChapterLocked { .. }));

        store
            .unlock_chapter("ch05", "Circus name corrected in bible")
            .unwrap();
        assert!(store.is_editable("ch05"));

        let entries = store.audit_log().entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.actor == "editor"));
    }

    #[test]
    fn test_documents() {
        let mut store = RuleStore::new();
        let id = store
            .register_document("Bracero program paper", DocumentClass::Context, Some("social"))
            .unwrap();
        store
            .reclassify_document(id, DocumentClass::Canon, "Quoted in chapter 3")
            .unwrap();

        assert_eq!(store.document(id).unwrap().class, DocumentClass::Canon);
        assert_eq!(store.documents(Some(DocumentClass::Canon)).len(), 1);
        assert!(store.rules().facts().next().is_none());
        assert!(matches!(
            store.reclassify_document(Uuid::new_v4(), DocumentClass::Craft, "why not"),
            Err(GovernanceError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_contested_facts() {
        let mut store = RuleStore::new();
        store
            .set_fact("circus.name", "Wallace Brothers", "character bible")
            .unwrap();
        store
            .set_fact("circus.name", "Clyde Beatty-Cole Bros.", "timeline")
            .unwrap();
        store.set_fact("tommy.instrument", "trombone", "ch1").unwrap();

        let contested = store.contested_facts();
        assert_eq!(contested.len(), 1);
        assert_eq!(contested[0].key, "circus.name");
    }

    #[test]
    fn test_canon_summary() {
        let mut store = RuleStore::new();
        store.set_fact("tommy.instrument", "trombone", "ch1").unwrap();
        store.set_fact("tommy.age.1954", 17, "ch1").unwrap();
        store.set_fact("jenny.surname", "Hale", "bible").unwrap();

        let summary = store.canon_summary();
        assert!(summary.contains("## tommy"));
        assert!(summary.contains("**tommy.instrument**: trombone"));
        assert!(summary.find("## jenny").unwrap() < summary.find("## tommy").unwrap());
    }

    #[test]
    fn test_shared_store_snapshot() {
        let shared = SharedRuleStore::new(RuleStore::new());
        let before = shared.snapshot();
        shared.write(|s| s.set_fact("tommy.instrument", "trombone", "ch1")).unwrap();

        assert!(before.get_fact("tommy.instrument").is_err());
        assert!(shared.snapshot().get_fact("tommy.instrument").is_ok());
        assert_eq!(shared.read(|s| s.audit_log().len()), 1);
    }
}
