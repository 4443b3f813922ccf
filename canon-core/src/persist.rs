//! Ledger persistence.
//!
//! The whole rule store, including fact history, chapter locks, documents
//! and the audit log, is saved as one pretty-printed JSON file so it can sit
//! next to the manuscript under version control.

use crate::rules::RuleStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current ledger file version.
///
/// Version 2 records full scopes and term alternatives in the audit log.
pub const LEDGER_VERSION: u32 = 2;

/// Counts shown when listing ledgers without loading them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetadata {
    pub project: String,
    pub facts: usize,
    pub terms: usize,
    pub scopes: usize,
    pub chapters: usize,
    pub documents: usize,
    pub audit_entries: usize,
    pub saved_at: DateTime<Utc>,
}

/// A saved rule store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedLedger {
    /// Format version for compatibility checking.
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub metadata: LedgerMetadata,
    pub store: RuleStore,
}

impl SavedLedger {
    pub fn new(project: &str, store: RuleStore) -> Self {
        let saved_at = Utc::now();
        let rules = store.rules();
        let metadata = LedgerMetadata {
            project: project.to_string(),
            facts: rules.facts().count(),
            terms: rules.list_prohibited(None).len(),
            scopes: rules.scopes().count(),
            chapters: store.chapters().count(),
            documents: store.documents(None).len(),
            audit_entries: store.audit_log().len(),
            saved_at,
        };
        Self {
            version: LEDGER_VERSION,
            saved_at,
            metadata,
            store,
        }
    }

    /// Save to a JSON file, creating parent directories as needed.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        info!(path = %path.display(), entries = self.metadata.audit_entries, "ledger saved");
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct VersionOnly {
            version: u32,
        }

        // Older layouts may not parse as the current one, so the version is
        // checked on its own first.
        let found = serde_json::from_str::<VersionOnly>(&content)?.version;
        if found != LEDGER_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: LEDGER_VERSION,
                found,
            });
        }
        let saved: Self = serde_json::from_str(&content)?;

        info!(path = %path.display(), "ledger loaded");
        Ok(saved)
    }

    /// Read only the metadata of a ledger file.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<LedgerMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: LedgerMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;

        if partial.version != LEDGER_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: LEDGER_VERSION,
                found: partial.version,
            });
        }

        Ok(partial.metadata)
    }
}

/// Save a store as a ledger.
pub async fn save_store(
    store: &RuleStore,
    project: &str,
    path: impl AsRef<Path>,
) -> Result<(), PersistError> {
    SavedLedger::new(project, store.clone()).save_json(path).await
}

/// Load a store, or start an empty one when the file does not exist yet.
pub async fn load_or_default(path: impl AsRef<Path>) -> Result<RuleStore, PersistError> {
    match SavedLedger::load_json(path).await {
        Ok(saved) => Ok(saved.store),
        Err(PersistError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            Ok(RuleStore::new())
        }
        Err(err) => Err(err),
    }
}

/// Write the audit log as a markdown changelog.
pub async fn write_changelog(store: &RuleStore, path: impl AsRef<Path>) -> Result<(), PersistError> {
    fs::write(path, store.audit_log().to_changelog()).await?;
    Ok(())
}

/// Information about a ledger file.
#[derive(Debug, Clone)]
pub struct LedgerInfo {
    pub path: PathBuf,
    pub metadata: LedgerMetadata,
}

/// List ledger files in a directory, most recently saved first.
pub async fn list_ledgers(dir: impl AsRef<Path>) -> Result<Vec<LedgerInfo>, PersistError> {
    let mut ledgers = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "json") {
            if let Ok(metadata) = SavedLedger::peek_metadata(&path).await {
                ledgers.push(LedgerInfo { path, metadata });
            }
        }
    }

    ledgers.sort_by(|a, b| b.metadata.saved_at.cmp(&a.metadata.saved_at));
    Ok(ledgers)
}

/// Ledger file name for a project.
pub fn ledger_path(base_dir: impl AsRef<Path>, project: &str) -> PathBuf {
    let sanitized = project
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>();
    base_dir.as_ref().join(format!("{sanitized}_canon.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_path_is_sanitized() {
        let path = ledger_path("/tmp/novel", "The Price of Silence");
        assert_eq!(path, PathBuf::from("/tmp/novel/the_price_of_silence_canon.json"));
    }

    #[test]
    fn test_metadata_counts() {
        let mut store = RuleStore::new();
        store.set_fact("tommy.instrument", "trombone", "ch1").unwrap();
        store.set_fact("tommy.instrument", "trumpet", "ch7").unwrap();
        let saved = SavedLedger::new("novel", store);

        assert_eq!(saved.version, LEDGER_VERSION);
        assert_eq!(saved.metadata.facts, 1);
        assert_eq!(saved.metadata.audit_entries, 2);
        assert_eq!(saved.metadata.project, "novel");
    }

    #[tokio::test]
    async fn test_older_layout_reports_version() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("old_canon.json");
        let old = r#"{"version": 1, "store": {"audit": {"entries": [
            {"sequence": 1, "action": {"action": "scope_declared", "chapter": "ch02", "flagged_phrases": 1}}
        ]}}}"#;
        fs::write(&path, old).await.unwrap();

        assert!(matches!(
            SavedLedger::load_json(&path).await,
            Err(PersistError::VersionMismatch { expected: LEDGER_VERSION, found: 1 })
        ));
    }
}
