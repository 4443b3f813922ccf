//! Governance configuration.
//!
//! Settings come from built-in defaults, then an optional JSON file, then
//! environment variables, each layer overriding the one before.

use crate::extract::{AgeExtractor, DEFAULT_CONTEXT_WINDOW};
use crate::rules::{RuleStore, DEFAULT_ACTOR};
use crate::scanner::ScopeResolution;
use crate::timeline::TimelineExtractor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Environment variable naming the ledger file.
pub const ENV_STORE: &str = "CANON_STORE";
/// Environment variable naming the actor recorded on audit entries.
pub const ENV_ACTOR: &str = "CANON_ACTOR";
/// Environment variable that, when truthy, refuses to scan undeclared chapters.
pub const ENV_STRICT_SCOPES: &str = "CANON_STRICT_SCOPES";
/// Environment variable with the in-story year used for age keys.
pub const ENV_STORY_YEAR: &str = "CANON_STORY_YEAR";

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
}

/// Settings for a governance session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Where the ledger lives.
    pub store_path: PathBuf,

    /// Who is recorded on audit entries.
    pub actor: String,

    /// How chapters without a declared scope are scanned.
    pub scope_resolution: ScopeResolution,

    /// Bytes searched around an age mention for a subject name.
    pub age_context_window: usize,

    /// In-story year, selects `<subject>.age.<year>` keys.
    pub story_year: Option<i32>,

    /// Seed the era lexicon into a fresh store.
    pub seed_lexicon: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("canon.json"),
            actor: DEFAULT_ACTOR.to_string(),
            scope_resolution: ScopeResolution::DefaultWhenUndeclared,
            age_context_window: DEFAULT_CONTEXT_WINDOW,
            story_year: None,
            seed_lexicon: true,
        }
    }
}

impl GovernanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Refuse to scan chapters with no declared scope.
    pub fn with_strict_scopes(mut self, strict: bool) -> Self {
        self.scope_resolution = if strict {
            ScopeResolution::DeclaredOnly
        } else {
            ScopeResolution::DefaultWhenUndeclared
        };
        self
    }

    pub fn with_age_context_window(mut self, bytes: usize) -> Self {
        self.age_context_window = bytes;
        self
    }

    pub fn with_story_year(mut self, year: i32) -> Self {
        self.story_year = Some(year);
        self
    }

    pub fn with_seed_lexicon(mut self, seed: bool) -> Self {
        self.seed_lexicon = seed;
        self
    }

    /// Load from a JSON file. Missing fields keep their defaults.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_STORE) {
            self.store_path = PathBuf::from(path.trim());
        }
        if let Some(actor) = get(ENV_ACTOR) {
            self.actor = actor.trim().to_string();
        }
        if let Some(value) = get(ENV_STRICT_SCOPES) {
            let strict = match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: ENV_STRICT_SCOPES,
                        value,
                    })
                }
            };
            self = self.with_strict_scopes(strict);
        }
        if let Some(value) = get(ENV_STORY_YEAR) {
            let year = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_STORY_YEAR,
                value: value.clone(),
            })?;
            self.story_year = Some(year);
        }
        Ok(self)
    }

    /// The age extractor these settings describe.
    pub fn age_extractor(&self) -> AgeExtractor {
        let extractor = AgeExtractor::new().with_context_window(self.age_context_window);
        match self.story_year {
            Some(year) => extractor.with_story_year(year),
            None => extractor,
        }
    }

    /// The timeline extractor these settings describe. It shares the age
    /// context window.
    pub fn timeline_extractor(&self) -> TimelineExtractor {
        TimelineExtractor::new().with_context_window(self.age_context_window)
    }

    /// A fresh store for these settings.
    pub fn new_store(&self) -> RuleStore {
        let store = if self.seed_lexicon {
            RuleStore::with_era_lexicon()
        } else {
            RuleStore::new()
        };
        store.with_actor(self.actor.clone())
    }
}
