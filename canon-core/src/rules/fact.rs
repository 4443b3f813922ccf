//! Canon facts: declared truths about the story world.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value of a canon fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Flag(bool),
    Integer(i64),
    Text(String),
}

impl FactValue {
    /// Parse a value typed by a person: integers and `true`/`false` become
    /// typed values, everything else is text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return FactValue::Integer(n);
        }
        match trimmed.to_lowercase().as_str() {
            "true" => FactValue::Flag(true),
            "false" => FactValue::Flag(false),
            _ => FactValue::Text(trimmed.to_string()),
        }
    }

    /// Whether an observed value agrees with this canon value.
    ///
    /// Text compares trimmed and case-insensitively. Text that parses as the
    /// same integer or flag agrees with a typed value.
    pub fn agrees_with(&self, observed: &FactValue) -> bool {
        match (self, observed) {
            (FactValue::Text(a), FactValue::Text(b)) => {
                a.trim().to_lowercase() == b.trim().to_lowercase()
            }
            (FactValue::Integer(a), FactValue::Integer(b)) => a == b,
            (FactValue::Flag(a), FactValue::Flag(b)) => a == b,
            (FactValue::Text(t), typed) | (typed, FactValue::Text(t)) => {
                FactValue::parse(t) == *typed
            }
            _ => false,
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Flag(b) => write!(f, "{b}"),
            FactValue::Integer(n) => write!(f, "{n}"),
            FactValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        FactValue::Text(s.to_string())
    }
}

impl From<String> for FactValue {
    fn from(s: String) -> Self {
        FactValue::Text(s)
    }
}

impl From<i64> for FactValue {
    fn from(n: i64) -> Self {
        FactValue::Integer(n)
    }
}

impl From<i32> for FactValue {
    fn from(n: i32) -> Self {
        FactValue::Integer(i64::from(n))
    }
}

impl From<u32> for FactValue {
    fn from(n: u32) -> Self {
        FactValue::Integer(i64::from(n))
    }
}

impl From<bool> for FactValue {
    fn from(b: bool) -> Self {
        FactValue::Flag(b)
    }
}

/// A superseded value of a canon fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRevision {
    pub value: FactValue,
    pub source: String,
    pub version: u32,
    pub recorded_at: DateTime<Utc>,
    pub superseded_at: DateTime<Utc>,
}

/// A single declared truth about the story world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonFact {
    /// Dotted identifier, e.g. `tommy.instrument`.
    pub key: String,
    pub value: FactValue,
    /// Chapter or document that established the current value.
    pub source: String,
    /// Starts at 1 and grows on every change.
    pub version: u32,
    pub recorded_at: DateTime<Utc>,
    /// Prior values, oldest first. Never truncated.
    #[serde(default)]
    pub history: Vec<FactRevision>,
}

impl CanonFact {
    pub(crate) fn new(key: String, value: FactValue, source: String, at: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            source,
            version: 1,
            recorded_at: at,
            history: Vec::new(),
        }
    }

    /// Replace the current value, moving the old one into history.
    pub(crate) fn revise(&mut self, value: FactValue, source: String, at: DateTime<Utc>) {
        let previous = FactRevision {
            value: std::mem::replace(&mut self.value, value),
            source: std::mem::replace(&mut self.source, source),
            version: self.version,
            recorded_at: self.recorded_at,
            superseded_at: at,
        };
        self.history.push(previous);
        self.version += 1;
        self.recorded_at = at;
    }

    /// The subject part of the key (`tommy` for `tommy.age.1952`).
    pub fn subject(&self) -> &str {
        self.key.split('.').next().unwrap_or(&self.key)
    }

    /// Distinct sources that have ever declared this fact, oldest first.
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for source in self
            .history
            .iter()
            .map(|r| r.source.as_str())
            .chain(std::iter::once(self.source.as_str()))
        {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parsing() {
        assert_eq!(FactValue::parse("17"), FactValue::Integer(17));
        assert_eq!(FactValue::parse(" TRUE "), FactValue::Flag(true));
        assert_eq!(
            FactValue::parse(" trombone "),
            FactValue::Text("trombone".to_string())
        );
    }

    #[test]
    fn test_value_agreement() {
        let canon = FactValue::from("Trombone");
        assert!(canon.agrees_with(&FactValue::from(" trombone")));
        assert!(!canon.agrees_with(&FactValue::from("trumpet")));

        let age = FactValue::Integer(17);
        assert!(age.agrees_with(&FactValue::from("17")));
        assert!(FactValue::from("17").agrees_with(&age));
        assert!(!age.agrees_with(&FactValue::Integer(19)));
        assert!(!age.agrees_with(&FactValue::Flag(true)));
    }

    #[test]
    fn test_revision_keeps_history() {
        let t0 = Utc::now();
        let mut fact = CanonFact::new(
            "circus.name".to_string(),
            FactValue::from("Wallace Brothers"),
            "character bible".to_string(),
            t0,
        );
        fact.revise(
            FactValue::from("Clyde Beatty-Cole Bros."),
            "timeline".to_string(),
            Utc::now(),
        );

        assert_eq!(fact.version, 2);
        assert_eq!(fact.history.len(), 1);
        assert_eq!(fact.history[0].value, FactValue::from("Wallace Brothers"));
        assert_eq!(fact.history[0].version, 1);
        assert_eq!(fact.sources(), vec!["character bible", "timeline"]);
        assert_eq!(fact.subject(), "circus");
    }
}
