//! Built-in 1950s era lexicon.
//!
//! Vocabulary that breaks a 1954 voice, grouped by category, with
//! period-appropriate alternatives where a direct swap exists. Seeded into a
//! rule store on request; after that the entries are ordinary prohibited
//! terms the author can extend.

use crate::rules::TermCategory;

/// One lexicon entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    pub category: TermCategory,
    pub pattern: &'static str,
    pub alternatives: Vec<&'static str>,
}

impl LexiconEntry {
    fn new(category: TermCategory, pattern: &'static str) -> Self {
        Self {
            category,
            pattern,
            alternatives: period_alternatives(pattern).to_vec(),
        }
    }
}

/// Period alternatives for a word, matched exactly (case-insensitive).
pub fn period_alternatives(word: &str) -> &'static [&'static str] {
    let word = word.trim().to_lowercase();
    ALTERNATIVES
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, alts)| *alts)
        .unwrap_or(&[])
}

/// Entries for one category.
pub fn entries_for(category: TermCategory) -> impl Iterator<Item = &'static LexiconEntry> {
    ERA_LEXICON.iter().filter(move |e| e.category == category)
}

const THERAPY_SPEAK: &[&str] = &[
    "trauma", "traumatic", "traumatized",
    "triggered", "triggering", "trigger warning",
    "processing", "process my feelings",
    "boundaries", "boundary", "set boundaries",
    "toxic", "toxicity", "toxic relationship",
    "gaslighting", "gaslight", "gaslighter",
    "codependent", "codependency",
    "enable", "enabler", "enabling behavior",
    "closure", "need closure", "get closure",
    "validate", "validation", "feel validated",
    "self-care", "self care",
    "safe space",
    "mindful", "mindfulness", "mindfully",
    "empower", "empowered", "empowerment",
    "unpack", "unpack that",
    "healing journey",
    "inner child",
    "coping mechanism",
    "red flag", "red flags",
    "narcissist", "narcissistic",
    "anxiety", "anxious",
    "depression", "depressed",
    "mental health",
    "therapy", "therapist",
    "support system",
    "emotional labor",
    "lived experience",
];

const CORPORATE_JARGON: &[&str] = &[
    "leverage", "leveraging",
    "synergy", "synergize", "synergistic",
    "circle back",
    "pivot", "pivoting",
    "bandwidth", "no bandwidth",
    "stakeholder", "stakeholders",
    "deliverable", "deliverables",
    "optimize", "optimization", "optimizing",
    "proactive", "proactively",
    "scalable", "scale up",
    "paradigm", "paradigm shift",
    "actionable", "action items",
    "core competency",
    "best practices",
    "value proposition",
    "move the needle",
    "low-hanging fruit",
    "drill down",
    "take offline",
    "loop in",
    "on my radar",
    "unpack this",
    "double-click on",
    "align", "alignment",
    "optics",
    "ecosystem",
];

const CONTEMPORARY_SLANG: &[&str] = &[
    "24/7", "twenty-four seven",
    "bottom line",
    "at the end of the day",
    "game-changer", "game changer",
    "no-brainer", "no brainer",
    "deep dive",
    "moving forward",
    "reach out", "reaching out",
    "heads up", "heads-up",
    "touch base",
    "ballpark", "in the ballpark",
    "pushback", "push back",
    "reality check",
    "wake-up call",
    "on the same page",
    "think outside the box",
    "take it to the next level",
    "win-win",
    "100 percent", "one hundred percent",
    "absolutely",
    "basically",
    "literally",
    "totally",
    "awesome",
    "amazing",
    "lifestyle",
    "networking",
    "multi-tasking", "multitasking",
    "downtime",
    "feedback",
];

const TECHNOLOGY_ANACHRONISMS: &[&str] = &[
    "computer", "computers",
    "satellite",
    "transistor",
    "electronic",
];

const ALTERNATIVES: &[(&str, &[&str])] = &[
    ("stressed", &["wound up", "wound tight", "on edge", "worked up", "keyed up"]),
    ("anxious", &["nervy", "jumpy", "jittery", "on edge", "uneasy"]),
    ("anxiety", &["nerves", "the jitters", "a case of nerves"]),
    ("depressed", &["low", "blue", "down", "in the dumps", "feeling low"]),
    ("depression", &["the blues", "a low spell"]),
    ("upset", &["rattled", "shaken", "put out", "sore"]),
    ("angry", &["sore", "steamed", "burned up", "hot under the collar"]),
    ("scared", &["spooked", "rattled", "shook up"]),
    ("relationship", &["situation", "arrangement", "understanding", "what we have"]),
    ("dating", &["going steady", "stepping out", "keeping company", "courting"]),
    ("boyfriend", &["fellow", "beau", "steady"]),
    ("girlfriend", &["girl", "steady", "sweetheart"]),
    ("awesome", &["swell", "grand", "first-rate"]),
    ("amazing", &["swell", "grand", "something else"]),
    ("totally", &["plenty", "clean", "all the way"]),
    ("absolutely", &["sure", "you bet", "you said it"]),
    ("literally", &["plain", "honest to God"]),
    ("reach out", &["get in touch", "look up", "drop a line"]),
    ("touch base", &["look in on", "check in with"]),
    ("heads up", &["fair warning", "tip-off"]),
    ("bottom line", &["long and short of it", "upshot"]),
];

lazy_static::lazy_static! {
    /// The full era lexicon, in category order.
    pub static ref ERA_LEXICON: Vec<LexiconEntry> = {
        let groups: [(TermCategory, &[&'static str]); 4] = [
            (TermCategory::TherapySpeak, THERAPY_SPEAK),
            (TermCategory::CorporateJargon, CORPORATE_JARGON),
            (TermCategory::ContemporarySlang, CONTEMPORARY_SLANG),
            (TermCategory::Anachronism, TECHNOLOGY_ANACHRONISMS),
        ];
        groups
            .into_iter()
            .flat_map(|(category, words)| {
                words.iter().map(move |w| LexiconEntry::new(category, *w))
            })
            .collect()
    };
}
