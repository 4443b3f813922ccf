//! Timeline extraction: dates in prose checked against `timeline.*` canon.
//!
//! A canon fact such as `timeline.circus_fire = "July 6, 1944"` names an
//! event. When the text mentions a date near that event's name, the
//! extractor proposes an observation for the key. Dates that agree with
//! canon are reported with the canon value, so only disagreements turn into
//! contradictions.

use crate::extract::{
    ceil_boundary, distance, floor_boundary, CanonObservation, Extractor, Span,
    DEFAULT_CONTEXT_WINDOW,
};
use crate::rules::{FactValue, RuleSet};
use crate::scanner::phrase_regex;
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Key prefix for timeline events.
pub const TIMELINE_PREFIX: &str = "timeline.";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy)]
enum DateShape {
    MonthDayYear,
    MonthYear,
    /// `month/day/year`, two- or four-digit year.
    Numeric,
    Iso,
}

lazy_static::lazy_static! {
    static ref DATE_PATTERNS: Vec<(DateShape, Regex)> = {
        let months = MONTHS.join("|");
        [
            (
                DateShape::MonthDayYear,
                format!(r"(?i)\b({months})\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s*(\d{{4}})\b"),
            ),
            (DateShape::MonthYear, format!(r"(?i)\b({months})\s+(\d{{4}})\b")),
            (DateShape::Numeric, r"\b(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})\b".to_string()),
            (DateShape::Iso, r"\b(\d{4})-(\d{2})-(\d{2})\b".to_string()),
        ]
        .into_iter()
        .filter_map(|(shape, p)| Regex::new(&p).ok().map(|re| (shape, re)))
        .collect()
    };
}

/// A calendar date as written in prose. The day is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MentionedDate {
    pub year: i32,
    pub month: u32,
    pub day: Option<u32>,
}

impl MentionedDate {
    /// A date, if it exists on the calendar.
    pub fn new(year: i32, month: u32, day: Option<u32>) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        if let Some(day) = day {
            NaiveDate::from_ymd_opt(year, month, day)?;
        }
        Some(Self { year, month, day })
    }

    /// The first date written anywhere in `text`.
    pub fn find(text: &str) -> Option<Self> {
        find_dates(text).into_iter().next().map(|(_, date)| date)
    }

    /// Whether two mentions can describe the same day.
    ///
    /// A mention without a day agrees with any day of its month.
    pub fn agrees_with(&self, other: &MentionedDate) -> bool {
        self.year == other.year
            && self.month == other.month
            && match (self.day, other.day) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }

    fn from_captures(shape: DateShape, caps: &Captures<'_>) -> Option<Self> {
        match shape {
            DateShape::MonthDayYear => Self::new(
                capture(caps, 3)?,
                month_number(caps.get(1)?.as_str())?,
                Some(capture(caps, 2)?),
            ),
            DateShape::MonthYear => {
                Self::new(capture(caps, 2)?, month_number(caps.get(1)?.as_str())?, None)
            }
            DateShape::Numeric => {
                let raw_year = caps.get(3)?.as_str();
                let year: i32 = raw_year.parse().ok()?;
                // Two-digit years are read as 19xx.
                let year = if raw_year.len() == 2 { 1900 + year } else { year };
                Self::new(year, capture(caps, 1)?, Some(capture(caps, 2)?))
            }
            DateShape::Iso => Self::new(capture(caps, 1)?, capture(caps, 2)?, Some(capture(caps, 3)?)),
        }
    }
}

impl fmt::Display for MentionedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(month) = (self.month as usize).checked_sub(1).and_then(|i| MONTHS.get(i)) else {
            return write!(f, "{}-{:02}", self.year, self.month);
        };
        match self.day {
            Some(day) => write!(f, "{month} {day}, {}", self.year),
            None => write!(f, "{month} {}", self.year),
        }
    }
}

fn capture<T: FromStr>(caps: &Captures<'_>, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .map(|i| i as u32 + 1)
}

/// Every date written in `text`, in text order.
pub fn find_dates(text: &str) -> Vec<(Span, MentionedDate)> {
    let mut found: Vec<(Span, MentionedDate)> = DATE_PATTERNS
        .iter()
        .flat_map(|(shape, re)| {
            re.captures_iter(text).filter_map(move |caps| {
                let whole = caps.get(0)?;
                let date = MentionedDate::from_captures(*shape, &caps)?;
                Some((Span::new(whole.start(), whole.end()), date))
            })
        })
        .collect();
    found.sort();
    found
}

struct TimelineEvent {
    key: String,
    canon: FactValue,
    date: MentionedDate,
    names: Vec<Regex>,
}

/// Heuristic timeline extractor.
///
/// Each `timeline.<event>` fact whose value contains a date is an event.
/// The event is recognized in prose by its name with underscores read as
/// spaces (`circus_fire` is "circus fire"). A trailing `.date` segment is
/// ignored, so `timeline.circus_fire.date` names the same event.
#[derive(Debug, Clone)]
pub struct TimelineExtractor {
    context_window: usize,
}

impl Default for TimelineExtractor {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl TimelineExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_window(mut self, bytes: usize) -> Self {
        self.context_window = bytes;
        self
    }

    fn events(&self, rules: &RuleSet) -> Vec<TimelineEvent> {
        rules
            .facts()
            .filter_map(|fact| {
                let rest = fact.key.strip_prefix(TIMELINE_PREFIX)?;
                let date = MentionedDate::find(&fact.value.to_string())?;
                let segments: Vec<String> = rest
                    .split('.')
                    .filter(|s| !s.is_empty() && *s != "date")
                    .map(|s| s.replace(['_', '-'], " "))
                    .collect();
                let mut labels = vec![segments.join(" ")];
                if let Some(last) = segments.last() {
                    if !labels.contains(last) {
                        labels.push(last.clone());
                    }
                }
                let names: Vec<Regex> = labels
                    .iter()
                    .filter(|l| !l.trim().is_empty())
                    .filter_map(|l| phrase_regex(l, false).ok())
                    .collect();
                (!names.is_empty()).then(|| TimelineEvent {
                    key: fact.key.clone(),
                    canon: fact.value.clone(),
                    date,
                    names,
                })
            })
            .collect()
    }
}

impl Extractor for TimelineExtractor {
    fn extract(&self, text: &str, rules: &RuleSet) -> Vec<CanonObservation> {
        let events = self.events(rules);
        if events.is_empty() || text.is_empty() {
            return Vec::new();
        }

        let mut observations = Vec::new();
        for (span, date) in find_dates(text) {
            let lo = floor_boundary(text, span.start.saturating_sub(self.context_window));
            let hi = ceil_boundary(text, span.end.saturating_add(self.context_window));
            let window = &text[lo..hi];

            let nearest = events
                .iter()
                .filter_map(|event| {
                    event
                        .names
                        .iter()
                        .flat_map(|re| re.find_iter(window))
                        .map(|m| distance(lo + m.start(), lo + m.end(), span.start, span.end))
                        .min()
                        .map(|d| (d, event))
                })
                .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.key.cmp(&b.1.key)));

            if let Some((_, event)) = nearest {
                let observed = if event.date.agrees_with(&date) {
                    event.canon.clone()
                } else {
                    FactValue::Text(text[span.start..span.end].to_string())
                };
                observations.push(CanonObservation::new(event.key.clone(), observed, span));
            }
        }
        debug!(count = observations.len(), "timeline observations proposed");
        observations
    }
}
