//! Reports: findings grouped for a human reviewer.

use crate::finding::{ScanFinding, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// More than this many blocking and warning findings means the chapter
/// needs real work rather than a review pass.
pub const NEEDS_WORK_THRESHOLD: usize = 5;

/// Overall judgement of a scanned chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Nothing found.
    Clean,
    /// Only advisory findings.
    Minor,
    /// A handful of findings worth reviewing.
    Review,
    /// Many findings.
    NeedsWork,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Clean => "CLEAN",
            Verdict::Minor => "MINOR",
            Verdict::Review => "REVIEW",
            Verdict::NeedsWork => "NEEDS WORK",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Verdict::Clean => "No issues detected",
            Verdict::Minor => "Only advisory suggestions",
            Verdict::Review => "Review flagged passages",
            Verdict::NeedsWork => "Multiple issues to address",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.label(), self.description())
    }
}

/// Findings grouped by severity with per-category counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub blocking: Vec<ScanFinding>,
    pub warning: Vec<ScanFinding>,
    pub advisory: Vec<ScanFinding>,
    pub by_category: BTreeMap<String, usize>,
    pub verdict: Verdict,
}

impl Report {
    pub fn group(&self, severity: Severity) -> &[ScanFinding] {
        match severity {
            Severity::Blocking => &self.blocking,
            Severity::Warning => &self.warning,
            Severity::Advisory => &self.advisory,
        }
    }

    pub fn total(&self) -> usize {
        self.blocking.len() + self.warning.len() + self.advisory.len()
    }

    pub fn by_severity(&self) -> BTreeMap<Severity, usize> {
        Severity::ALL
            .into_iter()
            .map(|s| (s, self.group(s).len()))
            .collect()
    }

    /// Whether anything must be fixed before export.
    pub fn is_blocking(&self) -> bool {
        !self.blocking.is_empty()
    }

    /// Whether any finding is at least as urgent as `threshold`.
    pub fn has_at_least(&self, threshold: Severity) -> bool {
        Severity::ALL
            .into_iter()
            .filter(|s| *s <= threshold)
            .any(|s| !self.group(s).is_empty())
    }

    /// All findings, most urgent group first.
    pub fn iter(&self) -> impl Iterator<Item = &ScanFinding> {
        self.blocking
            .iter()
            .chain(self.warning.iter())
            .chain(self.advisory.iter())
    }
}

/// Group findings into a report.
///
/// Exact duplicates are dropped. Within a group, findings keep text order.
pub fn build_report(findings: impl IntoIterator<Item = ScanFinding>) -> Report {
    let mut seen = HashSet::new();
    let mut blocking = Vec::new();
    let mut warning = Vec::new();
    let mut advisory = Vec::new();
    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();

    for finding in findings {
        if !seen.insert(finding.clone()) {
            continue;
        }
        *by_category
            .entry(finding.rule.category_label().to_string())
            .or_default() += 1;
        match finding.severity {
            Severity::Blocking => blocking.push(finding),
            Severity::Warning => warning.push(finding),
            Severity::Advisory => advisory.push(finding),
        }
    }
    for group in [&mut blocking, &mut warning, &mut advisory] {
        group.sort_by_key(|f| (f.location.start, f.location.end));
    }

    let pressing = blocking.len() + warning.len();
    let verdict = if pressing > NEEDS_WORK_THRESHOLD {
        Verdict::NeedsWork
    } else if pressing > 0 {
        Verdict::Review
    } else if !advisory.is_empty() {
        Verdict::Minor
    } else {
        Verdict::Clean
    };

    Report {
        blocking,
        warning,
        advisory,
        by_category,
        verdict,
    }
}

/// One chapter's report within a manuscript run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterReport {
    pub chapter: String,
    pub report: Report,
}

/// Reports for several chapters, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptReport {
    pub chapters: Vec<ChapterReport>,
}

impl ManuscriptReport {
    pub fn push(&mut self, chapter: impl Into<String>, report: Report) {
        self.chapters.push(ChapterReport {
            chapter: chapter.into(),
            report,
        });
    }

    pub fn total(&self) -> usize {
        self.chapters.iter().map(|c| c.report.total()).sum()
    }

    /// Findings of one severity across every chapter.
    pub fn count(&self, severity: Severity) -> usize {
        self.chapters
            .iter()
            .map(|c| c.report.group(severity).len())
            .sum()
    }

    /// The worst chapter verdict; clean when there are no chapters.
    pub fn verdict(&self) -> Verdict {
        self.chapters
            .iter()
            .map(|c| c.report.verdict)
            .max()
            .unwrap_or(Verdict::Clean)
    }

    pub fn has_at_least(&self, threshold: Severity) -> bool {
        self.chapters.iter().any(|c| c.report.has_at_least(threshold))
    }
}

/// Plain-text overview of a manuscript run, one line per chapter.
pub fn render_manuscript_summary(manuscript: &ManuscriptReport) -> String {
    let mut out = format!(
        "Manuscript: {} chapter(s), {} finding(s): {} blocking, {} warning, {} advisory\nOverall: {}\n\n",
        manuscript.chapters.len(),
        manuscript.total(),
        manuscript.count(Severity::Blocking),
        manuscript.count(Severity::Warning),
        manuscript.count(Severity::Advisory),
        manuscript.verdict()
    );
    for c in &manuscript.chapters {
        out.push_str(&format!(
            "  {:<16} {:<11} {} finding(s)\n",
            c.chapter,
            c.report.verdict.label(),
            c.report.total()
        ));
    }
    out
}

/// Markdown overview of a manuscript run.
pub fn render_manuscript_markdown(manuscript: &ManuscriptReport, title: &str) -> String {
    let mut lines = vec![
        format!("# Manuscript Report: {title}"),
        String::new(),
        format!("**Overall**: {}", manuscript.verdict()),
        String::new(),
        "| Chapter | Verdict | Blocking | Warning | Advisory |".to_string(),
        "|---------|---------|----------|---------|----------|".to_string(),
    ];
    for c in &manuscript.chapters {
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            c.chapter,
            c.report.verdict.label(),
            c.report.blocking.len(),
            c.report.warning.len(),
            c.report.advisory.len()
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain-text rendering, stable for identical reports.
pub fn render_text(report: &Report) -> String {
    let mut out = format!(
        "Verdict: {} ({} finding(s): {} blocking, {} warning, {} advisory)\n",
        report.verdict,
        report.total(),
        report.blocking.len(),
        report.warning.len(),
        report.advisory.len()
    );

    for severity in Severity::ALL {
        let group = report.group(severity);
        if group.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&severity.tag().to_uppercase());
        out.push('\n');
        for f in group {
            out.push_str(&format!(
                "  {}:{}  \"{}\"  [{}] {}",
                f.location.line,
                f.location.column,
                one_line(&f.matched_text),
                f.rule.category_label(),
                f.rule.identifier()
            ));
            if let Some(suggestion) = &f.suggestion {
                out.push_str(&format!("  ({suggestion})"));
            }
            out.push('\n');
        }
    }

    if !report.by_category.is_empty() {
        out.push_str("\nBy category:\n");
        for (category, count) in &report.by_category {
            out.push_str(&format!("  {category}: {count}\n"));
        }
    }
    out
}

/// Markdown rendering for review files.
pub fn render_markdown(report: &Report, title: &str) -> String {
    let mut lines = vec![
        format!("# Lint Report: {title}"),
        String::new(),
        format!("**Verdict**: {}", report.verdict),
        String::new(),
        "| Severity | Count |".to_string(),
        "|----------|-------|".to_string(),
    ];
    for (severity, count) in report.by_severity() {
        lines.push(format!("| {severity} | {count} |"));
    }

    if !report.by_category.is_empty() {
        lines.push(String::new());
        lines.push("## By Category".to_string());
        lines.push(String::new());
        for (category, count) in &report.by_category {
            lines.push(format!("- **{category}**: {count}"));
        }
    }

    for severity in Severity::ALL {
        let group = report.group(severity);
        if group.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("## {} ({})", severity.tag().to_uppercase(), group.len()));
        lines.push(String::new());
        for f in group {
            let mut line = format!(
                "- Line {}, col {}: `{}` ({})",
                f.location.line,
                f.location.column,
                one_line(&f.matched_text),
                f.rule.category_label()
            );
            if let Some(suggestion) = &f.suggestion {
                line.push_str(&format!(" - {suggestion}"));
            }
            lines.push(line);
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
