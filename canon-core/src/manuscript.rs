//! Whole-manuscript checks: every chapter file, one report each.

use crate::error::Result;
use crate::extract::Extractor;
use crate::persist::PersistError;
use crate::report::{build_report, ManuscriptReport};
use crate::scanner::Scanner;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File extensions treated as chapter text.
pub const CHAPTER_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// A chapter on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFile {
    /// Chapter id, taken from the file stem.
    pub chapter: String,
    /// Number parsed from names like `ch03`, `chapter_12_title` or `07_title`.
    pub number: Option<u32>,
    pub path: PathBuf,
}

impl ChapterFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let chapter = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            number: chapter_number(&chapter),
            chapter,
            path,
        }
    }

    pub fn is_chapter_text(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| CHAPTER_EXTENSIONS.iter().any(|c| c.eq_ignore_ascii_case(e)))
    }
}

/// The chapter number in a file stem, if it has one.
pub fn chapter_number(stem: &str) -> Option<u32> {
    let lower = stem.trim().to_lowercase();
    let rest = ["chapter", "ch"]
        .iter()
        .find_map(|prefix| lower.strip_prefix(prefix))
        .unwrap_or(&lower)
        .trim_start_matches(['_', '-', ' ']);
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Chapter files in a directory, in reading order.
///
/// Numbered chapters come first by number, then unnumbered files by name.
pub async fn discover_chapters(dir: impl AsRef<Path>) -> std::result::Result<Vec<ChapterFile>, PersistError> {
    let mut chapters = Vec::new();
    let mut entries = fs::read_dir(dir.as_ref()).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && ChapterFile::is_chapter_text(&path) {
            chapters.push(ChapterFile::from_path(path));
        }
    }

    sort_chapters(&mut chapters);
    debug!(dir = %dir.as_ref().display(), count = chapters.len(), "chapters discovered");
    Ok(chapters)
}

/// Put chapters in reading order.
pub fn sort_chapters(chapters: &mut [ChapterFile]) {
    chapters.sort_by(|a, b| {
        (a.number.is_none(), a.number, &a.chapter).cmp(&(b.number.is_none(), b.number, &b.chapter))
    });
}

/// Lint each chapter with one scanner and one extractor.
///
/// Chapters are reported in the order given. The first chapter the scanner
/// refuses (an undeclared chapter under strict scopes) stops the run.
pub fn lint_manuscript<'a, E>(
    scanner: &Scanner,
    chapters: impl IntoIterator<Item = (&'a str, &'a str)>,
    extractor: &E,
) -> Result<ManuscriptReport>
where
    E: Extractor + ?Sized,
{
    let mut manuscript = ManuscriptReport::default();
    for (chapter, text) in chapters {
        let findings = scanner.scan_with(chapter, text, extractor)?;
        manuscript.push(chapter, build_report(findings));
    }
    info!(
        chapters = manuscript.chapters.len(),
        findings = manuscript.total(),
        verdict = ?manuscript.verdict(),
        "manuscript linted"
    );
    Ok(manuscript)
}
