//! Command-line arguments.

use canon_core::{ChapterState, DocumentClass, Severity, TermCategory};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "canon",
    version,
    about = "Canon ledger and era-language linter for the manuscript",
    long_about = "Keep canon facts, prohibited vocabulary and chapter scopes in a versioned ledger, \
                  and lint chapters against them. The linter reports; it never edits text.",
    after_help = "Settings resolve in order: built-in defaults, --config file, CANON_* environment \
                  variables (a .env file is read if present), then command-line flags."
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Ledger file (default: canon.json)")]
    pub store: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH", help = "JSON settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Name recorded on audit entries")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new ledger.
    Init(InitArgs),
    /// Lint chapter files, or every chapter in a directory.
    Lint(LintArgs),
    /// Canon facts.
    #[command(subcommand)]
    Fact(FactCommand),
    /// Prohibited vocabulary.
    #[command(subcommand)]
    Term(TermCommand),
    /// Per-chapter rule scopes.
    #[command(subcommand)]
    Scope(ScopeCommand),
    /// Chapter lock states.
    #[command(subcommand)]
    Chapter(ChapterCommand),
    /// Research documents.
    #[command(subcommand)]
    Doc(DocCommand),
    /// Show the audit log.
    Audit(AuditArgs),
    /// Write the audit log as a markdown changelog.
    Changelog {
        #[arg(value_name = "OUT")]
        out: PathBuf,
    },
    /// Print a markdown summary of current canon.
    Summary,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(long, help = "Start without the built-in era lexicon")]
    pub no_lexicon: bool,
    #[arg(long, default_value = "manuscript", help = "Project name stored in the ledger")]
    pub project: String,
    #[arg(long, help = "Replace an existing ledger")]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Markdown,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailOn {
    Blocking,
    Warning,
    Advisory,
    Never,
}

impl FailOn {
    pub fn threshold(self) -> Option<Severity> {
        match self {
            FailOn::Blocking => Some(Severity::Blocking),
            FailOn::Warning => Some(Severity::Warning),
            FailOn::Advisory => Some(Severity::Advisory),
            FailOn::Never => None,
        }
    }
}

#[derive(Debug, Args)]
pub struct LintArgs {
    #[arg(
        value_name = "PATH",
        required = true,
        num_args = 1..,
        help = "Chapter files or directories of .md/.txt chapters"
    )]
    pub paths: Vec<PathBuf>,
    #[arg(long, help = "Chapter id for a single file (default: file stem)")]
    pub chapter: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON array of observations proposed by an extraction tool"
    )]
    pub observations: Option<PathBuf>,
    #[arg(long, help = "Propose age observations heuristically")]
    pub ages: bool,
    #[arg(long, help = "Propose timeline.* observations from dates in the text")]
    pub timeline: bool,
    #[arg(
        long = "fail-on",
        value_enum,
        default_value_t = FailOn::Blocking,
        help = "Exit non-zero when a finding at or above this severity exists"
    )]
    pub fail_on: FailOn,
    #[arg(long, help = "Report title (markdown format)")]
    pub title: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum FactCommand {
    /// Show the current value of a key.
    Get { key: String },
    /// Declare or change a fact.
    Set {
        key: String,
        value: String,
        #[arg(long, help = "Chapter or document establishing the value")]
        source: String,
    },
    /// Show every version of a key.
    History { key: String },
    /// List all current facts.
    List,
    /// List facts declared by more than one source.
    Contested,
}

#[derive(Debug, Subcommand)]
pub enum TermCommand {
    /// Prohibit a word or phrase. A trailing `*` also matches longer words.
    Add {
        pattern: String,
        #[arg(long, short)]
        category: TermCategory,
        #[arg(long = "alt", value_name = "WORD", help = "Suggested replacement, repeatable")]
        alternatives: Vec<String>,
    },
    /// List prohibited terms.
    List {
        #[arg(long, short)]
        category: Option<TermCategory>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ScopeCommand {
    /// Declare or replace a chapter's scope.
    Set {
        chapter: String,
        #[arg(long, value_delimiter = ',', help = "Active categories")]
        active: Vec<TermCategory>,
        #[arg(long = "high-risk", value_delimiter = ',', help = "Categories that block export")]
        high_risk: Vec<TermCategory>,
        #[arg(long = "phrase", value_name = "PHRASE", help = "Forbidden phrase, repeatable")]
        phrases: Vec<String>,
    },
    /// Show the scope a chapter is scanned under.
    Show { chapter: String },
}

#[derive(Debug, Subcommand)]
pub enum ChapterCommand {
    /// Show a chapter's lock record.
    Status { chapter: String },
    /// Move a chapter to another state.
    Set {
        chapter: String,
        state: ChapterState,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Return a canon-locked chapter to revised.
    Unlock {
        chapter: String,
        #[arg(long)]
        reason: String,
    },
    /// List tracked chapters.
    List,
}

#[derive(Debug, Subcommand)]
pub enum DocCommand {
    /// Register a research document.
    Register {
        title: String,
        #[arg(long)]
        class: DocumentClass,
        #[arg(long)]
        subtype: Option<String>,
    },
    /// Move a document to another class.
    Reclassify {
        id: Uuid,
        #[arg(long)]
        class: DocumentClass,
        #[arg(long)]
        reason: String,
    },
    /// List registered documents.
    List {
        #[arg(long)]
        class: Option<DocumentClass>,
    },
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    #[arg(long, help = "Only entries about this canon key")]
    pub key: Option<String>,
    #[arg(long, value_name = "N", help = "Only the last N entries")]
    pub last: Option<usize>,
}
