//! Command handlers.

use crate::cli::{
    AuditArgs, ChapterCommand, Cli, Command, DocCommand, FactCommand, InitArgs, LintArgs,
    OutputFormat, ScopeCommand, TermCommand,
};
use anyhow::{bail, Context, Result};
use canon_core::extract::Extractor;
use canon_core::persist::{write_changelog, SavedLedger};
use canon_core::rules::RuleSet;
use canon_core::{
    discover_chapters, lint_manuscript, render_manuscript_markdown, render_manuscript_summary,
    render_markdown, render_text, CanonObservation, ChapterFile, ChapterLock, ChapterRuleScope,
    FactValue, GovernanceConfig, ManuscriptReport, RuleStore, Scanner, TermCategory,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::fs;
use tracing::{debug, info};

/// Exit code when lint findings reach the `--fail-on` threshold.
const LINT_FAILED: u8 = 2;

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli).await?;
    debug!(store = %config.store_path.display(), actor = %config.actor, "configuration resolved");

    match cli.command {
        Command::Init(args) => init(&config, args).await,
        Command::Lint(args) => Ok(if lint(&config, args).await? {
            ExitCode::from(LINT_FAILED)
        } else {
            ExitCode::SUCCESS
        }),
        Command::Fact(cmd) => mutate(&config, |store| fact(store, cmd)).await,
        Command::Term(cmd) => mutate(&config, |store| term(store, cmd)).await,
        Command::Scope(cmd) => mutate(&config, |store| scope(store, cmd)).await,
        Command::Chapter(cmd) => mutate(&config, |store| chapter(store, cmd)).await,
        Command::Doc(cmd) => mutate(&config, |store| doc(store, cmd)).await,
        Command::Audit(args) => {
            let ledger = Ledger::open(&config).await?;
            audit(&ledger.store, args);
            Ok(ExitCode::SUCCESS)
        }
        Command::Changelog { out } => {
            let ledger = Ledger::open(&config).await?;
            write_changelog(&ledger.store, &out)
                .await
                .with_context(|| format!("writing changelog to {}", out.display()))?;
            println!(
                "Wrote {} audit entries to {}",
                ledger.store.audit_log().len(),
                out.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Summary => {
            let ledger = Ledger::open(&config).await?;
            println!("{}", ledger.store.canon_summary());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn resolve_config(cli: &Cli) -> Result<GovernanceConfig> {
    let config = match &cli.config {
        Some(path) => GovernanceConfig::load_json(path)
            .await
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GovernanceConfig::new(),
    };
    let mut config = config.apply_env()?;
    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    if let Some(actor) = &cli.actor {
        config.actor = actor.clone();
    }
    Ok(config)
}

// =============================================================================
// Ledger
// =============================================================================

struct Ledger {
    path: PathBuf,
    project: String,
    store: RuleStore,
}

impl Ledger {
    async fn open(config: &GovernanceConfig) -> Result<Self> {
        let path = config.store_path.clone();
        let exists = fs::try_exists(&path)
            .await
            .with_context(|| format!("checking for ledger {}", path.display()))?;
        if !exists {
            bail!(
                "no ledger at {}; create one with `canon init`",
                path.display()
            );
        }
        let saved = SavedLedger::load_json(&path)
            .await
            .with_context(|| format!("loading ledger {}", path.display()))?;
        let mut store = saved.store;
        store.set_actor(config.actor.clone());
        Ok(Self {
            path,
            project: saved.metadata.project,
            store,
        })
    }

    async fn save(&self) -> Result<()> {
        SavedLedger::new(&self.project, self.store.clone())
            .save_json(&self.path)
            .await
            .with_context(|| format!("saving ledger {}", self.path.display()))
    }
}

/// Apply a change and save only when the audit log grew.
async fn mutate(
    config: &GovernanceConfig,
    f: impl FnOnce(&mut RuleStore) -> Result<()>,
) -> Result<ExitCode> {
    let mut ledger = Ledger::open(config).await?;
    let before = ledger.store.audit_log().len();
    f(&mut ledger.store)?;
    if ledger.store.audit_log().len() != before {
        ledger.save().await?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn init(config: &GovernanceConfig, args: InitArgs) -> Result<ExitCode> {
    let path = &config.store_path;
    let exists = fs::try_exists(path)
        .await
        .with_context(|| format!("checking for ledger {}", path.display()))?;
    if !args.force && exists {
        bail!("{} already exists; pass --force to replace it", path.display());
    }
    let config = config.clone().with_seed_lexicon(config.seed_lexicon && !args.no_lexicon);
    let ledger = Ledger {
        path: path.clone(),
        project: args.project,
        store: config.new_store(),
    };
    ledger.save().await?;
    info!(path = %path.display(), "ledger created");
    println!(
        "Created {} with {} prohibited term(s)",
        path.display(),
        ledger.store.list_prohibited(None).len()
    );
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// Lint
// =============================================================================

/// Lint every chapter named on the command line. Returns whether the
/// `--fail-on` threshold was reached in any chapter.
async fn lint(config: &GovernanceConfig, args: LintArgs) -> Result<bool> {
    let ledger = Ledger::open(config).await?;
    let files = collect_chapters(&args.paths).await?;
    if files.is_empty() {
        bail!("no chapter files found");
    }
    if files.len() > 1 && (args.chapter.is_some() || args.observations.is_some()) {
        bail!("--chapter and --observations apply to a single chapter file");
    }

    let mut chapters = Vec::with_capacity(files.len());
    for file in &files {
        let text = fs::read_to_string(&file.path)
            .await
            .with_context(|| format!("reading {}", file.path.display()))?;
        let chapter = args.chapter.clone().unwrap_or_else(|| file.chapter.clone());
        chapters.push((chapter, text));
    }

    let supplied = match &args.observations {
        Some(path) => read_observations(path).await?,
        None => Vec::new(),
    };
    let ages = args.ages.then(|| config.age_extractor());
    let timeline = args.timeline.then(|| config.timeline_extractor());
    let extractor = |text: &str, rules: &RuleSet| {
        let mut observations = supplied.clone();
        if let Some(ages) = &ages {
            observations.extend(ages.extract(text, rules));
        }
        if let Some(timeline) = &timeline {
            observations.extend(timeline.extract(text, rules));
        }
        observations
    };

    let scanner = Scanner::new(ledger.store.snapshot()).with_resolution(config.scope_resolution);
    let manuscript = lint_manuscript(
        &scanner,
        chapters.iter().map(|(c, t)| (c.as_str(), t.as_str())),
        &extractor,
    )?;
    print_reports(&manuscript, &args)?;

    Ok(args
        .fail_on
        .threshold()
        .is_some_and(|t| manuscript.has_at_least(t)))
}

/// Files are taken as given; directories expand to their chapters in
/// reading order.
async fn collect_chapters(paths: &[PathBuf]) -> Result<Vec<ChapterFile>> {
    let mut chapters = Vec::new();
    for path in paths {
        let metadata = fs::metadata(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        if metadata.is_dir() {
            let found = discover_chapters(path)
                .await
                .with_context(|| format!("listing chapters in {}", path.display()))?;
            debug!(dir = %path.display(), count = found.len(), "chapters found");
            chapters.extend(found);
        } else {
            chapters.push(ChapterFile::from_path(path.clone()));
        }
    }
    Ok(chapters)
}

fn print_reports(manuscript: &ManuscriptReport, args: &LintArgs) -> Result<()> {
    let single = manuscript.chapters.len() == 1;
    match args.format {
        OutputFormat::Text => {
            for c in &manuscript.chapters {
                if !single {
                    println!("== {} ==", c.chapter);
                }
                print!("{}", render_text(&c.report));
                if !single {
                    println!();
                }
            }
            if !single {
                print!("{}", render_manuscript_summary(manuscript));
            }
        }
        OutputFormat::Markdown => {
            for c in &manuscript.chapters {
                let title = match (&args.title, single) {
                    (Some(title), true) => title.as_str(),
                    _ => c.chapter.as_str(),
                };
                println!("{}", render_markdown(&c.report, title));
            }
            if !single {
                let title = args.title.as_deref().unwrap_or("Manuscript");
                print!("{}", render_manuscript_markdown(manuscript, title));
            }
        }
        OutputFormat::Json => match manuscript.chapters.as_slice() {
            [only] => println!("{}", serde_json::to_string_pretty(&only.report)?),
            _ => println!("{}", serde_json::to_string_pretty(manuscript)?),
        },
    }
    Ok(())
}

async fn read_observations(path: &Path) -> Result<Vec<CanonObservation>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading observations {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing observations {}", path.display()))
}

// =============================================================================
// Rule Store Commands
// =============================================================================

fn fact(store: &mut RuleStore, cmd: FactCommand) -> Result<()> {
    match cmd {
        FactCommand::Get { key } => {
            let fact = store.get_fact(&key)?;
            println!("{} = {} (v{}, from {})", fact.key, fact.value, fact.version, fact.source);
        }
        FactCommand::Set { key, value, source } => {
            let version = store.set_fact(&key, FactValue::parse(&value), &source)?;
            println!("{} is at version {version}", key.trim());
        }
        FactCommand::History { key } => {
            for v in store.fact_history(&key)? {
                println!(
                    "v{}  {}  {}  (from {}){}",
                    v.version,
                    v.recorded_at.format("%Y-%m-%d %H:%M"),
                    v.value,
                    v.source,
                    if v.current { "  <- current" } else { "" }
                );
            }
        }
        FactCommand::List => {
            for fact in store.rules().facts() {
                println!("{} = {} (v{})", fact.key, fact.value, fact.version);
            }
        }
        FactCommand::Contested => {
            let contested = store.contested_facts();
            if contested.is_empty() {
                println!("No contested facts.");
            }
            for fact in contested {
                println!("{}: declared by {}", fact.key, fact.sources().join(", "));
            }
        }
    }
    Ok(())
}

fn term(store: &mut RuleStore, cmd: TermCommand) -> Result<()> {
    match cmd {
        TermCommand::Add {
            pattern,
            category,
            alternatives,
        } => {
            store.add_prohibited(&pattern, category, alternatives)?;
            println!("Prohibited '{}' in {category}", pattern.trim());
        }
        TermCommand::List { category } => {
            for term in store.list_prohibited(category) {
                let alternatives = if term.suggested_alternatives.is_empty() {
                    String::new()
                } else {
                    format!("  -> {}", term.suggested_alternatives.join(", "))
                };
                println!("[{}] {}{alternatives}", term.category, term.pattern);
            }
        }
    }
    Ok(())
}

fn scope(store: &mut RuleStore, cmd: ScopeCommand) -> Result<()> {
    match cmd {
        ScopeCommand::Set {
            chapter,
            active,
            high_risk,
            phrases,
        } => {
            let mut scope = ChapterRuleScope::new(chapter.as_str());
            for category in active {
                scope = scope.with_active(category);
            }
            for category in high_risk {
                scope = scope.with_high_risk(category);
            }
            for phrase in phrases {
                scope = scope.with_flagged_phrase(phrase);
            }
            store.declare_scope(scope)?;
            println!("Scope declared for {}", chapter.trim());
        }
        ScopeCommand::Show { chapter } => {
            let declared = store.rules().declared_scope(&chapter).is_some();
            let scope = store.scope_for_chapter(&chapter);
            let tags = |cats: &BTreeSet<TermCategory>| {
                cats.iter().map(|c| c.tag()).collect::<Vec<_>>().join(", ")
            };
            println!(
                "{}{}",
                scope.chapter,
                if declared { "" } else { " (default scope)" }
            );
            println!("  active:    {}", tags(&scope.active));
            println!("  high-risk: {}", tags(&scope.high_risk));
            for phrase in &scope.flagged_phrases {
                println!("  phrase:    {phrase}");
            }
        }
    }
    Ok(())
}

fn chapter(store: &mut RuleStore, cmd: ChapterCommand) -> Result<()> {
    let print = |lock: &ChapterLock| {
        println!(
            "{}: {} (revisions: {}){}",
            lock.chapter,
            lock.state,
            lock.revision_count,
            lock.lock_reason
                .as_deref()
                .map(|r| format!(", locked: {r}"))
                .unwrap_or_default()
        );
    };
    match cmd {
        ChapterCommand::Status { chapter } => print(&store.chapter_state(&chapter)),
        ChapterCommand::Set {
            chapter,
            state,
            reason,
        } => print(&store.set_chapter_state(&chapter, state, reason.as_deref())?),
        ChapterCommand::Unlock { chapter, reason } => {
            print(&store.unlock_chapter(&chapter, &reason)?)
        }
        ChapterCommand::List => store.chapters().for_each(print),
    }
    Ok(())
}

fn doc(store: &mut RuleStore, cmd: DocCommand) -> Result<()> {
    match cmd {
        DocCommand::Register {
            title,
            class,
            subtype,
        } => {
            let id = store.register_document(&title, class, subtype.as_deref())?;
            println!("{id}");
        }
        DocCommand::Reclassify { id, class, reason } => {
            store.reclassify_document(id, class, &reason)?;
            println!("{id} is now {class}");
        }
        DocCommand::List { class } => {
            for d in store.documents(class) {
                println!(
                    "{}  [{}{}]  {}",
                    d.id,
                    d.class,
                    d.subtype.as_deref().map(|s| format!("/{s}")).unwrap_or_default(),
                    d.title
                );
            }
        }
    }
    Ok(())
}

fn audit(store: &RuleStore, args: AuditArgs) {
    let log = store.audit_log();
    let entries: Vec<_> = match (&args.key, args.last) {
        (Some(key), _) => store.audit_for(key).collect(),
        (None, Some(n)) => log.recent(n).iter().collect(),
        (None, None) => log.entries().iter().collect(),
    };
    for entry in entries {
        println!(
            "#{:<4} {}  {:<12} {}",
            entry.sequence,
            entry.at.format("%Y-%m-%d %H:%M:%S"),
            entry.actor,
            entry.action
        );
    }
}
