//! Wordloop CLI
//!
//! Main entry point for studying vocabulary from the terminal, serving the
//! HTTP API and writing daily reports.

use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use wordloop_engine::{
    count_tasks, create_router, session_rng, AppState, Clock, Config, JsonFileStore,
    LevelDistribution, Phase, SessionRecord, SpellingOutcome, Step, StudySession, SystemClock,
    TaskCounts, WordStore, WordloopError,
};
use wordloop_report::{
    json::JsonGenerator, DailyReport, LevelBreakdown, MarkdownGenerator, SessionSummary,
    TaskSummary,
};

/// Typed at any prompt to leave the session.
const QUIT_COMMAND: &str = ":q";

/// Wordloop - Vocabulary Study Sessions
///
/// Reviews due words and introduces new ones with a recall step followed by
/// a spelling step, moving each word through four mastery levels.
#[derive(Parser, Debug)]
#[command(name = "wordloop")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: wordloop.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Path to the JSON store (overrides storePath)
    #[arg(short, long, value_name = "FILE", global = true)]
    store: Option<String>,

    /// Learner id (overrides userId)
    #[arg(short, long, value_name = "ID", global = true)]
    user: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show today's workload, mastery levels and today's session
    Status,

    /// Study today's words interactively
    Study {
        /// Seed for a reproducible word order
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Serve the HTTP API
    Serve {
        /// Port for the HTTP API server (overrides port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write today's report into the output directory
    Report {
        /// Also write a JSON report
        #[arg(long)]
        json: bool,

        /// Output directory (overrides outputDir)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(config = ?args.config, command = ?args.command, "Wordloop starting");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(store) = args.store {
        config.store_path = store;
    }
    if let Some(user) = args.user {
        config.user_id = user;
    }

    match args.command {
        Command::Status => {
            config.validate()?;
            run_status(&config)
        }
        Command::Study { seed } => {
            config.validate()?;
            tokio::task::spawn_blocking(move || run_study(&config, seed)).await?
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            config.validate()?;
            run_serve(config).await
        }
        Command::Report { json, output_dir } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            config.validate()?;
            run_report(&config, json)
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_status(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let clock = SystemClock;
    let today = clock.today();

    let tasks = count_tasks(&store, &config.user_id, &config.settings, today)?;
    let levels = LevelDistribution::from_states(&store.word_states(&config.user_id)?);
    let record = store.session_record_for(&config.user_id, today)?;

    print_tasks(&config.user_id, &tasks);
    print_levels(&levels);
    println!();
    match record {
        Some(record) => print_record(&record),
        None => println!("No session completed today."),
    }
    Ok(())
}

fn run_study(config: &Config, seed: Option<u64>) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut session = match StudySession::start(
        &store,
        config.user_id.clone(),
        config.settings,
        clock,
        session_rng(seed),
    ) {
        Ok(session) => session,
        Err(WordloopError::EmptyQueue) => {
            println!("Nothing to study today. Come back tomorrow or add words to your list.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Type {QUIT_COMMAND} at any prompt to leave. Progress of finished phases is kept.");
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut last_phase = None;

    while !session.is_complete() {
        if last_phase != Some(session.phase()) {
            print_phase(session.phase());
            last_phase = Some(session.phase());
        }

        let finished = match session.step() {
            Some(Step::Recall) => study_recall(&mut session, &mut store, &mut input)?,
            Some(Step::Spelling) => study_spelling(&mut session, &mut store, &mut input)?,
            None => true,
        };
        if !finished {
            session.abandon();
            println!();
            println!("Session left early.");
            return Ok(());
        }
    }

    println!();
    if let Some(record) = session.record() {
        print_record(record);
        if !session.record_persisted() {
            eprintln!("Warning: this session's summary could not be saved to the store.");
        }
    }
    Ok(())
}

async fn run_serve(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let addr: SocketAddr = ([127, 0, 0, 1], config.port).into();
    println!("Starting HTTP API server on {addr}...");

    let router = create_router(AppState::new(config, store));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!("HTTP API server running on http://{addr}");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, shutting down");
            }
        })
        .await?;
    Ok(())
}

fn run_report(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let report = build_report(&store, config, &SystemClock)?;
    let output_dir = PathBuf::from(&config.output_dir);
    std::fs::create_dir_all(&output_dir)?;

    println!("Generating reports...");
    let md_path = output_dir.join(format!("{}.md", report.file_stem()));
    std::fs::write(&md_path, MarkdownGenerator::new(&report).generate())?;
    println!("  Markdown report: {}", md_path.display());

    if json {
        let json_path = output_dir.join(format!("{}.json", report.file_stem()));
        JsonGenerator::new(&report).write_to_file(&json_path, true)?;
        println!("  JSON report: {}", json_path.display());
    }

    println!();
    println!("Status: {}", report.status());
    Ok(())
}

// ============================================================================
// Interactive steps
// ============================================================================

/// Runs one recall item. Returns `false` if the learner quit.
fn study_recall(
    session: &mut StudySession,
    store: &mut JsonFileStore,
    input: &mut impl BufRead,
) -> anyhow::Result<bool> {
    let Some(item) = session.current().cloned() else {
        return Ok(true);
    };

    println!();
    match &item.word.phonetic {
        Some(phonetic) => println!("  {}  {phonetic}", item.word.word),
        None => println!("  {}", item.word.word),
    }
    if prompt(input, "Press Enter to reveal")?.is_none() {
        return Ok(false);
    }
    session.reveal()?;
    println!("  {}", item.word.meanings.join("; "));
    if let Some(example) = &item.word.example {
        println!("  e.g. {example}");
    }

    loop {
        let Some(answer) = prompt(input, "Did you know it? [y/n]")? else {
            return Ok(false);
        };
        let know = match answer.to_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => continue,
        };
        report_persistence(session.submit_recall(store, know))?;
        return Ok(true);
    }
}

/// Runs one spelling item. Returns `false` if the learner quit.
fn study_spelling(
    session: &mut StudySession,
    store: &mut JsonFileStore,
    input: &mut impl BufRead,
) -> anyhow::Result<bool> {
    println!();
    println!("  Meaning: {}", session.display_meaning().unwrap_or_default());

    while !session.spelling_resolved() {
        let label = if session.needs_correction() {
            "Type the correct spelling"
        } else {
            "Spell the word"
        };
        let Some(answer) = prompt(input, label)? else {
            return Ok(false);
        };

        match session.submit_spelling(&answer) {
            Ok(SpellingOutcome::Correct) => println!("  Correct!"),
            Ok(SpellingOutcome::Corrected) => println!("  Got it."),
            Ok(SpellingOutcome::Incorrect { correct_spelling }) => {
                println!("  Not quite. The word is: {correct_spelling}");
            }
            Ok(SpellingOutcome::StillIncorrect) => println!("  Try again."),
            Err(e) if e.is_user_error() => println!("  Please type the word."),
            Err(e) => return Err(e.into()),
        }
    }

    report_persistence(session.proceed(store))?;
    Ok(true)
}

/// Prints a prompt and reads one trimmed line. `None` on end of input or quit.
fn prompt(input: &mut impl BufRead, label: &str) -> anyhow::Result<Option<String>> {
    print!("{label}> ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let line = line.trim();
    if line == QUIT_COMMAND {
        return Ok(None);
    }
    Ok(Some(line.to_string()))
}

/// Store failures do not stop the session; everything else does.
fn report_persistence(result: wordloop_engine::Result<()>) -> anyhow::Result<()> {
    match result {
        Err(e) if e.is_transient() => {
            tracing::warn!(error = %e, "Progress could not be saved");
            eprintln!("Warning: {e}");
            Ok(())
        }
        other => other.map_err(Into::into),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

fn open_store(config: &Config) -> anyhow::Result<JsonFileStore> {
    tracing::debug!(path = %config.store_path, "Opening store");
    JsonFileStore::open(&config.store_path).map_err(|e| anyhow::anyhow!("{e}"))
}

/// Collects today's figures into a report.
fn build_report(
    store: &JsonFileStore,
    config: &Config,
    clock: &dyn Clock,
) -> anyhow::Result<DailyReport> {
    let today = clock.today();
    let tasks = count_tasks(store, &config.user_id, &config.settings, today)?;
    let levels = LevelDistribution::from_states(&store.word_states(&config.user_id)?);
    let record = store.session_record_for(&config.user_id, today)?;

    DailyReport::builder()
        .user_id(config.user_id.clone())
        .date(today)
        .generated_at(clock.now())
        .tasks(convert_tasks(&tasks))
        .session(record.as_ref().map(convert_record))
        .levels(LevelBreakdown::new(levels.levels))
        .build()
        .map_err(Into::into)
}

/// Converts `TaskCounts` to `TaskSummary`.
const fn convert_tasks(tasks: &TaskCounts) -> TaskSummary {
    TaskSummary {
        review_count: tasks.review_count,
        new_count: tasks.new_count,
        total_studied: tasks.total_studied,
        total_words: tasks.total_words,
    }
}

/// Converts a `SessionRecord` to `SessionSummary`.
fn convert_record(record: &SessionRecord) -> SessionSummary {
    SessionSummary {
        new_count: record.new_count,
        review_count: record.review_count,
        spelling_accuracy: record.spelling_accuracy,
        know: record.self_eval_stats.know,
        dont_know: record.self_eval_stats.dont_know,
        duration_seconds: record.duration_seconds,
        hardest_word: record.hardest_word.clone(),
        level_ups: record.level_ups,
    }
}

fn print_phase(phase: Phase) {
    let title = match phase {
        Phase::Review => "Review",
        Phase::NewLearn => "New words",
        Phase::NewReview => "New words: review",
        Phase::Relapse => "Second chance",
        Phase::Complete => return,
    };
    println!();
    println!("=== {title} ===");
}

fn print_tasks(user_id: &str, tasks: &TaskCounts) {
    println!("Today for {user_id}:");
    println!("  Reviews due: {}", tasks.review_count);
    println!("  New words: {}", tasks.new_count);
    println!(
        "  Words studied: {} of {}",
        tasks.total_studied, tasks.total_words
    );
}

fn print_levels(levels: &LevelDistribution) {
    println!();
    println!("Mastery levels:");
    for (level, count) in levels.levels.iter().enumerate() {
        println!("  L{level}: {count}");
    }
    println!("  Mastered: {} of {}", levels.mastered(), levels.total());
}

fn print_record(record: &SessionRecord) {
    println!("=== Session Summary ===");
    println!("Reviews: {}", record.review_count);
    println!("New words: {}", record.new_count);
    println!("Spelling accuracy: {}%", record.accuracy_percent());
    println!(
        "Recall: {} know, {} don't know",
        record.self_eval_stats.know, record.self_eval_stats.dont_know
    );
    println!("Level ups: {}", record.level_ups);
    println!(
        "Duration: {}m {}s",
        record.duration_seconds / 60,
        record.duration_seconds % 60
    );
    if !record.hardest_word.is_empty() {
        println!("Hardest word: {}", record.hardest_word);
    }
}
