//! Fathom CLI - Command-line interface for deep research
//!
//! Runs interactive research sessions from the terminal and manages the
//! session store.

use clap::{Parser, Subcommand};
use fathom_core::{
    default_config_path, init_logging, log_operation_error, log_operation_start,
    log_operation_success, ErrorContext, FathomConfig, FathomError, FathomResult, LoggingConfig,
};
use fathom_engine::{
    EngineError, FileSessionStore, ProgressEvent, ResearchEngine, ResumePayload, SessionRecord,
    SessionStatus, SessionStore,
};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::info;

#[derive(Parser)]
#[command(name = "fathom")]
#[command(about = "Deep research from the command line")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a topic, pausing for approval before the final report
    Research {
        /// Topic to research
        topic: String,

        /// Approve the collected research without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Inspect and manage stored sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,

        /// Print the default configuration file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List stored sessions
    List,

    /// Show one session in detail
    Show {
        /// Session identifier
        session_id: String,

        /// Include the full report text
        #[arg(long)]
        report: bool,
    },

    /// Delete a stored session
    Delete {
        /// Session identifier
        session_id: String,
    },
}

#[tokio::main]
async fn main() -> FathomResult<()> {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::default();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }

    init_logging(&logging_config).map_err(|e| FathomError::Config {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(e),
        context: ErrorContext::new("cli")
            .with_operation("init_logging")
            .with_suggestion("Check logging configuration"),
    })?;

    info!("Starting Fathom CLI v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Research { topic, yes } => {
            handle_research(topic, yes, config).await?;
        }
        Commands::Sessions { command } => {
            handle_sessions(command, &config).await?;
        }
        Commands::Config {
            show,
            init,
            validate,
            path,
        } => {
            handle_config(show, init, validate, path, cli.config.as_ref())?;
        }
    }

    Ok(())
}

fn load_config(config_path: Option<&PathBuf>) -> FathomResult<FathomConfig> {
    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            FathomConfig::from_file(path)?
        }
        None => FathomConfig::load_default()?,
    };
    Ok(config.apply_env())
}

async fn handle_research(topic: String, auto_approve: bool, config: FathomConfig) -> FathomResult<()> {
    log_operation_start!("research", topic = %topic);

    if config.llm.api_key.is_none()
        && std::env::var("OPENAI_API_KEY").is_err()
        && std::env::var("ANTHROPIC_API_KEY").is_err()
    {
        println!("⚠️  No LLM API key configured (OPENAI_API_KEY or ANTHROPIC_API_KEY)");
    }
    if config.search.api_key.is_none() && std::env::var("EXA_API_KEY").is_err() {
        println!("⚠️  EXA_API_KEY not set; web searches will be rejected");
    }

    println!("🔍 Researching: {}", topic);

    let engine = ResearchEngine::builder(config)
        .build()
        .await
        .map_err(|e| engine_failure("build_engine", e))?;

    let created = engine
        .create_session()
        .await
        .map_err(|e| engine_failure("create_session", e))?;
    let session_id = created.id.clone();
    println!("🆔 Session: {}", session_id);
    println!();

    let mut events = engine
        .subscribe(&session_id)
        .await
        .map_err(|e| engine_failure("subscribe", e))?;

    engine
        .resume(&session_id, ResumePayload::topic(&topic))
        .await
        .map_err(|e| engine_failure("submit_topic", e))?;

    loop {
        match events.recv().await {
            Ok(ProgressEvent::Status { stage, message, .. }) => match stage.as_str() {
                "awaiting_approval" => {
                    show_collected(&engine, &session_id).await;
                    let payload = if auto_approve {
                        println!("✅ Auto-approving report synthesis");
                        ResumePayload::approve()
                    } else {
                        ask_approval()?
                    };
                    engine
                        .resume(&session_id, payload)
                        .await
                        .map_err(|e| engine_failure("submit_approval", e))?;
                }
                "awaiting_topic" => {
                    let next = prompt_line("💬 New research topic (empty to stop):")?;
                    if next.is_empty() {
                        println!("👋 Session parked; resume it later via its session id.");
                        break;
                    }
                    engine
                        .resume(&session_id, ResumePayload::topic(next))
                        .await
                        .map_err(|e| engine_failure("submit_topic", e))?;
                }
                _ => println!("📍 {}", message),
            },
            Ok(ProgressEvent::Step {
                step,
                total,
                message,
                ..
            }) => {
                println!("  [{}/{}] {}", step, total, message);
            }
            Ok(ProgressEvent::Complete { message, .. }) => {
                println!("\n✅ {}", message);
                break;
            }
            Ok(ProgressEvent::Error { message, .. }) => {
                println!("\n❌ {}", message);
                break;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                println!("⚠️  Skipped {} progress events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    let session = engine
        .get_session(&session_id)
        .await
        .map_err(|e| engine_failure("get_session", e))?;

    match session.status {
        SessionStatus::Completed => {
            if let Some(report) = &session.report {
                println!("\n📄 Final report:\n");
                println!("{}", report);
            }
            log_operation_success!("research",
                session_id = %session_id,
                learnings = session.learnings.len()
            );
        }
        SessionStatus::Declined => {
            println!("🚫 Session declined after {} rejected revisions.", session.revision);
        }
        _ => {}
    }

    Ok(())
}

/// Print what the research pass gathered so the user can judge it.
async fn show_collected(engine: &ResearchEngine, session_id: &str) {
    if let Ok(session) = engine.get_session(session_id).await {
        println!(
            "\n📋 Collected {} learnings from {} queries:",
            session.learnings.len(),
            session.completed_queries.len()
        );
        for (i, learning) in session.learnings.iter().enumerate() {
            println!("  {}. {}", i + 1, learning.text);
        }
        println!();
    }
}

fn ask_approval() -> FathomResult<ResumePayload> {
    println!("💬 Approve the report? [y = approve, n = reject, or type guidance for another pass]");
    let line = prompt_line(">")?;
    let payload = match line.to_lowercase().as_str() {
        "y" | "yes" => ResumePayload::approve(),
        "" | "n" | "no" => ResumePayload::reject(None),
        _ => ResumePayload::reject(Some(line)),
    };
    Ok(payload)
}

async fn handle_sessions(command: SessionCommands, config: &FathomConfig) -> FathomResult<()> {
    let store = FileSessionStore::new(&config.storage.data_dir)
        .map_err(|e| engine_failure("open_store", e))?;

    match command {
        SessionCommands::List => {
            let mut records = store
                .list()
                .await
                .map_err(|e| engine_failure("list_sessions", e))?;

            if records.is_empty() {
                println!(
                    "No stored sessions under {}",
                    config.storage.data_dir.display()
                );
                return Ok(());
            }

            records.sort_by_key(|record| record.created_at);
            println!("📋 Research sessions:");
            for record in &records {
                println!(
                    "  {}  {:<17}  {} learnings  {}",
                    record.id,
                    record.status.as_str(),
                    record.learnings.len(),
                    record.topic.as_deref().unwrap_or("(no topic yet)")
                );
            }
        }
        SessionCommands::Show { session_id, report } => {
            let record = store
                .load(&session_id)
                .await
                .map_err(|e| engine_failure("load_session", e))?
                .ok_or_else(|| FathomError::NotFound {
                    resource: format!("session {}", session_id),
                    context: ErrorContext::new("cli")
                        .with_operation("show_session")
                        .with_suggestion("Run `fathom sessions list` to see stored sessions"),
                })?;
            print_record(&record, report);
        }
        SessionCommands::Delete { session_id } => {
            store
                .delete(&session_id)
                .await
                .map_err(|e| engine_failure("delete_session", e))?;
            println!("🗑️  Deleted session {}", session_id);
        }
    }

    Ok(())
}

fn print_record(record: &SessionRecord, include_report: bool) {
    println!("🆔 Session: {}", record.id);
    println!("  Status:    {}", record.status);
    if let Some(topic) = &record.topic {
        println!("  Topic:     {}", topic);
    }
    println!("  Revision:  {}", record.revision);
    println!("  Queries:   {}", record.completed_queries.len());
    println!("  Learnings: {}", record.learnings.len());
    println!(
        "  Updated:   {}",
        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(prompt) = &record.prompt {
        println!("  Waiting on: {}", prompt);
    }
    if let Some(error) = &record.last_error {
        println!("  ⚠️  Last error: {}", error);
    }
    if include_report {
        match &record.report {
            Some(report) => println!("\n📄 Report:\n\n{}", report),
            None => println!("\nNo report yet."),
        }
    }
}

fn handle_config(
    show: bool,
    init: bool,
    validate: bool,
    path: bool,
    config_path: Option<&PathBuf>,
) -> FathomResult<()> {
    // Loads what is on disk, without env-var secrets mixed in, so that
    // --show never prints an API key.
    let load_raw = || match config_path {
        Some(path) => FathomConfig::from_file(path),
        None => FathomConfig::load_default(),
    };

    if init {
        let config = FathomConfig::default();
        let target = default_config_path().ok_or_else(|| FathomError::Config {
            message: "Could not determine the configuration directory".to_string(),
            source: None,
            context: ErrorContext::new("cli").with_operation("config_init"),
        })?;

        config.save_to_file(&target)?;
        println!("✅ Configuration initialized at: {}", target.display());
        println!("📝 Edit the file to set API keys and tune research limits.");
    }

    if path {
        match default_config_path() {
            Some(p) => println!("{}", p.display()),
            None => println!("No configuration directory available on this platform"),
        }
    }

    if show {
        let config = load_raw()?;
        let rendered = toml::to_string_pretty(&config).map_err(|e| FathomError::Config {
            message: format!("Failed to render config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("cli").with_operation("config_show"),
        })?;
        println!("📋 Current configuration:");
        println!("{}", rendered);
    }

    if validate {
        let config = load_raw()?;
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}

fn engine_failure(operation: &str, err: EngineError) -> FathomError {
    log_operation_error!(operation, err);
    FathomError::Internal {
        message: format!("Research operation failed: {}", err),
        source: Some(Box::new(err)),
        context: ErrorContext::new("cli").with_operation(operation),
    }
}

fn prompt_line(prompt: &str) -> FathomResult<String> {
    print!("{} ", prompt);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
