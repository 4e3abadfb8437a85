//! Talk Vault CLI - a terminal front end for the Talk Vault API.
//!
//! Each command starts the application the way the web front end does:
//! resolve the stored session, ask the navigation gate for the page, then
//! issue the page's requests through the shared client.

mod cli;

use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use talkvault_core::api::SummarySource;
use talkvault_core::models::RegisterRequest;
use talkvault_core::{App, AuthOutcome, Config, GateDecision, StorageKind, View};

use cli::{Cli, Command, HistoryArgs, RegisterArgs, SummarizeArgs};

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
/// When `log_dir` is configured, logs also go to a daily rolling file.
fn init_tracing(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match config.log_dir {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, "talkvault.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config ({}), using defaults", e);
        Config::default()
    });
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if cli.ephemeral {
        config.storage = StorageKind::Memory;
    }

    let _log_guard = init_tracing(&config);
    info!(base_url = %config.base_url(), "Talk Vault CLI starting");

    let mut app = App::new(config)?;
    // Returning the error lets `_log_guard` flush the file log before exit
    run(&mut app, cli.command).await
}

async fn run(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => login(app, email).await,
        Command::Register(args) => register(app, args).await,
        Command::Logout => {
            app.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => whoami(app).await,
        Command::Dashboard => dashboard(app).await,
        Command::Meetings => meetings(app).await,
        Command::Documents => documents(app).await,
        Command::Summarize(args) => summarize(app, args).await,
        Command::History(args) => history(app, args).await,
    }
}

// ============================================================================
// Auth commands
// ============================================================================

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) => print!("{} [{}]: ", label, value),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    match (input.is_empty(), default) {
        (true, Some(value)) => Ok(value.to_string()),
        _ => Ok(input.to_string()),
    }
}

fn prompt_password() -> Result<String> {
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

async fn login(app: &mut App, email: Option<String>) -> Result<()> {
    app.start(View::Login).await;

    let email = match email {
        Some(email) => email,
        None => {
            let last = app.config.last_email.clone();
            prompt("Email", last.as_deref())?
        }
    };
    let password = prompt_password()?;

    println!("\nAuthenticating...");
    match app.login(&email, &password).await {
        AuthOutcome::Success(user) => {
            if let Err(e) = app.config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!("Logged in as {}.", user.display_name());
            Ok(())
        }
        AuthOutcome::Failure { message } => Err(anyhow!(message)),
    }
}

async fn register(app: &mut App, args: RegisterArgs) -> Result<()> {
    app.start(View::Register).await;

    let password = prompt_password()?;
    let confirm = rpassword::prompt_password("Confirm password: ")
        .context("Failed to read password")?;
    if password != confirm {
        return Err(anyhow!("Passwords do not match"));
    }

    let request = RegisterRequest {
        email: args.email,
        username: args.username,
        full_name: args.full_name,
        password,
    };
    match app.register(&request).await {
        AuthOutcome::Success(receipt) => {
            println!(
                "{} Run `talkvault login` to sign in.",
                receipt.message.as_deref().unwrap_or("Account created.")
            );
            Ok(())
        }
        AuthOutcome::Failure { message } => Err(anyhow!(message)),
    }
}

// ============================================================================
// Pages
// ============================================================================

/// Open a protected page. Errors when the gate sends the user to log in.
async fn open_page(app: &mut App, view: View) -> Result<()> {
    match app.start(view).await {
        GateDecision::Render(_) => Ok(()),
        GateDecision::Redirect(View::Login) => {
            Err(anyhow!("Not logged in. Run `talkvault login` first."))
        }
        other => Err(anyhow!("Cannot open {}: {:?}", view, other)),
    }
}

/// Map a page request failure to an error, applying any pending 401 first.
fn page_error(app: &mut App, e: talkvault_core::ApiError) -> anyhow::Error {
    app.drain_events();
    if app.current_view() == Some(View::Login) {
        anyhow!("Session expired. Run `talkvault login` again.")
    } else {
        anyhow!(e.user_message())
    }
}

async fn whoami(app: &mut App) -> Result<()> {
    open_page(app, View::Profile).await?;
    let user = app
        .session()
        .user()
        .ok_or_else(|| anyhow!("Not logged in"))?;

    println!("{} <{}>", user.display_name(), user.email);
    println!("  username: {}", user.username);
    println!("  active:   {}", if user.is_active { "yes" } else { "no" });
    if let Some(created) = user.created_at {
        println!("  joined:   {}", created.format("%Y-%m-%d"));
    }
    Ok(())
}

async fn dashboard(app: &mut App) -> Result<()> {
    open_page(app, View::Dashboard).await?;
    let counts = app.api().dashboard().await;
    app.drain_events();
    if app.current_view() == Some(View::Login) {
        return Err(anyhow!("Session expired. Run `talkvault login` again."));
    }

    let show = |n: Option<usize>| n.map(|n| n.to_string()).unwrap_or_else(|| "unavailable".to_string());
    println!("Meetings:  {}", show(counts.meetings));
    println!("Documents: {}", show(counts.documents));
    Ok(())
}

async fn meetings(app: &mut App) -> Result<()> {
    open_page(app, View::Meetings).await?;
    let result = app.api().list_meetings().await;
    let meetings = match result {
        Ok(list) => list,
        Err(e) => return Err(page_error(app, e)),
    };

    if meetings.is_empty() {
        println!("No meetings yet.");
    }
    for meeting in meetings {
        let when = meeting
            .scheduled_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{:<16} {:<12} {}", when, meeting.status.label(), meeting.title);
    }
    Ok(())
}

async fn documents(app: &mut App) -> Result<()> {
    open_page(app, View::Documents).await?;
    let result = app.api().list_documents().await;
    let documents = match result {
        Ok(list) => list,
        Err(e) => return Err(page_error(app, e)),
    };

    if documents.is_empty() {
        println!("No documents yet.");
    }
    for doc in documents {
        println!("{:<12} {}", doc.processing_status.label(), doc.display_name());
    }
    Ok(())
}

async fn summarize(app: &mut App, args: SummarizeArgs) -> Result<()> {
    open_page(app, View::Upload).await?;

    let source = match (args.audio, args.text) {
        (Some(path), _) => SummarySource::from_audio_file(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, Some(text)) => SummarySource::Transcript(text),
        (None, None) => return Err(anyhow!("Provide --audio or --text")),
    };

    println!("Summarizing (this can take a few minutes)...");
    let username = app.session().user().map(|u| u.username.clone());
    let result = app.api().summarize(source, username.as_deref()).await;
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => return Err(page_error(app, e)),
    };

    println!("\n{}", summary.summary);
    if let Some(id) = summary.saved_id {
        println!("\nSaved as {}. View it again with `talkvault history {}`.", id, id);
    }
    Ok(())
}

async fn history(app: &mut App, args: HistoryArgs) -> Result<()> {
    open_page(app, View::History).await?;

    if let Some(id) = args.id {
        let result = app.api().summary_detail(&id).await;
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => return Err(page_error(app, e)),
        };
        if let Some(created) = entry.created_at {
            let author = entry.username.as_deref().unwrap_or("anonymous");
            println!("{}  by {}", created.format("%Y-%m-%d %H:%M"), author);
        }
        println!("\n{}", entry.summary_text.as_deref().unwrap_or("(empty summary)"));
        if let Some(text) = entry.original_text {
            println!("\n--- Transcript ---\n{}", text);
        }
        return Ok(());
    }

    let username = if args.mine {
        app.session().user().map(|u| u.username.clone())
    } else {
        None
    };
    let result = app.api().summary_history(args.limit, username.as_deref()).await;
    let entries = match result {
        Ok(entries) => entries,
        Err(e) => return Err(page_error(app, e)),
    };

    if entries.is_empty() {
        println!("No summaries yet.");
    }
    for entry in entries {
        let when = entry
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{:<24} {:<16} {}", entry.id, when, entry.headline(60));
    }
    Ok(())
}
