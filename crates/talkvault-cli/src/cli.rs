use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "talkvault")]
#[command(version)]
#[command(about = "Log in to Talk Vault and work with meetings, documents and summaries", long_about = None)]
pub struct Cli {
    /// API base address (overrides config and TALKVAULT_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Keep the session in memory only; nothing is written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session credential
    Login {
        /// Account email (defaults to the last one used)
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Create an account (does not log in)
    Register(RegisterArgs),
    /// Forget the stored session credential
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Meeting and document counts
    Dashboard,
    /// List meetings
    Meetings,
    /// List uploaded documents
    Documents,
    /// Summarize a recording or a transcript
    Summarize(SummarizeArgs),
    /// List stored summaries, or show one by id
    History(HistoryArgs),
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(short, long)]
    pub email: String,

    #[arg(short, long)]
    pub username: String,

    #[arg(long)]
    pub full_name: Option<String>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SummarizeArgs {
    /// Audio file to transcribe and summarize
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Transcript text to summarize
    #[arg(long)]
    pub text: Option<String>,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Summary id to show in full
    pub id: Option<String>,

    /// Maximum number of summaries to list
    #[arg(short, long, default_value_t = talkvault_core::api::DEFAULT_HISTORY_LIMIT)]
    pub limit: u32,

    /// Only summaries written by the logged-in user
    #[arg(long)]
    pub mine: bool,
}
