//! examkit CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "examkit", version, about = "Validate, grade, and take LMS exams")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse exam content and report problems
    Validate {
        /// Exam content file (JSON question array or markdown)
        #[arg(long)]
        content: PathBuf,

        /// Require structured content and fail on the first invalid question
        #[arg(long)]
        strict: bool,
    },

    /// Score an answer file against exam content
    Grade {
        /// Exam content file
        #[arg(long)]
        content: PathBuf,

        /// JSON object mapping question ids to answers
        #[arg(long)]
        answers: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Take a timed exam from the LMS
    Take {
        /// Module id
        #[arg(long)]
        module: u64,

        /// Exam lesson id
        #[arg(long)]
        lesson: u64,
    },

    /// Log in to the LMS and store the session
    Login {
        #[arg(long)]
        username: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// List modules and progress
    Modules {
        /// Show the lessons of one module
        #[arg(long)]
        id: Option<u64>,
    },

    /// List past exam attempts
    History {
        /// Show the per-question review of one attempt
        #[arg(long)]
        review: Option<u64>,
    },

    /// Create starter config and sample exam content
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examkit=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Validate { content, strict } => commands::validate::execute(content, strict),
        Commands::Grade {
            content,
            answers,
            format,
        } => commands::grade::execute(content, answers, format),
        Commands::Take { module, lesson } => commands::take::execute(module, lesson, config).await,
        Commands::Login { username, password } => {
            commands::session::login(username, password, config).await
        }
        Commands::Logout => commands::session::logout(config),
        Commands::Modules { id } => commands::modules::execute(id, config).await,
        Commands::History { review } => commands::history::execute(review, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
