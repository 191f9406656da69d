use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "survey-wizard", version, about = "Survey Wizard CLI")]
struct Cli {
    /// Backend base URL (overrides the config file and SURVEY_WIZARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take the survey interactively
    Run,
    /// List the survey questions
    Questions {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how other participants answered a question
    Distribution {
        /// Question id
        question_id: String,
        /// Your answer (1-6), highlighted in the summary
        #[arg(long)]
        answer: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a return code
    Validate {
        /// User code issued at registration
        code: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SURVEY_WIZARD_LOG")
        .unwrap_or_else(|_| EnvFilter::new("survey_wizard=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let api_url = cli.api_url.as_deref();
    let result = match cli.command {
        Commands::Run => commands::run::run(api_url).await,
        Commands::Questions { json } => commands::questions::run(api_url, json).await,
        Commands::Distribution {
            question_id,
            answer,
            json,
        } => commands::distribution::run(api_url, &question_id, answer, json).await,
        Commands::Validate { code } => commands::validate::run(api_url, &code).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => commands::completions::run(shell, Cli::command()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
