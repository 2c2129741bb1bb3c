use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "slice-cli", version, about = "Slice plan reminders CLI")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reminder control for a plan
    Reminders {
        #[command(subcommand)]
        action: commands::reminders::RemindersAction,
    },
    /// Plan actions that keep reminders in step
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Anonymous plan service identity
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Reminders { action } => commands::reminders::run(action, cli.json).await,
        Commands::Plan { action } => commands::plan::run(action, cli.json).await,
        Commands::Config { action } => commands::config::run(action, cli.json),
        Commands::Auth { action } => commands::auth::run(action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
