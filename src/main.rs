mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use habitus::config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "habitus", version, about = "Habit streak tracker with cross-habit engagement streaks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server
    Serve {
        /// Override the configured transport (stdio or http)
        #[arg(long)]
        transport: Option<String>,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage and record habits
    Habit {
        #[command(subcommand)]
        action: HabitAction,
    },
    /// Show the top users by engagement streak
    Leaderboard {
        /// Number of users to show (defaults to reconcile.leaderboard_size)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Recompute every user's engagement streak
    Repair,
    /// Run database diagnostics
    Doctor,
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user
    Add {
        username: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show a user and their cached engagement streak
    Show { user_id: String },
    /// Delete a user and all of their habits
    Remove { user_id: String },
}

#[derive(Subcommand)]
enum HabitAction {
    /// Create a habit
    Add {
        #[arg(long)]
        user: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List habits (resets lapsed streaks and refreshes the engagement streak)
    List {
        #[arg(long)]
        user: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Mark a habit done for today
    Complete {
        #[arg(long)]
        user: String,
        habit_id: String,
    },
    /// Mark a habit as not done, resetting its streak
    Fail {
        #[arg(long)]
        user: String,
        habit_id: String,
    },
    /// Change a habit's title or description
    Edit {
        #[arg(long)]
        user: String,
        habit_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a habit
    Remove {
        #[arg(long)]
        user: String,
        habit_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::HabitusConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC and CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { transport } => {
            if let Some(transport) = transport {
                config.server.transport = transport;
            }
            match config.server.transport.as_str() {
                "http" => server::serve_http(config).await?,
                "stdio" => server::serve_stdio(config).await?,
                other => anyhow::bail!("unknown transport: {other}. Supported: stdio, http"),
            }
        }
        Command::User { action } => match action {
            UserAction::Add { username, email } => cli::user::add(&config, &username, email).await?,
            UserAction::Show { user_id } => cli::user::show(&config, &user_id).await?,
            UserAction::Remove { user_id } => cli::user::remove(&config, &user_id).await?,
        },
        Command::Habit { action } => match action {
            HabitAction::Add {
                user,
                title,
                description,
            } => cli::habit::add(&config, &user, &title, description).await?,
            HabitAction::List { user, json } => cli::habit::list(&config, &user, json).await?,
            HabitAction::Complete { user, habit_id } => {
                cli::habit::complete(&config, &user, &habit_id).await?
            }
            HabitAction::Fail { user, habit_id } => cli::habit::fail(&config, &user, &habit_id).await?,
            HabitAction::Edit {
                user,
                habit_id,
                title,
                description,
            } => cli::habit::edit(&config, &user, &habit_id, title, description).await?,
            HabitAction::Remove { user, habit_id } => {
                cli::habit::remove(&config, &user, &habit_id).await?
            }
        },
        Command::Leaderboard { limit } => {
            let limit = limit.unwrap_or(config.reconcile.leaderboard_size);
            cli::leaderboard::leaderboard(&config, limit).await?
        }
        Command::Repair => cli::repair::repair(&config).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
