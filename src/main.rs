mod auth;
mod commands;
mod routes;
mod state;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hyperion_core::Settings;
use hyperion_core::groups::AccountType;

#[derive(Parser)]
#[command(name = "hyperion")]
#[command(about = "Backend for the association platform: feed, adverts and calendar")]
struct Cli {
    /// Path to the config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve,
    /// Create a user and print its access token
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        firstname: String,

        /// One of student, former_student, staff, association, external, other_school_student, demo
        #[arg(long, default_value = "student")]
        account_type: AccountType,

        /// Group id to add the user to (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,
    },
    /// Create a group
    CreateGroup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,
    },
    /// Regenerate the public calendar file from the database
    RecreateIcs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => commands::serve::run(settings).await,
        Commands::CreateUser {
            email,
            name,
            firstname,
            account_type,
            groups,
        } => commands::create_user::run(settings, email, name, firstname, account_type, groups),
        Commands::CreateGroup { name, description } => {
            commands::create_group::run(settings, name, description)
        }
        Commands::RecreateIcs => commands::recreate_ics::run(settings),
    }
}
