//! Angeli Visions CLI - account and content management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create a back-office account
//! av-cli admin create -e admin@angelivisions.com -n "Admin" -p 'long-password' -r admin
//!
//! # List accounts
//! av-cli admin list
//!
//! # Write the default content into every empty collection
//! av-cli content seed
//! ```
//!
//! The store is the one the site uses: Upstash when `KV_REST_API_URL` and
//! `KV_REST_API_TOKEN` are set, otherwise process memory (useful only for
//! dry runs).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "av-cli")]
#[command(author, version, about = "Angeli Visions CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage back-office accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage site content
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new account
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`admin`, `editor`, `guest`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
    /// List accounts
    List,
}

#[derive(Subcommand)]
enum ContentAction {
    /// Write default content into collections that have never been saved
    Seed,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = commands::open_store()?;
    match cli.command {
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
                role,
            } => {
                commands::admin::create_user(&store, &email, &name, &password, &role).await?;
            }
            AdminAction::List => commands::admin::list_users(&store).await?,
        },
        Commands::Content { action } => match action {
            ContentAction::Seed => commands::content::seed(&store).await,
        },
    }
    Ok(())
}
