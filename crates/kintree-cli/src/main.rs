//! Kintree CLI - Command-line interface for Kintree
//!
//! This is the main entry point for users interacting with Kintree.
//! It provides commands for loading family records, browsing trees
//! and serving them to a viewer.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "kintree")]
#[command(author = "Kintree Contributors")]
#[command(version)]
#[command(about = "Family trees from flat relationship records", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Workspace directory holding .kintree (defaults to current directory)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Read records from a JSON snapshot file instead of the store
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Kintree in the workspace directory
    Init,

    /// Load a JSON snapshot into the store, replacing its contents
    Import {
        /// Snapshot file with families, members and relationships
        file: PathBuf,
    },

    /// Load the built-in sample families into an empty store
    Seed,

    /// Write the stored records to a JSON snapshot
    Export {
        /// Output file
        output: PathBuf,
    },

    /// Add a family, or update the one with the same id
    AddFamily {
        /// Family id
        id: String,

        /// Display name
        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Add a member, or update the one with the same id
    AddMember {
        /// Member id
        id: String,

        /// Family the member belongs to
        #[arg(short, long)]
        family: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        age: Option<u32>,

        #[arg(long)]
        occupation: Option<String>,

        #[arg(long)]
        contact: Option<String>,

        /// male or female (Hindi labels accepted)
        #[arg(long)]
        gender: Option<String>,
    },

    /// Remove a member together with every relationship involving them
    RemoveMember {
        /// Member id
        id: String,
    },

    /// Record a relationship: <member1> is the <kind> of <member2>
    Link {
        member1: String,

        /// father, mother, son, daughter, spouse, brother or sister
        kind: String,

        member2: String,

        /// Relationship id (derived from the members and kind by default)
        #[arg(long)]
        id: Option<String>,
    },

    /// Remove a relationship by id
    Unlink {
        /// Relationship id
        id: String,
    },

    /// Print the family forest
    Tree {
        /// Only roots from this family
        #[arg(short, long)]
        family: Option<String>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show a member with their spouses and children
    Family {
        /// Member id
        member: String,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Search members and families
    Search {
        /// Search query
        query: String,

        /// Maximum results per bucket
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List the raw relationships of a member
    Relations {
        /// Member id
        member: String,
    },

    /// Report edges that were skipped and lineage loops
    Check,

    /// Show store status and statistics
    Status,

    /// Start the Kintree server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Headless mode: bind to 0.0.0.0 for remote access
        #[arg(long)]
        headless: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let ctx = match commands::Context::new(cli.dir, cli.snapshot) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Init => commands::init(&ctx),
        Commands::Import { file } => commands::import(&ctx, &file),
        Commands::Seed => commands::seed(&ctx),
        Commands::Export { output } => commands::export(&ctx, &output),
        Commands::AddFamily {
            id,
            name,
            description,
        } => commands::add_family(&ctx, &id, &name, description),
        Commands::AddMember {
            id,
            family,
            name,
            age,
            occupation,
            contact,
            gender,
        } => commands::add_member(
            &ctx,
            commands::MemberFields {
                id,
                family,
                name,
                age,
                occupation,
                contact,
                gender,
            },
        ),
        Commands::RemoveMember { id } => commands::remove_member(&ctx, &id),
        Commands::Link {
            member1,
            kind,
            member2,
            id,
        } => commands::link(&ctx, &member1, &kind, &member2, id),
        Commands::Unlink { id } => commands::unlink(&ctx, &id),
        Commands::Tree { family, json } => commands::tree(&ctx, family, json),
        Commands::Family { member, json } => commands::family(&ctx, &member, json),
        Commands::Search { query, limit } => commands::search(&ctx, &query, limit),
        Commands::Relations { member } => commands::relations(&ctx, &member),
        Commands::Check => commands::check(&ctx),
        Commands::Status => commands::status(&ctx),
        Commands::Serve { port, headless } => commands::serve(&ctx, port, headless).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
