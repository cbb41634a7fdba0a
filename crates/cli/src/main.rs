//! Order tracker CLI - database migrations, access tokens, and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! order-tracker-cli migrate
//!
//! # Issue an admin access token valid for 8 hours
//! order-tracker-cli token issue --user 1 --role admin --ttl-hours 8
//!
//! # Create a demo order for customer 42 and ship it
//! order-tracker-cli seed --customer 42 --advance-to shipped
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `token issue` - Mint a signed bearer token
//! - `seed` - Insert a demo order and walk it along the lifecycle

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use order_tracker_core::{OrderStatus, Role, UserId};

mod commands;

#[derive(Parser)]
#[command(name = "order-tracker-cli")]
#[command(author, version, about = "Order tracker CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage access tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Insert a demo order
    Seed {
        /// Customer who owns the order
        #[arg(short, long, default_value_t = 1)]
        customer: i32,

        /// Status to advance the order to (`pending` leaves it untouched)
        #[arg(short, long, default_value = "pending")]
        advance_to: OrderStatus,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a signed bearer token
    Issue {
        /// User id the token is issued to
        #[arg(short, long)]
        user: i32,

        /// Role (`customer`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: Role,

        /// Lifetime in hours
        #[arg(short, long, default_value_t = 24)]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Token { action } => match action {
            TokenAction::Issue {
                user,
                role,
                ttl_hours,
            } => commands::token::issue(UserId::new(user), role, ttl_hours)?,
        },
        Commands::Seed {
            customer,
            advance_to,
        } => commands::seed::demo_order(UserId::new(customer), advance_to).await?,
    }
    Ok(())
}
