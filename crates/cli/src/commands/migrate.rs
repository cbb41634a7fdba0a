//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! order-tracker-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TRACKER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/server/migrations/` and are embedded at build time.

use order_tracker_server::db;
use tracing::info;

use super::{CommandError, database_url};

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    info!("Connecting to order database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running order migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    info!("Order migrations complete!");
    Ok(())
}
