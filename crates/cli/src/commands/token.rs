//! Access token issuance.
//!
//! Signs with `TRACKER_TOKEN_SECRET`, the same secret the server verifies
//! with. The token is written to stdout so it can be captured by scripts.

use chrono::{Duration, Utc};
use order_tracker_core::{Role, UserId};
use order_tracker_server::config::token_secret_from_env;
use order_tracker_server::models::Principal;
use order_tracker_server::services::TokenSigner;
use tracing::info;

use super::CommandError;

const MAX_TTL_HOURS: i64 = 24 * 30;

/// Issue a bearer token for `user` with `role`.
///
/// # Errors
///
/// Returns an error if the TTL is out of range or the token secret is
/// missing or weak.
pub fn issue(user: UserId, role: Role, ttl_hours: i64) -> Result<(), CommandError> {
    if !(1..=MAX_TTL_HOURS).contains(&ttl_hours) {
        return Err(CommandError::InvalidArgument(format!(
            "ttl must be between 1 and {MAX_TTL_HOURS} hours"
        )));
    }

    let signer = TokenSigner::new(token_secret_from_env()?);
    let now = Utc::now();
    let ttl = Duration::hours(ttl_hours);
    let token = signer.issue(Principal::new(user, role), ttl, now)?;

    info!(user_id = %user, role = %role, expires_at = %(now + ttl), "Issued access token");

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }
    Ok(())
}
