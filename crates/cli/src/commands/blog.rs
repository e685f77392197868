//! Blog maintenance.
//!
//! ```bash
//! # Publish scheduled posts that are due, once (e.g. from cron)
//! cf-cli blog publish-due
//! ```

use chezflora_storefront::services::scheduler;

use super::{CommandError, connect_store};

/// Run a single publication pass over scheduled posts.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable. Failures inside the
/// pass are logged, as the server's publisher does.
pub async fn publish_due() -> Result<(), CommandError> {
    let store = connect_store().await?;
    scheduler::run_once(&store).await;
    Ok(())
}
