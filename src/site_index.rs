//! Site index aggregation: rebuild the root index page from the metadata
//! objects persisted by previous runs.
//!
//! The store is the only state shared across runs; the index is recomputed
//! from scratch every time and the prior page is overwritten unconditionally.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::commit::CommitMetadata;
use crate::config::Config;
use crate::contract::{BoxError, ObjectInfo, ObjectStore};
use crate::html::html_site_index;
use crate::publish::METADATA_PREFIX;

/// Well-known key of the root index page.
pub const SITE_INDEX_KEY: &str = "index.html";

/// Selects the metadata objects feeding the index: drop entries older than
/// the max-age window, newest first, truncated to the configured bound.
fn select_latest(mut objects: Vec<ObjectInfo>, config: &Config, now: DateTime<Utc>) -> Vec<ObjectInfo> {
    objects.retain(|object| now - object.created <= config.store.max_age);
    objects.sort_by(|a, b| b.created.cmp(&a.created));
    objects.truncate(config.num_latest_items);
    objects
}

/// Rebuilds and publishes the root index page.
///
/// A metadata object that fails to parse is logged and skipped; one corrupt
/// historical entry must never take down the whole aggregation.
pub async fn update_site_index<S: ObjectStore>(
    config: &Config,
    store: &S,
    now: DateTime<Utc>,
) -> Result<(), BoxError> {
    let all = store.list(METADATA_PREFIX).await?;
    let selected = select_latest(all, config, now);
    debug!(selected = selected.len(), "Selected metadata objects for site index");

    let mut commits: Vec<CommitMetadata> = Vec::with_capacity(selected.len());
    for object in &selected {
        let bytes = store.get(&object.key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(meta) => commits.push(meta),
            Err(e) => {
                warn!(key = %object.key, error = %e, "Failure to parse commit metadata file");
            }
        }
    }

    let page = html_site_index(
        &config.project_name,
        &config.github.repo,
        &config.github.main_branch,
        config.main_branch_items,
        &commits,
    );
    store
        .put(SITE_INDEX_KEY, page.into_bytes(), "text/html")
        .await?;
    info!(commits = commits.len(), "Rebuilt site index");
    Ok(())
}
