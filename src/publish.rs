//! Publishing: per-commit metadata, the commit index page, and the
//! concurrency-bounded build upload engine.
//!
//! Uploads within one build fan out onto a semaphore-bounded pool; the batch
//! call returns only once every submitted upload has settled, and any single
//! failure fails the batch. Every put is a full overwrite, so re-running a
//! failed pipeline re-uploads some files and corrupts nothing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::commit::CommitMetadata;
use crate::config::Config;
use crate::contract::{BoxError, ObjectStore};
use crate::discover::{not_dependency_cache, package_name};
use crate::html::html_commit_index;

/// Key prefix under which one metadata object per run is stored. The site
/// index aggregator discovers historical runs purely by listing this prefix.
pub const METADATA_PREFIX: &str = "commits/metadata-";

/// Publishes one run: the JSON metadata object, the commit index page, and
/// every build's files. Honors `skip.publish`.
pub async fn publish_storybooks<S: ObjectStore>(
    config: &Config,
    store: &S,
    metadata: &CommitMetadata,
    builds: &[PathBuf],
) -> Result<(), BoxError> {
    if config.skip.publish {
        info!("Skipping storybooks publish");
        return Ok(());
    }

    let commit = &metadata.commit;
    let publish_base = format!("commits/{commit}");

    // Not under commits/<commit>/ with the rest: the flat metadata- prefix is
    // what the aggregator lists to find historical runs.
    let json = serde_json::to_vec_pretty(metadata)?;
    store
        .put(&format!("{METADATA_PREFIX}{commit}.json"), json, "application/json")
        .await?;

    let index = html_commit_index(metadata, builds);
    store
        .put(
            &format!("{publish_base}/index.html"),
            index.into_bytes(),
            "text/html",
        )
        .await?;

    for build in builds {
        let package = package_name(build)
            .ok_or_else(|| format!("build path has no package name: {}", build.display()))?;
        debug!(package, "Uploading build");
        let uploaded = upload_storybook_build(
            store,
            build,
            &format!("{publish_base}/{package}"),
            config.upload_concurrency,
        )
        .await?;
        info!(package, files = uploaded, "Uploaded storybook build");
    }

    info!(
        "Published storybooks to {}/{publish_base}/index.html",
        config.store.public_base_url
    );
    Ok(())
}

/// Uploads every regular file under `build_dir` to the store, substituting
/// the local root with `dest_prefix` and preserving the relative path
/// verbatim. At most `concurrency` uploads are in flight at any instant.
/// Returns the number of files uploaded.
pub async fn upload_storybook_build<S: ObjectStore>(
    store: &S,
    build_dir: &Path,
    dest_prefix: &str,
    concurrency: usize,
) -> Result<usize, BoxError> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut uploads = Vec::new();

    for entry in walkdir::WalkDir::new(build_dir)
        .into_iter()
        .filter_entry(not_dependency_cache)
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file = entry.into_path();
        let key = destination_key(build_dir, &file, dest_prefix)?;
        let semaphore = Arc::clone(&semaphore);
        uploads.push(async move {
            let _permit = semaphore.acquire_owned().await?;
            let bytes = tokio::fs::read(&file).await?;
            store.put(&key, bytes, content_type_for(&file)).await?;
            debug!(key = %key, "Uploaded build file");
            Ok::<(), BoxError>(())
        });
    }

    let count = uploads.len();
    try_join_all(uploads).await?;
    Ok(count)
}

/// Rewrites a local file path into its destination key: `dest_prefix` plus
/// the path relative to `build_dir`, `/`-separated on every platform.
fn destination_key(build_dir: &Path, file: &Path, dest_prefix: &str) -> Result<String, BoxError> {
    let relative = file
        .strip_prefix(build_dir)
        .map_err(|_| format!("{} is not under {}", file.display(), build_dir.display()))?;

    let mut key = String::from(dest_prefix);
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| format!("non UTF-8 path segment in {}", file.display()))?;
        key.push('/');
        key.push_str(part);
    }
    Ok(key)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
