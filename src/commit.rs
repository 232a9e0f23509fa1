//! Commit metadata: the canonical record for one pipeline run.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::contract::{BoxError, CommandRunner};

/// One run's commit record, serialized verbatim to the store as
/// `commits/metadata-<commit>.json` and read back by the site index
/// aggregator. Immutable once constructed.
///
/// Invariant: `pull_request` is set iff `pull_request_url` is set; both come
/// from the same CI-provided URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMetadata {
    /// Run start time.
    pub datestamp: DateTime<Utc>,
    pub commit: String,
    /// May be empty when the branch cannot be determined.
    #[serde(default)]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "pullRequestURL"
    )]
    pub pull_request_url: Option<String>,
    pub summary: String,
    pub description: String,
}

/// Derives the (number, URL) pull-request pair from a CI-provided URL.
/// The number is the URL's last path segment. Returns `(None, None)` when no
/// URL is available, keeping the both-or-neither invariant.
pub fn pull_request_pair(url: Option<&str>) -> (Option<String>, Option<String>) {
    match url {
        Some(url) if !url.is_empty() => {
            let number = url.rsplit('/').next().unwrap_or(url).to_string();
            (Some(number), Some(url.to_string()))
        }
        _ => (None, None),
    }
}

async fn capture_or_file<R: CommandRunner>(
    runner: &R,
    dir: &Path,
    override_file: Option<&Path>,
    command: &str,
) -> Result<String, BoxError> {
    match override_file {
        Some(path) => {
            debug!(path = %path.display(), "Reading commit field from file");
            Ok(fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?)
        }
        None => runner.capture(dir, command).await,
    }
}

/// Gathers commit metadata from the packages root: git by default, with
/// file-based overrides for CI environments where the checkout is shallow or
/// absent. All commands run with the packages root as the child's working
/// directory.
pub async fn gather_commit_metadata<R: CommandRunner>(
    config: &Config,
    runner: &R,
) -> Result<CommitMetadata, BoxError> {
    let root = config.packages_root.as_path();
    let datestamp = Utc::now();

    let commit = match &config.commit.version_json {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            let parsed: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
            parsed
                .get("commit")
                .and_then(|v| v.as_str())
                .ok_or_else(|| format!("no commit field in {}", path.display()))?
                .to_string()
        }
        None => runner.capture(root, "git rev-parse HEAD").await?,
    };

    let summary = capture_or_file(
        runner,
        root,
        config.commit.summary_file.as_deref(),
        "git log -n 1 --no-color --pretty=%s",
    )
    .await?;

    let description = capture_or_file(
        runner,
        root,
        config.commit.description_file.as_deref(),
        "git log -n 1 --no-color --pretty=medium",
    )
    .await?;

    let branch = match &config.ci.branch {
        Some(branch) => branch.clone(),
        None => {
            runner
                .capture(root, "git rev-parse --symbolic-full-name --abbrev-ref HEAD")
                .await?
        }
    };

    let (pull_request, pull_request_url) = pull_request_pair(config.ci.pull_request.as_deref());

    let metadata = CommitMetadata {
        datestamp,
        commit,
        branch,
        pull_request,
        pull_request_url,
        summary,
        description,
    };
    info!(
        commit = %metadata.commit,
        branch = %metadata.branch,
        pull_request = ?metadata.pull_request,
        "Gathered commit metadata"
    );
    Ok(metadata)
}
