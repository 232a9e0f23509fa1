//! High-level pipeline: one publishing run from discovery to site index.
//!
//! Orchestrates the per-run state machine:
//! gather commit metadata → discover packages → build each sequentially →
//! discover builds → publish metadata and uploads → notify status →
//! rebuild the site index.
//!
//! # Responsibilities
//! - Fail-fast orchestration: the first failing phase aborts the rest.
//! - Distinguishing expected empty-result halts ([`Outcome::NothingToDo`],
//!   an exit-0 termination) from failures (errors, exit non-zero).
//! - The pipeline is stateless between invocations; the object store is the
//!   only source of truth across runs.
//!
//! # Callable From
//! - The CLI binary and integration tests; collaborators are injected as
//!   trait implementations so tests can run against mocks and in-memory
//!   stores.

use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use crate::build::build_storybooks;
use crate::commit::gather_commit_metadata;
use crate::config::Config;
use crate::contract::{BoxError, CommandRunner, ObjectStore, StatusNotifier};
use crate::discover::{find_storybook_builds, find_storybook_packages};
use crate::publish::publish_storybooks;
use crate::site_index::update_site_index;
use crate::status::update_github_status;

/// How a run ended short of a failure.
#[derive(Debug)]
pub enum Outcome {
    /// All phases ran.
    Completed(RunReport),
    /// An expected empty-result halt; not an error.
    NothingToDo(&'static str),
}

#[derive(Debug)]
pub struct RunReport {
    pub commit: String,
    pub packages: usize,
    pub builds: usize,
}

/// Runs the whole pipeline once.
pub async fn run_pipeline<S, R, N>(
    config: &Config,
    store: &S,
    runner: &R,
    notifier: &N,
) -> Result<Outcome, BoxError>
where
    S: ObjectStore,
    R: CommandRunner,
    N: StatusNotifier,
{
    info!("Starting storybook publishing pipeline");

    let metadata = gather_commit_metadata(config, runner).await?;

    let packages: Vec<PathBuf> =
        find_storybook_packages(&config.packages_root, config.packages_depth).collect();
    if packages.is_empty() {
        return Ok(Outcome::NothingToDo("No storybook packages to handle - exiting."));
    }
    info!(packages = packages.len(), "Discovered storybook packages");

    build_storybooks(config, runner, &packages).await?;

    let builds = find_storybook_builds(&config.packages_root, config.packages_depth);
    if builds.is_empty() {
        return Ok(Outcome::NothingToDo("No storybook build found - exiting."));
    }
    info!(builds = builds.len(), "Discovered storybook builds");

    publish_storybooks(config, store, &metadata, &builds).await?;

    update_github_status(config, notifier, &metadata.commit).await?;

    update_site_index(config, store, Utc::now()).await?;

    Ok(Outcome::Completed(RunReport {
        commit: metadata.commit,
        packages: packages.len(),
        builds: builds.len(),
    }))
}
