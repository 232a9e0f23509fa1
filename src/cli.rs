use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::command::DefaultCommandRunner;
use crate::load_config::{load_config, CliOverrides};
use crate::pipeline::{run_pipeline, Outcome};
use crate::status::GithubStatus;
use crate::store::GcsStore;

/// CLI for storybook-publisher: build and publish storybook bundles per commit.
#[derive(Parser, Debug)]
#[clap(
    name = "storybook-publisher",
    version,
    about = "Build storybook bundles for the current commit, publish them to object storage and update the rolling site index"
)]
pub struct Cli {
    /// Path to a local YAML config file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Log verbosity level (TRACE, DEBUG, VERBOSE, INFO, WARN, ERROR, OFF)
    #[clap(long)]
    pub log_level: Option<String>,

    /// Read the commit hash from a version.json file
    #[clap(long)]
    pub version_json: Option<PathBuf>,

    /// Name of the branch from which this commit came
    #[clap(long)]
    pub commit_branch: Option<String>,

    /// Read the commit summary from a file
    #[clap(long)]
    pub commit_summary: Option<PathBuf>,

    /// Read the commit description from a file
    #[clap(long)]
    pub commit_description: Option<PathBuf>,

    /// Dump the resolved config (sensitive values censored) and exit
    #[clap(long)]
    pub check_config: bool,

    /// Skip the storybook build phase
    #[clap(long)]
    pub skip_build: bool,

    /// Skip the storybook publish phase
    #[clap(long)]
    pub skip_publish: bool,

    /// Skip setting the github status check
    #[clap(long)]
    pub skip_status: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            log_level: self.log_level.clone(),
            version_json: self.version_json.clone(),
            commit_branch: self.commit_branch.clone(),
            commit_summary: self.commit_summary.clone(),
            commit_description: self.commit_description.clone(),
            skip_build: self.skip_build,
            skip_publish: self.skip_publish,
            skip_status: self.skip_status,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), &cli.overrides())?;

    if cli.check_config {
        println!("{}", config.censored_summary());
        return Ok(());
    }

    let store = GcsStore::new(&config.store.bucket, config.store.token.clone());
    let runner = DefaultCommandRunner::new(config.log_level);
    let notifier = GithubStatus::new(
        &config.github.repo,
        config.github.token.as_deref().unwrap_or_default(),
    );

    match run_pipeline(&config, &store, &runner, &notifier).await {
        Ok(Outcome::Completed(report)) => {
            info!(
                commit = %report.commit,
                packages = report.packages,
                builds = report.builds,
                "Pipeline completed"
            );
            Ok(())
        }
        Ok(Outcome::NothingToDo(message)) => {
            info!("{message}");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{e}")),
    }
}
