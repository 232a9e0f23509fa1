//! Sequential storybook builds.
//!
//! Builds are never run concurrently: the external build tooling shares
//! caches and lockfiles across packages. A failed build aborts the whole run.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::contract::{BoxError, CommandRunner};
use crate::discover::BUILD_MARKER;

/// Builds every discovered package, strictly in order. Honors `skip.build`.
pub async fn build_storybooks<R: CommandRunner>(
    config: &Config,
    runner: &R,
    packages: &[std::path::PathBuf],
) -> Result<(), BoxError> {
    if config.skip.build {
        info!("Skipping storybooks build");
        return Ok(());
    }

    for package in packages {
        build_storybook(config, runner, package).await?;
    }
    Ok(())
}

async fn build_storybook<R: CommandRunner>(
    config: &Config,
    runner: &R,
    package: &Path,
) -> Result<(), BoxError> {
    let package_name = package
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("package path has no name: {}", package.display()))?;
    info!(package = package_name, "Building storybook");

    // Stale output from a previous run would otherwise be re-discovered and
    // re-uploaded even if this build fails to produce anything.
    let stale_output = package.join(BUILD_MARKER);
    if stale_output.exists() {
        fs::remove_dir_all(&stale_output)
            .map_err(|e| format!("failed to remove {}: {e}", stale_output.display()))?;
    }

    if config.use_yarn_workspaces {
        run_checked(runner, package, &format!("yarn workspaces focus {package_name}")).await?;
    }
    run_checked(runner, package, "yarn run build-storybook").await?;

    Ok(())
}

async fn run_checked<R: CommandRunner>(
    runner: &R,
    dir: &Path,
    command: &str,
) -> Result<(), BoxError> {
    let code = runner.run(dir, command).await?;
    if code != 0 {
        return Err(format!(
            "`{command}` in {} exited with code {code}",
            dir.display()
        )
        .into());
    }
    Ok(())
}
