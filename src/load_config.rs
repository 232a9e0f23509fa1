//! Layered configuration loading.
//!
//! Resolution order, highest precedence first: CLI flags, the optional YAML
//! config file, environment variables, built-in defaults. The result is one
//! immutable [`Config`]; validation is eager and reports every violation in
//! a single failure rather than one at a time.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::{
    CiConfig, CommitOverrides, Config, GithubConfig, LogLevel, SkipConfig, StoreConfig,
};

const DEFAULT_MAX_AGE_MS: i64 = 1000 * 60 * 60 * 24 * 30;
const DEFAULT_UPLOAD_CONCURRENCY: usize = 16;
const DEFAULT_NUM_LATEST_ITEMS: usize = 25;
const DEFAULT_MAIN_BRANCH_ITEMS: usize = 3;
const DEFAULT_PACKAGES_DEPTH: usize = 3;

/// Values taken from CLI flags; `None`/`false` means the flag was absent and
/// lower layers decide.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub version_json: Option<PathBuf>,
    pub commit_branch: Option<String>,
    pub commit_summary: Option<PathBuf>,
    pub commit_description: Option<PathBuf>,
    pub skip_build: bool,
    pub skip_publish: bool,
    pub skip_status: bool,
}

/// The YAML config file. Every field is optional; the file only overrides
/// what it mentions.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub log_level: Option<String>,
    pub project_name: Option<String>,
    pub packages_root: Option<PathBuf>,
    pub packages_depth: Option<usize>,
    pub use_yarn_workspaces: Option<bool>,
    #[serde(default)]
    pub skip: FileSkip,
    pub upload_concurrency: Option<usize>,
    pub num_latest_items: Option<usize>,
    pub main_branch_items: Option<usize>,
    #[serde(default)]
    pub commit: FileCommit,
    #[serde(default)]
    pub github: FileGithub,
    #[serde(default)]
    pub store: FileStore,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSkip {
    pub build: Option<bool>,
    pub publish: Option<bool>,
    pub status: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileCommit {
    pub version_json: Option<PathBuf>,
    pub summary_file: Option<PathBuf>,
    pub description_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileGithub {
    pub repo: Option<String>,
    pub main_branch: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileStore {
    pub bucket: Option<String>,
    pub public_base_url: Option<String>,
    pub token: Option<String>,
    pub max_age_ms: Option<i64>,
}

/// Raw environment layer. Separated from `std::env` so resolution is a pure
/// function tests can drive directly.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub log_level: Option<String>,
    pub project_name: Option<String>,
    pub packages_root: Option<String>,
    pub packages_depth: Option<String>,
    pub use_yarn_workspaces: Option<String>,
    pub skip_build: Option<String>,
    pub skip_publish: Option<String>,
    pub skip_status: Option<String>,
    pub upload_concurrency: Option<String>,
    pub num_latest_items: Option<String>,
    pub main_branch_items: Option<String>,
    pub version_json: Option<String>,
    pub commit_summary_file: Option<String>,
    pub commit_description_file: Option<String>,
    pub circle_branch: Option<String>,
    pub circle_pull_request: Option<String>,
    pub github_repo: Option<String>,
    pub github_main_branch: Option<String>,
    pub github_token: Option<String>,
    pub bucket: Option<String>,
    pub public_base_url: Option<String>,
    pub store_token: Option<String>,
    pub max_age_ms: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let get = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            log_level: get("STORYBOOKS_LOG_LEVEL"),
            project_name: get("STORYBOOKS_PROJECT_NAME"),
            packages_root: get("STORYBOOKS_PACKAGES_ROOT"),
            packages_depth: get("STORYBOOKS_PACKAGES_DEPTH"),
            use_yarn_workspaces: get("STORYBOOKS_USE_YARN_WORKSPACES"),
            skip_build: get("STORYBOOKS_SKIP_BUILD"),
            skip_publish: get("STORYBOOKS_SKIP_PUBLISH"),
            skip_status: get("STORYBOOKS_SKIP_STATUS"),
            upload_concurrency: get("STORYBOOKS_UPLOAD_CONCURRENCY"),
            num_latest_items: get("STORYBOOKS_NUM_LATEST_ITEMS"),
            main_branch_items: get("STORYBOOKS_MAIN_BRANCH_ITEMS"),
            version_json: get("STORYBOOKS_VERSION_JSON"),
            commit_summary_file: get("STORYBOOKS_COMMIT_SUMMARY_FILE"),
            commit_description_file: get("STORYBOOKS_COMMIT_DESCRIPTION_FILE"),
            circle_branch: get("CIRCLE_BRANCH"),
            circle_pull_request: get("CIRCLE_PULL_REQUEST"),
            github_repo: get("STORYBOOKS_PROJECT_REPO"),
            github_main_branch: get("STORYBOOKS_PROJECT_MAIN_BRANCH"),
            github_token: get("STORYBOOKS_GITHUB_TOKEN"),
            bucket: get("STORYBOOKS_GCP_BUCKET"),
            public_base_url: get("STORYBOOKS_PUBLIC_BASE_URL"),
            store_token: get("STORYBOOKS_GCP_TOKEN"),
            max_age_ms: get("STORYBOOKS_GCP_MAX_AGE"),
        }
    }
}

fn parse_env<T: FromStr>(
    violations: &mut Vec<String>,
    name: &str,
    value: Option<&String>,
    what: &str,
) -> Option<T> {
    let raw = value?;
    match raw.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            violations.push(format!("{name} must be {what}, got {raw:?}"));
            None
        }
    }
}

fn parse_env_bool(violations: &mut Vec<String>, name: &str, value: Option<&String>) -> Option<bool> {
    let raw = value?;
    match raw.as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        other => {
            violations.push(format!("{name} must be a boolean, got {other:?}"));
            None
        }
    }
}

/// Merges the three layers over the defaults and validates the result.
/// Every violation is collected before failing.
pub fn resolve(cli: &CliOverrides, file: FileConfig, env: EnvConfig) -> Result<Config> {
    let mut violations: Vec<String> = Vec::new();

    let log_level_raw = cli
        .log_level
        .clone()
        .or(file.log_level)
        .or(env.log_level)
        .unwrap_or_else(|| "INFO".to_string());
    let log_level = match log_level_raw.parse::<LogLevel>() {
        Ok(level) => level,
        Err(e) => {
            violations.push(e);
            LogLevel::Info
        }
    };

    let project_name = file.project_name.or(env.project_name);

    let packages_root = file
        .packages_root
        .or(env.packages_root.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let env_depth = parse_env(&mut violations, "STORYBOOKS_PACKAGES_DEPTH", env.packages_depth.as_ref(), "an integer");
    let packages_depth = file
        .packages_depth
        .or(env_depth)
        .unwrap_or(DEFAULT_PACKAGES_DEPTH);
    if packages_depth == 0 {
        violations.push("packages_depth must be at least 1".to_string());
    }

    let env_yarn = parse_env_bool(&mut violations, "STORYBOOKS_USE_YARN_WORKSPACES", env.use_yarn_workspaces.as_ref());
    let use_yarn_workspaces = file.use_yarn_workspaces.or(env_yarn).unwrap_or(true);

    let skip = SkipConfig {
        build: cli.skip_build
            || file
                .skip
                .build
                .or(parse_env_bool(&mut violations, "STORYBOOKS_SKIP_BUILD", env.skip_build.as_ref()))
                .unwrap_or(false),
        publish: cli.skip_publish
            || file
                .skip
                .publish
                .or(parse_env_bool(&mut violations, "STORYBOOKS_SKIP_PUBLISH", env.skip_publish.as_ref()))
                .unwrap_or(false),
        status: cli.skip_status
            || file
                .skip
                .status
                .or(parse_env_bool(&mut violations, "STORYBOOKS_SKIP_STATUS", env.skip_status.as_ref()))
                .unwrap_or(false),
    };

    let env_concurrency = parse_env(&mut violations, "STORYBOOKS_UPLOAD_CONCURRENCY", env.upload_concurrency.as_ref(), "an integer");
    let upload_concurrency = file
        .upload_concurrency
        .or(env_concurrency)
        .unwrap_or(DEFAULT_UPLOAD_CONCURRENCY);
    if upload_concurrency == 0 {
        violations.push("upload_concurrency must be at least 1".to_string());
    }

    let env_latest = parse_env(&mut violations, "STORYBOOKS_NUM_LATEST_ITEMS", env.num_latest_items.as_ref(), "an integer");
    let num_latest_items = file
        .num_latest_items
        .or(env_latest)
        .unwrap_or(DEFAULT_NUM_LATEST_ITEMS);

    let env_main_items = parse_env(&mut violations, "STORYBOOKS_MAIN_BRANCH_ITEMS", env.main_branch_items.as_ref(), "an integer");
    let main_branch_items = file
        .main_branch_items
        .or(env_main_items)
        .unwrap_or(DEFAULT_MAIN_BRANCH_ITEMS);

    let commit = CommitOverrides {
        version_json: cli
            .version_json
            .clone()
            .or(file.commit.version_json)
            .or(env.version_json.map(PathBuf::from)),
        summary_file: cli
            .commit_summary
            .clone()
            .or(file.commit.summary_file)
            .or(env.commit_summary_file.map(PathBuf::from)),
        description_file: cli
            .commit_description
            .clone()
            .or(file.commit.description_file)
            .or(env.commit_description_file.map(PathBuf::from)),
    };

    let ci = CiConfig {
        branch: cli.commit_branch.clone().or(env.circle_branch),
        pull_request: env.circle_pull_request,
    };

    let github_repo = file.github.repo.or(env.github_repo);
    let github = GithubConfig {
        repo: github_repo.clone().unwrap_or_default(),
        main_branch: file
            .github
            .main_branch
            .or(env.github_main_branch)
            .unwrap_or_else(|| "main".to_string()),
        token: file.github.token.or(env.github_token),
    };

    let bucket = file.store.bucket.or(env.bucket);
    let env_max_age = parse_env(&mut violations, "STORYBOOKS_GCP_MAX_AGE", env.max_age_ms.as_ref(), "milliseconds");
    let max_age_ms = file.store.max_age_ms.or(env_max_age).unwrap_or(DEFAULT_MAX_AGE_MS);
    if max_age_ms <= 0 {
        violations.push("store.max_age_ms must be positive".to_string());
    }

    let public_base_url = file
        .store
        .public_base_url
        .or(env.public_base_url)
        .or_else(|| {
            bucket
                .as_ref()
                .map(|b| format!("https://storage.googleapis.com/{b}"))
        });

    if project_name.is_none() {
        violations.push("project_name is required (STORYBOOKS_PROJECT_NAME)".to_string());
    }
    if github_repo.is_none() {
        violations.push("github.repo is required (STORYBOOKS_PROJECT_REPO)".to_string());
    }
    if bucket.is_none() {
        violations.push("store.bucket is required (STORYBOOKS_GCP_BUCKET)".to_string());
    }

    if !violations.is_empty() {
        error!(count = violations.len(), "Configuration is invalid");
        anyhow::bail!("invalid configuration:\n  - {}", violations.join("\n  - "));
    }

    let config = Config {
        log_level,
        project_name: project_name.unwrap_or_default(),
        packages_root,
        packages_depth,
        use_yarn_workspaces,
        skip,
        upload_concurrency,
        num_latest_items,
        main_branch_items,
        commit,
        ci,
        github,
        store: StoreConfig {
            bucket: bucket.unwrap_or_default(),
            public_base_url: public_base_url.unwrap_or_default(),
            token: file.store.token.or(env.store_token),
            max_age: Duration::milliseconds(max_age_ms),
        },
    };
    config.trace_loaded();
    Ok(config)
}

/// Loads the optional config file, reads the environment, and resolves the
/// final configuration.
pub fn load_config(path: Option<&Path>, cli: &CliOverrides) -> Result<Config> {
    let file = match path {
        Some(path) => {
            info!(config_path = ?path, "Loading configuration from file");
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let parsed: FileConfig = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config YAML {}", path.display()))?;
            parsed
        }
        None => FileConfig::default(),
    };

    resolve(cli, file, EnvConfig::from_env())
}
