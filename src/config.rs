//! Resolved configuration value object.
//!
//! One immutable [`Config`] is produced at startup by [`crate::load_config`]
//! and threaded through every phase. Nothing in the pipeline mutates it or
//! reads configuration from the environment after this point.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use tracing::{debug, info};

/// Log verbosity level, as accepted by the `log_level` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Verbose,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// Directive string for the tracing-subscriber `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug | LogLevel::Verbose => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Whether external build commands should stream their stdout through.
    pub fn verbose_enabled(&self) -> bool {
        matches!(self, LogLevel::Trace | LogLevel::Debug | LogLevel::Verbose)
    }

    /// Whether external build commands should stream their stderr through.
    pub fn errors_enabled(&self) -> bool {
        !matches!(self, LogLevel::Off)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "VERBOSE" => Ok(LogLevel::Verbose),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "OFF" => Ok(LogLevel::Off),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format!("{self:?}").to_ascii_uppercase())
    }
}

/// Per-phase skip switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipConfig {
    pub build: bool,
    pub publish: bool,
    pub status: bool,
}

/// Optional file-based overrides for commit metadata gathering.
#[derive(Debug, Clone, Default)]
pub struct CommitOverrides {
    /// JSON file whose `commit` field supplies the commit hash.
    pub version_json: Option<PathBuf>,
    /// Text file supplying the one-line commit summary.
    pub summary_file: Option<PathBuf>,
    /// Text file supplying the multi-line commit description.
    pub description_file: Option<PathBuf>,
}

/// Values handed down by the CI environment.
#[derive(Debug, Clone, Default)]
pub struct CiConfig {
    pub branch: Option<String>,
    pub pull_request: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// Owner and repository, e.g. `mozilla/fxa`.
    pub repo: String,
    pub main_branch: String,
    /// Personal access token for status checks. Status updates are skipped
    /// with a warning when absent.
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub bucket: String,
    /// Public base URL of the published site.
    pub public_base_url: String,
    /// Bearer token for the object store API.
    pub token: Option<String>,
    /// Metadata objects older than this are excluded from the site index.
    pub max_age: Duration,
}

/// The fully resolved, validated configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: LogLevel,
    pub project_name: String,
    pub packages_root: PathBuf,
    /// How many directory levels below the packages root are searched for
    /// marker directories.
    pub packages_depth: usize,
    pub use_yarn_workspaces: bool,
    pub skip: SkipConfig,
    pub upload_concurrency: usize,
    /// Bound on the number of commits in the rebuilt site index.
    pub num_latest_items: usize,
    /// Bound on the "latest main branch" view of the site index.
    pub main_branch_items: usize,
    pub commit: CommitOverrides,
    pub ci: CiConfig,
    pub github: GithubConfig,
    pub store: StoreConfig,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            project = %self.project_name,
            packages_root = %self.packages_root.display(),
            bucket = %self.store.bucket,
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }

    /// Human-readable dump with sensitive values censored, for `--check-config`.
    pub fn censored_summary(&self) -> String {
        let censor = |v: &Option<String>| match v {
            Some(_) => "*****",
            None => "(unset)",
        };
        format!(
            "log_level: {}\n\
             project_name: {}\n\
             packages_root: {}\n\
             packages_depth: {}\n\
             use_yarn_workspaces: {}\n\
             skip: build={} publish={} status={}\n\
             upload_concurrency: {}\n\
             num_latest_items: {}\n\
             main_branch_items: {}\n\
             github.repo: {}\n\
             github.main_branch: {}\n\
             github.token: {}\n\
             store.bucket: {}\n\
             store.public_base_url: {}\n\
             store.token: {}\n\
             store.max_age_ms: {}",
            self.log_level,
            self.project_name,
            self.packages_root.display(),
            self.packages_depth,
            self.use_yarn_workspaces,
            self.skip.build,
            self.skip.publish,
            self.skip.status,
            self.upload_concurrency,
            self.num_latest_items,
            self.main_branch_items,
            self.github.repo,
            self.github.main_branch,
            censor(&self.github.token),
            self.store.bucket,
            self.store.public_base_url,
            censor(&self.store.token),
            self.store.max_age.num_milliseconds(),
        )
    }
}

/// A fully populated configuration for tests. Exported alongside the mocks
/// so integration tests can start from a valid value and override fields.
#[cfg(any(test, feature = "test-export-mocks"))]
pub fn test_config() -> Config {
    Config {
        log_level: LogLevel::Info,
        project_name: "example project".into(),
        packages_root: PathBuf::from("."),
        packages_depth: 3,
        use_yarn_workspaces: true,
        skip: SkipConfig::default(),
        upload_concurrency: 16,
        num_latest_items: 25,
        main_branch_items: 3,
        commit: CommitOverrides::default(),
        ci: CiConfig::default(),
        github: GithubConfig {
            repo: "example/project".into(),
            main_branch: "main".into(),
            token: None,
        },
        store: StoreConfig {
            bucket: "example-bucket".into(),
            public_base_url: "https://storage.googleapis.com/example-bucket".into(),
            token: None,
            max_age: Duration::days(30),
        },
    }
}
