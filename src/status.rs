//! GitHub status check notification.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::contract::{BoxError, StatusNotifier};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// Posts commit status checks to the GitHub statuses API.
pub struct GithubStatus {
    client: reqwest::Client,
    api_base: String,
    repo: String,
    token: String,
}

impl GithubStatus {
    pub fn new(repo: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: GITHUB_API_BASE.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
        }
    }
}

fn status_body(commit: &str, target_url: &str) -> serde_json::Value {
    serde_json::json!({
        "state": "success",
        "context": "storybooks: pull request",
        "description": format!("Storybook deployment for {commit}"),
        "target_url": target_url,
    })
}

#[async_trait]
impl StatusNotifier for GithubStatus {
    async fn notify(&self, commit: &str, target_url: &str) -> Result<(), BoxError> {
        let api_url = format!("{}/repos/{}/statuses/{commit}", self.api_base, self.repo);
        let resp = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/vnd.github.v3+json")
            .header("Authorization", format!("token {}", self.token))
            .json(&status_body(commit, target_url))
            .send()
            .await?;

        if resp.status() != StatusCode::CREATED {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("Failed to update Github status {body}").into());
        }

        let data: serde_json::Value = resp.json().await?;
        info!(id = ?data.get("id"), "Updated Github status check");
        debug!(?data, "Github status response");
        Ok(())
    }
}

/// Drives the notification step for one run: honors `skip.status`, warns and
/// skips when no token is configured, otherwise posts one status linking to
/// the commit's published index page.
pub async fn update_github_status<N: StatusNotifier>(
    config: &Config,
    notifier: &N,
    commit: &str,
) -> Result<(), BoxError> {
    if config.skip.status {
        info!("Skipping github status");
        return Ok(());
    }
    if config.github.token.is_none() {
        warn!("Skipping Github status check update - missing access token");
        return Ok(());
    }

    let target_url = format!(
        "{}/commits/{commit}/index.html",
        config.store.public_base_url
    );
    notifier.notify(commit, &target_url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::contract::MockStatusNotifier;

    #[test]
    fn status_body_carries_the_deployment_link() {
        let body = status_body("abc123", "https://site/commits/abc123/index.html");
        assert_eq!(body["state"], "success");
        assert_eq!(body["context"], "storybooks: pull request");
        assert_eq!(body["description"], "Storybook deployment for abc123");
        assert_eq!(body["target_url"], "https://site/commits/abc123/index.html");
    }

    #[tokio::test]
    async fn skip_flag_suppresses_notification() {
        let mut config = test_config();
        config.skip.status = true;
        config.github.token = Some("token".into());

        let mut notifier = MockStatusNotifier::new();
        notifier.expect_notify().times(0);

        update_github_status(&config, &notifier, "abc").await.unwrap();
    }

    #[tokio::test]
    async fn missing_token_skips_with_warning() {
        let config = test_config();
        assert!(config.github.token.is_none());

        let mut notifier = MockStatusNotifier::new();
        notifier.expect_notify().times(0);

        update_github_status(&config, &notifier, "abc").await.unwrap();
    }

    #[tokio::test]
    async fn notifies_with_commit_target_url() {
        let mut config = test_config();
        config.github.token = Some("token".into());

        let mut notifier = MockStatusNotifier::new();
        notifier
            .expect_notify()
            .withf(|commit, target_url| {
                commit == "abc123"
                    && target_url
                        == "https://storage.googleapis.com/example-bucket/commits/abc123/index.html"
            })
            .return_once(|_, _| Ok(()));

        update_github_status(&config, &notifier, "abc123").await.unwrap();
    }
}
