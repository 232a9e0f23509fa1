//! Google Cloud Storage object store client.
//!
//! A thin wrapper over the GCS JSON API: media-upload puts (overwrite
//! semantics), prefix listing with store-assigned creation times, and
//! `alt=media` downloads. Authentication is a bearer token supplied by
//! configuration; acquiring one is the CI environment's problem.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::contract::{BoxError, ObjectInfo, ObjectStore};

const GCS_API_BASE: &str = "https://storage.googleapis.com";

pub struct GcsStore {
    client: reqwest::Client,
    api_base: String,
    bucket: String,
    token: Option<String>,
}

impl GcsStore {
    pub fn new(bucket: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: GCS_API_BASE.to_string(),
            bucket: bucket.to_string(),
            token,
        }
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// URL for one object's content, `/` in the key percent-encoded as a
    /// single path segment per the JSON API.
    fn object_url(&self, key: &str, query: &[(&str, &str)]) -> Result<Url, BoxError> {
        let mut url = Url::parse(&format!(
            "{}/storage/v1/b/{}/o",
            self.api_base, self.bucket
        ))?;
        url.path_segments_mut()
            .map_err(|_| "api base cannot be a base URL")?
            .push(key);
        for (name, value) in query {
            url.query_pairs_mut().append_pair(name, value);
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListedObject>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    #[serde(rename = "timeCreated")]
    time_created: DateTime<Utc>,
}

async fn check(resp: reqwest::Response, action: &str) -> Result<reqwest::Response, BoxError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("{action} failed with {status}: {body}").into());
    }
    Ok(resp)
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BoxError> {
        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.api_base, self.bucket
        );
        let req = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", key)])
            .header("Content-Type", content_type)
            .body(bytes);
        let resp = self.authorized(req).send().await?;
        check(resp, "object upload").await?;
        debug!(key, "Stored object");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, BoxError> {
        let url = format!("{}/storage/v1/b/{}/o", self.api_base, self.bucket);
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.client.get(&url).query(&[("prefix", prefix)]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }
            let resp = self.authorized(req).send().await?;
            let page: ListResponse = check(resp, "object listing").await?.json().await?;

            objects.extend(page.items.into_iter().map(|item| ObjectInfo {
                key: item.name,
                created: item.time_created,
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(prefix, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        let url = self.object_url(key, &[("alt", "media")])?;
        let req = self.client.get(url);
        let resp = self.authorized(req).send().await?;
        let bytes = check(resp, "object download").await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
