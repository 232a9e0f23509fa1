//! Test doubles exported behind the `test-export-mocks` feature.
//!
//! [`InMemoryStore`] implements the object-store contract over a hash map
//! and instruments concurrency: it tracks how many puts are in flight at any
//! instant, so tests can assert the upload pool never exceeds its bound.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contract::{BoxError, ObjectInfo, ObjectStore};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub created: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    fail_keys: Mutex<HashSet<String>>,
    put_delay: Option<Duration>,
    active_puts: AtomicUsize,
    max_active_puts: AtomicUsize,
    put_count: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds each put open for `delay`, widening the window in which
    /// overlapping uploads are observable.
    pub fn with_put_delay(delay: Duration) -> Self {
        Self {
            put_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Any put to `key` will fail.
    pub fn fail_key(&self, key: &str) {
        self.fail_keys.lock().unwrap().insert(key.to_string());
    }

    /// Pre-populates an object with an explicit creation time.
    pub fn seed(&self, key: &str, bytes: Vec<u8>, content_type: &str, created: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                created,
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Highest number of puts that were ever in flight simultaneously.
    pub fn max_active_puts(&self) -> usize {
        self.max_active_puts.load(Ordering::SeqCst)
    }

    /// Puts currently in flight; zero once a batch call has returned.
    pub fn active_puts(&self) -> usize {
        self.active_puts.load(Ordering::SeqCst)
    }

    /// Total puts attempted, including failed ones.
    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BoxError> {
        let active = self.active_puts.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_puts.fetch_max(active, Ordering::SeqCst);
        self.put_count.fetch_add(1, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active_puts);

        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_keys.lock().unwrap().contains(key) {
            return Err(format!("injected failure for {key}").into());
        }

        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                created: Utc::now(),
            },
        );
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, BoxError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                created: object.created,
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| format!("no such object: {key}").into())
    }
}
