//! In-process key-value store for single-node runs and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{StatusError, StatusResult};
use crate::kv::KeyValueStore;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// `HashMap` with lazy expiry; expired keys are dropped on access.
#[derive(Debug, Default)]
pub struct InMemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StatusResult<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| StatusError::unavailable("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKv {
    async fn get(&self, key: &str) -> StatusResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StatusResult<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.lock()?.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StatusResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> StatusResult<Vec<String>> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        entries.retain(|_, entry| entry.is_live(now));
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> StatusResult<()> {
        Ok(())
    }
}

/// Match `text` against a pattern where `*` matches any run of chars.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !text.starts_with(first) || text.len() < first.len() + last.len() || !text.ends_with(last) {
        return false;
    }

    let mut rest = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("owner:a:video:*:status", "owner:a:video:v1:status"));
        assert!(!glob_match("owner:a:video:*:status", "owner:a:video:v1:output_link"));
        assert!(!glob_match("owner:a:video:*:status", "owner:ab:video:v1:status"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("a*b*c", "acb"));
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let kv = InMemoryKv::new();
        kv.set("k", "v", None).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));
        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_keys_disappear() {
        let kv = InMemoryKv::new();
        kv.set("short", "v", Some(Duration::from_millis(10))).await.unwrap();
        kv.set("long", "v", Some(Duration::from_secs(60))).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(kv.get("short").await.unwrap(), None);
        assert_eq!(kv.scan("*").await.unwrap(), vec!["long".to_string()]);
    }
}
