use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence seam for the seen-question ledger. Implementations must keep
/// one row per question id and preserve `last_seen` ordering for pruning.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Insert the id or refresh its `last_seen` timestamp.
    async fn upsert(&self, question_id: &str, seen_at: DateTime<Utc>) -> Result<()>;

    /// Whether the id has been recorded before.
    async fn contains(&self, question_id: &str) -> Result<bool>;

    /// Number of recorded ids.
    async fn count(&self) -> Result<u64>;

    /// Delete the `n` entries with the oldest `last_seen` (ties broken by id
    /// so deletion order is deterministic). Returns rows actually removed.
    async fn delete_oldest(&self, n: u64) -> Result<u64>;
}

/// Map-backed store for tests and ephemeral runs; nothing survives restart.
pub struct MemorySeenStore {
    inner: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Timestamp introspection, mainly for asserting refresh-on-duplicate.
    pub fn last_seen(&self, question_id: &str) -> Option<DateTime<Utc>> {
        self.lock().get(question_id).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Default for MemorySeenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeenStore for MemorySeenStore {
    async fn upsert(&self, question_id: &str, seen_at: DateTime<Utc>) -> Result<()> {
        self.lock().insert(question_id.to_string(), seen_at);
        Ok(())
    }

    async fn contains(&self, question_id: &str) -> Result<bool> {
        Ok(self.lock().contains_key(question_id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.lock().len() as u64)
    }

    async fn delete_oldest(&self, n: u64) -> Result<u64> {
        let mut map = self.lock();
        let mut entries: Vec<(String, DateTime<Utc>)> =
            map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let doomed: Vec<String> = entries
            .into_iter()
            .take(n as usize)
            .map(|(k, _)| k)
            .collect();
        for key in &doomed {
            map.remove(key);
        }
        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn upsert_then_contains() {
        let store = MemorySeenStore::new();
        let now = Utc::now();
        store.upsert("q1", now).await.unwrap();

        assert!(store.contains("q1").await.unwrap());
        assert!(!store.contains("q2").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_refreshes_timestamp() {
        let store = MemorySeenStore::new();
        let early = Utc::now() - Duration::hours(5);
        let late = Utc::now();

        store.upsert("q1", early).await.unwrap();
        store.upsert("q1", late).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.last_seen("q1"), Some(late));
    }

    #[tokio::test]
    async fn delete_oldest_removes_in_timestamp_order() {
        let store = MemorySeenStore::new();
        let base = Utc::now();
        store.upsert("old", base - Duration::hours(3)).await.unwrap();
        store.upsert("mid", base - Duration::hours(2)).await.unwrap();
        store.upsert("new", base - Duration::hours(1)).await.unwrap();

        let removed = store.delete_oldest(2).await.unwrap();
        assert_eq!(removed, 2);
        assert!(!store.contains("old").await.unwrap());
        assert!(!store.contains("mid").await.unwrap());
        assert!(store.contains("new").await.unwrap());
    }

    #[tokio::test]
    async fn delete_oldest_breaks_timestamp_ties_by_id() {
        let store = MemorySeenStore::new();
        let ts = Utc::now();
        store.upsert("b", ts).await.unwrap();
        store.upsert("a", ts).await.unwrap();
        store.upsert("c", ts).await.unwrap();

        store.delete_oldest(1).await.unwrap();
        assert!(!store.contains("a").await.unwrap());
        assert!(store.contains("b").await.unwrap());
        assert!(store.contains("c").await.unwrap());
    }

    #[tokio::test]
    async fn delete_more_than_present_is_safe() {
        let store = MemorySeenStore::new();
        store.upsert("only", Utc::now()).await.unwrap();

        let removed = store.delete_oldest(10).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
