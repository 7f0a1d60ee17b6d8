use super::{EphemeralStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Sharded in-process store to reduce lock contention
///
/// Uses multiple shards (separate HashMaps) to distribute load across
/// concurrent uploads. Keys are hashed to determine which shard to use.
#[derive(Clone)]
pub struct MemoryStore {
    shards: Vec<Arc<Mutex<HashMap<String, Entry>>>>,
    shard_count: usize,
    max_entries: usize, // Maximum number of live entries per shard
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new store with the default shard count (16 shards)
    pub fn new() -> Self {
        Self::with_shards(16)
    }

    /// Create a store with a custom shard count
    ///
    /// # Arguments
    /// * `shard_count` - Number of shards (should be a power of 2 for best distribution)
    pub fn with_shards(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            shard_count,
            max_entries: 10_000,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shard_count
    }

    fn shard(&self, key: &str) -> &Arc<Mutex<HashMap<String, Entry>>> {
        &self.shards[self.shard_index(key)]
    }

    /// Remove expired entries from every shard
    /// Returns the number of entries removed
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut total_cleaned = 0;

        for shard in &self.shards {
            let mut entries = shard.lock().await;
            let before_count = entries.len();
            entries.retain(|_key, entry| entry.is_live(now));
            total_cleaned += before_count - entries.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                entries_cleaned = total_cleaned,
                "Cleaned up expired store entries across all shards"
            );
        }

        total_cleaned
    }

    /// Number of live entries across all shards.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let mut total = 0;
        for shard in &self.shards {
            total += shard
                .lock()
                .await
                .values()
                .filter(|entry| entry.is_live(now))
                .count();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Make room for one more entry by dropping expired entries. Live
    /// entries are never evicted; a shard full of live entries refuses the
    /// new key.
    fn make_room(&self, entries: &mut HashMap<String, Entry>, now: Instant) -> StoreResult<()> {
        if entries.len() < self.max_entries {
            return Ok(());
        }

        entries.retain(|_key, entry| entry.is_live(now));

        if entries.len() >= self.max_entries {
            tracing::warn!(
                max_entries = self.max_entries,
                "Store shard full of live entries, refusing new key"
            );
            return Err(StoreError::CapacityExceeded {
                max_entries: self.max_entries,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let entries = self.shard(key).lock().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let mut entries = self.shard(key).lock().await;
        if !entries.contains_key(key) {
            self.make_room(&mut entries, now)?;
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        let now = Instant::now();
        let mut entries = self.shard(key).lock().await;

        if let Some(entry) = entries.get_mut(key).filter(|entry| entry.is_live(now)) {
            let count = entry
                .value
                .parse::<u64>()
                .map_err(|_| StoreError::NotACounter(key.to_string()))?
                .saturating_add(1);
            entry.value = count.to_string();
            return Ok(count);
        }

        if !entries.contains_key(key) {
            self.make_room(&mut entries, now)?;
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: "1".to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(1)
    }

    async fn ttl_remaining(&self, key: &str) -> StoreResult<Option<Duration>> {
        let now = Instant::now();
        let entries = self.shard(key).lock().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at.saturating_duration_since(now)))
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.shard(key).lock().await.remove(key);
        Ok(())
    }
}
