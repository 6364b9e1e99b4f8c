// Per-topic learner progress, kept in memory or in Redis

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const MAX_PROGRESS: i64 = 100;

fn clamp(value: i64) -> u8 {
    value.clamp(0, MAX_PROGRESS) as u8
}

/// Progress bookkeeping backend. Values are percentages in 0..=100.
#[derive(Clone)]
pub enum ProgressStore {
    Memory(Arc<RwLock<HashMap<String, u8>>>),
    Redis(redis::aio::ConnectionManager),
}

impl ProgressStore {
    pub fn in_memory() -> Self {
        ProgressStore::Memory(Arc::new(RwLock::new(HashMap::new())))
    }

    pub fn redis(conn: redis::aio::ConnectionManager) -> Self {
        ProgressStore::Redis(conn)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            ProgressStore::Memory(_) => "memory",
            ProgressStore::Redis(_) => "redis",
        }
    }

    /// Current progress for a topic; topics never seen report 0
    pub async fn get(&self, topic: &str) -> redis::RedisResult<u8> {
        match self {
            ProgressStore::Memory(store) => {
                Ok(store.read().await.get(topic).copied().unwrap_or(0))
            }
            ProgressStore::Redis(conn) => {
                let mut conn = conn.clone();
                let value = crate::redis::get_progress(&mut conn, topic).await?;
                Ok(clamp(value.unwrap_or(0)))
            }
        }
    }

    /// Add `delta` (may be negative) and return the clamped result
    pub async fn bump(&self, topic: &str, delta: i64) -> redis::RedisResult<u8> {
        match self {
            ProgressStore::Memory(store) => {
                let mut store = store.write().await;
                let current = store.get(topic).copied().unwrap_or(0) as i64;
                let updated = clamp(current.saturating_add(delta));
                store.insert(topic.to_string(), updated);
                Ok(updated)
            }
            ProgressStore::Redis(conn) => {
                let mut conn = conn.clone();
                let updated = crate::redis::bump_progress(&mut conn, topic, delta).await?;
                Ok(clamp(updated))
            }
        }
    }

    /// Overwrite the progress for a topic, clamped to 0..=100
    pub async fn set(&self, topic: &str, value: i64) -> redis::RedisResult<u8> {
        let value = clamp(value);
        match self {
            ProgressStore::Memory(store) => {
                store.write().await.insert(topic.to_string(), value);
            }
            ProgressStore::Redis(conn) => {
                let mut conn = conn.clone();
                crate::redis::set_progress(&mut conn, topic, value as i64).await?;
            }
        }
        Ok(value)
    }
}
