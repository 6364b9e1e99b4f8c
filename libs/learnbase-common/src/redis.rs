use redis::{AsyncCommands, RedisResult};

// Redis key layout for persisted learner progress.
// Keys are deterministic so API replicas agree on where a topic lives.

pub const PROGRESS_PREFIX: &str = "learnbase:progress";

/// Clamp-and-store in one round trip so concurrent bumps never lose an update
const BUMP_SCRIPT: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local updated = current + tonumber(ARGV[1])
if updated < 0 then updated = 0 end
if updated > 100 then updated = 100 end
redis.call('SET', KEYS[1], updated)
return updated
";

/// Generate the progress key for a topic
pub fn progress_key(topic: &str) -> String {
    format!("{}:{}", PROGRESS_PREFIX, topic)
}

/// Read the stored progress for a topic, `None` if it was never written
pub async fn get_progress(
    conn: &mut redis::aio::ConnectionManager,
    topic: &str,
) -> RedisResult<Option<i64>> {
    conn.get(progress_key(topic)).await
}

/// Overwrite the progress for a topic
pub async fn set_progress(
    conn: &mut redis::aio::ConnectionManager,
    topic: &str,
    value: i64,
) -> RedisResult<()> {
    conn.set(progress_key(topic), value).await
}

/// Atomically add `delta` to a topic's progress, clamped to 0..=100
pub async fn bump_progress(
    conn: &mut redis::aio::ConnectionManager,
    topic: &str,
    delta: i64,
) -> RedisResult<i64> {
    redis::Script::new(BUMP_SCRIPT)
        .key(progress_key(topic))
        .arg(delta)
        .invoke_async(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_key_format() {
        assert_eq!(progress_key("recursion"), "learnbase:progress:recursion");
    }

    #[test]
    fn test_progress_key_deterministic() {
        assert_eq!(progress_key("graphs"), progress_key("graphs"));
        assert_ne!(progress_key("graphs"), progress_key("trees"));
    }
}
