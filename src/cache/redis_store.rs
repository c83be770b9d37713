use std::time::Duration;

use redis::Commands;

use crate::cache::traits::KeyValueStore;
use crate::errors::CacheResult;

/// Redis as the shared external store. Each call opens a short-lived
/// connection bounded by `timeout`, so no connection state is shared.
pub struct RedisStore {
    client: redis::Client,
    timeout: Duration,
}

impl RedisStore {
    /// Open a client for `url` and check the server answers.
    pub fn connect(url: &str, timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let store = Self { client, timeout };

        let mut conn = store.connection()?;
        redis::cmd("PING").query::<String>(&mut conn)?;

        tracing::info!("Connected to redis at {}", url);
        Ok(store)
    }

    fn connection(&self) -> CacheResult<redis::Connection> {
        let conn = self.client.get_connection_with_timeout(self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        Ok(conn)
    }
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection()?;
        let value: Option<String> = conn.get(key)?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection()?;
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection()?;
        conn.del::<_, ()>(key)?;
        Ok(())
    }

    fn keys(&self, prefix: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.connection()?;
        let keys: Vec<String> = conn.keys(format!("{}*", prefix))?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = RedisStore::connect("not-a-redis-url", Duration::from_millis(50));
        assert!(result.is_err());
    }

    #[test]
    fn test_unreachable_server_is_an_error() {
        // Port 1 on localhost is never a redis server
        let result = RedisStore::connect("redis://127.0.0.1:1/0", Duration::from_millis(200));
        assert!(result.is_err());
    }
}
