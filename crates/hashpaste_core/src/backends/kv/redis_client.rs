//! Networked key-value client speaking the Redis protocol.

use super::{KeyValueClient, KvError, RedisSettings};
use redis::{Commands, IntoConnectionInfo};
use std::time::Duration;

/// [`KeyValueClient`] opening a short-lived connection per operation.
pub struct RedisClient {
    client: redis::Client,
    timeout: Duration,
}

/// Escape glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('*');
    escaped
}

impl RedisClient {
    /// Build a client; no connection is made until the first operation.
    ///
    /// # Errors
    /// Returns an error when the settings do not form a valid address.
    pub fn new(settings: &RedisSettings) -> Result<Self, KvError> {
        let mut info = format!(
            "redis://{}:{}/{}",
            settings.host, settings.port, settings.db_index
        )
        .into_connection_info()?;
        info.redis.password = settings.password.clone();
        Ok(Self {
            client: redis::Client::open(info)?,
            timeout: settings.timeout,
        })
    }

    fn connection(&self) -> Result<redis::Connection, KvError> {
        let conn = self.client.get_connection_with_timeout(self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        Ok(conn)
    }
}

impl KeyValueClient for RedisClient {
    fn ping(&self) -> Result<(), KvError> {
        let mut conn = self.connection()?;
        redis::cmd("PING").query::<String>(&mut conn)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.connection()?.get(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.connection()?.set::<_, _, ()>(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        self.connection()?.del::<_, ()>(key)?;
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.connection()?.exists(key)?)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let mut conn = self.connection()?;
        let keys = conn.scan_match::<_, String>(escape_glob(prefix))?.collect();
        Ok(keys)
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        let mut conn = self.connection()?;
        let keys = conn.scan::<String>()?.collect();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_escape_keeps_prefix_literal() {
        assert_eq!(escape_glob("abc."), "abc.*");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]*");
    }

    #[test]
    fn unreachable_server_fails_ping() {
        let client = RedisClient::new(&RedisSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            password: Some("secret".to_string()),
            db_index: 1,
            timeout: Duration::from_millis(500),
        })
        .expect("client");
        assert!(client.ping().is_err());
    }
}
