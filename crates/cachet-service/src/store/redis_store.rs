//! Redis-backed store client.

use super::StoreClient;
use async_trait::async_trait;
use cachet_config::RedisConfig;
use cachet_core::{StoreError, StoreResult};
use deadpool_redis::{Pool, Runtime};
use parking_lot::Mutex;
use redis::{Cmd, FromRedisValue, RedisError, Value};
use shaku::Component;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis store client.
///
/// Blocking calls share one connection opened from `client` and reopened
/// after a connection failure; non-blocking calls borrow one from `pool`.
/// A store built without either fails every call with
/// [`StoreError::Disabled`].
#[derive(Component)]
#[shaku(interface = StoreClient)]
pub struct RedisStore {
    /// Client for blocking calls.
    #[shaku(default)]
    client: Option<redis::Client>,
    /// Connection pool for async calls.
    #[shaku(default)]
    pool: Option<Arc<Pool>>,
    /// Connect timeout and per-call read/write timeout for blocking calls.
    #[shaku(default = DEFAULT_TIMEOUT)]
    timeout: Duration,
    /// Connection reused by blocking calls.
    #[shaku(default)]
    blocking: Mutex<Option<redis::Connection>>,
}

impl RedisStore {
    /// Create a store from an existing client and pool.
    #[must_use]
    pub fn new(client: redis::Client, pool: Arc<Pool>, timeout: Duration) -> Self {
        Self {
            client: Some(client),
            pool: Some(pool),
            timeout,
            blocking: Mutex::new(None),
        }
    }

    /// Create a store that rejects every call.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            client: None,
            pool: None,
            timeout: DEFAULT_TIMEOUT,
            blocking: Mutex::new(None),
        }
    }

    /// Create a store for the configured Redis instance.
    ///
    /// No connection is opened until the first call.
    pub fn connect(config: &RedisConfig) -> StoreResult<Self> {
        let (client, pool) = Self::open(config)?;
        Ok(Self::new(client, pool, config.connect_timeout()))
    }

    /// Build the blocking client and async pool for `config`.
    pub fn open(config: &RedisConfig) -> StoreResult<(redis::Client, Arc<Pool>)> {
        info!("Creating Redis store client for {}", redact_url(&config.url));

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Connection(format!("Invalid Redis URL: {}", e)))?;

        let pool = deadpool_redis::Config::from_url(&config.url)
            .builder()
            .map_err(|e| StoreError::Pool(format!("Invalid Redis pool config: {}", e)))?
            .max_size(config.pool_size)
            .create_timeout(Some(config.connect_timeout()))
            .wait_timeout(Some(config.connect_timeout()))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| StoreError::Pool(format!("Failed to create pool: {}", e)))?;

        Ok((client, Arc::new(pool)))
    }

    /// Check if a backend is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.client.is_some() || self.pool.is_some()
    }

    /// Run `cmd` on the shared blocking connection, opening it if needed.
    ///
    /// The connection is discarded when the call fails at the connection
    /// level, so the next call reconnects.
    fn query_blocking<R: FromRedisValue>(&self, command: &'static str, key: &str, cmd: &Cmd) -> StoreResult<R> {
        let client = self.client.as_ref().ok_or(StoreError::Disabled)?;

        let mut slot = self.blocking.lock();
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.open_blocking(client)?,
        };

        match cmd.query(&mut conn) {
            Ok(reply) => {
                *slot = Some(conn);
                Ok(reply)
            }
            Err(err) => {
                if is_connection_error(&err) {
                    warn!("Dropping blocking Redis connection after {} failure: {}", command, err);
                } else {
                    *slot = Some(conn);
                }
                Err(map_redis_error(command, key, &err))
            }
        }
    }

    fn open_blocking(&self, client: &redis::Client) -> StoreResult<redis::Connection> {
        let connection_error = |e: RedisError| StoreError::Connection(format!("Failed to get Redis connection: {}", e));

        let conn = client
            .get_connection_with_timeout(self.timeout)
            .map_err(connection_error)?;
        conn.set_read_timeout(Some(self.timeout)).map_err(connection_error)?;
        conn.set_write_timeout(Some(self.timeout)).map_err(connection_error)?;

        debug!("Opened blocking Redis connection");
        Ok(conn)
    }

    /// Get a connection from the pool.
    async fn async_conn(&self) -> StoreResult<deadpool_redis::Connection> {
        match &self.pool {
            Some(pool) => pool
                .get()
                .await
                .map_err(|e| StoreError::Pool(format!("Failed to get Redis connection: {}", e))),
            None => Err(StoreError::Disabled),
        }
    }
}

fn set_cmd(key: &str, value: &str, ttl: Option<Duration>) -> Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if let Some(ttl) = ttl {
        cmd.arg("PX").arg(ttl_millis(ttl));
    }
    cmd
}

/// Redis rejects `PX 0`, so sub-millisecond TTLs are rounded up.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn key_cmd(command: &'static str, key: &str) -> Cmd {
    let mut cmd = redis::cmd(command);
    cmd.arg(key);
    cmd
}

fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout()
}

fn map_redis_error(command: &'static str, key: &str, err: &RedisError) -> StoreError {
    if is_connection_error(err) {
        StoreError::Connection(format!("{} '{}': {}", command, key, err))
    } else {
        StoreError::command(command, key, err)
    }
}

fn set_accepted(reply: &Value) -> bool {
    !matches!(reply, Value::Nil)
}

/// Hide credentials when logging a connection URL.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl StoreClient for RedisStore {
    fn string_set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<bool> {
        let reply: Value = self.query_blocking("SET", key, &set_cmd(key, value, ttl))?;

        debug!("Set key '{}' (ttl: {:?})", key, ttl);
        Ok(set_accepted(&reply))
    }

    fn string_get(&self, key: &str) -> StoreResult<Option<String>> {
        self.query_blocking("GET", key, &key_cmd("GET", key))
    }

    fn key_exists(&self, key: &str) -> StoreResult<bool> {
        self.query_blocking("EXISTS", key, &key_cmd("EXISTS", key))
    }

    fn key_delete(&self, key: &str) -> StoreResult<bool> {
        let deleted: i64 = self.query_blocking("DEL", key, &key_cmd("DEL", key))?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(deleted > 0)
    }

    async fn string_set_async(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<bool> {
        let mut conn = self.async_conn().await?;
        let reply: Value = set_cmd(key, value, ttl)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("SET", key, &e))?;

        debug!("Set key '{}' (ttl: {:?})", key, ttl);
        Ok(set_accepted(&reply))
    }

    async fn string_get_async(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.async_conn().await?;
        key_cmd("GET", key)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("GET", key, &e))
    }

    async fn key_exists_async(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.async_conn().await?;
        key_cmd("EXISTS", key)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("EXISTS", key, &e))
    }

    async fn key_delete_async(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.async_conn().await?;
        let deleted: i64 = key_cmd("DEL", key)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("DEL", key, &e))?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(deleted > 0)
    }
}
