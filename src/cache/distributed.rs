//! Distributed Backend Module
//!
//! Distributed tier over the Redis protocol, using a multiplexed async
//! connection shared by every caller.
//!
//! Every command gets one deadline of `operation_timeout`; connecting is
//! bounded by `connect_timeout`. A command that fails fast on a reused
//! connection gets one retry on a fresh connection, inside the same deadline.
//! A single command therefore takes at most `connect_timeout +
//! operation_timeout`. `delete_pattern` and `flush` send two commands and can
//! take up to twice the operation timeout.
//!
//! Globs are escaped before reaching `KEYS`, so `*` is the only wildcard on
//! this tier too.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Cmd, FromRedisValue};
use tokio::sync::RwLock;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info};

use crate::cache::DistributedBackend;
use crate::config::Config;
use crate::error::{BackendError, BackendResult};

// == Redis Backend ==
pub struct RedisBackend {
    client: Client,
    /// Cached connection, `None` until first use or after a failure
    connection: RwLock<Option<MultiplexedConnection>>,
    connect_timeout: Duration,
    operation_timeout: Duration,
}

impl RedisBackend {
    // == Constructor ==
    /// Creates a backend for `url` without connecting.
    ///
    /// Only URL parsing can fail here.
    pub fn new(
        url: &str,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> BackendResult<Self> {
        let client = Client::open(url)
            .map_err(|e| BackendError::Protocol(format!("invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            connect_timeout,
            operation_timeout,
        })
    }

    /// Creates a backend from host/port/credentials in the config.
    pub fn from_config(config: &Config) -> BackendResult<Self> {
        Self::new(
            &config.redis_url(),
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.operation_timeout_ms),
        )
    }

    async fn open_connection(&self) -> BackendResult<MultiplexedConnection> {
        match timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(BackendError::from(e)),
            Err(_) => Err(BackendError::Timeout(format!(
                "connect after {}ms",
                self.connect_timeout.as_millis()
            ))),
        }
    }

    /// Returns the cached connection, opening one if needed.
    ///
    /// The flag is true when the connection was just opened.
    async fn connection(&self) -> BackendResult<(MultiplexedConnection, bool)> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok((conn.clone(), false));
        }

        let conn = self.open_connection().await?;
        *self.connection.write().await = Some(conn.clone());
        Ok((conn, true))
    }

    async fn drop_connection(&self) {
        *self.connection.write().await = None;
    }

    async fn run<T>(&self, op: &'static str, cmd: &Cmd) -> BackendResult<T>
    where
        T: FromRedisValue + Send,
    {
        let (mut conn, fresh) = self.connection().await?;
        let deadline = Instant::now() + self.operation_timeout;

        match self.execute(op, cmd, &mut conn, deadline).await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.drop_connection().await;
                if fresh || Instant::now() >= deadline {
                    return Err(err);
                }

                debug!("Redis {} failed on reused connection ({}), retrying once", op, err);
                let result = match timeout_at(deadline, self.connection()).await {
                    Ok(Ok((mut conn, _))) => self.execute(op, cmd, &mut conn, deadline).await,
                    Ok(Err(err)) => Err(err),
                    Err(_) => Err(self.timed_out(op)),
                };
                if result.is_err() {
                    self.drop_connection().await;
                }
                result
            }
        }
    }

    async fn execute<T>(
        &self,
        op: &'static str,
        cmd: &Cmd,
        conn: &mut MultiplexedConnection,
        deadline: Instant,
    ) -> BackendResult<T>
    where
        T: FromRedisValue + Send,
    {
        match timeout_at(deadline, cmd.query_async(conn)).await {
            Ok(result) => result.map_err(BackendError::from),
            Err(_) => Err(self.timed_out(op)),
        }
    }

    fn timed_out(&self, op: &str) -> BackendError {
        BackendError::Timeout(format!(
            "{} after {}ms",
            op,
            self.operation_timeout.as_millis()
        ))
    }
}

/// Escapes Redis glob metacharacters other than `*`.
fn escape_glob(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '\\' | '?' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl DistributedBackend for RedisBackend {
    async fn connect(&self) -> BackendResult<()> {
        let conn = self.open_connection().await?;
        *self.connection.write().await = Some(conn);
        self.ping().await?;
        info!("Connected to Redis");
        Ok(())
    }

    async fn ping(&self) -> BackendResult<()> {
        let reply: String = self.run("PING", &redis::cmd("PING")).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(BackendError::Protocol(format!("unexpected PING reply: {}", reply)))
        }
    }

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run("GET", &cmd).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl_seconds: u64) -> BackendResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if ttl_seconds > 0 {
            cmd.arg("EX").arg(ttl_seconds);
        }
        self.run("SET", &cmd).await
    }

    async fn delete(&self, key: &str) -> BackendResult<u64> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.run("DEL", &cmd).await
    }

    async fn delete_pattern(&self, pattern: &str) -> BackendResult<u64> {
        let keys = self.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut cmd = redis::cmd("DEL");
        cmd.arg(&keys);
        self.run("DEL", &cmd).await
    }

    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>> {
        let mut cmd = redis::cmd("KEYS");
        cmd.arg(escape_glob(pattern));
        let mut keys: Vec<String> = self.run("KEYS", &cmd).await?;
        keys.sort();
        Ok(keys)
    }

    async fn flush(&self) -> BackendResult<u64> {
        let held: u64 = self.run("DBSIZE", &redis::cmd("DBSIZE")).await?;
        self.run::<()>("FLUSHDB", &redis::cmd("FLUSHDB")).await?;
        Ok(held)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("connect_timeout", &self.connect_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}
