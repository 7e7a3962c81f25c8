use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::client::Bus;
use crate::error::BusError;

/// The production [`Bus`] backed by a real Redis (or Redis-compatible)
/// server, via `redis::aio::ConnectionManager` — it reconnects and retries
/// transparently, so the dispatcher never has to hold a connection pool of
/// its own (mirrors how `AppState` holds a single `PgPool` in the teacher).
#[derive(Clone)]
pub struct RedisBus {
    conn: ConnectionManager,
}

impl RedisBus {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!("connected to shared bus");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn get(&self, key: &str) -> Result<Option<String>, BusError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        conn.set(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        conn.del(key).await?;
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        conn.lpush(key, value).await?;
        Ok(())
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, BusError> {
        let mut conn = self.conn.clone();
        Ok(conn.rpop(key, None).await?)
    }
}
