use std::time::Duration;

use active_ics_core::{
    Error, Result,
    cache::{CacheBackend, MemoryCache},
};
use async_trait::async_trait;

/// Redis 缓存实现
#[derive(Debug, Clone)]
pub struct RedisCache {
    connection: redis::aio::MultiplexedConnection,
    prefix: String,
}

impl RedisCache {
    /// 创建新的 Redis 缓存实例
    pub async fn new(redis_url: &str, prefix: Option<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Config(format!("Failed to create Redis client: {}", e)))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Config(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            prefix: prefix.unwrap_or_else(|| "active-ics".to_string()),
        })
    }

    /// 构建带前缀的键
    fn build_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        use redis::AsyncCommands;

        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(self.build_key(key), value, ttl.as_secs().max(1))
            .await
            .map_err(|e| Error::Internal(format!("Failed to set Redis key: {}", e)))
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        use redis::AsyncCommands;

        let mut conn = self.connection.clone();
        conn.get(self.build_key(key))
            .await
            .map_err(|e| Error::Internal(format!("Failed to get Redis key: {}", e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        use redis::AsyncCommands;

        let mut conn = self.connection.clone();
        conn.del::<_, ()>(self.build_key(key))
            .await
            .map_err(|e| Error::Internal(format!("Failed to delete Redis key: {}", e)))
    }
}

/// 服务端日历缓存：配置了 REDIS_URL 时使用 Redis，否则使用进程内缓存
#[derive(Debug, Clone)]
pub enum ServerCache {
    Redis(RedisCache),
    Memory(MemoryCache),
}

impl ServerCache {
    pub async fn connect(redis_url: Option<&str>) -> Result<Self> {
        match redis_url {
            Some(url) => {
                tracing::info!("Caching calendars in Redis");
                Ok(Self::Redis(RedisCache::new(url, None).await?))
            }
            None => {
                tracing::info!("REDIS_URL not set, caching calendars in memory");
                Ok(Self::Memory(MemoryCache::new()))
            }
        }
    }
}

#[async_trait]
impl CacheBackend for ServerCache {
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        match self {
            Self::Redis(cache) => cache.set_raw(key, value, ttl).await,
            Self::Memory(cache) => cache.set_raw(key, value, ttl).await,
        }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Redis(cache) => cache.get_raw(key).await,
            Self::Memory(cache) => cache.get_raw(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Self::Redis(cache) => cache.delete(key).await,
            Self::Memory(cache) => cache.delete(key).await,
        }
    }
}
