use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant as StdInstant},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    data: Vec<u8>,
    expires_at: StdInstant,
}

impl MemoryEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: StdInstant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        StdInstant::now() >= self.expires_at
    }
}

/// 进程内缓存实现
///
/// 过期条目在读取时删除，每次写入时也会清理全部过期条目。
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前条目数（包括尚未清理的过期条目）
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired());
        entries.insert(key.to_string(), MemoryEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.data.clone())),
                Some(_) => {}
            }
        }

        // 写锁下再检查一次，期间可能已被重新写入
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(MemoryEntry::is_expired) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// 缓存管理器，提供统一的缓存接口
#[derive(Clone)]
pub struct CacheManager<C: CacheBackend> {
    cache: C,
}

impl<C: CacheBackend> CacheManager<C> {
    pub fn new(cache: C) -> Self
    where
        C: CacheBackend + 'static,
    {
        Self { cache }
    }

    pub fn calendar_cache_key(source: &str) -> String {
        format!("calendar:{}", source)
    }

    /// 缓存日历原始内容
    pub async fn cache_calendar(&self, source: &str, body: &str, ttl: Duration) -> Result<()> {
        let key = Self::calendar_cache_key(source);
        self.cache.set_raw(&key, body.as_bytes(), ttl).await
    }

    /// 读取缓存的日历内容，非 UTF-8 的条目会被丢弃
    pub async fn get_cached_calendar(&self, source: &str) -> Result<Option<String>> {
        let key = Self::calendar_cache_key(source);
        match self.cache.get_raw(&key).await? {
            Some(raw) => match String::from_utf8(raw) {
                Ok(body) => Ok(Some(body)),
                Err(_) => {
                    tracing::warn!("Dropping non UTF-8 cache entry for {}", source);
                    self.cache.delete(&key).await?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// 删除日历缓存
    pub async fn remove_calendar_cache(&self, source: &str) -> Result<()> {
        let key = Self::calendar_cache_key(source);
        self.cache.delete(&key).await
    }
}
