// SQL Cache Tier
//
// Caches generated SQL keyed by the user's prompt so repeated questions skip
// the LLM round trip. A shared Redis backend is preferred; when it cannot be
// reached the tier falls back to an in-memory map owned by the process.

use crate::config::{mask_credentials, CacheConfig};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Backend failure. Never escapes the tier except inside a lookup/write outcome.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),

    #[error("cache command failed: {0}")]
    Command(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Command(err.to_string())
        }
    }
}

/// Which backend a tier is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Network cache with per-entry TTL
    Shared,
    /// Process-local map, lost on restart
    Local,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Shared => write!(f, "Redis"),
            CacheKind::Local => write!(f, "memory"),
        }
    }
}

/// Result of a cache read
#[derive(Debug)]
pub enum CacheLookup {
    Hit(String),
    Miss,
    /// The backend failed; callers treat this like a miss
    Unavailable(CacheError),
}

impl CacheLookup {
    pub fn into_sql(self) -> Option<String> {
        match self {
            CacheLookup::Hit(sql) => Some(sql),
            CacheLookup::Miss | CacheLookup::Unavailable(_) => None,
        }
    }
}

/// Result of a cache write
#[derive(Debug)]
pub enum CacheWrite {
    Stored,
    /// The write failed and was dropped
    Skipped(CacheError),
}

/// Storage behind a cache tier
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn kind(&self) -> CacheKind;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value. `ttl` is only honoured by backends that support expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Redis-backed shared cache
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Open a connection and PING it; the backend is only trusted if both succeed
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn kind(&self) -> CacheKind {
        CacheKind::Shared
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GET").arg(key).query_async::<Option<String>>(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        redis::cmd("SETEX")
            .arg(key)
            .arg(seconds)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// In-memory fallback cache
///
/// Created once at startup and handed to every tier built during the
/// process, so re-probing the shared backend never drops cached entries.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: RwLock<HashMap<String, String>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for LocalCache {
    fn kind(&self) -> CacheKind {
        CacheKind::Local
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub read_errors: u64,
    pub writes: u64,
    pub write_errors: u64,
}

impl CacheStats {
    /// Calculate hit ratio (0.0 to 1.0); failed reads count as lookups
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses + self.read_errors;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    read_errors: AtomicU64,
    writes: AtomicU64,
    write_errors: AtomicU64,
}

/// Cache tier: one backend chosen up front, with backend errors absorbed here
#[derive(Clone)]
pub struct CacheTier {
    backend: Arc<dyn CacheBackend>,
    stats: Arc<StatsCounters>,
}

impl CacheTier {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            stats: Arc::new(StatsCounters::default()),
        }
    }

    pub fn local(local: Arc<LocalCache>) -> Self {
        Self::new(local)
    }

    /// Probe the shared backend and fall back to `local` if it is unreachable
    ///
    /// Calling this again re-probes; the same `local` map is reused either way.
    pub async fn connect(config: &CacheConfig, local: Arc<LocalCache>) -> Self {
        if config.disable_shared {
            tracing::info!("Shared cache disabled, using in-memory cache");
            return Self::local(local);
        }

        let url = config.redis_url();
        match RedisCache::connect(&url).await {
            Ok(redis) => {
                tracing::info!("Connected to shared cache at {}", mask_credentials(&url));
                Self::new(Arc::new(redis))
            }
            Err(e) => {
                tracing::warn!(
                    "Shared cache at {} unavailable, falling back to in-memory cache: {}",
                    mask_credentials(&url),
                    e
                );
                Self::local(local)
            }
        }
    }

    pub fn kind(&self) -> CacheKind {
        self.backend.kind()
    }

    /// Read a cached statement. Backend failures come back as `Unavailable`.
    pub async fn lookup(&self, key: &str) -> CacheLookup {
        match self.backend.get(key).await {
            Ok(Some(sql)) if !sql.is_empty() => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache hit for key: {}", key);
                CacheLookup::Hit(sql)
            }
            Ok(_) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache miss for key: {}", key);
                CacheLookup::Miss
            }
            Err(e) => {
                self.stats.read_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache read failed for key {}: {}", key, e);
                CacheLookup::Unavailable(e)
            }
        }
    }

    /// Write a statement. A failed write is logged and reported, never raised.
    pub async fn store(&self, key: &str, sql: &str, ttl: Duration) -> CacheWrite {
        match self.backend.set(key, sql, ttl).await {
            Ok(()) => {
                self.stats.writes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cached SQL for key: {} ({} backend)", key, self.kind());
                CacheWrite::Stored
            }
            Err(e) => {
                self.stats.write_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache write failed for key {}: {}", key, e);
                CacheWrite::Skipped(e)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            read_errors: self.stats.read_errors.load(Ordering::Relaxed),
            writes: self.stats.writes.load(Ordering::Relaxed),
            write_errors: self.stats.write_errors.load(Ordering::Relaxed),
        }
    }
}
