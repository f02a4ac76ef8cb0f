// SQL Resolver
//
// Turns a prompt into SQL: cached statement if there is one, otherwise a fresh
// one from the generator, which is then written back to the cache.

use crate::config::CacheConfig;
use crate::error::AppError;
use crate::models::ResolvedQuery;
use crate::services::llm_service::SqlGenerator;
use crate::services::query_cache::{CacheLookup, CacheTier, CacheWrite};
use std::sync::Arc;
use std::time::Duration;

/// Namespace prepended to every prompt to form its cache key
pub const DEFAULT_KEY_PREFIX: &str = "cache:";

/// Lifetime of a cached statement on the shared backend
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

pub struct SqlResolver {
    cache: CacheTier,
    generator: Arc<dyn SqlGenerator>,
    key_prefix: String,
    ttl: Duration,
}

impl SqlResolver {
    pub fn new(cache: CacheTier, generator: Arc<dyn SqlGenerator>) -> Self {
        Self {
            cache,
            generator,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Take key prefix and TTL from the cache settings
    pub fn with_config(mut self, config: &CacheConfig) -> Self {
        self.key_prefix = config.key_prefix.clone();
        self.ttl = Duration::from_secs(config.ttl_secs);
        self
    }

    /// Prefix + prompt, verbatim. No trimming or case folding.
    pub fn cache_key(&self, prompt: &str) -> String {
        format!("{}{}", self.key_prefix, prompt)
    }

    pub fn cache(&self) -> &CacheTier {
        &self.cache
    }

    /// Resolve a prompt to SQL
    ///
    /// At most one cache read, one generator call and one cache write. A
    /// generator failure aborts before anything is cached.
    pub async fn resolve(&self, prompt: &str) -> Result<ResolvedQuery, AppError> {
        let key = self.cache_key(prompt);

        match self.cache.lookup(&key).await {
            CacheLookup::Hit(sql) => {
                tracing::info!("Resolved prompt from {} cache", self.cache.kind());
                return Ok(ResolvedQuery::from_cache(sql));
            }
            CacheLookup::Miss => {}
            CacheLookup::Unavailable(e) => {
                tracing::debug!("Treating unreadable cache as a miss: {}", e);
            }
        }

        tracing::info!("Generating SQL for prompt: {}", prompt);
        let sql = self.generator.generate_sql(prompt).await.map_err(|e| match e {
            AppError::Generation(_) => e,
            other => AppError::Generation(other.to_string()),
        })?;

        if let CacheWrite::Skipped(e) = self.cache.store(&key, &sql, self.ttl).await {
            tracing::debug!("Generated SQL was not cached: {}", e);
        }

        Ok(ResolvedQuery::generated(sql))
    }
}
