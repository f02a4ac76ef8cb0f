use crate::error::AppError;
use serde::Deserialize;
use std::env;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual parts
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    /// Table described by `/schema` when no table is given
    pub schema_table: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub ttl_secs: u64,
    pub key_prefix: String,
    /// Skip the shared cache probe and go straight to the in-memory map
    pub disable_shared: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub gateway_url: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub schema_context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Environment variable -> config key
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
    ("DB_SCHEMA_TABLE", "database.schema_table"),
    ("REDIS_URL", "cache.url"),
    ("REDIS_HOST", "cache.host"),
    ("REDIS_PORT", "cache.port"),
    ("REDIS_DB", "cache.db"),
    ("CACHE_TTL_SECS", "cache.ttl_secs"),
    ("CACHE_KEY_PREFIX", "cache.key_prefix"),
    ("CACHE_DISABLE_SHARED", "cache.disable_shared"),
    ("LLM_GATEWAY_URL", "llm.gateway_url"),
    ("LLM_API_KEY", "llm.api_key"),
    ("LLM_MODEL", "llm.model"),
    ("LLM_TIMEOUT_SECS", "llm.timeout_secs"),
    ("LLM_SCHEMA_CONTEXT", "llm.schema_context"),
    ("RUST_LOG", "logging.level"),
];

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        // .env in the working directory first, then the conventional config/.env
        let _ = dotenv::dotenv();
        let _ = dotenv::from_path(Path::new("config").join(".env"));

        let mut builder = config::Config::builder()
            .set_default("database.host", "localhost")?
            .set_default("database.port", 3306)?
            .set_default("database.user", "root")?
            .set_default("database.password", "")?
            .set_default("database.name", "demo_db")?
            .set_default("database.schema_table", "ai_projects")?
            .set_default("cache.host", "localhost")?
            .set_default("cache.port", 6379)?
            .set_default("cache.db", 0)?
            .set_default("cache.ttl_secs", 3600)?
            .set_default("cache.key_prefix", "cache:")?
            .set_default("cache.disable_shared", false)?
            .set_default("llm.gateway_url", "")?
            .set_default("llm.timeout_secs", 60)?
            .set_default("logging.level", "warn")?;

        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = env::var(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        Ok(builder.build()?.try_deserialize()?)
    }
}

impl DatabaseConfig {
    /// Connection URL for the relational store
    ///
    /// Built as a MySQL URL from the individual settings unless `url` is set.
    pub fn connection_url(&self) -> Result<String, AppError> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.to_string());
        }

        let invalid = |what: &str| AppError::Config(format!("Invalid database {}: {}", what, self.host));

        let mut url = Url::parse(&format!("mysql://{}", self.host)).map_err(|_| invalid("host"))?;
        url.set_port(Some(self.port)).map_err(|_| invalid("port"))?;
        url.set_username(&self.user).map_err(|_| invalid("user"))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password)).map_err(|_| invalid("password"))?;
        }
        url.set_path(&self.name);

        Ok(url.to_string())
    }
}

impl CacheConfig {
    pub fn redis_url(&self) -> String {
        match self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// Mask credentials in a connection URL for safe logging
pub fn mask_credentials(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let mut masked = parsed.clone();
            if parsed.password().is_some() {
                let _ = masked.set_password(Some("***"));
            }
            masked.to_string()
        }
        Err(_) => "[invalid-url]".to_string(),
    }
}
