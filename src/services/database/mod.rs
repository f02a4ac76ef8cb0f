// Relational store abstraction, one implementation per supported database
pub mod adapter;
pub mod mysql;
pub mod postgresql;

pub use adapter::RelationalStore;
pub use mysql::MySqlStore;
pub use postgresql::PostgresStore;

use crate::error::AppError;
use std::sync::Arc;

/// Database type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    MySQL,
    PostgreSQL,
}

impl DatabaseType {
    /// Pick the database type from a connection URL scheme
    pub fn from_url(connection_url: &str) -> Result<Self, AppError> {
        let scheme = connection_url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_lowercase())
            .ok_or_else(|| AppError::Config(format!("Connection URL has no scheme: {}", connection_url)))?;

        match scheme.as_str() {
            "mysql" | "mariadb" => Ok(DatabaseType::MySQL),
            "postgresql" | "postgres" => Ok(DatabaseType::PostgreSQL),
            other => Err(AppError::Config(format!("Unsupported database type: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MySQL => "mysql",
            DatabaseType::PostgreSQL => "postgresql",
        }
    }
}

/// Factory function to create the store matching the URL scheme
pub fn create_store(connection_url: &str) -> Result<Arc<dyn RelationalStore>, AppError> {
    match DatabaseType::from_url(connection_url)? {
        DatabaseType::MySQL => Ok(Arc::new(MySqlStore::new(connection_url)?)),
        DatabaseType::PostgreSQL => Ok(Arc::new(PostgresStore::new(connection_url)?)),
    }
}
