// Relational store trait for multi-database support
use crate::error::AppError;
use crate::models::Row;

/// A database the shell can run statements against
///
/// Every call opens its own connection and releases it before returning,
/// whether the statement succeeded or not.
#[async_trait::async_trait]
pub trait RelationalStore: Send + Sync {
    /// Run a statement and materialize every row it returns
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, AppError>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<(), AppError>;

    /// Get database type
    fn database_type(&self) -> &str;

    /// Statement listing the tables of the current database
    fn list_tables_sql(&self) -> String;

    /// Statement describing a table, yielding `Field`, `Type`, `Null` and `Key` columns
    fn describe_table_sql(&self, table: &str) -> String;
}
