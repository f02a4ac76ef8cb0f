use crate::error::AppError;
use crate::models::{ResolvedQuery, ResultSet};
use crate::services::database::RelationalStore;
use std::sync::Arc;
use std::time::Instant;

/// Runs resolved SQL against the relational store
pub struct QueryService {
    store: Arc<dyn RelationalStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn RelationalStore {
        self.store.as_ref()
    }

    /// Execute a statement and collect all of its rows
    ///
    /// Any failure, whether connecting or running the statement, is an
    /// `Execution` error. A statement that matches nothing yields an empty set.
    pub async fn execute(&self, sql: &str) -> Result<ResultSet, AppError> {
        let start_time = Instant::now();

        let rows = self.store.execute(sql).await.map_err(|e| {
            tracing::error!("Query execution error: {}. SQL: {}", e, sql);
            match e {
                AppError::Execution(_) => e,
                other => AppError::Execution(other.to_string()),
            }
        })?;

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            "{} query returned {} rows in {} ms",
            self.store.database_type(),
            rows.len(),
            execution_time_ms
        );

        Ok(ResultSet::new(sql.to_string(), rows, execution_time_ms))
    }

    /// Execute a resolved query, carrying its cache flag into the result
    pub async fn execute_resolved(&self, resolved: &ResolvedQuery) -> Result<ResultSet, AppError> {
        let result = self.execute(&resolved.sql).await?;
        Ok(result.with_cache_hit(resolved.cache_hit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;
    use serde_json::json;

    /// Store answering every statement with the same rows, or failing
    struct CannedStore {
        rows: Vec<Row>,
        error: Option<fn() -> AppError>,
    }

    impl CannedStore {
        fn with_rows(rows: Vec<Row>) -> Arc<Self> {
            Arc::new(Self { rows, error: None })
        }

        fn failing(error: fn() -> AppError) -> Arc<Self> {
            Arc::new(Self {
                rows: Vec::new(),
                error: Some(error),
            })
        }
    }

    #[async_trait::async_trait]
    impl RelationalStore for CannedStore {
        async fn execute(&self, _sql: &str) -> Result<Vec<Row>, AppError> {
            match self.error {
                Some(make_error) => Err(make_error()),
                None => Ok(self.rows.clone()),
            }
        }

        async fn ping(&self) -> Result<(), AppError> {
            Ok(())
        }

        fn database_type(&self) -> &str {
            "mysql"
        }

        fn list_tables_sql(&self) -> String {
            "SHOW TABLES".to_string()
        }

        fn describe_table_sql(&self, table: &str) -> String {
            format!("DESCRIBE {}", table)
        }
    }

    fn project_rows() -> Vec<Row> {
        let mut alpha = Row::new();
        alpha.insert("id".to_string(), json!(1));
        alpha.insert("name".to_string(), json!("Alpha"));
        let mut beta = Row::new();
        beta.insert("id".to_string(), json!(2));
        beta.insert("name".to_string(), json!("Beta"));
        vec![alpha, beta]
    }

    #[tokio::test]
    async fn test_execute_collects_rows() {
        let service = QueryService::new(CannedStore::with_rows(project_rows()));

        let result = service.execute("SELECT id, name FROM ai_projects").await.unwrap();
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.sql, "SELECT id, name FROM ai_projects");
        assert!(!result.cache_hit);
    }

    #[tokio::test]
    async fn test_no_rows_is_not_an_error() {
        let service = QueryService::new(CannedStore::with_rows(Vec::new()));

        let result = service.execute("SELECT * FROM ai_projects WHERE 1 = 0").await.unwrap();
        assert_eq!(result.row_count, 0);
        assert!(result.rows.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_execution_error() {
        let service = QueryService::new(CannedStore::failing(|| {
            AppError::Execution("Table 'demo_db.nope' doesn't exist".to_string())
        }));

        let err = service.execute("SELECT * FROM nope").await.unwrap_err();
        assert!(matches!(err, AppError::Execution(ref msg) if msg.contains("nope")));
    }

    #[tokio::test]
    async fn test_other_store_errors_become_execution_errors() {
        let service = QueryService::new(CannedStore::failing(|| AppError::Config("bad url".to_string())));

        let err = service.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, AppError::Execution(_)));
    }

    #[tokio::test]
    async fn test_execute_resolved_keeps_cache_flag() {
        let service = QueryService::new(CannedStore::with_rows(project_rows()));

        let cached = ResolvedQuery::from_cache("SELECT * FROM ai_projects".to_string());
        let result = service.execute_resolved(&cached).await.unwrap();
        assert!(result.cache_hit);
        assert_eq!(result.row_count, 2);

        let generated = ResolvedQuery::generated("SELECT * FROM ai_projects".to_string());
        assert!(!service.execute_resolved(&generated).await.unwrap().cache_hit);
    }
}
