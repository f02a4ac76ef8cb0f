// PostgreSQL store: one short-lived connection per statement
use crate::error::AppError;
use crate::models::Row;
use crate::services::database::adapter::RelationalStore;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use url::Url;

pub struct PostgresStore {
    connection_url: String,
}

impl PostgresStore {
    pub fn new(connection_url: &str) -> Result<Self, AppError> {
        // Validate PostgreSQL URL format
        let url = Url::parse(connection_url)
            .map_err(|e| AppError::Config(format!("Invalid PostgreSQL URL: {}", e)))?;

        if url.scheme() != "postgresql" && url.scheme() != "postgres" {
            return Err(AppError::Config("URL must use postgresql:// or postgres:// scheme".to_string()));
        }

        Ok(Self {
            connection_url: connection_url.to_string(),
        })
    }

    /// Open a connection and drive it on a background task
    async fn connect(&self) -> Result<(Client, JoinHandle<()>), AppError> {
        let (client, connection) = tokio_postgres::connect(&self.connection_url, NoTls)
            .await
            .map_err(|e| AppError::Execution(format!("Failed to connect to PostgreSQL: {}", e)))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!("PostgreSQL connection closed with error: {}", e);
            }
        });

        Ok((client, handle))
    }

    /// Dropping the client ends the connection task; wait for it to finish
    async fn release(client: Client, handle: JoinHandle<()>) {
        drop(client);
        if let Err(e) = handle.await {
            tracing::debug!("PostgreSQL connection task failed: {}", e);
        }
    }

    fn messages_to_rows(messages: Vec<SimpleQueryMessage>) -> Vec<Row> {
        messages
            .into_iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => {
                    let mut row_obj = Row::new();
                    for (idx, column) in row.columns().iter().enumerate() {
                        let value = row
                            .get(idx)
                            .map(|v| Value::String(v.to_string()))
                            .unwrap_or(Value::Null);
                        row_obj.insert(column.name().to_string(), value);
                    }
                    Some(row_obj)
                }
                _ => None,
            })
            .collect()
    }

    fn quote_literal(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
}

#[async_trait::async_trait]
impl RelationalStore for PostgresStore {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, AppError> {
        let (client, handle) = self.connect().await?;

        let result = client.simple_query(sql).await;
        Self::release(client, handle).await;

        Ok(Self::messages_to_rows(result?))
    }

    async fn ping(&self) -> Result<(), AppError> {
        let (client, handle) = self.connect().await?;
        let result = client.simple_query("SELECT 1").await;
        Self::release(client, handle).await;
        result.map(|_| ()).map_err(AppError::from)
    }

    fn database_type(&self) -> &str {
        "postgresql"
    }

    fn list_tables_sql(&self) -> String {
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = current_schema() ORDER BY table_name"
            .to_string()
    }

    fn describe_table_sql(&self, table: &str) -> String {
        let table = Self::quote_literal(table);
        format!(
            r#"SELECT c.column_name AS "Field",
       c.data_type AS "Type",
       c.is_nullable AS "Null",
       CASE WHEN k.column_name IS NOT NULL THEN 'PRI' ELSE '' END AS "Key"
FROM information_schema.columns c
LEFT JOIN (
    SELECT kcu.column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = current_schema()
      AND tc.table_name = {table}
) k ON k.column_name = c.column_name
WHERE c.table_schema = current_schema() AND c.table_name = {table}
ORDER BY c.ordinal_position"#,
            table = table
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_postgres_url() {
        assert!(matches!(
            PostgresStore::new("mysql://localhost/db"),
            Err(AppError::Config(_))
        ));
        assert!(PostgresStore::new("postgresql://app@localhost:5432/projects").is_ok());
    }

    #[test]
    fn test_describe_escapes_table_name() {
        let store = PostgresStore::new("postgres://localhost/db").unwrap();
        let sql = store.describe_table_sql("o'brien");
        assert!(sql.contains("c.table_name = 'o''brien'"));
        assert!(sql.contains(r#"AS "Field""#));
        assert_eq!(store.database_type(), "postgresql");
    }

    #[test]
    fn test_no_messages_no_rows() {
        assert!(PostgresStore::messages_to_rows(Vec::new()).is_empty());
    }
}
