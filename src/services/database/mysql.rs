// MySQL store: one short-lived connection per statement
use crate::error::AppError;
use crate::models::Row;
use crate::services::database::adapter::RelationalStore;
use mysql_async::{prelude::*, Conn, Opts, Row as MySqlRow, Value as MySqlValue};
use serde_json::{json, Value};
use url::Url;

pub struct MySqlStore {
    opts: Opts,
}

impl MySqlStore {
    pub fn new(connection_url: &str) -> Result<Self, AppError> {
        // Validate MySQL URL format
        let url = Url::parse(connection_url)
            .map_err(|e| AppError::Config(format!("Invalid MySQL URL: {}", e)))?;

        if url.scheme() != "mysql" && url.scheme() != "mariadb" {
            return Err(AppError::Config("URL must use mysql:// or mariadb:// scheme".to_string()));
        }

        // mysql_async only understands the mysql:// scheme
        let normalized = connection_url.replacen("mariadb://", "mysql://", 1);
        let opts = Opts::from_url(&normalized)
            .map_err(|e| AppError::Config(format!("Invalid MySQL URL: {}", e)))?;

        Ok(Self { opts })
    }

    async fn connect(&self) -> Result<Conn, AppError> {
        Conn::new(self.opts.clone())
            .await
            .map_err(|e| AppError::Execution(format!("Failed to connect to MySQL: {}", e)))
    }

    /// Close a connection; a failed goodbye only matters for the log
    async fn release(conn: Conn) {
        if let Err(e) = conn.disconnect().await {
            tracing::debug!("MySQL disconnect failed: {}", e);
        }
    }

    fn row_to_json(row: MySqlRow) -> Row {
        let mut row_obj = Row::new();
        for (idx, column) in row.columns_ref().iter().enumerate() {
            let value = match row.get_opt::<MySqlValue, usize>(idx) {
                Some(Ok(mysql_val)) => Self::mysql_value_to_json(mysql_val),
                Some(Err(_)) | None => Value::Null,
            };
            row_obj.insert(column.name_str().to_string(), value);
        }
        row_obj
    }

    /// Helper function to convert MySQL Value to JSON Value
    fn mysql_value_to_json(mysql_val: MySqlValue) -> Value {
        match mysql_val {
            MySqlValue::NULL => Value::Null,
            MySqlValue::Bytes(bytes) => json!(String::from_utf8_lossy(&bytes)),
            MySqlValue::Int(i) => json!(i),
            MySqlValue::UInt(u) => json!(u),
            MySqlValue::Float(f) => json!(f),
            MySqlValue::Double(d) => json!(d),
            MySqlValue::Date(y, m, d, 0, 0, 0, 0) => json!(format!("{:04}-{:02}-{:02}", y, m, d)),
            MySqlValue::Date(y, m, d, h, min, s, _) => {
                json!(format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, m, d, h, min, s))
            }
            MySqlValue::Time(is_neg, d, h, m, s, _) => {
                let sign = if is_neg { "-" } else { "" };
                let total_hours = d * 24 + h as u32;
                json!(format!("{}{}:{:02}:{:02}", sign, total_hours, m, s))
            }
        }
    }
}

#[async_trait::async_trait]
impl RelationalStore for MySqlStore {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, AppError> {
        let mut conn = self.connect().await?;

        let result: Result<Vec<MySqlRow>, mysql_async::Error> = conn.query(sql).await;
        Self::release(conn).await;

        let rows = result.map_err(|e| AppError::Execution(e.to_string()))?;
        Ok(rows.into_iter().map(Self::row_to_json).collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.connect().await?;
        let result = conn.ping().await;
        Self::release(conn).await;
        result.map_err(|e| AppError::Execution(format!("MySQL ping failed: {}", e)))
    }

    fn database_type(&self) -> &str {
        "mysql"
    }

    fn list_tables_sql(&self) -> String {
        "SHOW TABLES".to_string()
    }

    fn describe_table_sql(&self, table: &str) -> String {
        format!("DESCRIBE `{}`", table.replace('`', "``"))
    }
}
