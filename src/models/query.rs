use serde::Serialize;
use serde_json::{Map, Value};

/// A single result row: column name -> value, in the order the store returned them
pub type Row = Map<String, Value>;

/// Outcome of resolving one natural language prompt to SQL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedQuery {
    pub sql: String,
    pub cache_hit: bool,
}

impl ResolvedQuery {
    pub fn from_cache(sql: String) -> Self {
        Self { sql, cache_hit: true }
    }

    pub fn generated(sql: String) -> Self {
        Self { sql, cache_hit: false }
    }
}

/// Materialized rows of one executed statement
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    pub sql: String,
    pub rows: Vec<Row>,
    pub cache_hit: bool,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl ResultSet {
    pub fn new(sql: String, rows: Vec<Row>, execution_time_ms: u64) -> Self {
        let row_count = rows.len();
        Self {
            sql,
            rows,
            cache_hit: false,
            row_count,
            execution_time_ms,
        }
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names of the first row, in store order
    pub fn columns(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
