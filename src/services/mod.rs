pub mod database; // Relational stores (MySQL, PostgreSQL)
pub mod llm_service;
pub mod query_cache; // Shared/local SQL cache tier
pub mod query_service;
pub mod result_formatter;
pub mod sql_resolver;

pub use database::{create_store, DatabaseType, RelationalStore};
pub use llm_service::*;
pub use query_cache::*;
pub use query_service::*;
pub use result_formatter::*;
pub use sql_resolver::*;
