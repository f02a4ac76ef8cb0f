use async_trait::async_trait;
use db_query_cli::config::CacheConfig;
use db_query_cli::models::Row;
use db_query_cli::services::{
    format_result_set, CacheKind, CacheTier, LocalCache, QueryService, RelationalStore, SqlGenerator, SqlResolver,
};
use db_query_cli::AppError;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Generator mapping a couple of known questions to SQL
#[derive(Default)]
struct ScriptedGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl SqlGenerator for ScriptedGenerator {
    async fn generate_sql(&self, prompt: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match prompt {
            "查询所有项目" => Ok("SELECT id, name FROM ai_projects".to_string()),
            "预算大于1亿的项目" => Ok("SELECT id, name FROM ai_projects WHERE budget > 100000000".to_string()),
            _ => Err(AppError::Generation("model returned no statement".to_string())),
        }
    }
}

/// In-memory store with two projects; records every statement it runs
#[derive(Default)]
struct ProjectStore {
    executed: Mutex<Vec<String>>,
}

#[async_trait]
impl RelationalStore for ProjectStore {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, AppError> {
        self.executed.lock().unwrap().push(sql.to_string());
        if sql.contains("budget > 100000000") {
            return Ok(Vec::new());
        }
        if !sql.contains("ai_projects") {
            return Err(AppError::Execution("Table doesn't exist".to_string()));
        }
        let rows = json!([{"id": "1", "name": "Alpha"}, {"id": "2", "name": "B"}]);
        Ok(serde_json::from_value(rows).unwrap())
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
        format!("DESCRIBE `{}`", table)
    }
}

fn unreachable_shared_cache() -> CacheConfig {
    CacheConfig {
        url: Some("redis://127.0.0.1:1/0".to_string()),
        host: "127.0.0.1".to_string(),
        port: 1,
        db: 0,
        ttl_secs: 3600,
        key_prefix: "cache:".to_string(),
        disable_shared: false,
    }
}

#[tokio::test]
async fn test_prompt_to_table_with_cache_reuse() {
    let generator = Arc::new(ScriptedGenerator::default());
    let store = Arc::new(ProjectStore::default());
    let cache = CacheTier::local(Arc::new(LocalCache::new()));
    let resolver = SqlResolver::new(cache, generator.clone());
    let executor = QueryService::new(store.clone());

    let resolved = resolver.resolve("查询所有项目").await.unwrap();
    let first = executor.execute_resolved(&resolved).await.unwrap();
    let rendered = format_result_set(&first);
    assert!(rendered.contains("| 1  | Alpha |"));
    assert!(rendered.ends_with("📊  共 2 条记录"));

    let resolved = resolver.resolve("查询所有项目").await.unwrap();
    let second = executor.execute_resolved(&resolved).await.unwrap();
    assert!(format_result_set(&second).ends_with("📊  共 2 条记录 (来自缓存)"));

    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.executed.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_result_is_rendered_not_failed() {
    let resolver = SqlResolver::new(
        CacheTier::local(Arc::new(LocalCache::new())),
        Arc::new(ScriptedGenerator::default()),
    );
    let executor = QueryService::new(Arc::new(ProjectStore::default()));

    let resolved = resolver.resolve("预算大于1亿的项目").await.unwrap();
    let result = executor.execute_resolved(&resolved).await.unwrap();
    assert_eq!(result.row_count, 0);
    assert_eq!(format_result_set(&result), "📭  查询结果为空");
}

#[tokio::test]
async fn test_generation_failure_never_reaches_the_store() {
    let generator = Arc::new(ScriptedGenerator::default());
    let store = Arc::new(ProjectStore::default());
    let resolver = SqlResolver::new(CacheTier::local(Arc::new(LocalCache::new())), generator.clone());

    for _ in 0..2 {
        let err = resolver.resolve("query all projects").await.unwrap_err();
        assert_eq!(err.code(), "GENERATION_ERROR");
    }

    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    assert!(store.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_shared_cache_runs_on_local_fallback() {
    let local = Arc::new(LocalCache::new());
    let generator = Arc::new(ScriptedGenerator::default());

    let cache = CacheTier::connect(&unreachable_shared_cache(), local.clone()).await;
    assert_eq!(cache.kind(), CacheKind::Local);

    let resolver = SqlResolver::new(cache, generator.clone()).with_config(&unreachable_shared_cache());
    assert!(!resolver.resolve("查询所有项目").await.unwrap().cache_hit);
    assert!(resolver.resolve("查询所有项目").await.unwrap().cache_hit);
    assert_eq!(local.len().await, 1);

    // A new process starts with an empty fallback map
    let restarted = SqlResolver::new(
        CacheTier::connect(&unreachable_shared_cache(), Arc::new(LocalCache::new())).await,
        generator.clone(),
    );
    assert!(!restarted.resolve("查询所有项目").await.unwrap().cache_hit);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_execution_failure_after_successful_resolution() {
    struct BadSqlGenerator;

    #[async_trait]
    impl SqlGenerator for BadSqlGenerator {
        async fn generate_sql(&self, _prompt: &str) -> Result<String, AppError> {
            Ok("SELECT * FROM nonexistent".to_string())
        }
    }

    let resolver = SqlResolver::new(CacheTier::local(Arc::new(LocalCache::new())), Arc::new(BadSqlGenerator));
    let executor = QueryService::new(Arc::new(ProjectStore::default()));

    let resolved = resolver.resolve("show me ghosts").await.unwrap();
    let err = executor.execute_resolved(&resolved).await.unwrap_err();
    assert_eq!(err.code(), "EXECUTION_ERROR");

    // The generated statement stays cached even though it failed to run
    assert!(resolver.resolve("show me ghosts").await.unwrap().cache_hit);
}
