use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use db_query_cli::config::{mask_credentials, Config};
use db_query_cli::services::{create_store, CacheKind, CacheTier, LlmService, LocalCache, QueryService, SqlResolver};
use db_query_cli::shell::{print_help, Shell};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging; stderr keeps log lines out of the rendered tables
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    print_help();

    // The relational store must be reachable before the session starts
    let database_url = config.database.connection_url()?;
    let store = create_store(&database_url)?;
    if let Err(e) = store.ping().await {
        error!("Failed to connect to {}: {}", mask_credentials(&database_url), e);
        println!("❌  数据库连接失败，请检查配置: {}", e);
        return Err(e.into());
    }
    info!("Connected to {}", mask_credentials(&database_url));
    println!("✅  {} 连接成功!", store.database_type());

    // Shared cache when reachable, in-memory otherwise
    let local_cache = Arc::new(LocalCache::new());
    let cache = CacheTier::connect(&config.cache, local_cache).await;
    match cache.kind() {
        CacheKind::Shared => println!("✅  Redis 连接成功!"),
        CacheKind::Local => println!("⚠️   Redis 未连接，将使用内存缓存"),
    }

    let generator = Arc::new(LlmService::new(&config.llm, store.database_type())?);
    if !generator.is_configured() {
        println!("⚠️   未配置 LLM_GATEWAY_URL，自然语言查询将不可用 (可使用 /sql)");
    }

    let resolver = SqlResolver::new(cache, generator).with_config(&config.cache);
    let executor = QueryService::new(store);
    let mut shell = Shell::new(resolver, executor, config.database.schema_table.clone())?;

    println!("\n{}", "=".repeat(60));
    shell.run().await?;

    Ok(())
}
