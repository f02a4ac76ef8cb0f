//! Interactive terminal: reads prompts and directives, prints tables.

use crate::error::AppError;
use crate::models::{ResolvedQuery, ResultSet, Row};
use crate::services::{format_result_set, value_text, CacheKind, CacheStats, QueryService, SqlResolver};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};

const PROMPT: &str = "\n💬  请输入查询 (或 /help 查看帮助): ";
const SQL_PROMPT: &str = "📝  请输入 SQL 语句: ";

/// One line of user input, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Help,
    /// Raw SQL, either inline after `/sql` or read from the next line
    Sql(Option<String>),
    Tables,
    /// Describe a table, the configured default when none is given
    Schema(Option<String>),
    Cache,
    Quit,
    Unknown(String),
    /// Anything else goes through the natural language pipeline
    Query(String),
}

impl Directive {
    /// Classify an input line; `None` for blank input
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, Some(rest.trim().to_string()).filter(|r| !r.is_empty())),
            None => (line, None),
        };
        let head = head.to_lowercase();

        let directive = match (head.as_str(), rest) {
            ("/quit" | "/exit" | "/q" | "quit" | "exit", None) => Directive::Quit,
            ("/help" | "/h" | "/?", None) => Directive::Help,
            ("/tables", None) => Directive::Tables,
            ("/cache", None) => Directive::Cache,
            ("/sql", sql) => Directive::Sql(sql),
            ("/schema", table) => Directive::Schema(table),
            (cmd, _) if cmd.starts_with('/') => Directive::Unknown(cmd.to_string()),
            _ => Directive::Query(line.to_string()),
        };
        Some(directive)
    }
}

enum ShellControl {
    Continue,
    Exit,
}

pub struct Shell {
    resolver: SqlResolver,
    executor: QueryService,
    schema_table: String,
    editor: DefaultEditor,
}

impl Shell {
    pub fn new(resolver: SqlResolver, executor: QueryService, schema_table: String) -> Result<Self, AppError> {
        let config = Config::builder()
            .auto_add_history(true)
            .history_ignore_space(true)
            .history_ignore_dups(true)?
            .build();
        let editor = DefaultEditor::with_config(config)?;

        Ok(Self {
            resolver,
            executor,
            schema_table,
            editor,
        })
    }

    /// Read and handle lines until the user quits
    pub async fn run(&mut self) -> Result<(), AppError> {
        loop {
            let line = match self.editor.readline(PROMPT) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    println!("\n👋  再见!");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            let Some(directive) = Directive::parse(&line) else {
                continue;
            };

            if let ShellControl::Exit = self.dispatch(directive).await {
                println!("👋  再见!");
                return Ok(());
            }
        }
    }

    async fn dispatch(&mut self, directive: Directive) -> ShellControl {
        match directive {
            Directive::Quit => return ShellControl::Exit,
            Directive::Help => print_help(),
            Directive::Tables => self.show_tables().await,
            Directive::Schema(table) => self.show_schema(table).await,
            Directive::Cache => {
                let cache = self.resolver.cache();
                println!("{}", cache_report(cache.kind(), &cache.stats()));
            }
            Directive::Sql(sql) => self.direct_sql(sql).await,
            Directive::Unknown(cmd) => {
                println!("❓  未知命令: {} (输入 /help 查看帮助)", cmd);
            }
            Directive::Query(prompt) => {
                println!("\n🔎  正在查询: {}", prompt);
                println!("{}", "-".repeat(60));
                match self.ask(&prompt).await {
                    Ok(result) => println!("{}", format_result_set(&result)),
                    Err(e) => print_error(&e),
                }
            }
        }
        ShellControl::Continue
    }

    /// Resolve a prompt to SQL, run it, and report progress along the way
    async fn ask(&self, prompt: &str) -> Result<ResultSet, AppError> {
        let resolved = self.resolver.resolve(prompt).await?;
        println!("{}", resolution_status(&resolved, self.resolver.cache().kind()));
        println!("📄  [SQL] {}", resolved.sql);
        println!("🔍  [执行查询...]");
        self.executor.execute_resolved(&resolved).await
    }

    async fn direct_sql(&mut self, sql: Option<String>) {
        let sql = match sql {
            Some(sql) => sql,
            None => match self.editor.readline(SQL_PROMPT) {
                Ok(line) => line.trim().to_string(),
                Err(e) => {
                    tracing::debug!("SQL input aborted: {}", e);
                    return;
                }
            },
        };
        if sql.is_empty() {
            return;
        }

        println!("🔍  执行: {}", sql);
        match self.executor.execute(&sql).await {
            Ok(result) => println!("{}", format_result_set(&result)),
            Err(e) => print_error(&e),
        }
    }

    async fn show_tables(&self) {
        let sql = self.executor.store().list_tables_sql();
        match self.executor.execute(&sql).await {
            Ok(result) => println!("{}", tables_listing(&result.rows)),
            Err(e) => print_error(&e),
        }
    }

    async fn show_schema(&self, table: Option<String>) {
        let table = table.unwrap_or_else(|| self.schema_table.clone());
        let sql = self.executor.store().describe_table_sql(&table);
        match self.executor.execute(&sql).await {
            Ok(result) => println!("{}", schema_listing(&table, &result.rows)),
            Err(e) => print_error(&e),
        }
    }
}

pub fn print_help() {
    println!(
        r#"
================================================================
  🤖 AI 数据库查询助手 - 终端版
================================================================
  使用方法: 直接输入自然语言查询，例如:
    - 查询所有项目
    - 查看张三负责的项目
    - 预算大于10万的项目
    - 已交付的项目有哪些

  特殊命令:
    /help            显示帮助
    /sql [语句]      直接执行 SQL 语句
    /tables          查看所有表
    /schema [表名]   查看表结构
    /cache           查看缓存状态
    /quit            退出程序
================================================================"#
    );
}

fn print_error(err: &AppError) {
    println!("❌  [{}] {}", err.code(), err);
    if let Some(hint) = err.hint() {
        println!("💡  {}", hint);
    }
}

/// Status line telling where the SQL came from
pub fn resolution_status(resolved: &ResolvedQuery, kind: CacheKind) -> &'static str {
    match (resolved.cache_hit, kind) {
        (true, CacheKind::Shared) => "🚀  [Redis 缓存命中]",
        (true, CacheKind::Local) => "📦  [内存缓存命中]",
        (false, _) => "🤖  [AI 生成 SQL]",
    }
}

/// Bullet list of the first column of each row
pub fn tables_listing(rows: &[Row]) -> String {
    let mut out = String::from("📋  数据库中的表:");
    for row in rows {
        if let Some(name) = row.values().next() {
            out.push_str(&format!("\n   • {}", value_text(name)));
        }
    }
    out
}

/// Bullet list of `Field: Type Null Key` lines
pub fn schema_listing(table: &str, rows: &[Row]) -> String {
    let mut out = format!("📐  {} 表结构:", table);
    if rows.is_empty() {
        out.push_str("\n   (未找到该表)");
    }
    for row in rows {
        let field = |name: &str| row.get(name).map(value_text).unwrap_or_default();
        out.push_str(&format!(
            "\n   • {}: {} {} {}",
            field("Field"),
            field("Type"),
            field("Null"),
            field("Key")
        ));
    }
    out
}

pub fn cache_report(kind: CacheKind, stats: &CacheStats) -> String {
    format!(
        "🗄️  缓存后端: {}\n   命中: {}  未命中: {}  读取失败: {}\n   写入: {}  写入失败: {}\n   命中率: {:.1}%",
        kind,
        stats.hits,
        stats.misses,
        stats.read_errors,
        stats.writes,
        stats.write_errors,
        stats.hit_ratio() * 100.0
    )
}
