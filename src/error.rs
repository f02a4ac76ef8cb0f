use thiserror::Error;

/// Application error types
///
/// Only `Generation` and `Execution` can occur while a prompt is being
/// handled; both abort that single request and leave the shell running.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("SQL generation failed: {0}")]
    Generation(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl AppError {
    /// Stable error code shown next to the message in the shell
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Generation(_) => "GENERATION_ERROR",
            AppError::Execution(_) => "EXECUTION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Terminal(_) => "TERMINAL_ERROR",
        }
    }

    /// Actionable suggestion for the user, if there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AppError::Generation(msg) if msg.contains("not configured") => {
                Some("Set LLM_GATEWAY_URL to enable natural language queries.")
            }
            AppError::Generation(_) => Some("Rephrase the question or use /sql to run SQL directly."),
            AppError::Execution(msg) if msg.contains("doesn't exist") || msg.contains("does not exist") => {
                Some("Use /tables and /schema to check table and column names.")
            }
            AppError::Execution(msg) if msg.contains("connect") => {
                Some("Check that the database server is reachable.")
            }
            _ => None,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<mysql_async::Error> for AppError {
    fn from(err: mysql_async::Error) -> Self {
        AppError::Execution(err.to_string())
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        let details = match err.as_db_error() {
            Some(db_error) => format!("{} (code {})", db_error.message(), db_error.code().code()),
            None => err.to_string(),
        };
        AppError::Execution(details)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Generation(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for AppError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        AppError::Terminal(err.to_string())
    }
}
