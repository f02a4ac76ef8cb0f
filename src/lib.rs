pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod shell;

pub use error::AppError;
pub use models::*;
pub use services::*;
