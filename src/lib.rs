//! Lectern library circulation server
//!
//! REST JSON API for the borrowing, return and fine workflows of a library:
//! readers request books, librarians hand them over, inspect returns and
//! confirm fine payments.

use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
