pub mod api;
pub mod config;
pub mod directions;
mod error;
pub mod geo;
pub mod optimization;
pub mod rate_limiter;

pub use api::routes::{create_router, AppState};
pub use config::Config;
pub use error::{Error, Result};
