//! Movies API front door library

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routes;
pub mod security;
pub mod validation;

pub use config::schema::ApiConfig;
pub use error::ApiError;
pub use http::ApiServer;
pub use lifecycle::Shutdown;
