//! HTTP front door.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (layer stack, serve loop)
//!     → response.rs (access log, error translation)
//!     → pipeline.rs (admission, body, validation, authentication)
//!     → routes
//! ```

pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ClientAddr, X_REQUEST_ID};
pub use server::{build_router, ApiServer};
