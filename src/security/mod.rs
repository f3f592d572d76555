//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (fixed-window admission per caller address)
//!     → [pipeline continues: body, validation/authentication]
//! Outgoing response:
//!     → headers.rs (hardening headers)
//! ```
//!
//! # Design Decisions
//! - Admission runs before any other work
//! - Fail closed: reject on any security check failure

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{Decision, RateLimiter};
