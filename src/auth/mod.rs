//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → bearer.rs (shape check, extract token)
//!     → token.rs (TokenVerifier: signature + expiry)
//!     → identity.rs (CallerIdentity attached to request extensions)
//!     → handlers extract CallerIdentity
//! ```
//!
//! # Design Decisions
//! - Pure verification: the authenticator never issues or refreshes credentials
//! - One rendered message for every failure mode

pub mod bearer;
pub mod identity;
pub mod token;

pub use bearer::authenticate;
pub use identity::CallerIdentity;
pub use token::{JwtAuthority, TokenIssuer, TokenVerifier, VerificationError};
