//! Services layer for the access-control core.
//!
//! `SessionService` owns session authentication and lifecycle;
//! `AccessService` owns permission evaluation.

pub mod access;
pub mod error;
pub mod session;

pub use access::{AccessScope, AccessService, Decision};
pub use error::ServiceError;
pub use session::{AuthOutcome, Identity, SessionService};
