//! service-core: shared infrastructure for the access-control services.

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
