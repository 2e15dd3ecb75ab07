//! pf-core: stable foundation for porflow.
//!
//! Contains:
//! - numeric (Real, finiteness and length checks, infinity norms)
//! - error (shared error types)

pub mod error;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
