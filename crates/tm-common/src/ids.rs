//! Identifiers for newly submitted records.
//!
//! Parent requests get `req-<ULID>`: unique, 30 chars, and lexicographically
//! ordered by creation time, so listing by id matches submission order.
//!
//! # Example
//! ```
//! use tm_common::ids;
//!
//! let id = ids::request_id();
//! assert!(id.starts_with("req-"));
//! ```

use ulid::Ulid;

pub const REQUEST_PREFIX: &str = "req-";

/// Generates a fresh parent-request id.
#[inline]
pub fn request_id() -> String {
    format!("{REQUEST_PREFIX}{}", Ulid::new())
}

/// Generates a bare ULID (used when a submission arrives without a user id).
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}
