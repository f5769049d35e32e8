//! Schema/codec subsystem.
//!
//! # Data Flow
//! ```text
//! Untrusted input (merged path/query/body JSON)
//!     → decode.rs (interpret Schema against the value)
//!     → Ok(decoded value) | Err(DecodeErrors, non-empty, path-qualified)
//!
//! Trusted output (handler result)
//!     → encode.rs (strip undeclared fields, re-encode coerced values)
//!     → wire value
//! ```
//!
//! # Design Decisions
//! - Schemas are plain data (an enum), interpreted by one generic routine
//! - Decoding is pure and total: failures are values, never panics
//! - Exact objects reject undeclared keys; open objects pass them through
//! - Union failures report the branch that progressed furthest
//!   (deepest issue path; later branch wins a tie)

pub mod decode;
pub mod encode;
pub mod schema;

pub use decode::{decode, decode_into, DecodeErrors, DecodeIssue, IssueKind};
pub use encode::encode;
pub use schema::{Field, ObjectBuilder, ObjectMode, Schema};
