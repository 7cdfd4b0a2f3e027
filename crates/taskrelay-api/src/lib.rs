//! Wire types and converters for the TaskRelay HTTP API.
//!
//! This crate contains:
//! - Request/response bodies shared by the control plane and its clients
//! - Converters from domain types to response types

pub mod convert;
pub mod types;

pub use types::*;
