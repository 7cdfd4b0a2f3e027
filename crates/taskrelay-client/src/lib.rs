//! Client library for the TaskRelay control plane.
//!
//! Wraps every HTTP route in a typed method on [`HttpClient`].

pub mod error;
pub mod http;

pub use error::ClientError;
pub use http::HttpClient;
