//! Core types for RPC interceptors.
//!
//! This crate holds the transport-agnostic pieces used by the server layers
//! in `rpc-interceptors`. Nothing here performs I/O or holds shared state.
//!
//! ## Modules
//!
//! - [`error`]: Status codes and the [`Status`] error type
//! - [`metadata`]: Case-insensitive, multi-valued call metadata
//! - [`auth`]: Credential extraction from the `authorization` key
//! - [`propagation`]: Trace context carried in call metadata

pub mod auth;
pub mod error;
pub mod metadata;
pub mod propagation;

pub use auth::{AUTHORIZATION_KEY, AuthError, auth_from_headers, auth_from_metadata};
pub use error::{Code, Status};
pub use metadata::Metadata;
pub use propagation::{DEFAULT_TRACE_HEADER, TraceContext, TraceContextError};
