//! # RPC Interceptors
//!
//! Tower layers that authenticate and trace RPC calls served with
//! [Axum](https://github.com/tokio-rs/axum).
//!
//! A call is identified by its procedure, the request path without the
//! leading `/` (e.g., `hello.Greeter/SayHello`). Its metadata is the set of
//! request headers, viewed as a case-insensitive multimap.
//!
//! ## Features
//!
//! - **Authentication:** [`AuthLayer`] runs an [`Authenticate`] hook per call.
//!   [`BearerAuth`] covers the common `authorization: bearer <token>` case and
//!   rejects missing or ambiguous credentials as `unauthenticated`.
//! - **Tracing:** [`TracingLayer`] opens a span per call. It is configured
//!   through ordered [`TracingOption`] setters where the last write wins, and
//!   by default resolves the tracer from the global dispatcher on every call.
//! - **Error responses:** rejected calls are answered with [`RpcError`], a
//!   JSON error body and the HTTP status of its [`Code`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use rpc_interceptors::prelude::*;
//!
//! let app = Router::new()
//!     .route("/hello.Greeter/SayHello", post(say_hello))
//!     .layer(AuthLayer::new(BearerAuth::new(verify_token)))
//!     .layer(TracingLayer::with_options([
//!         with_filter(|_, procedure| !procedure.starts_with("grpc.health")),
//!     ]));
//! ```

pub mod auth;
pub mod context;
pub mod error;
pub mod layer;
pub mod options;

pub use auth::{AuthContext, Authenticate, BEARER_SCHEME, BearerAuth};
pub use context::CallContext;
pub use error::RpcError;
pub use layer::{AuthLayer, AuthService, TracingLayer, TracingService};
pub use options::{GlobalTracer, TracerRegistry, TracingDefaults, TracingOption, TracingOptions};

// Re-export the core types
pub use rpc_interceptors_core;
pub use rpc_interceptors_core::{
    AuthError, Code, DEFAULT_TRACE_HEADER, Metadata, Status, TraceContext, auth_from_metadata,
};

pub mod prelude {
    //! The most common types and option setters.
    pub use crate::auth::{AuthContext, Authenticate, BearerAuth};
    pub use crate::error::RpcError;
    pub use crate::layer::{AuthLayer, TracingLayer};
    pub use crate::options::{
        TracingOptions, with_filter, with_operation_name, with_request_handler,
        with_trace_header_name, with_tracer, with_tracer_factory,
    };
    pub use rpc_interceptors_core::{Code, Metadata, Status};
}
