//! Tower layers intercepting RPC calls.
//!
//! - [`AuthLayer`]: rejects calls that fail authentication.
//! - [`TracingLayer`]: wraps each call in a span built from [`TracingOptions`].
//!
//! Both layers build a [`Metadata`] view from the request headers and work
//! out the procedure from the request path.
//!
//! ## Layer Stack Order
//!
//! Tracing should be the outer layer so rejected calls are traced too:
//!
//! ```rust,ignore
//! use rpc_interceptors::{AuthLayer, TracingLayer, TracingOptions};
//!
//! let app = Router::new()
//!     .route("/hello.Greeter/SayHello", post(handler))
//!     .layer(AuthLayer::new(authenticator))          // Inner: authentication
//!     .layer(TracingLayer::new(TracingOptions::default())); // Outer: tracing
//! ```
//!
//! [`TracingOptions`]: crate::options::TracingOptions
//! [`Metadata`]: rpc_interceptors_core::Metadata

mod auth;
mod trace;

pub use auth::{AuthLayer, AuthService};
pub use trace::{TracingLayer, TracingService};
