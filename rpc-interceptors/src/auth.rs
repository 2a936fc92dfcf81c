//! Authentication hooks for [`AuthLayer`](crate::layer::AuthLayer).
//!
//! An [`Authenticate`] implementation inspects the call metadata, typically
//! through [`AuthContext::credential`], and either rejects the call with a
//! [`Status`] or lets it through, optionally attaching a principal to the
//! request extensions for handlers to read.
//!
//! # Example
//!
//! ```ignore
//! use rpc_interceptors::{AuthContext, AuthLayer, BearerAuth, Status};
//!
//! #[derive(Clone)]
//! struct User(String);
//!
//! let auth = AuthLayer::new(BearerAuth::new(|token: &str| {
//!     lookup_user(token).ok_or_else(|| Status::unauthenticated("unknown token"))
//! }));
//!
//! let app = Router::new()
//!     .route("/hello.Greeter/SayHello", post(say_hello))
//!     .layer(auth);
//! ```

use std::fmt;
use std::marker::PhantomData;

use axum::http::Extensions;
use rpc_interceptors_core::{AuthError, Metadata, Status, auth_from_metadata};

/// Scheme used by [`BearerAuth`] unless configured otherwise.
pub const BEARER_SCHEME: &str = "bearer";

/// The call being authenticated.
#[derive(Debug)]
pub struct AuthContext<'a> {
    /// The procedure being called (e.g., "package.Service/Method").
    pub procedure: &'a str,
    /// Call metadata built from the request headers.
    pub metadata: &'a Metadata,
    /// Request extensions; insert the authenticated principal here.
    pub extensions: &'a mut Extensions,
}

impl<'a> AuthContext<'a> {
    pub fn new(procedure: &'a str, metadata: &'a Metadata, extensions: &'a mut Extensions) -> Self {
        Self {
            procedure,
            metadata,
            extensions,
        }
    }

    /// The credential presented with `scheme`.
    pub fn credential(&self, scheme: &str) -> Result<String, AuthError> {
        auth_from_metadata(self.metadata, scheme)
    }

    /// The credential presented with the `bearer` scheme.
    pub fn bearer_token(&self) -> Result<String, AuthError> {
        self.credential(BEARER_SCHEME)
    }
}

/// Decides whether a call may proceed.
///
/// Implemented for closures taking `&mut AuthContext<'_>`.
pub trait Authenticate: Send + Sync + 'static {
    fn authenticate(&self, call: &mut AuthContext<'_>) -> Result<(), Status>;
}

impl<F> Authenticate for F
where
    F: Fn(&mut AuthContext<'_>) -> Result<(), Status> + Send + Sync + 'static,
{
    fn authenticate(&self, call: &mut AuthContext<'_>) -> Result<(), Status> {
        self(call)
    }
}

/// Authenticator for `authorization: <scheme> <credential>` calls.
///
/// Extracts the credential, hands it to `verify`, and stores the principal
/// `verify` returns in the request extensions. Extraction failures are
/// rejected as unauthenticated before `verify` runs.
pub struct BearerAuth<V, P> {
    scheme: String,
    verify: V,
    _principal: PhantomData<fn() -> P>,
}

impl<V, P> BearerAuth<V, P>
where
    V: Fn(&str) -> Result<P, Status> + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    /// Authenticate `bearer` credentials with `verify`.
    pub fn new(verify: V) -> Self {
        Self {
            scheme: BEARER_SCHEME.to_string(),
            verify,
            _principal: PhantomData,
        }
    }

    /// Expect `scheme` instead of `bearer`.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

impl<V, P> Authenticate for BearerAuth<V, P>
where
    V: Fn(&str) -> Result<P, Status> + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    fn authenticate(&self, call: &mut AuthContext<'_>) -> Result<(), Status> {
        let credential = call.credential(&self.scheme)?;
        let principal = (self.verify)(&credential)?;
        call.extensions.insert(principal);
        Ok(())
    }
}

impl<V, P> fmt::Debug for BearerAuth<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}
