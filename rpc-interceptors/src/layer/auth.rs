//! Authentication layer.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::http::Request;
use axum::response::{IntoResponse, Response};
use rpc_interceptors_core::Metadata;
use tower::{Layer, Service};

use crate::auth::{AuthContext, Authenticate};
use crate::context::procedure_from_path;
use crate::error::RpcError;

/// Layer that authenticates every call before it reaches the inner service.
///
/// Rejected calls are answered directly with the authenticator's [`Status`]
/// as a unary error response (HTTP 401 for unauthenticated). Accepted calls
/// reach the inner service with whatever the authenticator put into the
/// request extensions.
///
/// [`Status`]: rpc_interceptors_core::Status
///
/// # Example
///
/// ```rust,ignore
/// use rpc_interceptors::{AuthLayer, BearerAuth};
///
/// let app = Router::new()
///     .route("/hello.Greeter/SayHello", post(say_hello))
///     .route("/grpc.health.v1.Health/Check", post(health))
///     .layer(
///         AuthLayer::new(BearerAuth::new(verify_token))
///             .skip_procedure("grpc.health.v1.Health/Check"),
///     );
/// ```
pub struct AuthLayer<A> {
    authenticator: Arc<A>,
    skipped: Arc<[String]>,
}

impl<A: Authenticate> AuthLayer<A> {
    /// Create a layer authenticating calls with `authenticator`.
    pub fn new(authenticator: A) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            skipped: Arc::from(Vec::new()),
        }
    }

    /// Let calls to `procedure` ("package.Service/Method") through unauthenticated.
    pub fn skip_procedure(self, procedure: impl Into<String>) -> Self {
        let mut skipped = self.skipped.to_vec();
        skipped.push(procedure.into());
        Self {
            authenticator: self.authenticator,
            skipped: skipped.into(),
        }
    }
}

impl<A> Clone for AuthLayer<A> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            skipped: self.skipped.clone(),
        }
    }
}

impl<A> fmt::Debug for AuthLayer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthLayer")
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}

impl<S, A> Layer<S> for AuthLayer<A> {
    type Service = AuthService<S, A>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            authenticator: self.authenticator.clone(),
            skipped: self.skipped.clone(),
        }
    }
}

/// Service produced by [`AuthLayer`].
pub struct AuthService<S, A> {
    inner: S,
    authenticator: Arc<A>,
    skipped: Arc<[String]>,
}

impl<S: Clone, A> Clone for AuthService<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            authenticator: self.authenticator.clone(),
            skipped: self.skipped.clone(),
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for AuthService<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("inner", &self.inner)
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}

impl<S, A, B> Service<Request<B>> for AuthService<S, A>
where
    S: Service<Request<B>, Response = Response>,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    A: Authenticate,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let (mut parts, body) = req.into_parts();
        let procedure = procedure_from_path(parts.uri.path());

        if self.skipped.iter().any(|skipped| skipped == procedure) {
            tracing::trace!(procedure, "authentication skipped");
            return Box::pin(self.inner.call(Request::from_parts(parts, body)));
        }

        let metadata = Metadata::from_headers(&parts.headers);
        let mut call = AuthContext::new(procedure, &metadata, &mut parts.extensions);

        match self.authenticator.authenticate(&mut call) {
            Ok(()) => {
                tracing::trace!(procedure, "call authenticated");
                Box::pin(self.inner.call(Request::from_parts(parts, body)))
            }
            Err(status) => {
                tracing::debug!(
                    procedure,
                    code = %status.code(),
                    reason = status.message().unwrap_or_default(),
                    "rejecting call"
                );
                let response = RpcError(status).into_response();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
