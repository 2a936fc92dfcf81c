//! Turning a rejected call into an HTTP response.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use rpc_interceptors_core::{AuthError, Status};

/// A [`Status`] returned to the caller as a unary error response.
///
/// The HTTP status comes from [`Code::http_status`], the body is the JSON
/// error object `{"code": "...", "message": "..."}`.
///
/// [`Code::http_status`]: rpc_interceptors_core::Code::http_status
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcError(pub Status);

impl RpcError {
    pub fn status(&self) -> &Status {
        &self.0
    }
}

impl From<Status> for RpcError {
    fn from(status: Status) -> Self {
        Self(status)
    }
}

impl From<AuthError> for RpcError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status_code = self.0.code().http_status();
        (status_code, Json(self.0)).into_response()
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for RpcError {}
