//! RPC status codes and the [`Status`] error type.
//!
//! - [`Code`]: protocol status codes, shared by every interceptor
//! - [`Status`]: a code plus an optional human-readable reason

use http::StatusCode;
use serde::{Serialize, Serializer};

/// RPC status codes, numbered as in the gRPC and Connect protocols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    Ok = 0,
    Canceled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    /// Get the wire name of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Ok => "ok",
            Code::Canceled => "canceled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::NotFound => "not_found",
            Code::AlreadyExists => "already_exists",
            Code::PermissionDenied => "permission_denied",
            Code::ResourceExhausted => "resource_exhausted",
            Code::FailedPrecondition => "failed_precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data_loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }

    /// HTTP status used when this code is returned from a unary call.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Code::Ok => StatusCode::OK,
            // 499 Client Closed Request (nginx extension)
            Code::Canceled => client_closed_request(),
            Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            Code::InvalidArgument => StatusCode::BAD_REQUEST,
            Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Code::NotFound => StatusCode::NOT_FOUND,
            Code::AlreadyExists => StatusCode::CONFLICT,
            Code::PermissionDenied => StatusCode::FORBIDDEN,
            Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            Code::FailedPrecondition => StatusCode::BAD_REQUEST,
            Code::Aborted => StatusCode::CONFLICT,
            Code::OutOfRange => StatusCode::BAD_REQUEST,
            Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
            Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }

    /// Best-effort code for a response that carries only an HTTP status.
    ///
    /// Any 2xx maps to [`Code::Ok`]; statuses without a dedicated mapping
    /// fall back to [`Code::Unknown`].
    pub fn from_http_status(status: StatusCode) -> Self {
        if status.is_success() {
            return Code::Ok;
        }
        match status {
            StatusCode::BAD_REQUEST => Code::InvalidArgument,
            StatusCode::UNAUTHORIZED => Code::Unauthenticated,
            StatusCode::FORBIDDEN => Code::PermissionDenied,
            StatusCode::NOT_FOUND => Code::NotFound,
            StatusCode::CONFLICT => Code::AlreadyExists,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Code::DeadlineExceeded,
            StatusCode::TOO_MANY_REQUESTS => Code::ResourceExhausted,
            StatusCode::NOT_IMPLEMENTED => Code::Unimplemented,
            StatusCode::SERVICE_UNAVAILABLE => Code::Unavailable,
            StatusCode::INTERNAL_SERVER_ERROR => Code::Internal,
            _ if status.as_u16() == CLIENT_CLOSED_REQUEST => Code::Canceled,
            _ => Code::Unknown,
        }
    }
}

const CLIENT_CLOSED_REQUEST: u16 = 499;

fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::REQUEST_TIMEOUT)
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body of a unary error response.
#[derive(Serialize)]
struct ErrorResponseBody<'a> {
    code: Code,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

/// Outcome of a rejected call: a [`Code`] and an optional reason.
///
/// Interceptors return this to reject a call before it reaches the handler.
///
/// # Example
///
/// ```
/// use rpc_interceptors_core::{Code, Status};
///
/// let status = Status::unauthenticated("bad authorization string");
/// assert_eq!(status.code(), Code::Unauthenticated);
/// assert_eq!(status.to_string(), "unauthenticated: bad authorization string");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    code: Code,
    message: Option<String>,
}

impl Status {
    /// Create a new status with a code and message.
    pub fn new<S: Into<String>>(code: Code, message: S) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Create a new status with just a code.
    pub fn from_code(code: Code) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Get the status code.
    pub fn code(&self) -> Code {
        self.code
    }

    /// Get the reason, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Create an unauthenticated status.
    pub fn unauthenticated<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Unauthenticated, message)
    }

    /// Create a permission denied status.
    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::new(Code::PermissionDenied, message)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code.as_str())?;
        if let Some(msg) = &self.message {
            write!(f, ": {}", msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for Status {}

impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ErrorResponseBody {
            code: self.code,
            message: self.message.as_deref(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_as_str() {
        assert_eq!(Code::Ok.as_str(), "ok");
        assert_eq!(Code::InvalidArgument.as_str(), "invalid_argument");
        assert_eq!(Code::Unauthenticated.as_str(), "unauthenticated");
    }

    #[test]
    fn test_code_http_status() {
        assert_eq!(Code::Unauthenticated.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Code::PermissionDenied.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(Code::Ok.http_status(), StatusCode::OK);
        assert_eq!(Code::Canceled.http_status().as_u16(), 499);
        assert_eq!(
            Code::DeadlineExceeded.http_status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_code_from_http_status() {
        assert_eq!(Code::from_http_status(StatusCode::OK), Code::Ok);
        assert_eq!(Code::from_http_status(StatusCode::NO_CONTENT), Code::Ok);
        assert_eq!(
            Code::from_http_status(StatusCode::UNAUTHORIZED),
            Code::Unauthenticated
        );
        assert_eq!(
            Code::from_http_status(StatusCode::GATEWAY_TIMEOUT),
            Code::DeadlineExceeded
        );
        assert_eq!(
            Code::from_http_status(StatusCode::REQUEST_TIMEOUT),
            Code::DeadlineExceeded
        );
        assert_eq!(
            Code::from_http_status(Code::Canceled.http_status()),
            Code::Canceled
        );
        assert_eq!(Code::from_http_status(StatusCode::IM_A_TEAPOT), Code::Unknown);
    }

    #[test]
    fn test_status_new() {
        let status = Status::new(Code::NotFound, "resource not found");
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), Some("resource not found"));
    }

    #[test]
    fn test_status_from_code() {
        let status = Status::from_code(Code::Internal);
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().is_none());
    }

    #[test]
    fn test_status_display() {
        let status = Status::unauthenticated("bad authorization string");
        assert_eq!(status.to_string(), "unauthenticated: bad authorization string");

        let status = Status::from_code(Code::Internal);
        assert_eq!(status.to_string(), "internal");
    }

    #[test]
    fn test_status_serialize() {
        let status = Status::unauthenticated("more than one authorization header found");
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["code"], "unauthenticated");
        assert_eq!(json["message"], "more than one authorization header found");
    }

    #[test]
    fn test_status_serialize_without_message() {
        let json = serde_json::to_value(Status::from_code(Code::Unauthenticated)).unwrap();
        assert_eq!(json, serde_json::json!({ "code": "unauthenticated" }));
    }
}
