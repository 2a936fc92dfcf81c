//! Credential extraction from call metadata.
//!
//! [`auth_from_metadata`] locates the single `authorization` value of a call,
//! checks its scheme and returns the credential that follows it. It only
//! parses; verifying the credential is up to the caller.

use http::HeaderMap;

use crate::error::{Code, Status};
use crate::metadata::Metadata;

/// Metadata key carrying the caller's credential.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Reasons a credential could not be extracted.
///
/// Every variant is reported to the caller as [`Code::Unauthenticated`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("request unauthenticated, no authorization header found")]
    MissingHeader,

    #[error("more than one authorization header found")]
    MultipleHeaders,

    #[error("bad authorization string")]
    BadAuthString,

    #[error("request unauthenticated with {expected}")]
    SchemeMismatch { expected: String },

    #[error("authorization scheme must not be empty")]
    EmptyScheme,
}

impl AuthError {
    /// The status code reported for this error.
    pub fn code(&self) -> Code {
        Code::Unauthenticated
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        Status::new(err.code(), err.to_string())
    }
}

/// Extract the credential of `expected_scheme` from call metadata.
///
/// The `authorization` key must hold exactly one value of the form
/// `"<scheme> <credential>"`. The scheme is matched case-insensitively; the
/// credential is everything after the first space, returned byte-for-byte
/// (it may itself contain spaces).
///
/// More than one `authorization` value is always rejected, even when one of
/// them would match. A value that is not valid UTF-8 is a bad auth string.
///
/// # Example
///
/// ```
/// use rpc_interceptors_core::{Metadata, auth_from_metadata};
///
/// let md = Metadata::pairs([(":authorization", "Bearer some_token")]);
/// assert_eq!(auth_from_metadata(&md, "bearer").unwrap(), "some_token");
/// ```
pub fn auth_from_metadata(md: &Metadata, expected_scheme: &str) -> Result<String, AuthError> {
    if expected_scheme.is_empty() {
        return Err(AuthError::EmptyScheme);
    }

    let value = match md.values(AUTHORIZATION_KEY) {
        [] => return Err(AuthError::MissingHeader),
        [Some(value)] => value,
        [None] => return Err(AuthError::BadAuthString),
        _ => return Err(AuthError::MultipleHeaders),
    };

    let (scheme, credential) = value.split_once(' ').ok_or(AuthError::BadAuthString)?;
    if credential.is_empty() {
        return Err(AuthError::BadAuthString);
    }

    if !scheme.eq_ignore_ascii_case(expected_scheme) {
        return Err(AuthError::SchemeMismatch {
            expected: expected_scheme.to_string(),
        });
    }

    Ok(credential.to_string())
}

/// Extract the credential of `expected_scheme` straight from transport headers.
pub fn auth_from_headers(headers: &HeaderMap, expected_scheme: &str) -> Result<String, AuthError> {
    auth_from_metadata(&Metadata::from_headers(headers), expected_scheme)
}
