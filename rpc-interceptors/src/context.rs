//! Per-call context handed to interceptor callbacks.

use axum::http::Extensions;
use rpc_interceptors_core::Metadata;

/// Read-only view of an incoming call.
///
/// Built by the layers for every request and passed to filter predicates
/// and tracer factories.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// The procedure being called (e.g., "package.Service/Method").
    pub procedure: &'a str,
    /// Call metadata built from the request headers.
    pub metadata: &'a Metadata,
    /// Request extensions, as set by outer layers.
    pub extensions: &'a Extensions,
}

impl<'a> CallContext<'a> {
    pub fn new(procedure: &'a str, metadata: &'a Metadata, extensions: &'a Extensions) -> Self {
        Self {
            procedure,
            metadata,
            extensions,
        }
    }

    /// Service part of the procedure ("package.Service"), empty if there is none.
    pub fn service(&self) -> &'a str {
        split_procedure(self.procedure).0
    }

    /// Method part of the procedure ("Method").
    pub fn method(&self) -> &'a str {
        split_procedure(self.procedure).1
    }
}

/// Procedure name for a request path: the path without its leading `/`.
pub fn procedure_from_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

fn split_procedure(procedure: &str) -> (&str, &str) {
    procedure.rsplit_once('/').unwrap_or(("", procedure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedure_from_path() {
        assert_eq!(
            procedure_from_path("/hello.Greeter/SayHello"),
            "hello.Greeter/SayHello"
        );
        assert_eq!(procedure_from_path("health"), "health");
        assert_eq!(procedure_from_path("/"), "");
    }

    #[test]
    fn test_service_and_method() {
        let md = Metadata::new();
        let ext = Extensions::new();
        let ctx = CallContext::new("hello.Greeter/SayHello", &md, &ext);
        assert_eq!(ctx.service(), "hello.Greeter");
        assert_eq!(ctx.method(), "SayHello");

        let ctx = CallContext::new("healthz", &md, &ext);
        assert_eq!(ctx.service(), "");
        assert_eq!(ctx.method(), "healthz");
    }
}
