use std::net::SocketAddr;

use anyhow::Context;
use axum::{Extension, Json, Router, body::Body, http::Request, routing::post};
use rpc_interceptors::prelude::*;
use serde::{Deserialize, Serialize};

/// Procedure answered without credentials and left untraced.
pub const HEALTH_CHECK: &str = "grpc.health.v1.Health/Check";

/// Returns the server address from the BIND_ADDR env var, defaulting to 127.0.0.1:3000.
///
/// # Example
///
/// ```ignore
/// let addr = rpc_interceptors_examples::server_addr()?;
/// let listener = tokio::net::TcpListener::bind(addr).await?;
/// ```
pub fn server_addr() -> anyhow::Result<SocketAddr> {
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    addr.parse::<SocketAddr>()
        .with_context(|| format!("invalid BIND_ADDR {addr:?}"))
}

/// Bearer token accepted by the demo server, from DEMO_TOKEN (default "demo-token").
pub fn demo_token() -> String {
    std::env::var("DEMO_TOKEN").unwrap_or_else(|_| "demo-token".into())
}

/// The caller, as established by the auth layer.
#[derive(Clone, Debug)]
pub struct User(pub String);

#[derive(Debug, Deserialize)]
pub struct HelloRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
}

async fn say_hello(
    Extension(user): Extension<User>,
    Json(req): Json<HelloRequest>,
) -> Json<HelloResponse> {
    let name = req.name.unwrap_or_else(|| "World".to_string());
    tracing::info!(user = %user.0, "greeting");
    Json(HelloResponse {
        message: format!("Hello, {}! (authenticated as {})", name, user.0),
    })
}

async fn health_check() -> &'static str {
    "SERVING"
}

// Logs the caller's user agent as an event inside the call span.
fn log_user_agent(span: &tracing::Span, request: &dyn std::any::Any) {
    let user_agent = request
        .downcast_ref::<Request<Body>>()
        .and_then(|req| req.headers().get("user-agent"))
        .and_then(|v| v.to_str().ok());
    if let Some(user_agent) = user_agent {
        tracing::debug!(parent: span, user_agent, "call received");
    }
}

/// The demo router: a greeter behind bearer authentication, traced per call.
pub fn app(token: String) -> Router {
    let verify = move |presented: &str| {
        if presented == token {
            Ok(User("demo".to_string()))
        } else {
            Err(Status::unauthenticated("unknown token"))
        }
    };

    Router::new()
        .route("/hello.Greeter/SayHello", post(say_hello))
        .route(&format!("/{HEALTH_CHECK}"), post(health_check))
        .layer(AuthLayer::new(BearerAuth::new(verify)).skip_procedure(HEALTH_CHECK))
        .layer(TracingLayer::with_options([
            with_filter(|_, procedure| procedure != HEALTH_CHECK),
            with_operation_name(|procedure| format!("rpc {procedure}")),
            with_request_handler(log_user_agent),
        ]))
}
