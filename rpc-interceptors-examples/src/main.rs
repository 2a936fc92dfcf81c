//! Example: greeter behind authentication and tracing layers
//!
//! Run with: cargo run --bin greeter
//! Test with:
//!   # Without credentials (should return HTTP 401 with an unauthenticated error)
//!   curl -v -X POST http://localhost:3000/hello.Greeter/SayHello \
//!     -H 'Content-Type: application/json' \
//!     -d '{"name": "Alice"}'
//!
//!   # With credentials and a propagated trace context (should succeed)
//!   curl -X POST http://localhost:3000/hello.Greeter/SayHello \
//!     -H 'Content-Type: application/json' \
//!     -H 'Authorization: Bearer demo-token' \
//!     -H 'uber-trace-id: 4bf92f3577b34da6:00f067aa0ba902b7:0:1' \
//!     -d '{"name": "Alice"}'

use rpc_interceptors_examples::{app, demo_token, server_addr};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Example: Authentication and Tracing Layers ===");
    println!("Server listening on http://{}", addr);
    println!();
    println!("Set RUST_LOG=debug to see rejected calls and span events.");
    println!();
    println!("Test WITH a bearer token (should succeed):");
    println!("  curl -X POST http://localhost:3000/hello.Greeter/SayHello \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -H 'Authorization: Bearer demo-token' \\");
    println!("    -d '{{\"name\": \"Alice\"}}'");

    axum::serve(listener, app(demo_token())).await?;
    Ok(())
}
