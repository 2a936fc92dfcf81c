//! Tracing layer.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::http::Request;
use axum::response::Response;
use rpc_interceptors_core::{Code, Metadata, TraceContext};
use tower::{Layer, Service};
use tracing::field::{Empty, display};
use tracing::instrument::{Instrument, WithSubscriber};

use crate::context::{CallContext, procedure_from_path};
use crate::options::{TracingOption, TracingOptions};

/// Layer that records every call as an `rpc` span.
///
/// For each call the layer:
///
/// 1. Asks the filter whether the call is traced. Untraced calls pass
///    through untouched and the tracer is not resolved.
/// 2. Resolves the tracer (a [`tracing::Dispatch`]) for the call.
/// 3. Opens a span named after the operation, with the propagated trace
///    context from the trace header recorded on it when present.
/// 4. Runs the request handler hook with the span and the request.
/// 5. Drives the inner service inside the span, with the resolved tracer
///    as the default dispatcher, and records the outcome.
///
/// Span fields: `otel.name`, `rpc.procedure`, `rpc.service`, `rpc.method`,
/// `trace.id`, `trace.parent_span_id`, `trace.sampled`, `http.status_code`,
/// `rpc.code` and `error`.
#[derive(Debug, Clone, Default)]
pub struct TracingLayer {
    options: TracingOptions,
}

impl TracingLayer {
    pub fn new(options: TracingOptions) -> Self {
        Self { options }
    }

    /// Shorthand for `TracingLayer::new(TracingOptions::build(setters))`.
    pub fn with_options<I>(setters: I) -> Self
    where
        I: IntoIterator<Item = TracingOption>,
    {
        Self::new(TracingOptions::build(setters))
    }

    pub fn options(&self) -> &TracingOptions {
        &self.options
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            options: self.options.clone(),
        }
    }
}

/// Service produced by [`TracingLayer`].
#[derive(Debug, Clone)]
pub struct TracingService<S> {
    inner: S,
    options: TracingOptions,
}

impl<S, B> Service<Request<B>> for TracingService<S>
where
    S: Service<Request<B>, Response = Response>,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    B: 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let procedure = procedure_from_path(req.uri().path()).to_string();
        let metadata = Metadata::from_headers(req.headers());
        let ctx = CallContext::new(&procedure, &metadata, req.extensions());

        if !self.options.should_trace(&ctx, &procedure) {
            return Box::pin(self.inner.call(req));
        }

        let tracer = self.options.tracer(&ctx);
        let op_name = self.options.operation_name(&procedure);
        let (service, method) = (ctx.service(), ctx.method());

        let span = tracing::dispatcher::with_default(&tracer, || {
            tracing::info_span!(
                "rpc",
                otel.name = %op_name,
                rpc.procedure = %procedure,
                rpc.service = service,
                rpc.method = method,
                trace.id = Empty,
                trace.parent_span_id = Empty,
                trace.sampled = Empty,
                http.status_code = Empty,
                rpc.code = Empty,
                error = Empty
            )
        });

        match TraceContext::from_metadata(&metadata, self.options.trace_header_name()) {
            Some(parent) => {
                span.record("trace.id", display(format_args!("{:032x}", parent.trace_id)));
                span.record(
                    "trace.parent_span_id",
                    display(format_args!("{:016x}", parent.span_id)),
                );
                span.record("trace.sampled", parent.is_sampled());
            }
            None => tracing::trace!(
                header = self.options.trace_header_name(),
                "no usable trace context on call"
            ),
        }

        self.options.handle_request(&span, &req);

        let fut = self.inner.call(req);
        let outcome = span.clone();
        Box::pin(
            async move {
                let result = fut.await;
                match &result {
                    Ok(response) => {
                        let status = response.status();
                        outcome.record("http.status_code", status.as_u16());
                        outcome.record("rpc.code", Code::from_http_status(status).as_str());
                        if !status.is_success() {
                            outcome.record("error", true);
                        }
                    }
                    Err(_) => {
                        outcome.record("error", true);
                    }
                }
                result
            }
            .instrument(span)
            .with_subscriber(tracer),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{with_filter, with_request_handler, with_tracer, with_tracer_factory};
    use axum::body::Body;
    use axum::http::StatusCode;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tower::{ServiceBuilder, ServiceExt};
    use tracing::Dispatch;
    use tracing_subscriber::registry::Registry;

    // Reports whether the handler runs under a `Registry` dispatcher.
    async fn report_dispatcher(_req: Request<Body>) -> Result<Response, Infallible> {
        let traced = tracing::dispatcher::get_default(|d| d.is::<Registry>());
        Ok(Response::new(Body::from(traced.to_string())))
    }

    async fn teapot(_req: Request<Body>) -> Result<Response, Infallible> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::IM_A_TEAPOT;
        Ok(response)
    }

    fn request(path: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_handler_runs_under_resolved_tracer() {
        let svc = ServiceBuilder::new()
            .layer(TracingLayer::with_options([with_tracer(
                tracing_subscriber::registry(),
            )]))
            .service_fn(report_dispatcher);

        let resp = svc.oneshot(request("/hello.Greeter/SayHello")).await.unwrap();
        assert_eq!(body_string(resp).await, "true");
    }

    #[tokio::test]
    async fn test_filtered_call_skips_tracer_resolution() {
        let resolved = Arc::new(AtomicUsize::new(0));
        let counter = resolved.clone();
        let layer = TracingLayer::with_options([
            with_filter(|_, procedure| !procedure.starts_with("grpc.health.v1.Health/")),
            with_tracer_factory(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Dispatch::new(tracing_subscriber::registry())
            }),
        ]);
        let svc = ServiceBuilder::new().layer(layer).service_fn(report_dispatcher);

        let resp = svc
            .clone()
            .oneshot(request("/grpc.health.v1.Health/Check"))
            .await
            .unwrap();
        assert_eq!(body_string(resp).await, "false");
        assert_eq!(resolved.load(Ordering::SeqCst), 0);

        let resp = svc.oneshot(request("/hello.Greeter/SayHello")).await.unwrap();
        assert_eq!(body_string(resp).await, "true");
        assert_eq!(resolved.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_handler_sees_request() {
        let seen = Arc::new(Mutex::new(None));
        let seen_by_handler = seen.clone();
        let layer = TracingLayer::with_options([with_request_handler(move |_span, request| {
            let path = request
                .downcast_ref::<Request<Body>>()
                .map(|req| req.uri().path().to_string());
            *seen_by_handler.lock().unwrap() = path;
        })]);
        let svc = ServiceBuilder::new().layer(layer).service_fn(report_dispatcher);

        svc.oneshot(request("/hello.Greeter/SayHello")).await.unwrap();
        assert_eq!(
            seen.lock().unwrap().as_deref(),
            Some("/hello.Greeter/SayHello")
        );
    }

    #[tokio::test]
    async fn test_response_passes_through() {
        let svc = ServiceBuilder::new()
            .layer(TracingLayer::with_options([with_tracer(
                tracing_subscriber::registry(),
            )]))
            .service_fn(teapot);

        let resp = svc.oneshot(request("/hello.Greeter/Brew")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    }
}
