//! Options for the tracing interceptor.
//!
//! Options are supplied as an ordered list of [`TracingOption`] setters and
//! folded into an immutable [`TracingOptions`] record once, when the layer is
//! built:
//!
//! 1. Start from a record with every field unset.
//! 2. Apply each setter in order. A later setter for the same field wins.
//! 3. Fill the fields still unset from a [`TracingDefaults`] record.
//!
//! The "tracer" of a call is a [`tracing::Dispatch`]. By default it is
//! resolved from the [`TracerRegistry`] on every call, never cached, so a
//! subscriber installed after the layer was built is still picked up.
//!
//! # Example
//!
//! ```
//! use rpc_interceptors::options::{
//!     TracingOptions, with_filter, with_operation_name, with_trace_header_name,
//! };
//!
//! let options = TracingOptions::build([
//!     with_filter(|_ctx, procedure: &str| !procedure.starts_with("grpc.health")),
//!     with_trace_header_name("x-trace"),
//!     with_operation_name(|procedure: &str| format!("rpc {procedure}")),
//! ]);
//! assert_eq!(options.trace_header_name(), "x-trace");
//! assert_eq!(options.operation_name("a.B/C"), "rpc a.B/C");
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rpc_interceptors_core::DEFAULT_TRACE_HEADER;
use tracing::{Dispatch, Span};

use crate::context::CallContext;

/// Decides whether a call is traced. Receives the call and its procedure.
pub type FilterFn = Arc<dyn Fn(&CallContext<'_>, &str) -> bool + Send + Sync>;

/// Resolves the tracer for a call.
pub type TracerFactory = Arc<dyn Fn(&CallContext<'_>) -> Dispatch + Send + Sync>;

/// Enriches the call span from the request before the handler runs.
pub type RequestHandlerFn = Arc<dyn Fn(&Span, &dyn Any) + Send + Sync>;

/// Maps a procedure to the span's operation name.
pub type OpNameFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Source of the process-wide tracer.
///
/// Injected into [`TracingDefaults`] so the default tracer factory can be
/// exercised without touching global state.
pub trait TracerRegistry: Send + Sync + 'static {
    /// The tracer registered right now.
    fn current(&self) -> Dispatch;
}

/// The [`TracerRegistry`] backed by `tracing`'s default dispatcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalTracer;

impl TracerRegistry for GlobalTracer {
    fn current(&self) -> Dispatch {
        tracing::dispatcher::get_default(Dispatch::clone)
    }
}

/// One option setter. Build with the `with_*` functions of this module.
#[derive(Clone)]
pub struct TracingOption(Setter);

#[derive(Clone)]
enum Setter {
    Filter(FilterFn),
    TraceHeaderName(String),
    TracerFactory(TracerFactory),
    RequestHandler(RequestHandlerFn),
    OperationName(OpNameFn),
}

impl fmt::Debug for TracingOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.0 {
            Setter::Filter(_) => "Filter",
            Setter::TraceHeaderName(_) => "TraceHeaderName",
            Setter::TracerFactory(_) => "TracerFactory",
            Setter::RequestHandler(_) => "RequestHandler",
            Setter::OperationName(_) => "OperationName",
        };
        f.debug_tuple("TracingOption").field(&name).finish()
    }
}

/// Only trace calls for which `filter` returns `true`.
pub fn with_filter<F>(filter: F) -> TracingOption
where
    F: Fn(&CallContext<'_>, &str) -> bool + Send + Sync + 'static,
{
    TracingOption(Setter::Filter(Arc::new(filter)))
}

/// Read propagated trace context from `name` instead of `uber-trace-id`.
pub fn with_trace_header_name(name: impl Into<String>) -> TracingOption {
    TracingOption(Setter::TraceHeaderName(name.into()))
}

/// Record every call with `tracer` instead of the registered one.
pub fn with_tracer(tracer: impl Into<Dispatch>) -> TracingOption {
    let tracer = tracer.into();
    with_tracer_factory(move |_| tracer.clone())
}

/// Resolve the tracer of each call with `factory`.
pub fn with_tracer_factory<F>(factory: F) -> TracingOption
where
    F: Fn(&CallContext<'_>) -> Dispatch + Send + Sync + 'static,
{
    TracingOption(Setter::TracerFactory(tracer_factory(factory)))
}

fn tracer_factory<F>(factory: F) -> TracerFactory
where
    F: Fn(&CallContext<'_>) -> Dispatch + Send + Sync + 'static,
{
    Arc::new(factory)
}

/// Call `handler` with the span and the request of every traced call.
///
/// The request is passed as `&dyn Any`; for HTTP services it is an
/// `axum::http::Request<B>` and can be recovered with `downcast_ref`.
pub fn with_request_handler<F>(handler: F) -> TracingOption
where
    F: Fn(&Span, &dyn Any) + Send + Sync + 'static,
{
    TracingOption(Setter::RequestHandler(Arc::new(handler)))
}

/// Name spans with `op_name(procedure)` instead of the procedure itself.
pub fn with_operation_name<F>(op_name: F) -> TracingOption
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    TracingOption(Setter::OperationName(Arc::new(op_name)))
}

/// Values used for fields no setter provided.
#[derive(Clone)]
pub struct TracingDefaults {
    tracer_factory: TracerFactory,
    trace_header_name: String,
}

impl TracingDefaults {
    /// Defaults resolving the tracer from [`GlobalTracer`].
    pub fn new() -> Self {
        Self::with_registry(GlobalTracer)
    }

    /// Defaults resolving the tracer from `registry` at every call.
    pub fn with_registry<R: TracerRegistry>(registry: R) -> Self {
        Self {
            tracer_factory: tracer_factory(move |_| registry.current()),
            trace_header_name: DEFAULT_TRACE_HEADER.to_string(),
        }
    }

    /// Use a different default trace header.
    pub fn trace_header_name(mut self, name: impl Into<String>) -> Self {
        self.trace_header_name = name.into();
        self
    }
}

impl Default for TracingDefaults {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TracingDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingDefaults")
            .field("trace_header_name", &self.trace_header_name)
            .finish_non_exhaustive()
    }
}

/// Fields collected from the setters, before defaults.
#[derive(Default)]
struct PartialOptions {
    filter: Option<FilterFn>,
    tracer_factory: Option<TracerFactory>,
    trace_header_name: Option<String>,
    request_handler: Option<RequestHandlerFn>,
    op_name: Option<OpNameFn>,
}

impl PartialOptions {
    fn apply(&mut self, option: TracingOption) {
        match option.0 {
            Setter::Filter(f) => self.filter = Some(f),
            Setter::TraceHeaderName(name) => self.trace_header_name = Some(name),
            Setter::TracerFactory(factory) => self.tracer_factory = Some(factory),
            Setter::RequestHandler(handler) => self.request_handler = Some(handler),
            Setter::OperationName(op_name) => self.op_name = Some(op_name),
        }
    }
}

/// Immutable configuration of the tracing interceptor.
///
/// Cloning is cheap; every callback is shared.
#[derive(Clone)]
pub struct TracingOptions {
    filter: Option<FilterFn>,
    tracer_factory: TracerFactory,
    trace_header_name: String,
    request_handler: Option<RequestHandlerFn>,
    op_name: Option<OpNameFn>,
}

impl TracingOptions {
    /// Build options from `setters`, filling gaps from [`TracingDefaults::new`].
    pub fn build<I>(setters: I) -> Self
    where
        I: IntoIterator<Item = TracingOption>,
    {
        Self::build_with_defaults(setters, &TracingDefaults::new())
    }

    /// Build options from `setters`, filling gaps from `defaults`.
    ///
    /// An empty trace header name counts as unset.
    pub fn build_with_defaults<I>(setters: I, defaults: &TracingDefaults) -> Self
    where
        I: IntoIterator<Item = TracingOption>,
    {
        let mut partial = PartialOptions::default();
        for setter in setters {
            partial.apply(setter);
        }

        Self {
            filter: partial.filter,
            tracer_factory: partial
                .tracer_factory
                .unwrap_or_else(|| defaults.tracer_factory.clone()),
            trace_header_name: partial
                .trace_header_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| defaults.trace_header_name.clone()),
            request_handler: partial.request_handler,
            op_name: partial.op_name,
        }
    }

    /// Whether `procedure` should be traced. Always `true` without a filter.
    pub fn should_trace(&self, ctx: &CallContext<'_>, procedure: &str) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(ctx, procedure))
    }

    /// Resolve the tracer for this call.
    pub fn tracer(&self, ctx: &CallContext<'_>) -> Dispatch {
        (self.tracer_factory)(ctx)
    }

    /// Metadata key carrying propagated trace context.
    pub fn trace_header_name(&self) -> &str {
        &self.trace_header_name
    }

    /// Span name for `procedure`.
    pub fn operation_name(&self, procedure: &str) -> String {
        match &self.op_name {
            Some(op_name) => op_name(procedure),
            None => procedure.to_string(),
        }
    }

    /// Run the request handler hook, if one is set.
    pub fn handle_request(&self, span: &Span, request: &dyn Any) {
        if let Some(handler) = &self.request_handler {
            handler(span, request);
        }
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn has_request_handler(&self) -> bool {
        self.request_handler.is_some()
    }
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self::build(std::iter::empty())
    }
}

impl fmt::Debug for TracingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingOptions")
            .field("filter", &self.filter.is_some())
            .field("trace_header_name", &self.trace_header_name)
            .field("request_handler", &self.request_handler.is_some())
            .field("op_name", &self.op_name.is_some())
            .finish_non_exhaustive()
    }
}
