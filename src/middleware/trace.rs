//! Per-request tracing span.

use std::sync::Arc;

use tracing::{info_span, Instrument};

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

/// Runs everything below it inside an `http.request` span carrying the
/// method and path, so handler logs are attributed to their request.
///
/// ```rust
/// use trellis::{middleware::Trace, Router};
///
/// let mut app = Router::new();
/// app.use_middleware(Trace);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(Traced(next))
    }
}

struct Traced(BoxedHandler);

impl ErasedHandler for Traced {
    fn call(&self, req: Request) -> BoxFuture {
        let span = info_span!("http.request", method = %req.method(), path = %req.path());
        Box::pin(self.0.call(req).instrument(span))
    }
}
