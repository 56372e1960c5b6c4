//! Middleware layer.
//!
//! A middleware is a decorator: it takes the next [`BoxedHandler`] and returns
//! a new one that runs its own logic around it. Cross-cutting concerns live
//! here: tracing, request ids, authentication-header checks.
//!
//! Order matters. `compose(&[m1, m2, m3], h)` builds `m1(m2(m3(h)))`, so a
//! request passes m1 → m2 → m3 → h and the response unwinds h → m3 → m2 → m1.
//!
//! ```rust
//! use trellis::middleware::{self, Next};
//! use trellis::{Request, Response};
//!
//! async fn powered_by(req: Request, next: Next) -> Response {
//!     let mut res = next.run(req).await;
//!     res.append_header("x-powered-by", "trellis");
//!     res
//! }
//!
//! let layer = middleware::from_fn(powered_by);
//! ```

mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

pub use trace::Trace;

// ── Middleware trait ──────────────────────────────────────────────────────────

/// A decorator over handlers.
///
/// Implemented for every `Fn(BoxedHandler) -> BoxedHandler` closure, for
/// [`from_fn`] adapters, and for the built-in layers in this module.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// Wraps `endpoint` in `middleware`, first element outermost.
///
/// An empty slice hands back `endpoint` itself, not a pass-through wrapper.
pub fn compose(middleware: &[Arc<dyn Middleware>], endpoint: BoxedHandler) -> BoxedHandler {
    middleware
        .iter()
        .rev()
        .fold(endpoint, |next, layer| layer.wrap(next))
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// The rest of the chain, handed to a [`from_fn`] middleware.
pub struct Next(BoxedHandler);

impl Next {
    /// Runs the remaining layers and the endpoint.
    pub async fn run(self, req: Request) -> Response {
        self.0.call(req).await
    }
}

/// Builds a middleware from `async fn(Request, Next) -> impl IntoResponse`.
///
/// Skip `next.run` to short-circuit: the endpoint never sees the request.
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn(Arc::new(f))
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(FromFnLayer { f: Arc::clone(&self.0), next })
    }
}

struct FromFnLayer<F> {
    f: Arc<F>,
    next: BoxedHandler,
}

impl<F, Fut, R> ErasedHandler for FromFnLayer<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.f)(req, Next(Arc::clone(&self.next)));
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// A reusable, ordered stack of middleware.
///
/// ```rust
/// use trellis::middleware::{Chain, Trace};
/// use trellis::{Request, Response, Router};
///
/// async fn report(_req: Request) -> Response { Response::text("ok") }
///
/// let audited = Chain::new().push(Trace).handler(report);
/// let mut router = Router::new();
/// router.handle_func("GET /report", audited);
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, layer: impl Middleware) -> Self {
        self.middleware.push(Arc::new(layer));
        self
    }

    pub fn len(&self) -> usize { self.middleware.len() }
    pub fn is_empty(&self) -> bool { self.middleware.is_empty() }

    pub fn as_slice(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    /// Composes the chain around `endpoint`.
    pub fn handler(&self, endpoint: impl Handler) -> ChainHandler {
        let endpoint = endpoint.into_boxed_handler();
        ChainHandler {
            chain: compose(self.as_slice(), Arc::clone(&endpoint)),
            endpoint,
            middleware: self.clone(),
        }
    }
}

/// A handler composed by [`Chain::handler`].
///
/// Keeps the bare endpoint and the chain it was built from, so callers can
/// inspect or re-wrap it. Registering it as a route runs the full chain.
#[derive(Clone)]
pub struct ChainHandler {
    endpoint: BoxedHandler,
    chain: BoxedHandler,
    middleware: Chain,
}

impl ChainHandler {
    /// The handler without any middleware.
    pub fn endpoint(&self) -> &BoxedHandler { &self.endpoint }
    pub fn middleware(&self) -> &Chain { &self.middleware }

    pub async fn call(&self, req: Request) -> Response {
        self.chain.call(req).await
    }
}

impl private::Sealed for ChainHandler {}

impl Handler for ChainHandler {
    fn into_boxed_handler(self) -> BoxedHandler {
        self.chain
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{Method, StatusCode};

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, name: &'static str) -> Arc<dyn Middleware> {
        let log = Arc::clone(log);
        Arc::new(from_fn(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name} in"));
                let res = next.run(req).await;
                log.lock().unwrap().push(format!("{name} out"));
                res
            }
        }))
    }

    fn endpoint(log: &Log) -> BoxedHandler {
        let log = Arc::clone(log);
        (move |_req: Request| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("handler".to_owned());
                "done"
            }
        })
        .into_boxed_handler()
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let log: Log = Arc::default();
        let layers = vec![recorder(&log, "m1"), recorder(&log, "m2"), recorder(&log, "m3")];

        let handler = compose(&layers, endpoint(&log));
        handler.call(Request::new(Method::GET, "/")).await;

        assert_eq!(
            *log.lock().unwrap(),
            ["m1 in", "m2 in", "m3 in", "handler", "m3 out", "m2 out", "m1 out"]
        );
    }

    #[tokio::test]
    async fn empty_chain_returns_endpoint_itself() {
        let log: Log = Arc::default();
        let h = endpoint(&log);

        let composed = compose(&[], Arc::clone(&h));
        assert!(Arc::ptr_eq(&composed, &h));

        composed.call(Request::new(Method::GET, "/")).await;
        assert_eq!(*log.lock().unwrap(), ["handler"]);
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let log: Log = Arc::default();
        let deny: Arc<dyn Middleware> =
            Arc::new(from_fn(|_req: Request, _next: Next| async { StatusCode::UNAUTHORIZED }));

        let res = compose(&[deny], endpoint(&log)).call(Request::new(Method::GET, "/")).await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closure_decorators_compose() {
        let tag = |next: BoxedHandler| -> BoxedHandler {
            from_fn(|req: Request, next: Next| async move {
                let mut res = next.run(req).await;
                res.append_header("x-tag", "1");
                res
            })
            .wrap(next)
        };
        let layers: Vec<Arc<dyn Middleware>> = vec![Arc::new(tag)];

        let res = compose(&layers, (|_req: Request| async { "ok" }).into_boxed_handler())
            .call(Request::new(Method::GET, "/"))
            .await;
        assert_eq!(res.header("x-tag"), Some("1"));
    }

    #[tokio::test]
    async fn chain_handler_keeps_endpoint_and_layers() {
        let log: Log = Arc::default();
        let chain = Chain::new().push(from_fn({
            let log = Arc::clone(&log);
            move |req: Request, next: Next| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push("outer".to_owned());
                    next.run(req).await
                }
            }
        }));
        assert_eq!(chain.len(), 1);

        let h = chain.handler(|_req: Request| async { "bare" });
        assert_eq!(h.middleware().len(), 1);

        h.endpoint().call(Request::new(Method::GET, "/")).await;
        assert!(log.lock().unwrap().is_empty());

        let res = h.call(Request::new(Method::GET, "/")).await;
        assert_eq!(res.body(), b"bare");
        assert_eq!(*log.lock().unwrap(), ["outer"]);
    }

    #[tokio::test]
    async fn chain_slice_composes_like_chain_handler() {
        let log: Log = Arc::default();
        let tag = from_fn(|req: Request, next: Next| async move {
            let mut res = next.run(req).await;
            res.append_header("x-layer", "a");
            res
        });
        let chain = Chain::new().push(tag);
        assert_eq!(chain.as_slice().len(), chain.len());

        let direct = compose(chain.as_slice(), endpoint(&log))
            .call(Request::new(Method::GET, "/"))
            .await;
        let wrapped = chain
            .handler(|_req: Request| async { "done" })
            .call(Request::new(Method::GET, "/"))
            .await;

        assert_eq!(direct.header("x-layer"), Some("a"));
        assert_eq!(wrapped.header("x-layer"), direct.header("x-layer"));
        assert_eq!(wrapped.body(), direct.body());
        assert_eq!(*log.lock().unwrap(), ["handler"]);
    }
}
