//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The route tree holds handlers of *different* types in one
//! `HashMap<Method, _>` per node, and middleware has to wrap any of them.
//! Both only work over a single type, so every handler is erased behind
//! `dyn ErasedHandler` and shared as a [`BoxedHandler`].
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn list(req: Request) -> Response { … }    ← user writes this
//!        ↓ router.handle_func("GET /items", list)
//! list.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(list))                        ← heap-allocated wrapper
//!        ↓  compose(&group_middleware, handler)    ← each layer is another BoxedHandler
//! handler.call(req)  at request time               ← one vtable dispatch per layer
//!        ↓
//! Box::pin(async { list(req).await.into_response() })  ← BoxFuture
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Erased types ──────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let tokio move the future across threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// The single-method capability every handler and every middleware layer
/// exposes once erased.
///
/// Middleware written against [`BoxedHandler`] calls the next layer through
/// this trait. Prefer [`middleware::from_fn`](crate::middleware::from_fn)
/// unless you need a hand-rolled layer.
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied by any `async fn` with the signature
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and by [`ChainHandler`](crate::middleware::ChainHandler). The trait is
/// sealed: only impls inside this crate can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

pub(crate) mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
