//! Request router: registration, middleware, grouping and dispatch.
//!
//! # Two layers of middleware
//!
//! Middleware is applied in two places, and the difference is observable:
//!
//! - **Root middleware** (`use_middleware` on the router returned by
//!   [`Router::new`]) wraps the route lookup itself and is re-composed on every
//!   request. Adding root middleware affects every request served afterwards,
//!   including requests to routes registered earlier. It also runs for
//!   requests that end in 404 or 405.
//! - **Group middleware** (anything on a router derived with [`Router::with`],
//!   [`Router::group`] or [`Router::with_prefix`]) is baked into each route's
//!   handler when the route is registered. Adding middleware to the group
//!   afterwards leaves those routes untouched.
//!
//! A derived router inherits its parent's group middleware, never the root's:
//! the root's layers already run around every request once.
//!
//! ```rust
//! use trellis::{middleware::{self, Next}, Request, Response, Router};
//!
//! async fn require_token(req: Request, next: Next) -> Response {
//!     match req.header("authorization") {
//!         Some(_) => next.run(req).await,
//!         None => Response::status(trellis::StatusCode::UNAUTHORIZED),
//!     }
//! }
//!
//! async fn list_widgets(_req: Request) -> Response { Response::json(b"[]".to_vec()) }
//! async fn health(_req: Request) -> Response { Response::text("ok") }
//!
//! let mut app = Router::new();
//! app.use_middleware(middleware::Trace);
//! app.handle_func("GET /healthz", health);
//! app.group_with_prefix("/api", |api| {
//!     api.use_middleware(middleware::from_fn(require_token));
//!     api.handle_func("GET /widgets", list_widgets);
//! });
//! ```

use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Instant;

use http::{Method, StatusCode};
use tracing::debug;

use crate::access_log::{AccessLog, AccessRecord, TracingAccessLog};
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::middleware::{compose, Middleware};
use crate::request::Request;
use crate::response::Response;
use crate::tree::{RouteInfo, RouteTree};

/// The application router.
///
/// Cheap to clone: every clone and every derived router writes into the same
/// route tree. Register routes at startup, then hand the root router to
/// [`Server::serve`](crate::Server::serve) or call [`Router::serve`] from
/// your own transport.
#[derive(Clone)]
pub struct Router {
    tree: Arc<RwLock<RouteTree>>,
    middleware: Vec<Arc<dyn Middleware>>,
    prefix: String,
    /// Derived from another router; its middleware is baked into routes.
    inline: bool,
    /// Entry handler of a derived router, built on first registration or
    /// first dispatch and fixed from then on.
    top: OnceLock<BoxedHandler>,
    access_log: Arc<dyn AccessLog>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(RouteTree::new())),
            middleware: Vec::new(),
            prefix: String::new(),
            inline: false,
            top: OnceLock::new(),
            access_log: Arc::new(TracingAccessLog),
        }
    }

    /// Replaces the access-log sink (default: [`TracingAccessLog`]).
    ///
    /// Derived routers share the sink of the router they came from, so set it
    /// before deriving.
    pub fn access_log(mut self, sink: impl AccessLog) -> Self {
        self.access_log = Arc::new(sink);
        self
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Registers `handler` for a `"<METHOD> <path>"` pattern, e.g.
    /// `"GET /items"`. The path is appended to this router's prefix.
    ///
    /// Registering the same method and path again replaces the handler.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is malformed; see [`Router::try_handle_func`].
    pub fn handle_func(&mut self, pattern: &str, handler: impl Handler) -> &mut Self {
        self.try_handle_func(pattern, handler)
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// Like [`Router::handle_func`], returning [`Error::InvalidPattern`]
    /// instead of panicking.
    ///
    /// A valid pattern is an uppercase method token, whitespace, and a path
    /// that starts with `/` and contains no whitespace.
    pub fn try_handle_func(&mut self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        let (method, path) = parse_pattern(pattern)?;
        self.register(method, path, handler.into_boxed_handler());
        Ok(())
    }

    /// Builder-style registration with a typed method. Returns `self` so
    /// registrations chain:
    ///
    /// ```rust
    /// # use trellis::{Method, Request, Response, Router};
    /// # async fn list(_: Request) -> Response { Response::text("") }
    /// # async fn create(_: Request) -> Response { Response::text("") }
    /// # async fn purge(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/items", list)
    ///     .on(Method::POST, "/items", create)
    ///     .on(Method::from_bytes(b"PURGE").unwrap(), "/cache", purge);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` does not start with `/` or contains whitespace.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.handle_func(&format!("{method} {path}"), handler);
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    fn register(&mut self, method: Method, path: &str, handler: BoxedHandler) {
        let full_path = format!("{}{}", self.prefix, path);

        let handler = if self.inline {
            self.top_handler();
            compose(&self.middleware, handler)
        } else {
            handler
        };

        debug!(method = %method, path = %full_path, layers = self.middleware.len(), "route registered");
        self.tree
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(&full_path, method, handler);
    }

    /// Every registered `(method, path)` pair, sorted by path then method.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner).routes()
    }

    // ── Middleware and derivation ────────────────────────────────────────────

    /// Appends middleware to this router.
    ///
    /// On the root router it applies to every request served from now on. On
    /// a derived router it applies to routes registered from now on.
    pub fn use_middleware(&mut self, layer: impl Middleware) -> &mut Self {
        self.middleware.push(Arc::new(layer));
        self
    }

    /// A derived router with `layer` appended to the inherited group
    /// middleware. Routes registered through it land in the same tree.
    ///
    /// ```rust
    /// # use trellis::{middleware::Trace, Request, Response, Router};
    /// # async fn admin(_: Request) -> Response { Response::text("") }
    /// let mut app = Router::new();
    /// app.with(Trace).handle_func("GET /admin", admin);
    /// ```
    pub fn with(&self, layer: impl Middleware) -> Router {
        let mut derived = self.derive(self.prefix.clone());
        derived.middleware.push(Arc::new(layer));
        derived
    }

    /// A derived router whose routes are registered under `prefix`.
    /// Prefixes concatenate: `with_prefix("/api").with_prefix("/v1")` mounts
    /// at `/api/v1`.
    pub fn with_prefix(&self, prefix: &str) -> Router {
        self.derive(format!("{}{prefix}", self.prefix))
    }

    /// Runs `f` against a derived router and returns it.
    pub fn group(&self, f: impl FnOnce(&mut Router)) -> Router {
        let mut derived = self.derive(self.prefix.clone());
        f(&mut derived);
        derived
    }

    /// [`Router::group`] under an extra path prefix.
    pub fn group_with_prefix(&self, prefix: &str, f: impl FnOnce(&mut Router)) -> Router {
        let mut derived = self.with_prefix(prefix);
        f(&mut derived);
        derived
    }

    fn derive(&self, prefix: String) -> Router {
        Router {
            tree: Arc::clone(&self.tree),
            middleware: if self.inline { self.middleware.clone() } else { Vec::new() },
            prefix,
            inline: true,
            top: OnceLock::new(),
            access_log: Arc::clone(&self.access_log),
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Routes one request and returns its response. Never fails: an unknown
    /// path yields `404 Not Found`, a known path with an unregistered method
    /// yields `405 Method Not Allowed` with an `allow` header.
    ///
    /// Emits one access-log line per call, after the response is complete.
    pub async fn serve(&self, req: Request) -> Response {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_owned();
        let remote = req.remote_addr();

        let response = self.entry_handler().call(req).await;

        let record = AccessRecord {
            status: response.status_code(),
            elapsed: start.elapsed(),
            remote,
            method,
            path,
        };
        self.access_log.log(&record.to_string());
        response
    }

    fn entry_handler(&self) -> BoxedHandler {
        if self.inline {
            self.top_handler()
        } else {
            compose(&self.middleware, self.dispatcher())
        }
    }

    fn top_handler(&self) -> BoxedHandler {
        Arc::clone(self.top.get_or_init(|| compose(&self.middleware, self.dispatcher())))
    }

    fn dispatcher(&self) -> BoxedHandler {
        Arc::new(Dispatcher { tree: Arc::clone(&self.tree) })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Innermost layer of every request: looks the route up and runs it.
struct Dispatcher {
    tree: Arc<RwLock<RouteTree>>,
}

impl ErasedHandler for Dispatcher {
    fn call(&self, req: Request) -> BoxFuture {
        // The guard is dropped at the end of this statement; handlers never
        // run under the lock.
        let found = self
            .tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .find(req.path(), req.method());

        match found {
            RouteInfo::Matched(handler) => handler.call(req),
            RouteInfo::NoRouteMatch => Box::pin(async { not_found() }),
            RouteInfo::MethodNotSupported { allowed } => {
                Box::pin(async move { method_not_allowed(&allowed) })
            }
        }
    }
}

fn not_found() -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .text("404 page not found")
}

fn method_not_allowed(allowed: &[Method]) -> Response {
    let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("allow", &allow)
        .text("method not allowed")
}

fn parse_pattern(pattern: &str) -> Result<(Method, &str), Error> {
    let invalid = |reason: &'static str| Error::InvalidPattern { pattern: pattern.to_owned(), reason };

    let (method, path) = pattern
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| invalid("expected `<METHOD> <path>`"))?;
    let path = path.trim_start();

    if method.bytes().any(|b| b.is_ascii_lowercase()) {
        return Err(invalid("method must be uppercase"));
    }
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| invalid("method is not a valid token"))?;

    if !path.starts_with('/') {
        return Err(invalid("path must start with `/`"));
    }
    if path.contains(char::is_whitespace) {
        return Err(invalid("path must not contain whitespace"));
    }
    Ok((method, path))
}
