//! # trellis
//!
//! An embeddable HTTP router: exact-match segment routing, composable
//! middleware, and route groups with scoped middleware and path prefixes.
//!
//! ## What it does
//!
//! - **Segment trie**: a route is its path split on `/`; lookup walks one
//!   node per segment. Unknown path → `404`, known path with the wrong
//!   method → `405` plus an `allow` header.
//! - **Middleware**: decorators over handlers, composed first-outermost.
//!   Root middleware wraps every request; group middleware is baked into the
//!   routes registered through the group.
//! - **Groups**: derived routers share the route tree and carry their own
//!   middleware and prefix.
//! - **Access log**: one `status | duration | remote | method | path` line
//!   per request to a sink you choose (default: `tracing`).
//!
//! What it does not do: path parameters, wildcards, regex routes, static
//! files, TLS.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trellis::{middleware, Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = Router::new();
//!     app.use_middleware(middleware::Trace);
//!     app.handle_func("GET /items", list_items);
//!     app.handle_func("POST /items", create_item);
//!
//!     app.group_with_prefix("/admin", |admin| {
//!         admin.handle_func("DELETE /items", clear_items);
//!     });
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn list_items(_req: Request) -> Response {
//!     Response::json(br#"[{"id":1}]"#.to_vec())
//! }
//!
//! async fn create_item(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/items/2")
//!         .json(br#"{"id":2}"#.to_vec())
//! }
//!
//! async fn clear_items(_req: Request) -> StatusCode {
//!     StatusCode::NO_CONTENT
//! }
//! ```

mod access_log;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod tree;

pub mod middleware;

pub use access_log::{AccessLog, TracingAccessLog};
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use tree::{RouteInfo, RouteTree};
