//! Minimal trellis example: a public collection, an authenticated admin
//! group, and the default tracing access log.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/items
//!   curl -X POST http://localhost:3000/items -d '{"name":"widget"}'
//!   curl -X DELETE http://localhost:3000/items          # 405
//!   curl -X DELETE http://localhost:3000/admin/items    # 401
//!   curl -X DELETE -H 'authorization: Bearer t' http://localhost:3000/admin/items

use trellis::middleware::{self, Next};
use trellis::{Request, Response, Router, Server, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut app = Router::new();
    app.use_middleware(middleware::Trace);
    app.handle_func("GET /items", list_items)
        .handle_func("POST /items", create_item)
        .handle_func("GET /healthz", |_req: Request| async { "ok" });

    app.group_with_prefix("/admin", |admin| {
        admin.use_middleware(middleware::from_fn(require_token));
        admin.handle_func("DELETE /items", clear_items);
    });

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// Rejects requests without an authorization header before they reach the
// handler.
async fn require_token(req: Request, next: Next) -> Response {
    if req.header("authorization").is_none() {
        return Response::status(StatusCode::UNAUTHORIZED);
    }
    next.run(req).await
}

async fn list_items(_req: Request) -> Response {
    Response::json(br#"[{"id":"1","name":"widget"}]"#.to_vec())
}

// req.body() is &[u8]; parse it with whatever you like.
async fn create_item(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/items/2")
        .json(br#"{"id":"2"}"#.to_vec())
}

async fn clear_items(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}
