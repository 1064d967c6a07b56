//! Minimal ruta example — CRUD-style JSON endpoints, middleware, and
//! health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/todos/t1
//!   curl -X POST http://localhost:3000/todos \
//!        -H 'content-type: application/json' \
//!        -d '{"title":"write docs"}'
//!   curl -X DELETE http://localhost:3000/todos/t1
//!   curl http://localhost:3000/healthz

use ruta::middleware::request_id;
use ruta::{
    Context, DynHandler, Error, ErasedHandler, HttpError, Router, Server, Status, handler, health,
    middleware,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Deserialize, Serialize)]
struct Todo {
    #[serde(default)]
    id: String,
    title: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut app = Router::new();

    // Global middleware: one tracing line per request.
    app.wrap(middleware(|next: DynHandler| {
        handler(move |c: Context| {
            let next = next.clone();
            async move {
                let method = c.method();
                let path = c.path();
                let result = next.call(c.clone()).await;
                info!(%method, %path, committed = c.committed(), "handled");
                result
            }
        })
    }));
    app.wrap(request_id());

    app.get("/todos/:id", get_todo);
    app.post("/todos", create_todo);
    app.delete("/todos/:id", delete_todo);
    app.get("/healthz", health::liveness);
    app.get("/readyz", health::readiness);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /todos/:id
async fn get_todo(c: Context) -> Result<(), Error> {
    let id = c.param("id");
    if id != "t1" {
        return Err(HttpError::not_found().with_message("no such todo").into());
    }
    c.json(
        Status::Ok,
        &Todo {
            id,
            title: "write docs".to_owned(),
        },
    )
}

// POST /todos
async fn create_todo(c: Context) -> Result<(), Error> {
    let mut todo: Todo = c.bind()?;
    todo.id = "t2".to_owned();
    c.json(Status::Created, &todo)
}

// DELETE /todos/:id → 204 No Content
async fn delete_todo(c: Context) -> Result<(), Error> {
    c.no_content(Status::NoContent)
}
