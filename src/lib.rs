//! # ruta
//!
//! An embeddable HTTP router and middleware dispatch pipeline.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! ruta owns the part of an HTTP service that actually differs between
//! applications: which handler runs for a method + path, what wraps it,
//! and what happens when it fails. Everything a fronting proxy already
//! ships — TLS, rate limiting, slow-client protection, body-size limits —
//! ruta does not reimplement.
//!
//! What's inside:
//!
//! - **Radix-tree routing** — one compressed trie per HTTP method,
//!   O(path-length) lookup, `:name` parameters, trailing `*` wildcards.
//!   Static beats param beats wildcard, always. A path registered under a
//!   different method answers `405`, an unknown path `404`.
//! - **Middleware pipeline** — pre-routing, global, and route-level
//!   decorators composed around each handler, run exactly once per
//!   request.
//! - **Pooled request contexts** — per-request state is recycled and
//!   fully reset between requests, sized once for the largest parameter
//!   count in the route table.
//! - **Centralized error translation** — handlers return `Result`; one
//!   place turns failures into status + body, at most once per response.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use ruta::{Context, Error, HttpError, Router, Server, Status};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = Router::new();
//!     app.get("/todos/:id", get_todo);
//!     app.post("/todos", create_todo);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_todo(c: Context) -> Result<(), Error> {
//!     let id = c.param("id");
//!     if id.is_empty() {
//!         return Err(HttpError::bad_request().into());
//!     }
//!     c.json(Status::Ok, &serde_json::json!({ "id": id, "done": false }))
//! }
//!
//! async fn create_todo(c: Context) -> Result<(), Error> {
//!     let todo: serde_json::Value = c.bind()?;
//!     c.json(Status::Created, &todo)
//! }
//! ```
//!
//! ## Embedding without the server
//!
//! [`Router::dispatch`] is transport-free: hand it a [`Request`], get a
//! [`Response`] back. The bundled [`Server`] is one hyper-based consumer
//! of that entry point; tests are another.

mod context;
mod error;
mod files;
mod group;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;
mod tree;

pub mod health;
pub mod middleware;

pub use context::{Binder, Context, DefaultBinder, Renderer};
pub use error::{BoxError, Error, HttpError};
pub use group::Group;
pub use handler::{DynHandler, ErasedHandler, Handler, Middleware, handler, middleware};
pub use method::Method;
pub use request::Request;
pub use response::{
    MIME_FORM, MIME_HTML, MIME_JSON, MIME_OCTET_STREAM, MIME_TEXT, Response,
};
pub use router::{Route, Router};
pub use server::Server;
pub use status::Status;
