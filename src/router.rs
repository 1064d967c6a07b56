//! The router: route table, registration API, and the per-request
//! dispatch pipeline.
//!
//! Registration happens through `&mut Router`, serving through
//! `Arc<Router>` — the borrow checker enforces what the design requires:
//! the match trees are never mutated while requests are in flight. Build
//! the router at startup, wrap it in an `Arc`, then dispatch.
//!
//! Per request the pipeline runs: context acquisition from the pool →
//! pre-routing middleware → tree lookup → global middleware → route
//! middleware (folded in at registration) → handler → error translation →
//! context release. A request that matches no route still flows through
//! the same pipeline, bound to a built-in 404 or 405 terminal handler.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use tracing::error;

use crate::context::{Binder, Context, ContextPool, DefaultBinder, Renderer};
use crate::error::{Error, HttpError};
use crate::files;
use crate::group::Group;
use crate::handler::{DynHandler, ErasedHandler, Handler, Middleware, fold};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::tree::Tree;

// ── Built-in terminal handlers ────────────────────────────────────────────────

/// Bound when lookup finds no node for the path, for any method.
async fn not_found(_c: Context) -> Result<(), Error> {
    Err(HttpError::not_found().into())
}

/// Bound when the path exists under a different method.
async fn method_not_allowed(_c: Context) -> Result<(), Error> {
    Err(HttpError::method_not_allowed().into())
}

static NOT_FOUND: LazyLock<DynHandler> = LazyLock::new(|| crate::handler::handler(not_found));
static METHOD_NOT_ALLOWED: LazyLock<DynHandler> =
    LazyLock::new(|| crate::handler::handler(method_not_allowed));

pub(crate) fn not_found_chain() -> DynHandler {
    NOT_FOUND.clone()
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// Descriptor for one registered endpoint.
///
/// `name` defaults to the handler's type name and feeds
/// [`Router::reverse`] / [`Router::uri`].
#[derive(Clone, Debug)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub name: String,
}

// ── Router ────────────────────────────────────────────────────────────────────

/// The application router and dispatcher.
///
/// ```rust
/// use ruta::{Context, Error, Method, Request, Router, Status};
///
/// # #[tokio::main] async fn main() {
/// async fn get_todo(c: Context) -> Result<(), Error> {
///     c.string(Status::Ok, format!("todo {}", c.param("id")))
/// }
///
/// let mut app = Router::new();
/// app.get("/todos/:id", get_todo);
///
/// let app = std::sync::Arc::new(app);
/// let res = app.dispatch("GET /todos/t2".parse().unwrap()).await;
/// assert_eq!(res.status(), Status::Ok);
/// # }
/// ```
pub struct Router {
    trees: [Tree; Method::ALL.len()],
    routes: Vec<Route>,
    pre: Vec<Middleware>,
    middleware: Vec<Middleware>,
    max_params: usize,
    pool: ContextPool,
    binder: Arc<dyn Binder>,
    renderer: Option<Arc<dyn Renderer>>,
    debug: bool,
}

impl Router {
    pub fn new() -> Self {
        Self {
            trees: std::array::from_fn(|_| Tree::new()),
            routes: Vec::new(),
            pre: Vec::new(),
            middleware: Vec::new(),
            max_params: 0,
            pool: ContextPool::new(),
            binder: Arc::new(DefaultBinder),
            renderer: None,
            debug: false,
        }
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    /// In debug mode untyped failures expose their text in the 500 body
    /// instead of the generic reason phrase.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Replaces the [`Binder`] used by [`Context::bind`].
    pub fn set_binder(&mut self, binder: impl Binder + 'static) {
        self.binder = Arc::new(binder);
    }

    /// Registers the [`Renderer`] used by [`Context::render`].
    pub fn set_renderer(&mut self, renderer: impl Renderer + 'static) {
        self.renderer = Some(Arc::new(renderer));
    }

    // ── Middleware ────────────────────────────────────────────────────────────

    /// Adds middleware that runs *before* route resolution — it may
    /// rewrite the request path or method and change what matches.
    pub fn pre(&mut self, middleware: Middleware) {
        self.pre.push(middleware);
    }

    /// Adds middleware that wraps every matched handler, after routing.
    pub fn wrap(&mut self, middleware: Middleware) {
        self.middleware.push(middleware);
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Registers a handler for a method + path pattern with optional
    /// route-level middleware, which is folded into the handler chain
    /// right here — mutating the slice afterwards cannot affect the route.
    ///
    /// Patterns use `:name` parameter segments and at most one trailing
    /// `*` wildcard. Registering the same method + path again replaces
    /// the previous handler.
    ///
    /// # Panics
    ///
    /// On malformed patterns; see [`Router::get`] for the pattern rules.
    /// Routes are wired at startup, so pattern mistakes are fatal there.
    pub fn add(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        middleware: &[Middleware],
    ) -> Route {
        let name = std::any::type_name_of_val(&handler);
        let chain = fold(handler.into_handler(), middleware);
        self.add_chain(method, path, chain, name)
    }

    /// `GET` route. Parameters use `:name` syntax — `c.param("name")`
    /// retrieves them:
    ///
    /// ```rust
    /// # use ruta::{Context, Error, Response, Router, Status};
    /// # async fn get_user(c: Context) -> Result<(), Error> { Ok(()) }
    /// # async fn create_user(c: Context) -> Result<(), Error> { Ok(()) }
    /// let mut app = Router::new();
    /// app.get("/users/:id", get_user);
    /// app.post("/users", create_user);
    /// ```
    pub fn get(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Get, path, handler, &[])
    }

    /// `POST` route.
    pub fn post(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Post, path, handler, &[])
    }

    /// `PUT` route.
    pub fn put(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Put, path, handler, &[])
    }

    /// `DELETE` route.
    pub fn delete(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Delete, path, handler, &[])
    }

    /// `HEAD` route.
    pub fn head(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Head, path, handler, &[])
    }

    /// `OPTIONS` route.
    pub fn options(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Options, path, handler, &[])
    }

    /// `PATCH` route.
    pub fn patch(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Patch, path, handler, &[])
    }

    /// `CONNECT` route.
    pub fn connect(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Connect, path, handler, &[])
    }

    /// `TRACE` route.
    pub fn trace(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Trace, path, handler, &[])
    }

    /// `PROPFIND` route.
    pub fn propfind(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Propfind, path, handler, &[])
    }

    /// Registers the handler for every method at once.
    pub fn any(
        &mut self,
        path: &str,
        handler: impl Handler,
        middleware: &[Middleware],
    ) -> Vec<Route> {
        let name = std::any::type_name_of_val(&handler);
        let chain = fold(handler.into_handler(), middleware);
        Method::ALL
            .iter()
            .map(|m| self.add_chain(*m, path, chain.clone(), name))
            .collect()
    }

    /// Registers the handler for the given subset of methods.
    pub fn match_methods(
        &mut self,
        methods: &[Method],
        path: &str,
        handler: impl Handler,
        middleware: &[Middleware],
    ) -> Vec<Route> {
        let name = std::any::type_name_of_val(&handler);
        let chain = fold(handler.into_handler(), middleware);
        methods
            .iter()
            .map(|m| self.add_chain(*m, path, chain.clone(), name))
            .collect()
    }

    /// Serves files under `root` at `prefix`. The wildcard capture is
    /// percent-decoded and path-cleaned; anything escaping `root` is a
    /// 404. Directory requests fall back to their `index.html`.
    pub fn static_dir(&mut self, prefix: &str, root: impl Into<PathBuf>) -> Route {
        let serve = serve_root(root.into());
        self.get(prefix, serve.clone());
        if prefix == "/" {
            self.get("/*", serve)
        } else {
            self.get(&format!("{prefix}/*"), serve)
        }
    }

    /// Serves one file at `path`.
    pub fn file(&mut self, path: &str, file: impl Into<PathBuf>) -> Route {
        let file: PathBuf = file.into();
        self.get(path, move |c: Context| {
            let file = file.clone();
            async move { c.file(file).await }
        })
    }

    /// A registration scope that prepends `prefix` and the given
    /// middleware to every route added through it. Purely a
    /// registration-time convenience — no trace of the group remains at
    /// dispatch time.
    pub fn group(&mut self, prefix: &str, middleware: &[Middleware]) -> Group<'_> {
        Group::new(self, prefix, middleware)
    }

    pub(crate) fn add_chain(
        &mut self,
        method: Method,
        path: &str,
        chain: DynHandler,
        name: &str,
    ) -> Route {
        let path = normalize(path);
        let count = self.trees[method.index()].insert(&path, chain);
        self.max_params = self.max_params.max(count);
        let route = Route {
            method,
            path,
            name: name.to_owned(),
        };
        match self
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.path == route.path)
        {
            Some(existing) => *existing = route.clone(),
            None => self.routes.push(route.clone()),
        }
        route
    }

    // ── Introspection ─────────────────────────────────────────────────────────

    /// The registered routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Builds a URL from a route name, substituting `:param` segments
    /// left to right. Unknown names produce an empty string; missing
    /// parameters leave their segments untouched.
    pub fn reverse(&self, name: &str, params: &[&str]) -> String {
        let Some(route) = self.routes.iter().find(|r| r.name == name) else {
            return String::new();
        };
        let bytes = route.path.as_bytes();
        let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
        let mut n = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b':' && n < params.len() {
                out.extend_from_slice(params[n].as_bytes());
                n += 1;
                while i < bytes.len() && bytes[i] != b'/' {
                    i += 1;
                }
            }
            if i < bytes.len() {
                out.push(bytes[i]);
            }
            i += 1;
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// [`reverse`](Router::reverse) keyed by handler identity: pass the
    /// same function you registered.
    pub fn uri(&self, handler: &impl Handler, params: &[&str]) -> String {
        self.reverse(std::any::type_name_of_val(handler), params)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Runs one request through the full pipeline and returns the
    /// finished response. This is the transport-free entry point:
    /// [`Server`](crate::Server) calls it per hyper request, tests call
    /// it directly.
    pub async fn dispatch(self: Arc<Self>, request: Request) -> Response {
        // Acquire. The pooled context is fully reset before it can
        // observe the new request.
        let c = self.pool.acquire();
        c.reset(
            request,
            self.max_params,
            self.binder.clone(),
            self.renderer.clone(),
        );

        // Routing and the routed chain are themselves a handler, so
        // pre-middleware can rewrite the request before matching.
        let routed = {
            let router = Arc::clone(&self);
            crate::handler::handler(move |c: Context| {
                let router = router.clone();
                async move {
                    router.route(&c);
                    let chain = fold(c.handler(), &router.middleware);
                    chain.call(c.clone()).await
                }
            })
        };
        let pipeline = fold(routed, &self.pre);

        if let Err(err) = pipeline.call(c.clone()).await {
            self.translate(err, &c);
        }

        // Release.
        let response = c.take_response();
        self.pool.release(c);
        response
    }

    /// Resolves the context's current method + path against the match
    /// trees and binds the resulting handler and parameters.
    fn route(&self, c: &Context) {
        let mut guard = c.state.lock();
        let state = &mut *guard;
        let method = state.request.method;
        state.params.clear();
        match self.trees[method.index()].lookup(&state.request.path, &mut state.params) {
            Some(chain) => state.handler = chain.clone(),
            None => {
                state.params.clear();
                state.handler = if self.allowed_elsewhere(method, &state.request.path) {
                    METHOD_NOT_ALLOWED.clone()
                } else {
                    NOT_FOUND.clone()
                };
            }
        }
    }

    /// True when some *other* method's tree has a terminal for this path —
    /// the 405-not-404 distinction.
    fn allowed_elsewhere(&self, method: Method, path: &str) -> bool {
        let mut scratch = Vec::new();
        Method::ALL.iter().any(|m| {
            *m != method && {
                scratch.clear();
                self.trees[m.index()].lookup(path, &mut scratch).is_some()
            }
        })
    }

    /// The single place a pipeline failure becomes bytes. Writes at most
    /// once: if the handler already committed a response, the failure is
    /// only logged.
    fn translate(&self, err: Error, c: &Context) {
        if c.committed() {
            error!("request failed after the response was committed: {err}");
            return;
        }
        let (status, message) = match &err {
            Error::Http(he) => (he.status(), he.message().to_owned()),
            Error::Internal(cause) => {
                let message = if self.debug {
                    cause.to_string()
                } else {
                    Status::InternalServerError.reason().to_owned()
                };
                (Status::InternalServerError, message)
            }
        };
        let written = if c.method() == Method::Head {
            c.no_content(status)
        } else {
            c.json(status, &serde_json::json!({ "message": message }))
        };
        if let Err(write_err) = written {
            error!("failed to write error response: {write_err}");
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the file-serving handler shared by [`Router::static_dir`] and
/// [`Group::static_dir`]: sanitize the wildcard capture, then delegate to
/// [`Context::file`].
pub(crate) fn serve_root(root: PathBuf) -> impl Handler + Clone {
    // An empty root would mean the filesystem root; restrict to CWD.
    let root = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root
    };
    move |c: Context| {
        let root = root.clone();
        async move {
            let capture = c.param("*");
            let Some(rel) = files::sanitize(&capture) else {
                return Err(HttpError::not_found().into());
            };
            c.file(root.join(rel)).await
        }
    }
}

fn normalize(path: &str) -> String {
    if path.is_empty() {
        "/".to_owned()
    } else if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn stub(_c: Context) -> Result<(), Error> {
        Ok(())
    }

    async fn other_stub(_c: Context) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn paths_are_normalized_to_leading_slash() {
        let mut app = Router::new();
        let route = app.get("healthz", stub);
        assert_eq!(route.path, "/healthz");
        let route = app.get("", stub);
        assert_eq!(route.path, "/");
    }

    #[test]
    fn duplicate_registration_replaces_table_entry() {
        let mut app = Router::new();
        app.get("/x", stub);
        app.get("/x", other_stub);
        assert_eq!(app.routes().len(), 1);
        assert!(app.routes()[0].name.contains("other_stub"));
    }

    #[test]
    fn any_registers_every_method() {
        let mut app = Router::new();
        let routes = app.any("/ping", stub, &[]);
        assert_eq!(routes.len(), Method::ALL.len());
        assert_eq!(app.routes().len(), Method::ALL.len());
    }

    #[test]
    fn reverse_substitutes_params_left_to_right() {
        let mut app = Router::new();
        app.get("/static/file", stub);
        app.get("/users/:id", other_stub);

        let name = std::any::type_name_of_val(&other_stub);
        assert_eq!(app.reverse(name, &[]), "/users/:id");
        assert_eq!(app.reverse(name, &["1"]), "/users/1");
        assert_eq!(app.uri(&stub, &[]), "/static/file");
        assert_eq!(app.reverse("no-such-route", &["1"]), "");
    }

    #[test]
    fn reverse_leaves_missing_params_in_place() {
        let mut app = Router::new();
        app.get("/users/:uid/files/:fid", stub);
        let name = std::any::type_name_of_val(&stub);
        assert_eq!(app.reverse(name, &["1"]), "/users/1/files/:fid");
        assert_eq!(app.reverse(name, &["1", "2"]), "/users/1/files/2");
    }
}
