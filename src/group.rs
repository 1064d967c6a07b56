//! Route groups: prefix + middleware scoping at registration time.
//!
//! A [`Group`] borrows the router mutably, so it exists only while routes
//! are being wired. Everything it registers lands in the router's own
//! table with the group prefix concatenated and the group middleware
//! prepended — at dispatch time there is no such thing as a group.

use std::path::PathBuf;

use crate::handler::{Handler, Middleware, fold};
use crate::method::Method;
use crate::router::{Route, Router};

/// A scoped registrar created by [`Router::group`].
///
/// ```rust
/// use ruta::{Context, Error, Router, Status};
///
/// async fn list_users(c: Context) -> Result<(), Error> {
///     c.string(Status::Ok, "users")
/// }
///
/// let mut app = Router::new();
/// let mut api = app.group("/api", &[]);
/// let mut v1 = api.group("/v1", &[]);
/// v1.get("/users", list_users); // registers GET /api/v1/users
/// ```
pub struct Group<'r> {
    prefix: String,
    middleware: Vec<Middleware>,
    router: &'r mut Router,
}

impl<'r> Group<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: &str, middleware: &[Middleware]) -> Self {
        Self {
            prefix: prefix.to_owned(),
            middleware: middleware.to_vec(),
            router,
        }
    }

    /// Adds middleware inherited by every route registered through this
    /// group from here on. Routes already added are unaffected.
    pub fn wrap(&mut self, middleware: Middleware) {
        self.middleware.push(middleware);
    }

    /// Registers a route under the group prefix, with the group
    /// middleware running before the route's own.
    pub fn add(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        middleware: &[Middleware],
    ) -> Route {
        let name = std::any::type_name_of_val(&handler);
        // Fold the route middleware first, then the group's, so the
        // group layers end up outermost.
        let chain = fold(handler.into_handler(), middleware);
        let chain = fold(chain, &self.middleware);
        self.router
            .add_chain(method, &format!("{}{}", self.prefix, path), chain, name)
    }

    /// `GET` route within the group.
    pub fn get(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Get, path, handler, &[])
    }

    /// `POST` route within the group.
    pub fn post(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Post, path, handler, &[])
    }

    /// `PUT` route within the group.
    pub fn put(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Put, path, handler, &[])
    }

    /// `DELETE` route within the group.
    pub fn delete(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Delete, path, handler, &[])
    }

    /// `HEAD` route within the group.
    pub fn head(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Head, path, handler, &[])
    }

    /// `OPTIONS` route within the group.
    pub fn options(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Options, path, handler, &[])
    }

    /// `PATCH` route within the group.
    pub fn patch(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Patch, path, handler, &[])
    }

    /// `CONNECT` route within the group.
    pub fn connect(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Connect, path, handler, &[])
    }

    /// `TRACE` route within the group.
    pub fn trace(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Trace, path, handler, &[])
    }

    /// `PROPFIND` route within the group.
    pub fn propfind(&mut self, path: &str, handler: impl Handler) -> Route {
        self.add(Method::Propfind, path, handler, &[])
    }

    /// Registers the handler for every method under the group prefix.
    pub fn any(
        &mut self,
        path: &str,
        handler: impl Handler,
        middleware: &[Middleware],
    ) -> Vec<Route> {
        let name = std::any::type_name_of_val(&handler);
        let chain = fold(handler.into_handler(), middleware);
        let chain = fold(chain, &self.middleware);
        Method::ALL
            .iter()
            .map(|m| {
                self.router.add_chain(
                    *m,
                    &format!("{}{}", self.prefix, path),
                    chain.clone(),
                    name,
                )
            })
            .collect()
    }

    /// A nested group: prefixes concatenate, middleware accumulates.
    pub fn group(&mut self, prefix: &str, middleware: &[Middleware]) -> Group<'_> {
        let mut inherited = self.middleware.clone();
        inherited.extend(middleware.iter().cloned());
        Group {
            prefix: format!("{}{}", self.prefix, prefix),
            middleware: inherited,
            router: &mut *self.router,
        }
    }

    /// Serves files under `root` at the group-prefixed `prefix`, with
    /// the group middleware applied.
    pub fn static_dir(&mut self, prefix: &str, root: impl Into<PathBuf>) -> Route {
        let serve = crate::router::serve_root(root.into());
        self.get(prefix, serve.clone());
        if prefix.ends_with('/') {
            self.get(&format!("{prefix}*"), serve)
        } else {
            self.get(&format!("{prefix}/*"), serve)
        }
    }

    /// Serves one file at the group-prefixed `path`, bypassing the group
    /// middleware.
    pub fn file(&mut self, path: &str, file: impl Into<PathBuf>) -> Route {
        self.router.file(&format!("{}{}", self.prefix, path), file)
    }
}
