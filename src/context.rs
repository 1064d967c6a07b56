//! Request-scoped state: the [`Context`] handle and its reuse pool.
//!
//! One `Context` exists per in-flight request. The handle itself is a cheap
//! `Arc` clone so handler futures and middleware can own it; all mutable
//! state sits behind a single mutex. After the response is written the
//! dispatcher releases the context back to a pool, where it is fully reset
//! before the next request can observe it.

use std::any::Any;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, HttpError};
use crate::files;
use crate::handler::DynHandler;
use crate::method::Method;
use crate::request::Request;
use crate::response::{MIME_FORM, MIME_HTML, MIME_JSON, MIME_TEXT, Response};
use crate::router;
use crate::status::Status;

// ── Collaborator interfaces ───────────────────────────────────────────────────

/// Populates a loosely typed value from the inbound request.
///
/// The default implementation reads JSON and form bodies, and query strings
/// for bodyless methods. [`Context::bind`] deserializes the produced value
/// into the caller's type.
pub trait Binder: Send + Sync {
    fn bind(&self, c: &Context) -> Result<Value, Error>;
}

/// Produces a response body from a template name and data. Registered on
/// the router; [`Context::render`] fails without one.
pub trait Renderer: Send + Sync {
    fn render(&self, name: &str, data: &Value, c: &Context) -> Result<Vec<u8>, Error>;
}

/// The built-in [`Binder`]: query parameters for GET/HEAD/DELETE, JSON or
/// form bodies by content type otherwise.
pub struct DefaultBinder;

impl Binder for DefaultBinder {
    fn bind(&self, c: &Context) -> Result<Value, Error> {
        match c.method() {
            Method::Get | Method::Head | Method::Delete => form_value(&c.query()),
            _ => {
                let content_type = c.header("content-type").unwrap_or_default();
                if content_type.starts_with(MIME_JSON) {
                    serde_json::from_slice(&c.body())
                        .map_err(|e| HttpError::bad_request().wrap(e).into())
                } else if content_type.starts_with(MIME_FORM) {
                    let body = c.body();
                    let text = std::str::from_utf8(&body)
                        .map_err(|e| Error::from(HttpError::bad_request().wrap(e)))?;
                    form_value(text)
                } else {
                    Err(HttpError::unsupported_media_type().into())
                }
            }
        }
    }
}

fn form_value(encoded: &str) -> Result<Value, Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(encoded)
        .map_err(|e| Error::from(HttpError::bad_request().wrap(e)))?;
    Ok(Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    ))
}

// ── Context ───────────────────────────────────────────────────────────────────

pub(crate) struct ContextState {
    pub(crate) request: Request,
    pub(crate) response: Response,
    pub(crate) committed: bool,
    pub(crate) params: Vec<(Arc<str>, String)>,
    pub(crate) handler: DynHandler,
    store: HashMap<String, Arc<dyn Any + Send + Sync>>,
    binder: Arc<dyn Binder>,
    renderer: Option<Arc<dyn Renderer>>,
}

/// The per-request context handed to handlers and middleware.
///
/// Cloning is cheap (one atomic increment) — middleware clones the handle
/// into the futures it builds. The context is owned by exactly one request
/// at a time; holding a clone past the end of the request is safe but
/// useless, as the state is reset for the next request.
#[derive(Clone)]
pub struct Context {
    pub(crate) state: Arc<Mutex<ContextState>>,
}

impl Context {
    pub(crate) fn empty() -> Self {
        Self {
            state: Arc::new(Mutex::new(ContextState {
                request: Request::empty(),
                response: Response::default(),
                committed: false,
                params: Vec::new(),
                handler: router::not_found_chain(),
                store: HashMap::new(),
                binder: Arc::new(DefaultBinder),
                renderer: None,
            })),
        }
    }

    /// A standalone context for exercising handlers outside a router.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self::empty()
    }

    /// Rebinds the context to a new request, wiping every trace of the
    /// previous one. Parameter storage keeps its allocation, pre-sized to
    /// the largest parameter count any registered route can capture.
    pub(crate) fn reset(
        &self,
        request: Request,
        max_params: usize,
        binder: Arc<dyn Binder>,
        renderer: Option<Arc<dyn Renderer>>,
    ) {
        let mut s = self.state.lock();
        s.request = request;
        s.response = Response::default();
        s.committed = false;
        s.params.clear();
        if s.params.capacity() < max_params {
            s.params.reserve_exact(max_params);
        }
        s.store.clear();
        s.handler = router::not_found_chain();
        s.binder = binder;
        s.renderer = renderer;
    }

    pub(crate) fn take_response(&self) -> Response {
        std::mem::take(&mut self.state.lock().response)
    }

    pub(crate) fn is_unique(&self) -> bool {
        Arc::strong_count(&self.state) == 1
    }

    // ── Request readers ───────────────────────────────────────────────────────

    pub fn method(&self) -> Method {
        self.state.lock().request.method
    }

    /// The raw (still percent-encoded) request path.
    pub fn path(&self) -> String {
        self.state.lock().request.path.clone()
    }

    pub fn query(&self) -> String {
        self.state.lock().request.query.clone()
    }

    /// A snapshot of all request headers.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.state.lock().request.headers.clone()
    }

    /// Case-insensitive request header lookup.
    pub fn header(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .request
            .header(name)
            .map(str::to_owned)
    }

    /// The request body. `Bytes` clones are reference-counted, not copied.
    pub fn body(&self) -> Bytes {
        self.state.lock().request.body.clone()
    }

    /// A captured path parameter, or the empty string when absent. Absent
    /// and present-but-empty are indistinguishable here. Values may still
    /// be percent-encoded; decoding is the caller's concern.
    pub fn param(&self, name: &str) -> String {
        self.state
            .lock()
            .params
            .iter()
            .find(|(k, _)| &**k == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    /// Deserializes the request payload through the registered [`Binder`].
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let binder = self.state.lock().binder.clone();
        let value = binder.bind(self)?;
        serde_json::from_value(value).map_err(|e| HttpError::bad_request().wrap(e).into())
    }

    // ── Pre-routing rewriters ─────────────────────────────────────────────────

    /// Rewrites the request path. Only observable by route matching when
    /// called from pre-middleware, which runs before the lookup.
    pub fn set_path(&self, path: impl Into<String>) {
        self.state.lock().request.path = path.into();
    }

    pub fn set_method(&self, method: Method) {
        self.state.lock().request.method = method;
    }

    // ── Per-request store ─────────────────────────────────────────────────────

    /// Saves a value for later pipeline stages (middleware → handler).
    pub fn set(&self, key: impl Into<String>, value: impl Any + Send + Sync) {
        self.state.lock().store.insert(key.into(), Arc::new(value));
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.state.lock().store.get(key).cloned()
    }

    /// Typed store lookup; `None` when the key is missing or the type does
    /// not match.
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key).and_then(|v| v.downcast::<T>().ok())
    }

    // ── Resolved handler ──────────────────────────────────────────────────────

    pub fn handler(&self) -> DynHandler {
        self.state.lock().handler.clone()
    }

    pub fn set_handler(&self, handler: DynHandler) {
        self.state.lock().handler = handler;
    }

    // ── Response writers ──────────────────────────────────────────────────────

    /// Whether a response has been committed. Committed responses are
    /// final: the error translator will only log, never overwrite.
    pub fn committed(&self) -> bool {
        self.state.lock().committed
    }

    /// Adds a response header. Ignored once the response is committed.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut s = self.state.lock();
        if s.committed {
            return;
        }
        s.response.headers.push((name.into(), value.into()));
    }

    /// `text/plain` response.
    pub fn string(&self, status: Status, body: impl Into<String>) -> Result<(), Error> {
        self.commit(status, Some(MIME_TEXT), body.into().into())
    }

    /// `text/html` response.
    pub fn html(&self, status: Status, body: impl Into<String>) -> Result<(), Error> {
        self.commit(status, Some(MIME_HTML), body.into().into())
    }

    /// JSON response serialized from any `Serialize` value.
    pub fn json<T: Serialize>(&self, status: Status, value: &T) -> Result<(), Error> {
        let body = serde_json::to_vec(value)?;
        self.commit(status, Some(MIME_JSON), body.into())
    }

    /// Response with an explicit content type and raw bytes.
    pub fn blob(
        &self,
        status: Status,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<(), Error> {
        self.commit(status, Some(content_type), body.into())
    }

    /// Body-less response.
    pub fn no_content(&self, status: Status) -> Result<(), Error> {
        self.commit(status, None, Bytes::new())
    }

    /// Redirect response; `status` must be in the 3xx range.
    pub fn redirect(&self, status: Status, location: &str) -> Result<(), Error> {
        if !status.is_redirect() {
            return Err(Error::other("invalid redirect status code"));
        }
        self.set_header("location", location);
        self.commit(status, None, Bytes::new())
    }

    /// Serves the file at `path`; directories fall back to their
    /// `index.html`. Missing files surface as 404.
    ///
    /// Callers passing request-derived paths must sanitize them first —
    /// [`Router::static_dir`](crate::Router::static_dir) does.
    pub async fn file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let mut path = path.as_ref().to_path_buf();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => path.push("index.html"),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(HttpError::not_found().wrap(e).into());
            }
            Err(e) => return Err(e.into()),
        }
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(HttpError::not_found().wrap(e).into());
            }
            Err(e) => return Err(e.into()),
        };
        self.blob(Status::Ok, files::content_type_for(&path), body)
    }

    /// Renders through the registered [`Renderer`] as `text/html`.
    pub fn render(&self, status: Status, name: &str, data: &Value) -> Result<(), Error> {
        let renderer = self
            .state
            .lock()
            .renderer
            .clone()
            .ok_or_else(|| Error::other("renderer not registered"))?;
        let body = renderer.render(name, data, self)?;
        self.blob(status, MIME_HTML, body)
    }

    fn commit(
        &self,
        status: Status,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<(), Error> {
        let mut s = self.state.lock();
        if s.committed {
            return Err(Error::other("response already committed"));
        }
        s.committed = true;
        s.response.status = status;
        if let Some(ct) = content_type {
            s.response
                .headers
                .push(("content-type".to_owned(), ct.to_owned()));
        }
        s.response.body = body;
        Ok(())
    }
}

// ── Pool ──────────────────────────────────────────────────────────────────────

/// Concurrency-safe free list of contexts.
///
/// Contexts are only re-pooled when their handle is uniquely held, so a
/// clone leaked from a finished request can never alias a live one.
pub(crate) struct ContextPool {
    free: Mutex<Vec<Context>>,
}

impl ContextPool {
    pub(crate) fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn acquire(&self) -> Context {
        self.free.lock().pop().unwrap_or_else(Context::empty)
    }

    pub(crate) fn release(&self, c: Context) {
        if c.is_unique() {
            self.free.lock().push(c);
        }
    }
}
