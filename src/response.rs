//! Outgoing HTTP response type.
//!
//! Handlers do not build a `Response` directly — they write through the
//! [`Context`](crate::Context) surface, which commits at most once. The
//! finished value is what [`Router::dispatch`](crate::Router::dispatch)
//! returns to the transport layer.

use bytes::Bytes;
use http_body_util::Full;
use tracing::error;

use crate::status::Status;

// ── MIME types ────────────────────────────────────────────────────────────────

pub const MIME_JSON: &str = "application/json";
pub const MIME_HTML: &str = "text/html; charset=utf-8";
pub const MIME_TEXT: &str = "text/plain; charset=utf-8";
pub const MIME_FORM: &str = "application/x-www-form-urlencoded";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

// ── Response ─────────────────────────────────────────────────────────────────

/// A finished HTTP response: status, headers, and a fully buffered body.
#[derive(Debug)]
pub struct Response {
    pub(crate) status: Status,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Response {
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Converts into the wire type hyper serves. HEAD body suppression is
    /// handled by hyper itself, which knows the request method.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status.code());
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        match builder.body(Full::new(self.body)) {
            Ok(res) => res,
            Err(e) => {
                error!("invalid response headers: {e}");
                http::Response::builder()
                    .status(Status::InternalServerError.code())
                    .body(Full::new(Bytes::new()))
                    .expect("bare 500 response is always valid")
            }
        }
    }
}

/// An uncommitted response: `200 OK`, no headers, empty body.
impl Default for Response {
    fn default() -> Self {
        Self {
            status: Status::Ok,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty_ok() {
        let res = Response::default();
        assert_eq!(res.status(), Status::Ok);
        assert!(res.headers().is_empty());
        assert!(res.body().is_empty());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let res = Response {
            status: Status::Ok,
            headers: vec![("Content-Type".to_owned(), MIME_JSON.to_owned())],
            body: Bytes::new(),
        };
        assert_eq!(res.header("content-type"), Some(MIME_JSON));
    }

    #[test]
    fn into_http_carries_status_and_headers() {
        let res = Response {
            status: Status::Created,
            headers: vec![("location".to_owned(), "/users/7".to_owned())],
            body: Bytes::from_static(b"{}"),
        };
        let http = res.into_http();
        assert_eq!(http.status(), http::StatusCode::CREATED);
        assert_eq!(http.headers()["location"], "/users/7");
    }
}
