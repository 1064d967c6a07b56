//! Incoming HTTP request type.
//!
//! The path is kept exactly as it appeared on the wire: percent-encoded
//! octets are NOT decoded before matching, so an encoded `/` inside a
//! parameter segment stays inside that segment. Decoding parameter values
//! is the handler's job.

use std::str::FromStr;

use bytes::Bytes;

use crate::method::Method;

/// An incoming HTTP request, decoupled from any transport.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Request {
    /// Builds a request from a method and a request target (`/path?query`).
    ///
    /// This is the embedding surface: transports and tests construct a
    /// `Request` and hand it to [`Router::dispatch`](crate::Router::dispatch).
    pub fn new(
        method: Method,
        target: &str,
        headers: Vec<(String, String)>,
        body: impl Into<Bytes>,
    ) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        Self {
            method,
            path: path.to_owned(),
            query: query.to_owned(),
            headers,
            body: body.into(),
        }
    }

    /// A placeholder bound to pooled contexts between requests.
    pub(crate) fn empty() -> Self {
        Self::new(Method::Get, "/", Vec::new(), Bytes::new())
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The raw (still percent-encoded) path component.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, without the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parses `"GET /path?query"` — a convenience for tests and examples.
impl FromStr for Request {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (method, target) = s.split_once(' ').ok_or(())?;
        let method = method.parse::<Method>()?;
        Ok(Self::new(method, target, Vec::new(), Bytes::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_splits_into_path_and_query() {
        let req = Request::new(Method::Get, "/users/42?full=1", Vec::new(), Bytes::new());
        assert_eq!(req.path(), "/users/42");
        assert_eq!(req.query(), "full=1");
    }

    #[test]
    fn encoded_path_is_preserved() {
        let req = Request::new(Method::Get, "/files/a%2Fb", Vec::new(), Bytes::new());
        assert_eq!(req.path(), "/files/a%2Fb");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = Request::new(
            Method::Post,
            "/",
            vec![("Content-Type".to_owned(), "application/json".to_owned())],
            Bytes::new(),
        );
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn from_str_parses_method_and_target() {
        let req: Request = "DELETE /todos/9".parse().unwrap();
        assert_eq!(req.method(), Method::Delete);
        assert_eq!(req.path(), "/todos/9");
    }
}
