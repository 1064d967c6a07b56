//! HTTP method as a typed enum.
//!
//! Covers the RFC 9110 verbs the router dispatches on, plus `PROPFIND`
//! (RFC 4918) so WebDAV-style clients can share the same route table.
//!
//! Unknown method strings are rejected at the transport boundary with
//! `501 Not Implemented` before a request context is ever acquired.

use std::fmt;
use std::str::FromStr;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Propfind,
    Put,
    Trace,
}

impl Method {
    /// Every dispatchable method, in the order used by catch-all
    /// registration ([`Router::any`](crate::Router::any)).
    pub const ALL: [Method; 10] = [
        Method::Connect,
        Method::Delete,
        Method::Get,
        Method::Head,
        Method::Options,
        Method::Patch,
        Method::Post,
        Method::Propfind,
        Method::Put,
        Method::Trace,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect  => "CONNECT",
            Self::Delete   => "DELETE",
            Self::Get      => "GET",
            Self::Head     => "HEAD",
            Self::Options  => "OPTIONS",
            Self::Patch    => "PATCH",
            Self::Post     => "POST",
            Self::Propfind => "PROPFIND",
            Self::Put      => "PUT",
            Self::Trace    => "TRACE",
        }
    }

    // Index into the per-method match-tree array.
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT"  => Ok(Self::Connect),
            "DELETE"   => Ok(Self::Delete),
            "GET"      => Ok(Self::Get),
            "HEAD"     => Ok(Self::Head),
            "OPTIONS"  => Ok(Self::Options),
            "PATCH"    => Ok(Self::Patch),
            "POST"     => Ok(Self::Post),
            "PROPFIND" => Ok(Self::Propfind),
            "PUT"      => Ok(Self::Put),
            "TRACE"    => Ok(Self::Trace),
            _          => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
