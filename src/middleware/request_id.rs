//! `x-request-id` propagation.

use rand::Rng;

use crate::context::Context;
use crate::handler::{DynHandler, ErasedHandler, Middleware, handler, middleware};

/// The header read from the request and set on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Echoes the inbound `x-request-id` onto the response, generating a
/// fresh 32-character alphanumeric id when the client sent none.
pub fn request_id() -> Middleware {
    middleware(|next: DynHandler| {
        handler(move |c: Context| {
            let next = next.clone();
            async move {
                let rid = c
                    .header(REQUEST_ID_HEADER)
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(generate);
                c.set_header(REQUEST_ID_HEADER, rid);
                next.call(c.clone()).await
            }
        })
    })
}

fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
