//! URL path rewriting.

use std::sync::Arc;

use regex::Regex;

use crate::context::Context;
use crate::handler::{DynHandler, ErasedHandler, Middleware, handler, middleware};

/// Rewrites the request path from `(pattern, replacement)` rules before
/// anything else sees it. Register with [`Router::pre`](crate::Router::pre)
/// so the rewrite happens ahead of route matching.
///
/// `*` in a pattern captures greedily; captures are referenced in the
/// replacement as `$1`, `$2`, … The first matching rule wins.
///
/// ```rust
/// use ruta::{Router, middleware::rewrite};
///
/// let mut app = Router::new();
/// app.pre(rewrite(&[
///     ("/old", "/new"),
///     ("/js/*", "/public/javascripts/$1"),
///     ("/users/*/orders/*", "/user/$1/order/$2"),
/// ]));
/// ```
///
/// # Panics
///
/// Without rules, or with a rule that does not compile — rewrite rules
/// are wired at startup, so a bad one is fatal there, never at request
/// time.
pub fn rewrite(rules: &[(&str, &str)]) -> Middleware {
    if rules.is_empty() {
        panic!("rewrite middleware requires url path rewrite rules");
    }
    let compiled: Arc<Vec<(Regex, String)>> = Arc::new(
        rules
            .iter()
            .map(|(pattern, replacement)| {
                let anchored = format!("{}$", pattern.replace('*', "(.*)"));
                let re = Regex::new(&anchored)
                    .unwrap_or_else(|e| panic!("invalid rewrite rule `{pattern}`: {e}"));
                (re, (*replacement).to_owned())
            })
            .collect(),
    );

    middleware(move |next: DynHandler| {
        let compiled = compiled.clone();
        handler(move |c: Context| {
            let next = next.clone();
            let compiled = compiled.clone();
            async move {
                let path = c.path();
                for (re, replacement) in compiled.iter() {
                    if let Some(caps) = re.captures(&path) {
                        let mut rewritten = replacement.clone();
                        for i in (1..caps.len()).rev() {
                            if let Some(m) = caps.get(i) {
                                rewritten = rewritten.replace(&format!("${i}"), m.as_str());
                            }
                        }
                        c.set_path(rewritten);
                        break;
                    }
                }
                next.call(c.clone()).await
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::handler::fold;

    async fn record_path(c: Context) -> Result<(), Error> {
        c.set("seen", c.path());
        Ok(())
    }

    async fn run(rules: &[(&str, &str)], path: &str) -> String {
        let chain = fold(handler(record_path), &[rewrite(rules)]);
        let c = Context::detached();
        c.set_path(path);
        chain.call(c.clone()).await.unwrap();
        c.get_as::<String>("seen").unwrap().as_ref().clone()
    }

    #[tokio::test]
    async fn literal_rule_rewrites() {
        assert_eq!(run(&[("/old", "/new")], "/old").await, "/new");
    }

    #[tokio::test]
    async fn wildcard_captures_substitute() {
        assert_eq!(
            run(&[("/js/*", "/public/javascripts/$1")], "/js/main.js").await,
            "/public/javascripts/main.js"
        );
        assert_eq!(
            run(&[("/users/*/orders/*", "/user/$1/order/$2")], "/users/7/orders/9").await,
            "/user/7/order/9"
        );
    }

    #[tokio::test]
    async fn unmatched_paths_pass_through() {
        assert_eq!(run(&[("/old", "/new")], "/other").await, "/other");
    }

    #[test]
    #[should_panic(expected = "rewrite rules")]
    fn empty_rules_panic() {
        rewrite(&[]);
    }

    #[test]
    #[should_panic(expected = "invalid rewrite rule")]
    fn malformed_rule_panics() {
        rewrite(&[("/bad(", "/x")]);
    }
}
