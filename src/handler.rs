//! Handler trait, type erasure, and middleware composition.
//!
//! # How async handlers are stored
//!
//! The match tree needs to hold handlers of *different* concrete types in
//! one structure. Rust collections can only hold one type, so handlers are
//! stored as **trait objects** (`dyn ErasedHandler`) behind a common
//! interface.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn hello(c: Context) -> Result<(), Error> { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_handler()                                    ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                              ← heap-allocated wrapper
//!        ↓  stored as DynHandler = Arc<dyn ErasedHandler>
//! handler.call(c)  at request time                        ← one vtable dispatch
//! ```
//!
//! The only runtime cost per request is one Arc clone (atomic inc) and one
//! virtual call.
//!
//! # Middleware
//!
//! A [`Middleware`] is a decorator: a function from one [`DynHandler`] to
//! another. Chains are built by folding a middleware slice over a terminal
//! handler, so the first middleware in the slice runs outermost.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future for one handler invocation.
///
/// `Pin<Box<…>>` because the runtime polls the future in place; `Send +
/// 'static` so tokio may move it across worker threads. The future owns its
/// [`Context`] handle, which is why it needs no borrowed lifetime.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'static>>;

/// The erased dispatch interface behind [`DynHandler`].
///
/// Middleware decorators invoke the wrapped handler through it:
/// `next.call(c.clone()).await`. Implemented only by the blanket
/// [`Handler`] machinery — never by hand.
pub trait ErasedHandler {
    fn call(&self, c: Context) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
///
/// `Arc` gives cheap, thread-safe shared ownership: the tree keeps one copy,
/// every in-flight request bumps a reference count.
pub type DynHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(c: Context) -> Result<(), Error>
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it, which keeps the API surface stable.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_handler(self) -> DynHandler;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Handler` on their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut> private::Sealed for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_handler(self) -> DynHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype holding a concrete handler `F`, bridging the typed world to the
/// trait-object world.
struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn call(&self, c: Context) -> BoxFuture {
        Box::pin((self.0)(c))
    }
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// A middleware: a decorator from one handler to another.
///
/// Middleware can run logic before and after the wrapped handler, and can
/// short-circuit by returning an error or by committing a response and
/// returning `Ok(())` without calling `next`.
///
/// ```rust
/// use ruta::{Context, DynHandler, ErasedHandler, Middleware, handler, middleware};
///
/// let tag: Middleware = middleware(|next: DynHandler| {
///     handler(move |c: Context| {
///         let next = next.clone();
///         async move {
///             c.set("tagged", true);
///             next.call(c.clone()).await
///         }
///     })
/// });
/// ```
pub type Middleware = Arc<dyn Fn(DynHandler) -> DynHandler + Send + Sync + 'static>;

/// Builds a [`Middleware`] from a decorator closure.
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(DynHandler) -> DynHandler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Erases a handler. Mostly useful inside middleware decorators to wrap
/// `next` in a new handler.
pub fn handler<H: Handler>(h: H) -> DynHandler {
    h.into_handler()
}

/// Folds `middleware` around `terminal`, innermost-last: the first element
/// of the slice becomes the outermost layer at execution time.
pub(crate) fn fold(terminal: DynHandler, middleware: &[Middleware]) -> DynHandler {
    middleware
        .iter()
        .rev()
        .fold(terminal, |inner, m| m.as_ref()(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    async fn ok(_c: Context) -> Result<(), Error> {
        Ok(())
    }

    fn tracer(tag: &'static str) -> Middleware {
        middleware(move |next: DynHandler| {
            handler(move |c: Context| {
                let next = next.clone();
                async move {
                    c.set(tag, true);
                    next.call(c.clone()).await
                }
            })
        })
    }

    #[tokio::test]
    async fn fold_applies_first_middleware_outermost() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let record = |tag: &'static str, order: Arc<parking_lot::Mutex<Vec<&'static str>>>| {
            middleware(move |next: DynHandler| {
                let order = order.clone();
                handler(move |c: Context| {
                    let next = next.clone();
                    let order = order.clone();
                    async move {
                        order.lock().push(tag);
                        next.call(c.clone()).await
                    }
                })
            })
        };

        let chain = fold(
            handler(ok),
            &[record("outer", order.clone()), record("inner", order.clone())],
        );
        chain.call(Context::detached()).await.unwrap();
        assert_eq!(*order.lock(), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn middleware_can_share_state_with_handler() {
        async fn assert_tagged(c: Context) -> Result<(), Error> {
            assert!(c.get_as::<bool>("traced").is_some());
            Ok(())
        }

        let chain = fold(handler(assert_tagged), &[tracer("traced")]);
        chain.call(Context::detached()).await.unwrap();
    }
}
