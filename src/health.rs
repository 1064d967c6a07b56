//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on your router:
//!
//! ```rust
//! use ruta::{Router, health};
//!
//! let mut app = Router::new();
//! app.get("/healthz", health::liveness);
//! app.get("/readyz", health::readiness);
//! ```
//!
//! Override `readiness` with your own handler to gate on dependency
//! availability (database connections, downstream services, etc.).

use crate::context::Context;
use crate::error::Error;
use crate::status::Status;

/// Kubernetes liveness probe handler.
///
/// Always `200 OK` with body `"ok"`. If the process can respond to HTTP
/// at all, it is alive — this handler intentionally has no dependencies.
pub async fn liveness(c: Context) -> Result<(), Error> {
    c.string(Status::Ok, "ok")
}

/// Kubernetes readiness probe handler (default implementation).
///
/// Always `200 OK` with body `"ready"`. Replace it if your application
/// needs a warm-up period or must verify dependency health first.
pub async fn readiness(c: Context) -> Result<(), Error> {
    c.string(Status::Ok, "ready")
}
