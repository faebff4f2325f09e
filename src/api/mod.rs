//! HTTP API.
//!
//! Routes are split into an unprotected group (health, login) and a
//! protected group behind the middleware stack: Auth → Audit → Handler.
//!
//! The router is composable: `clinic_router()` returns a `Router` that
//! can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::clinic_router;
pub use server::{start_server_on, ClinicServer, ServerSession};
pub use types::ApiContext;
