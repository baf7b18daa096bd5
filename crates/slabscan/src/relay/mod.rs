//! Analysis relay: the single streaming endpoint between clients and the
//! inference provider. Stateless per request; it validates nothing about
//! the provider's output and forwards it verbatim.

pub mod handlers;
pub mod routes;

pub use routes::{create_router, AppState, DEFAULT_REQUEST_TIMEOUT};
