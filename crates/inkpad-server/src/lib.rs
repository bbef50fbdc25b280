//! Inkpad HTTP server.
//!
//! Wires together the core library, storage provider, and HTTP routes into
//! a running Axum server. Serves the JSON API at `/api/*`; the router is
//! built by [`routes::router`] so tests can drive it without a listener.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
