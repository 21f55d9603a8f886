//! HTTP API server for Icebreaker.
//!
//! Exposes lead processing as JSON REST endpoints for the browser UI. The
//! pipeline runs in-process; each request is handled to completion before
//! its response is written.

pub mod routes;
pub mod server;

pub use routes::AppState;
pub use server::{build_router, run_server};
