//! Empathy platform API server library.
//!
//! Exposes config, state, error mapping, extractors, the audit logger, the
//! AI provider seam and the route tree so the binary and the integration
//! tests build the exact same application.

pub mod ai;
pub mod audit;
pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
