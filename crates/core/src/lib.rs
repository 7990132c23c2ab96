//! Domain logic for the Empathy platform backend.
//!
//! This crate has no internal dependencies and performs no I/O. It holds the
//! rules every API route shares (roles, validation, audit chaining, rate
//! limiting) plus the pure parts of each resource's lifecycle so they can be
//! unit-tested without a database or HTTP stack.

pub mod analytics;
pub mod audit;
pub mod baa;
pub mod bias;
pub mod conversation;
pub mod deletion;
pub mod emotion;
pub mod error;
pub mod goals;
pub mod hashing;
pub mod llm;
pub mod pagination;
pub mod rate_limit;
pub mod roles;
pub mod types;
pub mod validation;
