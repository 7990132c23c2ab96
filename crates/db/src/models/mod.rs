//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for patches where the resource
//!   supports them

pub mod analytics;
pub mod audit;
pub mod baa_template;
pub mod conversation;
pub mod deletion_request;
pub mod goal;
pub mod role;
pub mod session;
pub mod user;
