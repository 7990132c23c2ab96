pub mod ai;
pub mod analytics;
pub mod audit;
pub mod auth;
pub mod baa;
pub mod conversations;
pub mod features;
pub mod goals;
pub mod privacy;
pub mod users;
