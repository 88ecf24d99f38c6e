//! API route handlers

pub mod health;
pub mod stories;

pub use health::health_routes;
pub use stories::story_routes;
