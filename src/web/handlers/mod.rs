//! HTTP API handlers.

pub mod admin;
pub mod auth;
pub mod board;
pub mod setup;

pub use auth::AppState;
