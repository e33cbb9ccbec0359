//! Foundation - a role-based course discussion board.
//!
//! Accounts are invitation-only (after the first administrator), users act
//! in one of their roles per session, and the board offers threads, posts,
//! replies and per-user read tracking behind a JSON HTTP API.

pub mod admin;
pub mod auth;
pub mod board;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod web;

pub use auth::{hash_password, verify_password, AuthSession, UserProfile};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository, UserUpdate};
pub use error::{FoundationError, Result};
pub use web::WebServer;
