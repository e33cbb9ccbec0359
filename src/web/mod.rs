//! JSON-over-HTTP API.
//!
//! - `dto`: request and response bodies
//! - `error`: error envelope and status mapping
//! - `handlers`: endpoint implementations
//! - `middleware`: JWT auth, CORS, login rate limiting
//! - `router` / `server`: wiring and serving

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
