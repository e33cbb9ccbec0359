//! HTTP server for Foundation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::db::{Database, InvitationRepository, OneTimePasswordRepository};
use crate::{FoundationError, Result};

use super::handlers::AppState;
use super::middleware::{JwtState, LoginRateLimit};
use super::router::create_router_with_limiter;

/// Expired-code sweep interval.
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// HTTP server for the API.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    login_limit: Arc<LoginRateLimit>,
    cors_origins: Vec<String>,
}

impl WebServer {
    pub fn new(config: &Config, db: Database) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                FoundationError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.server.host, config.server.port
                ))
            })?;

        let app_state = AppState::new(
            Arc::new(db),
            &config.web.jwt_secret,
            config.web.jwt_access_token_expiry_secs,
        )
        .with_accounts(config.accounts.clone())
        .with_timezone(config.server.timezone.clone());

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state: Arc::new(JwtState::new(&config.web.jwt_secret)),
            login_limit: Arc::new(LoginRateLimit::new(config.web.login_rate_limit)),
            cors_origins: config.web.cors_origins.clone(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Full application router, compression included.
    pub fn router(&self) -> Router {
        create_router_with_limiter(
            self.app_state.clone(),
            self.jwt_state.clone(),
            self.login_limit.clone(),
            &self.cors_origins,
        )
        .layer(CompressionLayer::new())
    }

    /// Hourly removal of expired invitations and spent one-time passwords.
    fn start_cleanup_task(db: Arc<Database>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            interval.tick().await;

            loop {
                interval.tick().await;

                match InvitationRepository::new(db.pool()).purge_expired().await {
                    Ok(0) => tracing::debug!("No expired invitations to clean up"),
                    Ok(count) => {
                        tracing::info!(deleted_count = count, "Cleaned up expired invitations")
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to clean up invitations"),
                }

                match OneTimePasswordRepository::new(db.pool()).cleanup().await {
                    Ok(0) => tracing::debug!("No spent one-time passwords to clean up"),
                    Ok(count) => tracing::info!(
                        deleted_count = count,
                        "Cleaned up used/expired one-time passwords"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Failed to clean up one-time passwords"),
                }
            }
        });
    }

    /// Bind and serve until the listener fails.
    pub async fn run(self) -> Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_cleanup_task(self.app_state.db.clone());
        self.login_limit.clone().start_cleanup_task();

        tracing::info!(addr = %local_addr, "Web server listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}
