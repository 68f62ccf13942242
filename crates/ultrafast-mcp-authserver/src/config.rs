//! Construction-time configuration (§6, §10.3), loaded from environment
//! variables and validated eagerly so a misconfigured process fails at
//! startup rather than on the first request.

use crate::error::{AuthServerError, AuthServerResult};

/// Default interval, in seconds, at which the host should invoke
/// [`crate::server::AuthServer::cleanup`] (§5, §9: nothing bounds memory
/// growth unless this runs).
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Default `tracing` log level when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Authorization server configuration.
///
/// `issuer` is the fallback base URL used only where no request is in scope
/// (e.g. constructing cookies during tests); per-request issuer/endpoint
/// emission always prefers the `Host`/`X-Forwarded-Proto`-derived base URL
/// (§4.3, §9).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub issuer: String,
    pub backend_url: Option<String>,
    pub jwt_secret: String,
    pub cleanup_interval_secs: u64,
}

impl ServerConfig {
    /// Loads configuration from `AUTHSERVER_ISSUER`, `AUTHSERVER_BACKEND_URL`,
    /// `AUTHSERVER_JWT_SECRET`, and `AUTHSERVER_CLEANUP_INTERVAL_SECS`.
    pub fn from_env() -> AuthServerResult<Self> {
        let issuer = std::env::var("AUTHSERVER_ISSUER")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let backend_url = std::env::var("AUTHSERVER_BACKEND_URL").ok().filter(|s| !s.is_empty());
        let jwt_secret = std::env::var("AUTHSERVER_JWT_SECRET")
            .map_err(|_| AuthServerError::ServerError("AUTHSERVER_JWT_SECRET is not set".to_string()))?;
        let cleanup_interval_secs = std::env::var("AUTHSERVER_CLEANUP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS);

        Self { issuer, backend_url, jwt_secret, cleanup_interval_secs }.validate()
    }

    /// Trims the issuer and rejects an empty JWT secret (§6, §9). Called by
    /// both [`Self::from_env`] and any caller constructing a `ServerConfig`
    /// directly (as tests do).
    pub fn validate(mut self) -> AuthServerResult<Self> {
        self.issuer = self.issuer.trim().trim_end_matches('/').to_string();
        if self.jwt_secret.is_empty() {
            return Err(AuthServerError::ServerError(
                "JWT signing secret must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_rejected() {
        let config = ServerConfig {
            issuer: "http://localhost:8080/".to_string(),
            backend_url: None,
            jwt_secret: String::new(),
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn issuer_is_trimmed_of_trailing_slash_and_whitespace() {
        let config = ServerConfig {
            issuer: "  http://localhost:8080/  ".to_string(),
            backend_url: None,
            jwt_secret: "secret".to_string(),
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
        }
        .validate()
        .unwrap();
        assert_eq!(config.issuer, "http://localhost:8080");
    }
}
