//! OAuth 2.1 authorization server with PKCE and Dynamic Client Registration.
//!
//! Brokers browser-based authorization for an MCP CLI client against a
//! portal: discovery metadata (RFC 8414 / RFC 9728), dynamic client
//! registration (RFC 7591), the authorization endpoint with PKCE S256
//! (RFC 7636), authorization-code and refresh-token grants, and HS256 JWT
//! minting. See `AuthServer` for the entry point.

pub mod backend;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pkce;
pub mod server;
pub mod store;

pub use config::ServerConfig;
pub use error::{AuthServerError, AuthServerResult};
pub use server::AuthServer;
