//! Error taxonomy for the authorization server.
//!
//! One variant per error surface the handlers can produce. `IntoResponse` renders
//! each variant as the exact wire shape the endpoint it came from is allowed to use:
//! a JSON `{error, error_description}` body, a redirect carrying `error` in the query
//! string, or a bare 400/405 with no body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthServerError {
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    /// `response_type` other than `code`, surfaced as a redirect carrying the error,
    /// never as a direct JSON body.
    #[error("unsupported_response_type: redirect_uri={redirect_uri} state={state:?}")]
    UnsupportedResponseType { redirect_uri: String, state: Option<String> },

    /// Any other `/authorize` validation failure that must redirect with `error=invalid_request`.
    #[error("invalid_request (redirect): redirect_uri={redirect_uri} state={state:?}")]
    InvalidRequestRedirect { redirect_uri: String, state: Option<String> },

    /// Missing, unparseable, host-less, or unregistered redirect_uri. Never redirected to.
    #[error("invalid redirect_uri: {0}")]
    InvalidRedirectUri(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("server_error: {0}")]
    ServerError(String),

    #[error("JWT error: {source}")]
    Jwt {
        #[from]
        source: jsonwebtoken::errors::Error,
    },

    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid URL: {source}")]
    Url {
        #[from]
        source: url::ParseError,
    },

    #[error("backend request error: {source}")]
    Backend {
        #[from]
        source: reqwest::Error,
    },
}

#[derive(Serialize)]
struct OAuthErrorBody {
    error: &'static str,
    error_description: String,
}

impl AuthServerError {
    fn oauth_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidRequestRedirect { .. }
            | Self::Serialization { .. } => "invalid_request",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::InvalidRedirectUri(_) => "invalid_request",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::ServerError(_) | Self::Jwt { .. } | Self::Url { .. } | Self::Backend { .. } => {
                "server_error"
            }
        }
    }
}

impl IntoResponse for AuthServerError {
    fn into_response(self) -> Response {
        match &self {
            Self::UnsupportedResponseType { redirect_uri, state }
            | Self::InvalidRequestRedirect { redirect_uri, state } => {
                let code = self.oauth_code();
                let mut url = match url::Url::parse(redirect_uri) {
                    Ok(u) => u,
                    Err(_) => return (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
                };
                {
                    let mut q = url.query_pairs_mut();
                    q.append_pair("error", code);
                    if let Some(state) = state {
                        q.append_pair("state", state);
                    }
                }
                Redirect::to(url.as_str()).into_response()
            }
            Self::InvalidRedirectUri(reason) => {
                (StatusCode::BAD_REQUEST, format!("invalid redirect_uri: {reason}")).into_response()
            }
            Self::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, ()).into_response(),
            Self::ServerError(_) | Self::Jwt { .. } | Self::Url { .. } | Self::Backend { .. } => {
                tracing::error!(error = %self, "authorization server error");
                let body = OAuthErrorBody {
                    error: "server_error",
                    error_description: "internal server error".to_string(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
            }
            _ => {
                let body = OAuthErrorBody {
                    error: self.oauth_code(),
                    error_description: self.to_string(),
                };
                (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
            }
        }
    }
}

pub type AuthServerResult<T> = Result<T, AuthServerError>;
