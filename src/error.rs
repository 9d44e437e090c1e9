use crate::google_oauth::flow::SignInState;
use reqwest::StatusCode;
use sqlx::Error as SqlxError;
use std::time::Duration;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] SqlxError),

    #[error("OAuth state mismatch; possible CSRF, aborting sign-in")]
    CsrfMismatch,

    #[error("missing `code` in OAuth callback")]
    MissingCode,

    #[error("identity provider returned error: {error} ({})", description.as_deref().unwrap_or("-"))]
    Provider {
        error: String,
        description: Option<String>,
    },

    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: StatusCode, body: String },

    #[error("userinfo request failed with status {status}: {body}")]
    UserInfo { status: StatusCode, body: String },

    #[error("no OAuth callback received within {0:?}")]
    CallbackTimeout(Duration),

    #[error("callback listener error: {0}")]
    Listener(String),

    #[error("failed to open browser: {0}")]
    Browser(String),

    #[error("illegal sign-in transition {from:?} -> {to:?}")]
    InvalidTransition { from: SignInState, to: SignInState },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preferences error: {0}")]
    Preferences(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: i64 },

    #[error("Config error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(Box::new(e))
    }
}

impl AppError {
    /// Failures reported by the identity provider rather than by local I/O.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            AppError::Provider { .. } | AppError::TokenExchange { .. } | AppError::UserInfo { .. }
        )
    }
}
