use crate::error::AppError;
use crate::google_oauth::pkce::PkceExchange;
use crate::google_oauth::types::{CallbackParams, GoogleUserInfo};
use tracing::debug;

/// Provider error code sent when the user declines consent.
const ACCESS_DENIED: &str = "access_denied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInState {
    Idle,
    AuthorizationRequested,
    CallbackReceived,
    TokenExchanged,
    UserInfoFetched,
    Complete,
    Cancelled,
    Failed,
}

impl SignInState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }

    /// The flow only moves forward; `Failed` is reachable from any live state,
    /// `Cancelled` only while waiting on the browser.
    pub fn can_advance_to(self, next: SignInState) -> bool {
        use SignInState::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Failed) => true,
            (Idle, AuthorizationRequested) => true,
            (AuthorizationRequested, CallbackReceived | Cancelled) => true,
            (CallbackReceived, TokenExchanged | Cancelled) => true,
            (TokenExchanged, UserInfoFetched) => true,
            (UserInfoFetched, Complete) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    SignedIn(GoogleUserInfo),
    /// User abandoned the attempt. Not an error.
    Cancelled,
}

/// Tracks one attempt through the state machine.
#[derive(Debug)]
pub(super) struct SignInAttempt {
    state: SignInState,
}

impl SignInAttempt {
    pub(super) fn new() -> Self {
        Self {
            state: SignInState::Idle,
        }
    }

    pub(super) fn state(&self) -> SignInState {
        self.state
    }

    pub(super) fn advance(&mut self, next: SignInState) -> Result<(), AppError> {
        if !self.state.can_advance_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = ?self.state, to = ?next, "sign-in transition");
        self.state = next;
        Ok(())
    }

    pub(super) fn fail(&mut self) {
        if !self.state.is_terminal() {
            debug!(from = ?self.state, "sign-in failed");
            self.state = SignInState::Failed;
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum CallbackVerdict {
    Code(String),
    Cancelled,
}

/// Decide what a callback means before anything touches the network.
/// Order: provider error, then CSRF state, then the code itself.
pub(super) fn check_callback(
    pkce: &PkceExchange,
    params: CallbackParams,
) -> Result<CallbackVerdict, AppError> {
    if let Some(error) = params.error {
        if error == ACCESS_DENIED {
            return Ok(CallbackVerdict::Cancelled);
        }
        return Err(AppError::Provider {
            error,
            description: params.error_description,
        });
    }
    if !pkce.state_matches(params.state.as_deref()) {
        return Err(AppError::CsrfMismatch);
    }
    match params.code {
        Some(code) if !code.is_empty() => Ok(CallbackVerdict::Code(code)),
        _ => Err(AppError::MissingCode),
    }
}
