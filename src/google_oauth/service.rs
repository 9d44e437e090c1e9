use super::endpoints::GoogleOauthEndpoints;
use super::flow::{CallbackVerdict, SignInAttempt, SignInOutcome, SignInState, check_callback};
use crate::config::OauthConfig;
use crate::error::AppError;
use crate::google_oauth::broker::{AuthorizationBroker, AuthorizationResponse};
use crate::google_oauth::pkce::PkceExchange;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Shared HTTP client for the identity provider.
pub fn build_http_client(proxy: Option<&Url>) -> Result<reqwest::Client, AppError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("gnotes/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(15));
    if let Some(proxy_url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

/// Runs Google sign-in attempts. Each call to [`sign_in`](Self::sign_in) is an
/// independent attempt with fresh PKCE secrets; nothing is retried.
pub struct GoogleOauthService<B> {
    oauth: OauthConfig,
    http_client: reqwest::Client,
    broker: B,
}

impl<B: AuthorizationBroker> GoogleOauthService<B> {
    pub fn new(oauth: OauthConfig, http_client: reqwest::Client, broker: B) -> Self {
        Self {
            oauth,
            http_client,
            broker,
        }
    }

    pub async fn sign_in(&self) -> Result<SignInOutcome, AppError> {
        let mut attempt = SignInAttempt::new();
        match self.run(&mut attempt).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let at = attempt.state();
                attempt.fail();
                warn!(state = ?at, error = %e, "Google sign-in failed");
                Err(e)
            }
        }
    }

    async fn run(&self, attempt: &mut SignInAttempt) -> Result<SignInOutcome, AppError> {
        let pkce = PkceExchange::new_random();
        let auth_url = GoogleOauthEndpoints::build_authorize_url(&self.oauth, &pkce)?;
        attempt.advance(SignInState::AuthorizationRequested)?;
        info!("Dispatching OAuth consent page");

        let params = match self.broker.authorize(&auth_url).await? {
            AuthorizationResponse::Callback(params) => params,
            AuthorizationResponse::Cancelled => {
                attempt.advance(SignInState::Cancelled)?;
                info!("Sign-in cancelled in browser");
                return Ok(SignInOutcome::Cancelled);
            }
        };
        attempt.advance(SignInState::CallbackReceived)?;

        let code = match check_callback(&pkce, params)? {
            CallbackVerdict::Code(code) => code,
            CallbackVerdict::Cancelled => {
                attempt.advance(SignInState::Cancelled)?;
                info!("Consent denied by user");
                return Ok(SignInOutcome::Cancelled);
            }
        };

        let token = GoogleOauthEndpoints::exchange_authorization_code(
            &self.oauth,
            &code,
            &pkce,
            &self.http_client,
        )
        .await?;
        attempt.advance(SignInState::TokenExchanged)?;

        let access_token = token.access_token.as_deref().unwrap_or_default();
        let user =
            GoogleOauthEndpoints::fetch_userinfo(&self.oauth, access_token, &self.http_client)
                .await?;
        attempt.advance(SignInState::UserInfoFetched)?;

        attempt.advance(SignInState::Complete)?;
        info!(
            email = user.email.as_deref().unwrap_or("-"),
            "Google sign-in complete"
        );
        Ok(SignInOutcome::SignedIn(user))
    }
}
