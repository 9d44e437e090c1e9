use crate::config::OauthConfig;
use crate::error::AppError;
use crate::google_oauth::pkce::PkceExchange;
use crate::google_oauth::types::{GoogleUserInfo, TokenResponse};

use oauth2::{
    AuthUrl, Client as OAuth2Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, StandardRevocableToken,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenResponse,
    },
};
use reqwest::header::ACCEPT;
use tracing::{debug, info};
use url::Url;

/// Stateless Google OAuth Endpoints.
pub(super) struct GoogleOauthEndpoints;

impl GoogleOauthEndpoints {
    /// Consent page URL carrying client id, redirect, scopes, state and the
    /// S256 PKCE challenge.
    pub(super) fn build_authorize_url(
        cfg: &OauthConfig,
        pkce: &PkceExchange,
    ) -> Result<Url, AppError> {
        let client = build_oauth2_client(cfg)?;
        let (url, _state) = client
            .authorize_url(|| pkce.csrf_token())
            .add_scopes(cfg.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce.pkce_challenge())
            .url();
        Ok(url)
    }

    /// Exchange the authorization code plus verifier for an access token.
    pub(super) async fn exchange_authorization_code(
        cfg: &OauthConfig,
        code: &str,
        pkce: &PkceExchange,
        http_client: &reqwest::Client,
    ) -> Result<TokenResponse, AppError> {
        let form = [
            ("code", code),
            ("client_id", cfg.client_id.as_str()),
            ("client_secret", cfg.client_secret.as_str()),
            ("redirect_uri", cfg.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code_verifier", pkce.verifier()),
        ];
        let resp = http_client
            .post(cfg.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(AppError::TokenExchange { status, body });
        }

        let token: TokenResponse = match serde_json::from_str(&body) {
            Ok(token) => token,
            Err(e) => {
                debug!(error = %e, "token response is not valid JSON");
                return Err(AppError::TokenExchange { status, body });
            }
        };
        if token.access_token.as_deref().is_none_or(str::is_empty) {
            return Err(AppError::TokenExchange { status, body });
        }
        info!("Authorization code exchanged successfully");
        Ok(token)
    }

    pub(super) async fn fetch_userinfo(
        cfg: &OauthConfig,
        access_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<GoogleUserInfo, AppError> {
        let resp = http_client
            .get(cfg.userinfo_url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(AppError::UserInfo { status, body });
        }
        let info: GoogleUserInfo = resp.json().await?;
        info!(
            email = info.email.as_deref().unwrap_or("-"),
            "Fetch UserInfo successfully"
        );
        Ok(info)
    }
}

/// Build the Google OAuth2 client used for authorization URLs.
fn build_oauth2_client(cfg: &OauthConfig) -> Result<GoogleOauth2Client, AppError> {
    let client = OAuth2Client::new(ClientId::new(cfg.client_id.clone()))
        .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(cfg.auth_url.as_str().to_string())?)
        .set_redirect_uri(RedirectUrl::new(cfg.redirect_uri.as_str().to_string())?);
    Ok(client)
}

pub(super) type GoogleOauth2Client = OAuth2Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
>;
