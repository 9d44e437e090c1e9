//! Google sign-in: Authorization Code flow with PKCE.

pub mod broker;
pub mod callback;
pub(crate) mod endpoints;
pub mod flow;
pub mod pkce;
pub mod service;
pub mod types;

pub use broker::{AuthorizationBroker, AuthorizationResponse, LoopbackBroker, PrintUrl, SystemBrowser};
pub use flow::{SignInOutcome, SignInState};
pub use service::{GoogleOauthService, build_http_client};
pub use types::{CallbackParams, GoogleUserInfo, TokenResponse};
