use crate::error::AppError;
use crate::google_oauth::callback::CallbackListener;
use crate::google_oauth::types::CallbackParams;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;
use url::Url;

/// What came back from the browser step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResponse {
    Callback(CallbackParams),
    /// The user abandoned the browser step.
    Cancelled,
}

/// Presents the consent page and captures the redirect.
pub trait AuthorizationBroker: Send + Sync {
    fn authorize(
        &self,
        auth_url: &Url,
    ) -> impl Future<Output = Result<AuthorizationResponse, AppError>> + Send;
}

pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &Url) -> Result<(), AppError>;
}

/// Platform default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &Url) -> Result<(), AppError> {
        let mut cmd = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("rundll32");
            c.arg("url.dll,FileProtocolHandler");
            c
        } else {
            Command::new("xdg-open")
        };
        cmd.arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AppError::Browser(e.to_string()))?;
        info!("Opened consent page in system browser");
        Ok(())
    }
}

/// For headless use: print the URL for the user to open by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintUrl;

impl BrowserOpener for PrintUrl {
    fn open(&self, url: &Url) -> Result<(), AppError> {
        eprintln!("Open this URL in your browser to sign in:\n\n  {url}\n");
        Ok(())
    }
}

/// Local HTTP listener on the redirect URI plus a browser to drive the user.
///
/// A closed browser tab sends nothing back, so this broker never reports
/// [`AuthorizationResponse::Cancelled`]. An abandoned attempt ends with
/// [`AppError::CallbackTimeout`] once `timeout` runs out, unless the caller
/// drops the future first (the CLI does on ctrl-c). Only an explicit
/// `access_denied` redirect turns into a cancellation.
pub struct LoopbackBroker<O> {
    redirect_uri: Url,
    timeout: Duration,
    opener: O,
}

impl<O: BrowserOpener> LoopbackBroker<O> {
    pub fn new(redirect_uri: Url, timeout: Duration, opener: O) -> Self {
        Self {
            redirect_uri,
            timeout,
            opener,
        }
    }
}

impl<O: BrowserOpener> AuthorizationBroker for LoopbackBroker<O> {
    async fn authorize(&self, auth_url: &Url) -> Result<AuthorizationResponse, AppError> {
        let listener = CallbackListener::bind(&self.redirect_uri).await?;
        self.opener.open(auth_url)?;
        let params = listener.wait(self.timeout).await?;
        Ok(AuthorizationResponse::Callback(params))
    }
}
