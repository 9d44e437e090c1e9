use crate::error::AppError;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URI: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5000/";

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "gnotes.toml";
/// Prefix for environment overrides, nested keys split on `__`
/// (e.g. `GNOTES_OAUTH__CLIENT_ID`).
pub const ENV_PREFIX: &str = "GNOTES_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loglevel: String,
    /// Directory holding the database and preference files.
    /// Falls back to the platform's local data directory.
    pub data_dir: Option<PathBuf>,
    pub database_file: String,
    pub preferences_file: String,
    pub proxy: Option<Url>,
    pub oauth: OauthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    pub auth_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
    pub callback_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            data_dir: None,
            database_file: "gnotes.db3".to_string(),
            preferences_file: "preferences.json".to_string(),
            proxy: None,
            oauth: OauthConfig::default(),
        }
    }
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: parse_const(DEFAULT_REDIRECT_URI),
            scopes: ["openid", "profile", "email"]
                .into_iter()
                .map(String::from)
                .collect(),
            auth_url: parse_const(GOOGLE_AUTH_URL),
            token_url: parse_const(GOOGLE_TOKEN_URI),
            userinfo_url: parse_const(GOOGLE_USERINFO_URI),
            callback_timeout_secs: 300,
        }
    }
}

fn parse_const(s: &'static str) -> Url {
    Url::parse(s).expect("built-in URL constant is valid")
}

impl Config {
    /// Load defaults, then `gnotes.toml`, then `GNOTES_*` environment variables.
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        Ok(Self::figment(path).extract()?)
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            ProjectDirs::from("dev", "gnotes", "gnotes")
                .map(|dirs| dirs.data_local_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(&self.database_file)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir().join(&self.preferences_file)
    }
}

impl OauthConfig {
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_point_at_google() {
        let cfg = Config::default();
        assert_eq!(cfg.oauth.auth_url.as_str(), GOOGLE_AUTH_URL);
        assert_eq!(cfg.oauth.redirect_uri.as_str(), DEFAULT_REDIRECT_URI);
        assert_eq!(cfg.oauth.scopes, vec!["openid", "profile", "email"]);
        assert_eq!(cfg.oauth.callback_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn toml_and_env_layer_over_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "gnotes.toml",
                r#"
                loglevel = "debug"
                data_dir = "/tmp/gnotes-test"

                [oauth]
                client_id = "from-file"
                callback_timeout_secs = 30
                "#,
            )?;
            jail.set_env("GNOTES_OAUTH__CLIENT_SECRET", "from-env");

            let cfg = Config::load_from(Path::new("gnotes.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.loglevel, "debug");
            assert_eq!(cfg.oauth.client_id, "from-file");
            assert_eq!(cfg.oauth.client_secret, "from-env");
            assert_eq!(cfg.oauth.callback_timeout_secs, 30);
            assert_eq!(
                cfg.database_path(),
                PathBuf::from("/tmp/gnotes-test/gnotes.db3")
            );
            Ok(())
        });
    }
}
