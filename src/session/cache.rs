use super::preferences::PreferenceStore;
use crate::error::AppError;
use crate::google_oauth::GoogleUserInfo;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

pub const KEY_USER_NAME: &str = "user_name";
pub const KEY_USER_EMAIL: &str = "user_email";
pub const KEY_USER_PHOTO: &str = "user_photo_url";
pub const KEY_IS_LOGGED_IN: &str = "is_logged_in";

/// Remembered signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub email: String,
    pub photo_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(GoogleUserInfo),
    LoggedOut,
}

/// "Remember me" cache over a preference store.
///
/// At most one session exists. The logged-in flag is written last on save,
/// so a reader never sees the flag set over stale fields.
pub struct SessionCache<P> {
    prefs: P,
    events: broadcast::Sender<SessionEvent>,
}

impl<P: PreferenceStore> SessionCache<P> {
    pub fn new(prefs: P, events: broadcast::Sender<SessionEvent>) -> Self {
        Self { prefs, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn save(&self, user: &GoogleUserInfo) -> Result<(), AppError> {
        // Drop the flag first so a failed write cannot leave it over old fields.
        self.prefs.set_bool(KEY_IS_LOGGED_IN, false)?;
        self.prefs
            .set_string(KEY_USER_NAME, user.name.as_deref().unwrap_or_default())?;
        self.prefs
            .set_string(KEY_USER_EMAIL, user.email.as_deref().unwrap_or_default())?;
        self.prefs
            .set_string(KEY_USER_PHOTO, user.picture.as_deref().unwrap_or_default())?;
        self.prefs.set_bool(KEY_IS_LOGGED_IN, true)?;

        info!(email = user.email.as_deref().unwrap_or("-"), "session saved");
        self.notify(SessionEvent::LoggedIn(user.clone()));
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.prefs.remove(KEY_USER_NAME)?;
        self.prefs.remove(KEY_USER_EMAIL)?;
        self.prefs.remove(KEY_USER_PHOTO)?;
        self.prefs.set_bool(KEY_IS_LOGGED_IN, false)?;

        info!("session cleared");
        self.notify(SessionEvent::LoggedOut);
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        if !self.is_logged_in() {
            return None;
        }
        Some(Session {
            name: self.prefs.get_string(KEY_USER_NAME).unwrap_or_default(),
            email: self.prefs.get_string(KEY_USER_EMAIL).unwrap_or_default(),
            photo_url: self.prefs.get_string(KEY_USER_PHOTO).unwrap_or_default(),
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.prefs.get_bool(KEY_IS_LOGGED_IN).unwrap_or(false)
    }

    /// Flush and hand back the underlying store.
    pub fn close(self) -> Result<P, AppError> {
        self.prefs.flush()?;
        Ok(self.prefs)
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        if self.events.send(event).is_err() {
            debug!("no session event subscribers");
        }
    }
}
