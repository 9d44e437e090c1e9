//! Signed-in user cache ("remember me") over persistent preferences.

pub mod cache;
pub mod preferences;

pub use cache::{Session, SessionCache, SessionEvent};
pub use preferences::{FilePreferences, MemoryPreferences, PreferenceStore};
