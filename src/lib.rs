pub mod config;
pub mod db;
pub mod error;
pub mod google_oauth;
pub mod notes;
pub mod session;

pub use config::Config;
pub use db::RecordStore;
pub use error::AppError;
pub use google_oauth::GoogleOauthService;
pub use notes::NotesService;
pub use session::SessionCache;
