pub mod model;
pub mod service;

pub use model::Note;
pub use service::{NoteDraft, NotesService};
