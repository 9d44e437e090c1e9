use super::model::{CATEGORY_MAX_CHARS, Note, TITLE_MAX_CHARS};
use crate::db::{Record, RecordStore, SaveMode};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

/// User-editable fields of a note. On update, `None` keeps the stored value;
/// on create it means the default.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: String,
    pub content: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
}

impl NoteDraft {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }
        if self.title.chars().count() > TITLE_MAX_CHARS {
            return Err(AppError::Validation(format!(
                "title exceeds {TITLE_MAX_CHARS} characters"
            )));
        }
        if let Some(cat) = &self.category
            && cat.chars().count() > CATEGORY_MAX_CHARS
        {
            return Err(AppError::Validation(format!(
                "category exceeds {CATEGORY_MAX_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// Note use-cases on top of the generic record store.
#[derive(Clone)]
pub struct NotesService {
    store: Arc<RecordStore>,
}

impl NotesService {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Notes, newest edit first, optionally filtered on title/content.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Note>, AppError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let mut notes = match search {
            Some(needle) => self.store.query(|n: &Note| n.matches(needle)).await?,
            None => self.store.get_all::<Note>().await?,
        };
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(notes)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Note>, AppError> {
        self.store.get_by_id::<Note>(id).await
    }

    pub async fn create(&self, draft: NoteDraft) -> Result<Note, AppError> {
        draft.validate()?;
        let mut note = Note::new(draft.title, draft.content.unwrap_or_default());
        if let Some(category) = draft.category {
            note.category = category;
        }
        if let Some(color) = draft.color {
            note.color = color;
        }
        self.store.save(&mut note, SaveMode::Insert).await?;
        info!(id = note.id, "note created");
        Ok(note)
    }

    pub async fn update(&self, id: i64, draft: NoteDraft) -> Result<Note, AppError> {
        draft.validate()?;
        let mut note = self.require(id).await?;
        note.title = draft.title;
        if let Some(content) = draft.content {
            note.content = content;
        }
        if let Some(category) = draft.category {
            note.category = category;
        }
        if let Some(color) = draft.color {
            note.color = color;
        }
        note.touch();
        self.store.save(&mut note, SaveMode::Update).await?;
        info!(id, "note updated");
        Ok(note)
    }

    pub async fn toggle_favorite(&self, id: i64) -> Result<Note, AppError> {
        let mut note = self.require(id).await?;
        note.is_favorite = !note.is_favorite;
        note.touch();
        self.store.update(&note).await?;
        Ok(note)
    }

    /// Returns whether a note was removed.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let removed = self.store.delete_by_id::<Note>(id).await? > 0;
        if removed {
            info!(id, "note deleted");
        }
        Ok(removed)
    }

    async fn require(&self, id: i64) -> Result<Note, AppError> {
        self.get(id).await?.ok_or(AppError::NotFound {
            table: Note::TABLE,
            id,
        })
    }
}
