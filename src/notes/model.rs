use crate::db::{Column, Record, SqliteQuery};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_COLOR: &str = "#667eea";
pub const TITLE_MAX_CHARS: usize = 200;
pub const CATEGORY_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_favorite: bool,
}

impl Note {
    /// Unsaved note with default category and color.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = now();
        Self {
            id: 0,
            title: title.into(),
            content: content.into(),
            category: DEFAULT_CATEGORY.to_string(),
            color: DEFAULT_COLOR.to_string(),
            created_at: now,
            updated_at: now,
            is_favorite: false,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now();
    }

    /// Case-insensitive match on title or content.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.content.to_lowercase().contains(&needle)
    }
}

/// Millisecond precision keeps timestamps stable across a storage round trip.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl Record for Note {
    const TABLE: &'static str = "notes";
    const COLUMNS: &'static [Column] = &[
        Column::new("title", "TEXT NOT NULL"),
        Column::new("content", "TEXT NOT NULL DEFAULT ''"),
        Column::new("category", "TEXT NOT NULL DEFAULT 'General'"),
        Column::new("color", "TEXT NOT NULL DEFAULT '#667eea'"),
        Column::new("created_at", "TEXT NOT NULL"), // RFC3339
        Column::new("updated_at", "TEXT NOT NULL"),
        Column::new("is_favorite", "INTEGER NOT NULL DEFAULT 0"),
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.title.clone())
            .bind(self.content.clone())
            .bind(self.category.clone())
            .bind(self.color.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.is_favorite)
    }
}
