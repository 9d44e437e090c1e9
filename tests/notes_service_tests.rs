use gnotes::notes::{NoteDraft, NotesService};
use gnotes::{AppError, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn service() -> (TempDir, NotesService) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = Arc::new(RecordStore::new(dir.path().join("notes.db3")));
    (dir, NotesService::new(store))
}

fn draft(title: &str, content: &str) -> NoteDraft {
    NoteDraft {
        title: title.to_string(),
        content: Some(content.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_applies_defaults_and_overrides() {
    let (_dir, notes) = service();

    let plain = notes.create(draft("A", "x")).await.unwrap();
    assert_ne!(plain.id, 0);
    assert_eq!(plain.category, "General");
    assert_eq!(plain.color, "#667eea");

    let styled = notes
        .create(NoteDraft {
            category: Some("Work".to_string()),
            color: Some("#ff0000".to_string()),
            ..draft("B", "")
        })
        .await
        .unwrap();
    assert_eq!(styled.category, "Work");
    assert_eq!(styled.color, "#ff0000");
}

#[tokio::test]
async fn blank_or_oversized_fields_are_rejected() {
    let (_dir, notes) = service();

    assert!(matches!(
        notes.create(draft("   ", "x")).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        notes.create(draft(&"t".repeat(201), "")).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        notes
            .create(NoteDraft {
                category: Some("c".repeat(51)),
                ..draft("ok", "")
            })
            .await,
        Err(AppError::Validation(_))
    ));
    assert!(notes.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_is_newest_edit_first_and_searchable() {
    let (_dir, notes) = service();
    let first = notes.create(draft("Groceries", "milk")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = notes.create(draft("Ideas", "a new app")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    notes.update(first.id, draft("Groceries", "milk, bread")).await.unwrap();

    let ids: Vec<i64> = notes.list(None).await.unwrap().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    let found = notes.list(Some("BREAD")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, first.id);

    assert_eq!(notes.list(Some("  ")).await.unwrap().len(), 2);
}

#[tokio::test]
async fn update_keeps_identity_and_creation_time() {
    let (_dir, notes) = service();
    let created = notes.create(draft("A", "x")).await.unwrap();

    let updated = notes.update(created.id, draft("A", "y")).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    let stored = notes.get(created.id).await.unwrap().unwrap();
    assert_eq!(stored.content, "y");
}

#[tokio::test]
async fn title_only_edit_keeps_the_other_fields() {
    let (_dir, notes) = service();
    let created = notes
        .create(NoteDraft {
            category: Some("Work".to_string()),
            color: Some("#ff0000".to_string()),
            ..draft("Plan", "body")
        })
        .await
        .unwrap();

    let edit = NoteDraft {
        title: "Plan v2".to_string(),
        ..Default::default()
    };
    notes.update(created.id, edit).await.unwrap();

    let stored = notes.get(created.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Plan v2");
    assert_eq!(stored.content, "body");
    assert_eq!(stored.category, "Work");
    assert_eq!(stored.color, "#ff0000");
}

#[tokio::test]
async fn update_and_favorite_of_missing_note_fail() {
    let (_dir, notes) = service();
    assert!(matches!(
        notes.update(7, draft("A", "")).await,
        Err(AppError::NotFound { table: "notes", id: 7 })
    ));
    assert!(matches!(
        notes.toggle_favorite(7).await,
        Err(AppError::NotFound { .. })
    ));
}

#[tokio::test]
async fn favorite_toggles_and_delete_reports_removal() {
    let (_dir, notes) = service();
    let note = notes.create(draft("A", "")).await.unwrap();

    assert!(notes.toggle_favorite(note.id).await.unwrap().is_favorite);
    assert!(!notes.toggle_favorite(note.id).await.unwrap().is_favorite);

    assert!(notes.delete(note.id).await.unwrap());
    assert!(!notes.delete(note.id).await.unwrap());
    assert_eq!(notes.get(note.id).await.unwrap(), None);
}
