use gnotes::db::{Column, Record, RecordStore, SaveMode, SqlValue, SqliteQuery};
use gnotes::notes::Note;
use sqlx::FromRow;
use tempfile::TempDir;

fn store() -> (TempDir, RecordStore) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = RecordStore::new(dir.path().join("data").join("test.db3"));
    (dir, store)
}

#[derive(Debug, Clone, PartialEq, FromRow)]
struct Tag {
    id: i64,
    name: String,
}

impl Tag {
    fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
}

impl Record for Tag {
    const TABLE: &'static str = "tags";
    const COLUMNS: &'static [Column] = &[Column::new("name", "TEXT NOT NULL UNIQUE")];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.name.clone())
    }
}

#[tokio::test]
async fn note_lifecycle_through_get_all() {
    let (_dir, store) = store();

    let mut note = Note::new("A", "x");
    assert_eq!(store.save(&mut note, SaveMode::Insert).await.unwrap(), 1);
    assert_ne!(note.id, 0);
    let id = note.id;

    let all = store.get_all::<Note>().await.unwrap();
    assert_eq!(all, vec![note.clone()]);

    note.content = "y".to_string();
    assert_eq!(store.save(&mut note, SaveMode::Update).await.unwrap(), 1);
    let all = store.get_all::<Note>().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
    assert_eq!(all[0].content, "y");

    assert_eq!(store.delete(&note).await.unwrap(), 1);
    assert!(store.get_all::<Note>().await.unwrap().is_empty());
}

#[tokio::test]
async fn inserts_get_distinct_nonzero_ids() {
    let (_dir, store) = store();
    let mut a = Note::new("a", "");
    let mut b = Note::new("b", "");
    store.save(&mut a, SaveMode::Insert).await.unwrap();
    store.save(&mut b, SaveMode::Insert).await.unwrap();

    assert!(a.id > 0 && b.id > 0);
    assert_ne!(a.id, b.id);
    assert_eq!(store.count::<Note>().await.unwrap(), 2);
}

#[tokio::test]
async fn update_of_missing_row_affects_nothing() {
    let (_dir, store) = store();
    let mut ghost = Note::new("ghost", "");
    ghost.id = 42;
    assert_eq!(store.save(&mut ghost, SaveMode::Update).await.unwrap(), 0);
    assert_eq!(store.count::<Note>().await.unwrap(), 0);
}

#[tokio::test]
async fn delete_by_missing_id_is_a_noop() {
    let (_dir, store) = store();
    let mut note = Note::new("keep", "");
    store.save(&mut note, SaveMode::Insert).await.unwrap();

    assert_eq!(store.delete_by_id::<Note>(note.id + 100).await.unwrap(), 0);
    assert_eq!(store.count::<Note>().await.unwrap(), 1);
    assert_eq!(store.delete_by_id::<Note>(note.id).await.unwrap(), 1);
    assert_eq!(store.get_by_id::<Note>(note.id).await.unwrap(), None);
}

#[tokio::test]
async fn query_and_count_with_predicates() {
    let (_dir, store) = store();
    let mut notes = vec![
        Note::new("alpha", "one"),
        Note::new("beta", "two"),
        Note::new("alphabet", "three"),
    ];
    assert_eq!(store.insert_all(&mut notes).await.unwrap(), 3);

    let alphas = store
        .query(|n: &Note| n.title.starts_with("alpha"))
        .await
        .unwrap();
    assert_eq!(
        alphas.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(),
        vec!["alpha", "alphabet"]
    );
    assert_eq!(
        store.count_where(|n: &Note| n.content == "two").await.unwrap(),
        1
    );
}

#[tokio::test]
async fn batch_insert_assigns_ids_in_order_and_batch_update_applies() {
    let (_dir, store) = store();
    let mut notes = vec![Note::new("1", ""), Note::new("2", ""), Note::new("3", "")];
    store.insert_all(&mut notes).await.unwrap();
    assert!(notes.windows(2).all(|w| w[0].id < w[1].id));

    for n in notes.iter_mut() {
        n.is_favorite = true;
    }
    assert_eq!(store.update_all(&notes).await.unwrap(), 3);
    assert_eq!(
        store.count_where(|n: &Note| n.is_favorite).await.unwrap(),
        3
    );
}

#[tokio::test]
async fn constraint_violation_surfaces_as_storage_error_and_rolls_back_batch() {
    let (_dir, store) = store();
    let mut tags = vec![Tag::new("work"), Tag::new("home"), Tag::new("work")];

    let err = store.insert_all(&mut tags).await.unwrap_err();
    assert!(matches!(err, gnotes::AppError::Storage(_)));
    assert_eq!(store.count::<Tag>().await.unwrap(), 0);
    // rolled-back rows must not leave ids behind
    assert!(tags.iter().all(|t| t.id == 0));

    let mut retry = vec![Tag::new("work"), Tag::new("home")];
    store.insert_all(&mut retry).await.unwrap();
    assert!(retry.iter().all(|t| t.id > 0));
}

#[tokio::test]
async fn each_record_shape_gets_its_own_table() {
    let (_dir, store) = store();
    let mut tag = Tag::new("work");
    let mut note = Note::new("n", "");
    store.save(&mut tag, SaveMode::Insert).await.unwrap();
    store.save(&mut note, SaveMode::Insert).await.unwrap();

    assert_eq!(store.delete_all::<Tag>().await.unwrap(), 1);
    assert_eq!(store.count::<Tag>().await.unwrap(), 0);
    assert_eq!(store.count::<Note>().await.unwrap(), 1);
}

#[tokio::test]
async fn raw_query_and_execute() {
    let (_dir, store) = store();
    let mut tags = vec![Tag::new("a"), Tag::new("b"), Tag::new("c")];
    store.insert_all(&mut tags).await.unwrap();

    let found: Vec<Tag> = store
        .query_raw(
            "SELECT id, name FROM tags WHERE name <> ? ORDER BY name DESC",
            vec![SqlValue::from("b")],
        )
        .await
        .unwrap();
    assert_eq!(
        found.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        vec!["c", "a"]
    );

    let affected = store
        .execute(
            "UPDATE tags SET name = ? WHERE id = ?",
            vec!["z".into(), tags[0].id.into()],
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);
    assert_eq!(
        store.get_by_id::<Tag>(tags[0].id).await.unwrap().unwrap().name,
        "z"
    );

    assert!(store.execute("NOT SQL", vec![]).await.is_err());
}

#[tokio::test]
async fn close_reopens_lazily_and_data_persists() {
    let (_dir, store) = store();
    let mut note = Note::new("durable", "content");
    store.save(&mut note, SaveMode::Insert).await.unwrap();

    store.close().await;
    let again = store.get_by_id::<Note>(note.id).await.unwrap();
    assert_eq!(again, Some(note));
}

#[tokio::test]
async fn delete_database_removes_the_file() {
    let (_dir, store) = store();
    assert!(!store.info().await.unwrap().exists);

    store.create_table::<Note>().await.unwrap();
    let info = store.info().await.unwrap();
    assert!(info.exists);
    assert!(info.size_formatted().ends_with(" KB"));

    store.delete_database().await.unwrap();
    assert!(!store.path().exists());
    // deleting twice is fine
    store.delete_database().await.unwrap();

    assert_eq!(store.count::<Note>().await.unwrap(), 0);
}
