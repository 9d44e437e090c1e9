use crate::db::models::{DatabaseInfo, Record, SaveMode, SqlValue};
use crate::db::schema;
use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub type SqlitePool = Pool<Sqlite>;

#[derive(Default)]
struct StoreState {
    pool: Option<SqlitePool>,
    tables: HashSet<&'static str>,
}

/// Generic CRUD over a single SQLite file.
///
/// The file is opened on first use and kept open until [`close`](Self::close).
/// The pool holds a single connection so every statement is serialized by it.
/// Tables are created the first time a record type is touched.
pub struct RecordStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(path: &Path) -> Result<SqlitePool, AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let connect_opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_opts)
            .await?;
        info!(path = %path.display(), "database opened");
        Ok(pool)
    }

    async fn pool_in(&self, state: &mut StoreState) -> Result<SqlitePool, AppError> {
        if let Some(pool) = state.pool.as_ref() {
            return Ok(pool.clone());
        }
        let pool = Self::open(&self.path).await?;
        state.pool = Some(pool.clone());
        Ok(pool)
    }

    async fn pool(&self) -> Result<SqlitePool, AppError> {
        let mut state = self.state.lock().await;
        self.pool_in(&mut state).await
    }

    /// Open the pool if needed and make sure `T`'s table exists.
    async fn ready<T: Record>(&self) -> Result<SqlitePool, AppError> {
        let mut state = self.state.lock().await;
        let pool = self.pool_in(&mut state).await?;
        if !state.tables.contains(T::TABLE) {
            sqlx::query(&schema::create_table_sql::<T>())
                .execute(&pool)
                .await?;
            state.tables.insert(T::TABLE);
            debug!(table = T::TABLE, "table ensured");
        }
        Ok(pool)
    }

    /// Create `T`'s table if it does not exist yet.
    pub async fn create_table<T: Record>(&self) -> Result<(), AppError> {
        self.ready::<T>().await.map(|_| ())
    }

    pub async fn get_all<T: Record>(&self) -> Result<Vec<T>, AppError> {
        let pool = self.ready::<T>().await?;
        let rows = sqlx::query_as::<_, T>(&schema::select_all_sql::<T>())
            .fetch_all(&pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id<T: Record>(&self, id: i64) -> Result<Option<T>, AppError> {
        let pool = self.ready::<T>().await?;
        let row = sqlx::query_as::<_, T>(&schema::select_by_id_sql::<T>())
            .bind(id)
            .fetch_optional(&pool)
            .await?;
        Ok(row)
    }

    /// Rows of `T` for which `predicate` holds, in id order.
    pub async fn query<T, F>(&self, predicate: F) -> Result<Vec<T>, AppError>
    where
        T: Record,
        F: Fn(&T) -> bool,
    {
        let mut rows = self.get_all::<T>().await?;
        rows.retain(|r| predicate(r));
        Ok(rows)
    }

    pub async fn count<T: Record>(&self) -> Result<u64, AppError> {
        let pool = self.ready::<T>().await?;
        let n = sqlx::query_scalar::<_, i64>(&schema::count_sql::<T>())
            .fetch_one(&pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    pub async fn count_where<T, F>(&self, predicate: F) -> Result<u64, AppError>
    where
        T: Record,
        F: Fn(&T) -> bool,
    {
        Ok(self.query(predicate).await?.len() as u64)
    }

    /// Insert or update `item` as chosen by `mode`. Returns affected rows.
    /// On insert the new row id is written back into `item`.
    pub async fn save<T: Record>(&self, item: &mut T, mode: SaveMode) -> Result<u64, AppError> {
        match mode {
            SaveMode::Insert => {
                let pool = self.ready::<T>().await?;
                let sql = schema::insert_sql::<T>();
                let res = item.bind_columns(sqlx::query(&sql)).execute(&pool).await?;
                item.set_id(res.last_insert_rowid());
                debug!(table = T::TABLE, id = item.id(), "row inserted");
                Ok(res.rows_affected())
            }
            SaveMode::Update => self.update(item).await,
        }
    }

    pub async fn update<T: Record>(&self, item: &T) -> Result<u64, AppError> {
        let pool = self.ready::<T>().await?;
        let sql = schema::update_sql::<T>();
        let res = item
            .bind_columns(sqlx::query(&sql))
            .bind(item.id())
            .execute(&pool)
            .await?;
        debug!(
            table = T::TABLE,
            id = item.id(),
            affected = res.rows_affected(),
            "row updated"
        );
        Ok(res.rows_affected())
    }

    pub async fn delete<T: Record>(&self, item: &T) -> Result<u64, AppError> {
        self.delete_by_id::<T>(item.id()).await
    }

    /// Delete by id; a missing id affects zero rows.
    pub async fn delete_by_id<T: Record>(&self, id: i64) -> Result<u64, AppError> {
        let pool = self.ready::<T>().await?;
        let res = sqlx::query(&schema::delete_by_id_sql::<T>())
            .bind(id)
            .execute(&pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn delete_all<T: Record>(&self) -> Result<u64, AppError> {
        let pool = self.ready::<T>().await?;
        let res = sqlx::query(&schema::delete_all_sql::<T>())
            .execute(&pool)
            .await?;
        Ok(res.rows_affected())
    }

    /// Batch insert in a single transaction. Ids are written back in order,
    /// and only once the transaction has committed.
    pub async fn insert_all<T: Record>(&self, items: &mut [T]) -> Result<u64, AppError> {
        let pool = self.ready::<T>().await?;
        let sql = schema::insert_sql::<T>();
        let mut tx = pool.begin().await?;
        let mut affected = 0;
        let mut ids = Vec::with_capacity(items.len());

        for item in items.iter() {
            let res = item.bind_columns(sqlx::query(&sql)).execute(&mut *tx).await?;
            ids.push(res.last_insert_rowid());
            affected += res.rows_affected();
        }

        tx.commit().await?;
        for (item, id) in items.iter_mut().zip(ids) {
            item.set_id(id);
        }
        Ok(affected)
    }

    /// Batch update in a single transaction.
    pub async fn update_all<T: Record>(&self, items: &[T]) -> Result<u64, AppError> {
        let pool = self.ready::<T>().await?;
        let sql = schema::update_sql::<T>();
        let mut tx = pool.begin().await?;
        let mut affected = 0;

        for item in items {
            let res = item
                .bind_columns(sqlx::query(&sql))
                .bind(item.id())
                .execute(&mut *tx)
                .await?;
            affected += res.rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }

    /// Raw SELECT mapped into `T`.
    pub async fn query_raw<T: Record>(
        &self,
        sql: &str,
        args: Vec<SqlValue>,
    ) -> Result<Vec<T>, AppError> {
        let pool = self.ready::<T>().await?;
        let query = args
            .into_iter()
            .fold(sqlx::query(sql), |q, arg| arg.bind_to(q));
        let rows = query.fetch_all(&pool).await?;
        rows.iter()
            .map(|row| T::from_row(row).map_err(AppError::from))
            .collect()
    }

    /// Raw statement. Returns affected rows.
    pub async fn execute(&self, sql: &str, args: Vec<SqlValue>) -> Result<u64, AppError> {
        let pool = self.pool().await?;
        let query = args
            .into_iter()
            .fold(sqlx::query(sql), |q, arg| arg.bind_to(q));
        let res = query.execute(&pool).await?;
        Ok(res.rows_affected())
    }

    /// Release the connection. The next operation reopens it.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if let Some(pool) = state.pool.take() {
            pool.close().await;
            info!(path = %self.path.display(), "database closed");
        }
        state.tables.clear();
    }

    /// Close and remove the database file along with its WAL side files.
    pub async fn delete_database(&self) -> Result<(), AppError> {
        self.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            match tokio::fs::remove_file(&file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(path = %self.path.display(), "database deleted");
        Ok(())
    }

    pub async fn info(&self) -> Result<DatabaseInfo, AppError> {
        let (exists, size_bytes) = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => (true, meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (false, 0),
            Err(e) => return Err(e.into()),
        };
        Ok(DatabaseInfo {
            path: self.path.clone(),
            exists,
            size_bytes,
        })
    }
}
