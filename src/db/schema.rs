//! SQL generation from a [`Record`]'s schema declaration.
//! Table and column names come from `'static` declarations, never from input.

use super::models::Record;

/// `CREATE TABLE IF NOT EXISTS` with:
/// - `id` INTEGER PRIMARY KEY AUTOINCREMENT
/// - every declared column with its declared type
pub fn create_table_sql<T: Record>() -> String {
    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY AUTOINCREMENT",
        T::TABLE
    );
    for col in T::COLUMNS {
        ddl.push_str(&format!(",\n    {} {}", col.name, col.sql_type));
    }
    ddl.push_str("\n)");
    ddl
}

pub(crate) fn select_all_sql<T: Record>() -> String {
    format!("SELECT {} FROM {} ORDER BY id", column_list::<T>(true), T::TABLE)
}

pub(crate) fn select_by_id_sql<T: Record>() -> String {
    format!(
        "SELECT {} FROM {} WHERE id = ?",
        column_list::<T>(true),
        T::TABLE
    )
}

pub(crate) fn insert_sql<T: Record>() -> String {
    let placeholders = vec!["?"; T::COLUMNS.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::TABLE,
        column_list::<T>(false),
        placeholders
    )
}

pub(crate) fn update_sql<T: Record>() -> String {
    let assignments = T::COLUMNS
        .iter()
        .map(|c| format!("{} = ?", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("UPDATE {} SET {} WHERE id = ?", T::TABLE, assignments)
}

pub(crate) fn delete_by_id_sql<T: Record>() -> String {
    format!("DELETE FROM {} WHERE id = ?", T::TABLE)
}

pub(crate) fn delete_all_sql<T: Record>() -> String {
    format!("DELETE FROM {}", T::TABLE)
}

pub(crate) fn count_sql<T: Record>() -> String {
    format!("SELECT COUNT(*) FROM {}", T::TABLE)
}

fn column_list<T: Record>(with_id: bool) -> String {
    let names = T::COLUMNS.iter().map(|c| c.name);
    if with_id {
        std::iter::once("id").chain(names).collect::<Vec<_>>().join(", ")
    } else {
        names.collect::<Vec<_>>().join(", ")
    }
}
