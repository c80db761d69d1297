//! Element row queries

use super::{format_timestamp, tagging, timestamp_column};
use crate::error::{SqliteError, SqliteResult};
use crate::functions::SEARCH_FUNCTION;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tagbox_core::model::{ElementId, ElementRecord, NewElement, Ownership, UserId};
use tagbox_core::storage::ElementQuery;

const COLUMNS: &str = "id, title, description, owner_id, created_at, updated_at";

pub fn insert_tx(conn: &Connection, new: &NewElement) -> SqliteResult<ElementId> {
    if let Some(owner) = new.ownership.owner() {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            [owner.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(SqliteError::NotFound(format!("user {owner}")));
        }
    }

    let created_at = format_timestamp(new.created_at);
    conn.execute(
        r#"
        INSERT INTO elements (title, description, owner_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
        params![
            new.title,
            new.description,
            new.ownership.owner().map(|id| id.0),
            created_at,
        ],
    )?;

    Ok(ElementId(conn.last_insert_rowid()))
}

pub fn get_tx(conn: &Connection, id: ElementId) -> SqliteResult<Option<ElementRecord>> {
    let record = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM elements WHERE id = ?1"),
            [id.0],
            row_to_element,
        )
        .optional()?;
    Ok(record)
}

/// Write title, description and `updated_at`. Ownership never changes.
pub fn save_tx(conn: &Connection, record: &ElementRecord) -> SqliteResult<()> {
    let changed = conn.execute(
        "UPDATE elements SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            record.title,
            record.description,
            format_timestamp(record.updated_at),
            record.id.0,
        ],
    )?;
    if changed == 0 {
        return Err(SqliteError::NotFound(format!("element {}", record.id)));
    }
    Ok(())
}

/// Delete a row. Taggings go with it through `ON DELETE CASCADE`.
pub fn delete_tx(conn: &Connection, id: ElementId) -> SqliteResult<bool> {
    // Explicit so the cascade holds even with foreign keys switched off
    conn.execute("DELETE FROM taggings WHERE element_id = ?1", [id.0])?;
    let removed = conn.execute("DELETE FROM elements WHERE id = ?1", [id.0])?;
    Ok(removed > 0)
}

/// Rows matching `query`, ordered by id.
///
/// Tag filter, search and limit are one statement, so the limit is honored
/// however many elements carry a tag.
pub fn query_tx(conn: &Connection, query: &ElementQuery<'_>) -> SqliteResult<Vec<ElementRecord>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some((subquery, names)) = tagging::matching_elements_sql(query.tags, query.combinator) {
        clauses.push(format!("id IN ({subquery})"));
        values.extend(names.into_iter().map(Value::Text));
    }

    if let Some(needle) = query.search {
        clauses.push(format!("{SEARCH_FUNCTION}(?, title, description)"));
        values.push(Value::Text(needle.to_string()));
    }

    let mut sql = format!("SELECT {COLUMNS} FROM elements");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY id");
    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params_from_iter(values), row_to_element)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn row_to_element(row: &rusqlite::Row) -> rusqlite::Result<ElementRecord> {
    let owner: Option<i64> = row.get(3)?;
    Ok(ElementRecord {
        id: ElementId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        ownership: Ownership::from_owner(owner.map(UserId)),
        created_at: timestamp_column(row, 4)?,
        updated_at: timestamp_column(row, 5)?,
    })
}
