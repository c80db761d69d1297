//! Tag registry queries

use super::{format_timestamp, timestamp_column};
use crate::error::{SqliteError, SqliteResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tagbox_core::model::{Tag, TagId, TagName};

/// Return the tag named `name`, inserting it first if it does not exist
pub fn get_or_create_tx(conn: &Connection, name: &TagName, now: DateTime<Utc>) -> SqliteResult<Tag> {
    conn.execute(
        r#"
        INSERT INTO tags (name, created_at)
        VALUES (?1, ?2)
        ON CONFLICT(name) DO NOTHING
        "#,
        params![name.as_str(), format_timestamp(now)],
    )?;

    find_one_tx(conn, name.as_str())?
        .ok_or_else(|| SqliteError::NotFound(format!("tag '{}' after insert", name)))
}

fn find_one_tx(conn: &Connection, name: &str) -> SqliteResult<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, name, created_at FROM tags WHERE name = ?1",
            [name],
            row_to_tag,
        )
        .optional()?;
    Ok(tag)
}

/// Tags named exactly `name`
pub fn find_tx(conn: &Connection, name: &str) -> SqliteResult<Vec<Tag>> {
    Ok(find_one_tx(conn, name)?.into_iter().collect())
}

pub fn list_tx(conn: &Connection) -> SqliteResult<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM tags ORDER BY name")?;
    let tags = stmt
        .query_map([], row_to_tag)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

pub(crate) fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: TagId(row.get(0)?),
        name: row.get(1)?,
        created_at: timestamp_column(row, 2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::apply_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_get_or_create_reuses_row() {
        let conn = conn();
        let name = TagName::parse("rust").unwrap();
        let first = get_or_create_tx(&conn, &name, Utc::now()).unwrap();
        let second = get_or_create_tx(&conn, &name, Utc::now()).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(list_tx(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let conn = conn();
        get_or_create_tx(&conn, &TagName::parse("rust").unwrap(), Utc::now()).unwrap();
        get_or_create_tx(&conn, &TagName::parse("Rust").unwrap(), Utc::now()).unwrap();
        assert_eq!(list_tx(&conn).unwrap().len(), 2);
        assert!(find_tx(&conn, "RUST").unwrap().is_empty());
    }

    #[test]
    fn test_list_is_ordered_by_name() {
        let conn = conn();
        for raw in ["zeta", "alpha", "mid"] {
            get_or_create_tx(&conn, &TagName::parse(raw).unwrap(), Utc::now()).unwrap();
        }
        let names: Vec<String> = list_tx(&conn).unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
