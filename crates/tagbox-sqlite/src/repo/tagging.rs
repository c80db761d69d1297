//! Element/tag association queries

use super::{format_timestamp, placeholders, tag::row_to_tag};
use crate::error::{SqliteError, SqliteResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::BTreeSet;
use tagbox_core::filter::Combinator;
use tagbox_core::model::{ElementId, Tag, TagId};

/// Link a tag to an existing element. Linking twice keeps one row.
pub fn attach_tx(
    conn: &Connection,
    element: ElementId,
    tag: TagId,
    now: DateTime<Utc>,
) -> SqliteResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM elements WHERE id = ?1)",
        [element.0],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(SqliteError::NotFound(format!("element {element}")));
    }

    conn.execute(
        r#"
        INSERT INTO taggings (element_id, tag_id, created_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(element_id, tag_id) DO NOTHING
        "#,
        params![element.0, tag.0, format_timestamp(now)],
    )?;
    Ok(())
}

pub fn detach_tx(conn: &Connection, element: ElementId, tag: TagId) -> SqliteResult<()> {
    conn.execute(
        "DELETE FROM taggings WHERE element_id = ?1 AND tag_id = ?2",
        params![element.0, tag.0],
    )?;
    Ok(())
}

/// Tags of one element ordered by name
pub fn tags_of_tx(conn: &Connection, element: ElementId) -> SqliteResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT t.id, t.name, t.created_at
        FROM tags t
        JOIN taggings tg ON tg.tag_id = t.id
        WHERE tg.element_id = ?1
        ORDER BY t.name
        "#,
    )?;
    let tags = stmt
        .query_map([element.0], row_to_tag)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Subquery selecting ids of elements that satisfy a tag filter, with the
/// names it binds. `None` when there are no names.
///
/// Binds one parameter per distinct name, never one per element.
pub(crate) fn matching_elements_sql(
    names: &[String],
    combinator: Combinator,
) -> Option<(String, Vec<String>)> {
    let distinct: Vec<String> = names
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect();
    if distinct.is_empty() {
        return None;
    }

    let select = format!(
        "SELECT tg.element_id FROM taggings tg JOIN tags t ON t.id = tg.tag_id \
         WHERE t.name IN ({})",
        placeholders(distinct.len())
    );
    let sql = match combinator {
        Combinator::Any => select,
        // An unregistered name can never reach the count
        Combinator::All => format!(
            "{select} GROUP BY tg.element_id HAVING COUNT(DISTINCT t.name) = {}",
            distinct.len()
        ),
    };
    Some((sql, distinct))
}

/// Elements carrying at least one of `names`
pub fn elements_with_any_tx(conn: &Connection, names: &[String]) -> SqliteResult<BTreeSet<ElementId>> {
    match matching_elements_sql(names, Combinator::Any) {
        Some((sql, names)) => collect_ids(conn, &sql, &names),
        None => Ok(BTreeSet::new()),
    }
}

/// Elements carrying every one of `names`. An unregistered name matches nothing.
pub fn elements_with_all_tx(conn: &Connection, names: &[String]) -> SqliteResult<BTreeSet<ElementId>> {
    match matching_elements_sql(names, Combinator::All) {
        Some((sql, names)) => collect_ids(conn, &sql, &names),
        None => Ok(BTreeSet::new()),
    }
}

fn collect_ids<P: rusqlite::ToSql>(
    conn: &Connection,
    sql: &str,
    values: &[P],
) -> SqliteResult<BTreeSet<ElementId>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params_from_iter(values.iter()), |row| row.get::<_, i64>(0))?
        .map(|id| id.map(ElementId))
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::tag::get_or_create_tx;
    use crate::schema::apply_migrations;
    use tagbox_core::model::TagName;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        apply_migrations(&conn).unwrap();
        conn.execute_batch("INSERT INTO elements (id) VALUES (1), (2), (3);")
            .unwrap();
        conn
    }

    fn tag(conn: &Connection, name: &str) -> TagId {
        get_or_create_tx(conn, &TagName::parse(name).unwrap(), Utc::now())
            .unwrap()
            .id
    }

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_attach_is_idempotent() {
        let conn = setup();
        let a = tag(&conn, "a");
        attach_tx(&conn, ElementId(1), a, Utc::now()).unwrap();
        attach_tx(&conn, ElementId(1), a, Utc::now()).unwrap();
        assert_eq!(tags_of_tx(&conn, ElementId(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_attach_to_missing_element_fails() {
        let conn = setup();
        let a = tag(&conn, "a");
        let result = attach_tx(&conn, ElementId(99), a, Utc::now());
        assert!(matches!(result, Err(SqliteError::NotFound(_))));
    }

    #[test]
    fn test_detach_missing_pair_is_noop() {
        let conn = setup();
        let a = tag(&conn, "a");
        detach_tx(&conn, ElementId(1), a).unwrap();
        assert!(tags_of_tx(&conn, ElementId(1)).unwrap().is_empty());
    }

    #[test]
    fn test_any_and_all() {
        let conn = setup();
        let a = tag(&conn, "a");
        let b = tag(&conn, "b");
        attach_tx(&conn, ElementId(1), a, Utc::now()).unwrap();
        attach_tx(&conn, ElementId(1), b, Utc::now()).unwrap();
        attach_tx(&conn, ElementId(2), a, Utc::now()).unwrap();

        let any = elements_with_any_tx(&conn, &names(&["a", "b"])).unwrap();
        assert_eq!(any, BTreeSet::from([ElementId(1), ElementId(2)]));

        let all = elements_with_all_tx(&conn, &names(&["a", "b"])).unwrap();
        assert_eq!(all, BTreeSet::from([ElementId(1)]));

        let duplicated = elements_with_all_tx(&conn, &names(&["a", "a"])).unwrap();
        assert_eq!(duplicated, BTreeSet::from([ElementId(1), ElementId(2)]));

        let unknown = elements_with_all_tx(&conn, &names(&["a", "nope"])).unwrap();
        assert!(unknown.is_empty());
    }
}
