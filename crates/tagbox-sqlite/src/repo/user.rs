//! User and token queries

use super::{format_timestamp, timestamp_column};
use crate::error::{SqliteError, SqliteResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tagbox_core::model::{NewUser, User, UserId};

const COLUMNS: &str = "id, username, password_hash, is_admin, created_at";

fn username_taken(conn: &Connection, username: &str, except: Option<UserId>) -> SqliteResult<bool> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id IS NOT ?2)",
        params![username, except.map(|id| id.0)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn insert_tx(conn: &Connection, new: &NewUser) -> SqliteResult<UserId> {
    if username_taken(conn, &new.username, None)? {
        return Err(SqliteError::Conflict(format!(
            "username '{}' is already taken",
            new.username
        )));
    }

    conn.execute(
        r#"
        INSERT INTO users (username, password_hash, is_admin, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![
            new.username,
            new.password_hash,
            new.is_admin,
            format_timestamp(new.created_at),
        ],
    )?;
    Ok(UserId(conn.last_insert_rowid()))
}

pub fn get_tx(conn: &Connection, id: UserId) -> SqliteResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
            [id.0],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn by_username_tx(conn: &Connection, username: &str) -> SqliteResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM users WHERE username = ?1"),
            [username],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn list_tx(conn: &Connection) -> SqliteResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM users ORDER BY id"))?;
    let users = stmt
        .query_map([], row_to_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn save_tx(conn: &Connection, user: &User) -> SqliteResult<()> {
    if username_taken(conn, &user.username, Some(user.id))? {
        return Err(SqliteError::Conflict(format!(
            "username '{}' is already taken",
            user.username
        )));
    }

    let changed = conn.execute(
        "UPDATE users SET username = ?1, password_hash = ?2, is_admin = ?3 WHERE id = ?4",
        params![user.username, user.password_hash, user.is_admin, user.id.0],
    )?;
    if changed == 0 {
        return Err(SqliteError::NotFound(format!("user {}", user.id)));
    }
    Ok(())
}

pub fn token_for_user_tx(conn: &Connection, user: UserId) -> SqliteResult<Option<String>> {
    let key = conn
        .query_row(
            "SELECT key FROM auth_tokens WHERE user_id = ?1",
            [user.0],
            |row| row.get(0),
        )
        .optional()?;
    Ok(key)
}

/// Store `key` as the user's only token, replacing any previous one
pub fn insert_token_tx(
    conn: &Connection,
    key: &str,
    user: UserId,
    now: DateTime<Utc>,
) -> SqliteResult<()> {
    conn.execute("DELETE FROM auth_tokens WHERE user_id = ?1", [user.0])?;
    conn.execute(
        "INSERT INTO auth_tokens (key, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![key, user.0, format_timestamp(now)],
    )?;
    Ok(())
}

pub fn user_for_token_tx(conn: &Connection, key: &str) -> SqliteResult<Option<User>> {
    let user = conn
        .query_row(
            r#"
            SELECT u.id, u.username, u.password_hash, u.is_admin, u.created_at
            FROM users u
            JOIN auth_tokens a ON a.user_id = u.id
            WHERE a.key = ?1
            "#,
            [key],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        password_hash: row.get(2)?,
        is_admin: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}
