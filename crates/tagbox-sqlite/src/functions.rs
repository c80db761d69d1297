//! Application-defined SQL functions
//!
//! SQLite's built-in `lower()` folds ASCII only. Text search instead calls
//! back into Rust so it behaves exactly like every other store.

use crate::error::SqliteResult;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use tagbox_core::filter::search_matches;

/// `tagbox_search(needle, title, description)`, true when either text
/// contains `needle` ignoring case
pub const SEARCH_FUNCTION: &str = "tagbox_search";

/// Register every function on `conn`. Functions are per connection.
pub fn register_functions(conn: &Connection) -> SqliteResult<()> {
    conn.create_scalar_function(
        SEARCH_FUNCTION,
        3,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let needle: String = ctx.get(0)?;
            let title: Option<String> = ctx.get(1)?;
            let description: Option<String> = ctx.get(2)?;
            Ok(search_matches(
                &needle,
                title.as_deref(),
                description.as_deref(),
            ))
        },
    )?;
    Ok(())
}
