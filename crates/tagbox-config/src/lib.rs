//! # tagbox configuration
//!
//! Settings for the server, the database, the access policy and password
//! hashing.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, `TAGBOX_*`
//! environment variables, command-line flags. The last step belongs to the
//! binary, which mutates the loaded [`AppConfig`] directly.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [database]
//! path = "/var/lib/tagbox/tagbox.db"
//!
//! [policy]
//! allow_anonymous_create = false
//! unauthenticated_status = 401
//! ```

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::*;
