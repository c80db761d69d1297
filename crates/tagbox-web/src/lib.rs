//! JSON API for tagbox
//!
//! Routes are grouped per resource (`*_routes()` functions) and merged in
//! [`server::build_router`]. Handlers are thin: they extract the caller's
//! principal and payload, call [`tagbox_core::TagboxService`] and shape the
//! result into transfer views.

pub mod principal;
pub mod routes;
pub mod server;
pub mod state;

mod error;

pub use error::{Result, WebError};
pub use principal::MaybePrincipal;
pub use server::{build_router, start_server};
pub use state::AppState;
