mod auth;
mod elements;
mod health;
mod tags;
mod users;

pub use auth::auth_routes;
pub use elements::element_routes;
pub use health::health_routes;
pub use tags::tag_routes;
pub use users::user_routes;

use serde::Serialize;

/// Envelope for list endpoints
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub results: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(results: Vec<T>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}
