//! Route groups. Each takes the shared state and returns a finished `Router`.

mod common;
mod entity;
mod league;
mod users;
pub use common::common_routes_with_ready;
pub use entity::entity_routes;
pub use league::league_routes;
pub use users::{auth_routes, user_routes};
