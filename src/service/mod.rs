//! Services: request validation, generic CRUD, integrity-checked writes, statistics.

mod crud;
pub mod entity;
mod stats;
mod validation;
pub use crud::{CrudService, DEFAULT_LIMIT};
pub use entity::{Body, EntityService};
pub use stats::StatsService;
pub use validation::RequestValidator;
