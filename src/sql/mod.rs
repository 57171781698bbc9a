//! Parameterized SQL from the resolved model.

mod builder;
mod params;
pub use builder::*;
pub(crate) use builder::quoted;
pub use params::PgBindValue;
