mod insert;
mod models;
mod open;
mod query;
mod schema;

pub use insert::*;
pub use models::*;
pub use open::Db;
