//! Persistence layer: libSQL-backed storage for answers and the staff roster.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{RespondentStore, RosterStore};
