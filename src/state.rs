use crate::db::{DbPool, OrmConn};

/// Shared handles: `pool` for single-statement conditional updates,
/// `orm` for entity CRUD. Both point at the same database.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
}
