//! Relational metadata layer (component B, spec §4.B). Grounded on the
//! teacher's `db.rs` pooling plus the transaction-scoped helpers that used to
//! live in its dead `util.rs` (`delete`, `update_single_row`), generalized
//! into entity-specific CRUD and the junction/snapshot transactions the spec
//! requires.

mod repository;
mod snapshot;
mod sync_history;
mod view;

use crate::db::{Connection, ConnectionPool};
use crate::error::StoreError;
use diesel::r2d2::PoolError;
use diesel::Connection as _;

/// Thin wrapper around a connection pool; every public method opens (or
/// reuses) one pooled connection and, where the spec requires atomicity,
/// wraps its body in a single serializable transaction (spec §4.B
/// "Concurrency").
pub struct Store {
    pool: ConnectionPool,
}

impl Store {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<Connection, PoolError> {
        self.pool.get()
    }

    /// Exposed for [`crate::syncer::RepositoryLock`] and the publish lock,
    /// which need to hold a single physical connection for the lifetime of
    /// a `pg_advisory_lock` (spec §5 "Per-repository lock", "Publish lock").
    pub(crate) fn lock_connection(&self) -> Result<Connection, StoreError> {
        self.conn().map_err(StoreError::Connection)
    }
}

pub use repository::*;
pub use snapshot::*;
pub use sync_history::*;
pub use view::*;

pub(crate) fn serializable<T>(
    conn: &mut diesel::PgConnection,
    body: impl FnOnce(&mut diesel::PgConnection) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    conn.build_transaction().serializable().run(body)
}
