//! Connection pooling and migration embedding. Per spec.md §1/§6 the core
//! *consumes* a database handle from its caller rather than owning connection
//! bootstrapping end-to-end, but it still owns the pool type alias and the
//! embedded migration set, exactly as the teacher's `db.rs` does — the
//! difference is that `new_connection_pool` is a convenience constructor for
//! callers (and tests) rather than a lazily-initialized global.

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

pub type Connection = PooledConnection<ConnectionManager<PgConnection>>;
pub type ConnectionPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Builds a connection pool from a `postgres://` URL. Sized to the number of
/// CPUs by default, matching the teacher's approach of sizing to the async
/// runtime's worker count.
pub fn new_connection_pool(database_url: &str) -> Result<ConnectionPool, PoolError> {
    let manager = ConnectionManager::new(database_url);
    Pool::builder()
        .max_size(std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(4))
        .max_lifetime(None)
        .idle_timeout(None)
        .test_on_check_out(true)
        .build(manager)
}

/// Runs any pending embedded migrations. Left to the caller to invoke once at
/// process start; the core never runs migrations implicitly on a query path.
pub fn run_migrations(conn: &mut PgConnection) -> diesel::migration::Result<()> {
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}
