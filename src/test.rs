//! Shared test harness for integration tests that need a real Postgres
//! database (the Store's transactions and constraints are not meaningfully
//! testable against a fake). Grounded on the teacher's `test.rs`
//! `get_connection`/`get_state`/`reset_database` pattern, minus the
//! HTTP-server scaffolding this crate has no use for: a `DATABASE_URL`-backed
//! connection pool, migrations run once per process, and a per-test
//! `TRUNCATE` instead of a full database recreation.

use crate::db::{self, ConnectionPool};
use crate::store::Store;
use std::sync::OnceLock;

fn database_url() -> String {
    std::env::var("CHANTAL_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("CHANTAL_TEST_DATABASE_URL or DATABASE_URL must point at a scratch Postgres database for integration tests")
}

fn shared_pool() -> &'static ConnectionPool {
    static POOL: OnceLock<ConnectionPool> = OnceLock::new();
    POOL.get_or_init(|| {
        let pool = db::new_connection_pool(&database_url()).expect("test database must be reachable");
        let mut conn = pool.get().expect("test database must hand out a connection");
        db::run_migrations(&mut conn).expect("test database migrations must apply cleanly");
        pool
    })
}

/// Returns a [`Store`] over the shared test connection pool, with every table
/// truncated first so each test starts from an empty graph. Tests that use
/// this harness must run single-threaded (`cargo test -- --test-threads=1`)
/// or isolate their repository/view ids, since truncation is process-wide.
pub fn test_store() -> Store {
    let pool = shared_pool().clone();
    let mut conn = pool.get().expect("test database must hand out a connection");
    diesel::RunQueryDsl::execute(
        diesel::sql_query(
            "TRUNCATE repositories, content_items, repository_files, views \
             RESTART IDENTITY CASCADE",
        ),
        &mut conn,
    )
    .expect("truncate must succeed between tests");
    Store::new(pool)
}
