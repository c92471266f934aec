use crate::db::Connection;
use crate::error::{Error, StoreError};
use crate::store::Store;
use diesel::RunQueryDsl;

/// Exclusive advisory lock keyed by a string, backed by Postgres'
/// session-level `pg_advisory_lock` (spec §5 "Per-repository lock", "Publish
/// lock"). Holds its connection out of the pool for its lifetime and unlocks
/// on drop so the lock never outlives the guard even on an early return.
pub struct RepositoryLock {
    conn: Connection,
    key: i64,
}

impl RepositoryLock {
    pub fn acquire(store: &Store, repository_id: &str) -> Result<Self, Error> {
        Self::acquire_keyed(store, "repository", repository_id)
    }

    pub fn acquire_publish(store: &Store, target_path: &str) -> Result<Self, Error> {
        Self::acquire_keyed(store, "publish", target_path)
    }

    fn acquire_keyed(store: &Store, namespace: &str, id: &str) -> Result<Self, Error> {
        let mut conn = store.lock_connection()?;
        let key = lock_key(namespace, id);
        diesel::sql_query("SELECT pg_advisory_lock($1)")
            .bind::<diesel::sql_types::BigInt, _>(key)
            .execute(&mut conn)
            .map_err(StoreError::from)?;
        Ok(Self { conn, key })
    }
}

impl Drop for RepositoryLock {
    fn drop(&mut self) {
        let _ = diesel::sql_query("SELECT pg_advisory_unlock($1)")
            .bind::<diesel::sql_types::BigInt, _>(self.key)
            .execute(&mut self.conn);
    }
}

/// Hashes a namespace+id pair into the `bigint` key `pg_advisory_lock` needs.
fn lock_key(namespace: &str, id: &str) -> i64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    namespace.hash(&mut hasher);
    id.hash(&mut hasher);
    hasher.finish() as i64
}
