//! Pool Reconciler (component I, spec §4.I). Cross-checks the Pool and the
//! Store — neither of those two knows about the other (spec §9 "Ownership");
//! this is the one module that reads both. Grounded on the teacher's
//! `filesystem::calculate_directory_size` walk pattern, generalized to a
//! streaming three-way diff against `content_items`/`repository_files`.

use crate::checksum::Sha256Checksum;
use crate::error::{PoolError, StoreError};
use crate::pool::{Bucket, Pool, VerifyOutcome};
use crate::store::Store;
use std::collections::HashSet;
use std::path::PathBuf;

/// Restricts a reconciliation pass to the whole pool or to one repository's
/// referenced set (spec §4.I "Scoping").
#[derive(Debug, Clone)]
pub enum Scope {
    WholePool,
    Repository(String),
}

#[derive(Debug, Clone)]
pub struct Orphan {
    pub bucket: Bucket,
    pub sha256: Sha256Checksum,
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct Missing {
    pub bucket: Bucket,
    pub sha256: Sha256Checksum,
}

#[derive(Debug, Clone)]
pub struct Corrupt {
    pub bucket: Bucket,
    pub sha256: Sha256Checksum,
    pub actual: Sha256Checksum,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub orphans: Vec<Orphan>,
    pub missing: Vec<Missing>,
    pub corrupt: Vec<Corrupt>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    pub content_blobs: u64,
    pub content_bytes: u64,
    pub files_blobs: u64,
    pub files_bytes: u64,
}

pub struct Reconciler<'a> {
    pool: &'a Pool,
    store: &'a Store,
}

impl<'a> Reconciler<'a> {
    pub fn new(pool: &'a Pool, store: &'a Store) -> Self {
        Self { pool, store }
    }

    pub fn stats(&self) -> Result<PoolStats, StoreError> {
        let mut stats = PoolStats::default();
        for (_, _, size) in self.pool.iter_blobs(Bucket::Content) {
            stats.content_blobs += 1;
            stats.content_bytes += size;
        }
        for (_, _, size) in self.pool.iter_blobs(Bucket::Files) {
            stats.files_blobs += 1;
            stats.files_bytes += size;
        }
        Ok(stats)
    }

    /// Reports orphans (pool files with no DB reference) and missing entries
    /// (DB references with no pool file), without rehashing anything.
    pub fn orphans_and_missing(&self, scope: &Scope) -> Result<ReconcileReport, StoreError> {
        let mut report = ReconcileReport::default();

        let referenced_content: HashSet<Sha256Checksum> = match scope {
            Scope::WholePool => self.store.all_content_item_checksums()?.into_iter().collect(),
            Scope::Repository(id) => self.store.repository_content_item_checksums(id)?.into_iter().collect(),
        };
        let referenced_files: HashSet<Sha256Checksum> = match scope {
            Scope::WholePool => self.store.all_repository_file_checksums()?.into_iter().collect(),
            Scope::Repository(id) => self.store.repository_file_checksums(id)?.into_iter().collect(),
        };

        let mut seen_content = HashSet::new();
        for (sha256, path, size_bytes) in self.pool.iter_blobs(Bucket::Content) {
            seen_content.insert(sha256);
            if !referenced_content.contains(&sha256) {
                report.orphans.push(Orphan { bucket: Bucket::Content, sha256, path, size_bytes });
            }
        }
        for sha256 in referenced_content.difference(&seen_content) {
            report.missing.push(Missing { bucket: Bucket::Content, sha256: *sha256 });
        }

        let mut seen_files = HashSet::new();
        for (sha256, path, size_bytes) in self.pool.iter_blobs(Bucket::Files) {
            seen_files.insert(sha256);
            if !referenced_files.contains(&sha256) {
                report.orphans.push(Orphan { bucket: Bucket::Files, sha256, path, size_bytes });
            }
        }
        for sha256 in referenced_files.difference(&seen_files) {
            report.missing.push(Missing { bucket: Bucket::Files, sha256: *sha256 });
        }

        Ok(report)
    }

    /// Streaming full-checksum verify of every referenced blob in scope.
    /// Corruption is reported, never auto-repaired (spec §4.A).
    pub fn verify(&self, scope: &Scope) -> Result<Vec<Corrupt>, StoreError> {
        let referenced_content: Vec<Sha256Checksum> = match scope {
            Scope::WholePool => self.store.all_content_item_checksums()?,
            Scope::Repository(id) => self.store.repository_content_item_checksums(id)?,
        };
        let referenced_files: Vec<Sha256Checksum> = match scope {
            Scope::WholePool => self.store.all_repository_file_checksums()?,
            Scope::Repository(id) => self.store.repository_file_checksums(id)?,
        };

        let mut corrupt = Vec::new();
        for sha256 in referenced_content {
            if let Ok(VerifyOutcome::Corrupt { actual }) = self.pool.verify(Bucket::Content, &sha256) {
                corrupt.push(Corrupt { bucket: Bucket::Content, sha256, actual });
            }
        }
        for sha256 in referenced_files {
            if let Ok(VerifyOutcome::Corrupt { actual }) = self.pool.verify(Bucket::Files, &sha256) {
                corrupt.push(Corrupt { bucket: Bucket::Files, sha256, actual });
            }
        }
        Ok(corrupt)
    }

    /// Deletes orphan blobs found by [`Self::orphans_and_missing`]. Returns
    /// the number of blobs actually removed. `dry_run` reports what would be
    /// deleted without touching the filesystem.
    pub fn cleanup(&self, scope: &Scope, dry_run: bool) -> Result<usize, PoolError> {
        let report = self.orphans_and_missing(scope).map_err(|err| match err {
            StoreError::Connection(pool_err) => PoolError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other(pool_err.to_string()),
            },
            other => PoolError::Io { path: PathBuf::new(), source: std::io::Error::other(other.to_string()) },
        })?;
        if dry_run {
            return Ok(report.orphans.len());
        }
        let mut removed = 0;
        for orphan in &report.orphans {
            self.pool.delete(orphan.bucket, &orphan.sha256)?;
            removed += 1;
        }
        Ok(removed)
    }
}
