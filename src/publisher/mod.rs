//! Publisher (component F, spec §4.F). Emits a web-servable tree at a target
//! path by hard-linking from the Pool and either replaying mirrored metadata
//! verbatim or regenerating it from the Store.

mod apk;
mod apt;
mod helm;
mod rpm;

use crate::config::{Ecosystem, Mode};
use crate::error::Error;
use crate::model::{ContentItem, RepositoryFile};
use crate::pool::Pool;
use crate::syncer::RepositoryLock;
use crate::store::Store;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The resolved set of members to publish, independent of where they came
/// from (live repository, snapshot, or view) — spec §4.F step 1. Carries the
/// source `Repository`'s ecosystem-specific layout fields (APT suite/
/// components, APK branch/repository/architecture) so FILTERED/HOSTED index
/// regeneration reproduces the repository's actual configured layout rather
/// than a fixed convention.
pub struct PublishSet {
    pub ecosystem: Ecosystem,
    pub mode: Mode,
    pub content_items: Vec<ContentItem>,
    pub repository_files: Vec<RepositoryFile>,
    pub apt_suite: Option<String>,
    pub apt_components: Vec<String>,
    pub apk_branch: Option<String>,
    pub apk_repository: Option<String>,
    pub apk_architecture: Option<String>,
}

pub struct Publisher<'a> {
    pool: &'a Pool,
}

impl<'a> Publisher<'a> {
    pub fn new(pool: &'a Pool) -> Self {
        Self { pool }
    }

    /// Builds a sibling temp tree, emits content and metadata into it, then
    /// atomically swaps it over `target`. A failed publish leaves the
    /// previous tree untouched (spec §4.F "Failure semantics").
    pub fn publish(&self, store: &Store, set: &PublishSet, target: &Path) -> Result<(), Error> {
        let _lock = RepositoryLock::acquire_publish(store, &target.to_string_lossy())?;

        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        let staging = parent.join(format!(".chantal-publish-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&staging).map_err(|source| pool_io_err(&staging, source))?;

        let result = self.emit(set, &staging);
        if result.is_err() {
            let _ = std::fs::remove_dir_all(&staging);
            return result;
        }

        self.swap(&staging, target)?;
        Ok(())
    }

    fn emit(&self, set: &PublishSet, staging: &Path) -> Result<(), Error> {
        match set.ecosystem {
            Ecosystem::Rpm => rpm::emit(self.pool, set, staging),
            Ecosystem::Deb => apt::emit(self.pool, set, staging),
            Ecosystem::Apk => apk::emit(self.pool, set, staging),
            Ecosystem::Helm => helm::emit(self.pool, set, staging),
        }
    }

    /// Two-step swap so a concurrent reader of `target` never observes a
    /// half-constructed tree (spec §4.F step 5).
    fn swap(&self, staging: &Path, target: &Path) -> Result<(), Error> {
        if target.exists() {
            let trash = target.with_extension(format!("chantal-trash-{}", Uuid::new_v4()));
            std::fs::rename(target, &trash).map_err(|source| pool_io_err(target, source))?;
            std::fs::rename(staging, target).map_err(|source| pool_io_err(staging, source))?;
            std::fs::remove_dir_all(&trash).map_err(|source| pool_io_err(&trash, source))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|source| pool_io_err(parent, source))?;
            }
            std::fs::rename(staging, target).map_err(|source| pool_io_err(staging, source))?;
        }
        Ok(())
    }
}

pub(crate) fn pool_io_err(path: &Path, source: std::io::Error) -> Error {
    Error::Pool(crate::error::PoolError::Io { path: path.to_path_buf(), source })
}

/// Links `item`'s blob into `target_path`, refusing to silently replace a
/// different item already occupying that filename (spec §4.F step 3; see
/// DESIGN.md Open Question decision #2 — no ecosystem opts into "last write
/// wins").
pub(crate) fn link_content(pool: &Pool, item: &ContentItem, target_path: &Path) -> Result<(), Error> {
    check_no_conflict(pool, crate::pool::Bucket::Content, &item.sha256, target_path)?;
    pool.link_into(crate::pool::Bucket::Content, &item.sha256, target_path)?;
    Ok(())
}

pub(crate) fn link_file(pool: &Pool, file: &RepositoryFile, target_path: &Path) -> Result<(), Error> {
    check_no_conflict(pool, crate::pool::Bucket::Files, &file.sha256, target_path)?;
    pool.link_into(crate::pool::Bucket::Files, &file.sha256, target_path)?;
    Ok(())
}

fn check_no_conflict(pool: &Pool, bucket: crate::pool::Bucket, sha256: &crate::checksum::Sha256Checksum, target_path: &Path) -> Result<(), Error> {
    if target_path.exists() && !pool.linked_at_matches(bucket, sha256, target_path) {
        let filename = target_path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        return Err(Error::PublishConflict { filename });
    }
    Ok(())
}

pub(crate) fn mirror_files(pool: &Pool, set: &PublishSet, staging: &Path) -> Result<(), Error> {
    for file in &set.repository_files {
        let target_path: PathBuf = staging.join(&file.original_path);
        link_file(pool, file, &target_path)?;
    }
    Ok(())
}
