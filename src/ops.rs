//! The operations the core exposes to an external CLI dispatcher (spec.md §6
//! "Operations exposed to external CLI"). [`Engine`] is the single entry
//! point a caller constructs once per invocation from a validated
//! [`GlobalConfig`](crate::config::GlobalConfig) and a [`Store`] — it owns no
//! state of its own beyond the [`Pool`] and [`Store`] handles, mirroring the
//! teacher's `AppState` (pool + connection pool, no business state) while
//! dropping everything HTTP-specific.

use crate::config::{Ecosystem, Mode, RepositoryConfig};
use crate::download::{CancellationToken, DownloadManager};
use crate::error::Error;
use crate::model::{ContentItem, Repository, Snapshot, ViewSnapshot};
use crate::pool::Pool;
use crate::publisher::{Publisher, PublishSet};
use crate::reconcile::{Corrupt, Missing, Orphan, PoolStats, Reconciler, Scope};
use crate::store::{Store, SnapshotDiff, SyncReport};
use crate::syncer::Syncer;
use std::path::Path;

/// The per-repository outcome of [`Engine::check_updates`] (spec.md §6
/// `check_updates`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Changed,
    Error(String),
}

pub struct Engine {
    pool: Pool,
    store: Store,
}

impl Engine {
    pub fn new(pool: Pool, store: Store) -> Self {
        Self { pool, store }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// `sync(repository_id)` — runs the full pipeline for one repository
    /// (spec §4.E). Callers implementing `sync(all)` or `sync(pattern)` loop
    /// over their own repository list and call this once per match; the core
    /// does not interpret `all`/pattern selection itself (that is config/CLI
    /// policy, spec §1).
    pub async fn sync(&self, repository: &RepositoryConfig, cancel: &CancellationToken) -> Result<SyncReport, Error> {
        Syncer::new(&self.pool, &self.store).sync_repository(repository, cancel).await
    }

    /// `check_updates(repository_id)` — compares the upstream top-level index
    /// against the most recently mirrored one, without downloading any
    /// package payload (spec §6, §8 "Boundary behaviors" is silent on the
    /// exact mechanism; this follows the upstream-index-checksum approach
    /// implied by spec §4.D's "preserve verbatim" requirement).
    pub async fn check_updates(&self, repository: &RepositoryConfig) -> UpdateStatus {
        if repository.mode == Mode::Hosted {
            return UpdateStatus::UpToDate;
        }
        let (file_type, index_url) = match top_level_index(repository) {
            Ok(pair) => pair,
            Err(error) => return UpdateStatus::Error(error),
        };

        let download = match DownloadManager::for_repository(&crate::config::DownloadConfig::default(), repository, None) {
            Ok(manager) => manager,
            Err(error) => return UpdateStatus::Error(error.to_string()),
        };
        let bytes = match download.get(index_url.as_str()).await {
            Ok(response) => match response.bytes().await {
                Ok(bytes) => bytes,
                Err(error) => return UpdateStatus::Error(error.to_string()),
            },
            Err(error) => return UpdateStatus::Error(error.to_string()),
        };
        let fresh_sha256 = crate::checksum::sha256_bytes(bytes.as_ref());

        match self.store.latest_repository_file(&repository.id, file_type) {
            Ok(Some(existing)) if existing.sha256 == fresh_sha256 => UpdateStatus::UpToDate,
            Ok(_) => UpdateStatus::Changed,
            Err(error) => UpdateStatus::Error(error.to_string()),
        }
    }

    pub fn create_repository_snapshot(
        &self,
        repository_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Snapshot, Error> {
        self.store.create_snapshot(repository_id, name, description).map_err(Error::from)
    }

    pub fn create_view_snapshot(
        &self,
        view_name: &str,
        name: &str,
        description: Option<&str>,
        skip_empty: bool,
    ) -> Result<ViewSnapshot, Error> {
        self.store.create_view_snapshot(view_name, name, description, skip_empty).map_err(Error::from)
    }

    pub fn diff_snapshots(&self, repository_id: &str, a: &str, b: &str, ecosystem: Ecosystem) -> Result<SnapshotDiff, Error> {
        let snapshot_a = self.store.get_snapshot(repository_id, a)?;
        let snapshot_b = self.store.get_snapshot(repository_id, b)?;
        self.store.diff_snapshots(&snapshot_a, &snapshot_b, to_version_ecosystem(ecosystem)).map_err(Error::from)
    }

    pub fn copy_snapshot(
        &self,
        source_repository_id: &str,
        source_name: &str,
        target_repository_id: &str,
        target_name: &str,
    ) -> Result<Snapshot, Error> {
        self.store
            .copy_snapshot(source_repository_id, source_name, target_repository_id, target_name)
            .map_err(Error::from)
    }

    pub fn delete_repository_snapshot(&self, repository_id: &str, name: &str) -> Result<(), Error> {
        self.store.delete_snapshot(repository_id, name).map_err(Error::from)
    }

    pub fn delete_view_snapshot(&self, view_name: &str, name: &str) -> Result<(), Error> {
        self.store.delete_view_snapshot(view_name, name).map_err(Error::from)
    }

    /// `publish.repository(repository_id, target_path)` — publishes a
    /// repository's current (live) membership.
    pub fn publish_repository(&self, repository_id: &str, target_path: &Path) -> Result<(), Error> {
        let repository = self.store.get_repository(repository_id)?;
        let content_items = self.store.content_items_for_repository(repository_id)?;
        let repository_files = self.store.repository_files_for_repository(repository_id)?;
        let set = self.build_publish_set(&repository, content_items, repository_files)?;
        Publisher::new(&self.pool).publish(&self.store, &set, target_path)
    }

    /// `publish.snapshot(repository_id | view_name, snapshot_name, target_path)`.
    /// Resolution by repository vs. view is disambiguated by which lookup
    /// succeeds: a repository id that also happens to be a view name is a
    /// caller-policy naming collision the core does not attempt to resolve.
    pub fn publish_repository_snapshot(&self, repository_id: &str, snapshot_name: &str, target_path: &Path) -> Result<(), Error> {
        let repository = self.store.get_repository(repository_id)?;
        let snapshot = self.store.get_snapshot(repository_id, snapshot_name)?;
        let content_items = self.store.content_items_for_snapshot(snapshot.id)?;
        let repository_files = self.store.repository_files_for_snapshot(snapshot.id)?;
        let set = self.build_publish_set(&repository, content_items, repository_files)?;
        Publisher::new(&self.pool).publish(&self.store, &set, target_path)
    }

    /// Publishes a view snapshot: one PublishSet per constituent repository,
    /// emitted into `view_name/<repository_id>/` under `target_path` since
    /// the spec leaves cross-repository directory layout for a shared-type
    /// view unspecified beyond "one output tree" (spec §4.H).
    pub fn publish_view_snapshot(&self, view_name: &str, snapshot_name: &str, target_path: &Path) -> Result<(), Error> {
        let view_snapshot = self.store.get_view_snapshot(view_name, snapshot_name)?;
        let members = self.store.view_snapshot_members(view_snapshot.id)?;
        for member in members {
            let repository = self.store.get_repository(&member.repository_id)?;
            let content_items = self.store.content_items_for_snapshot(member.snapshot_id)?;
            let repository_files = self.store.repository_files_for_snapshot(member.snapshot_id)?;
            let set = self.build_publish_set(&repository, content_items, repository_files)?;
            let repository_target = target_path.join(&member.repository_id);
            Publisher::new(&self.pool).publish(&self.store, &set, &repository_target)?;
        }
        Ok(())
    }

    /// `publish.unpublish(target_path)` — removes a previously published tree.
    /// The database is never consulted or mutated (spec invariant 4,
    /// "Publication is a pure function of (pool ∪ database)").
    pub fn unpublish(&self, target_path: &Path) -> Result<(), Error> {
        let _lock = crate::syncer::RepositoryLock::acquire_publish(&self.store, &target_path.to_string_lossy())?;
        if target_path.exists() {
            std::fs::remove_dir_all(target_path)
                .map_err(|source| crate::error::PoolError::Io { path: target_path.to_path_buf(), source })?;
        }
        Ok(())
    }

    fn build_publish_set(
        &self,
        repository: &Repository,
        content_items: Vec<ContentItem>,
        repository_files: Vec<crate::model::RepositoryFile>,
    ) -> Result<PublishSet, Error> {
        let ecosystem = repository.ecosystem().ok_or_else(|| {
            Error::Config(format!("repository '{}' has unrecognized ecosystem '{}'", repository.id, repository.ecosystem))
        })?;
        let mode = repository.mode().ok_or_else(|| {
            Error::Config(format!("repository '{}' has unrecognized mode '{}'", repository.id, repository.mode))
        })?;
        Ok(PublishSet {
            ecosystem,
            mode,
            content_items,
            repository_files,
            apt_suite: repository.apt_suite.clone(),
            apt_components: repository.apt_components.clone(),
            apk_branch: repository.apk_branch.clone(),
            apk_repository: repository.apk_repository.clone(),
            apk_architecture: repository.apk_architecture.clone(),
        })
    }

    pub fn pool_stats(&self) -> Result<PoolStats, Error> {
        Reconciler::new(&self.pool, &self.store).stats().map_err(Error::from)
    }

    pub fn pool_verify(&self, scope: &Scope) -> Result<Vec<Corrupt>, Error> {
        Reconciler::new(&self.pool, &self.store).verify(scope).map_err(Error::from)
    }

    pub fn pool_orphans(&self, scope: &Scope) -> Result<Vec<Orphan>, Error> {
        Ok(Reconciler::new(&self.pool, &self.store).orphans_and_missing(scope)?.orphans)
    }

    pub fn pool_missing(&self, scope: &Scope) -> Result<Vec<Missing>, Error> {
        Ok(Reconciler::new(&self.pool, &self.store).orphans_and_missing(scope)?.missing)
    }

    pub fn pool_cleanup(&self, scope: &Scope, dry_run: bool) -> Result<usize, Error> {
        Reconciler::new(&self.pool, &self.store).cleanup(scope, dry_run).map_err(Error::from)
    }

    /// `content.list` — every ContentItem currently referenced by a
    /// repository.
    pub fn content_list(&self, repository_id: &str) -> Result<Vec<ContentItem>, Error> {
        self.store.content_items_for_repository(repository_id).map_err(Error::from)
    }

    /// `content.search` — filter by a name substring and/or ecosystem tag,
    /// across the whole pool rather than one repository.
    pub fn content_search(&self, name_pattern: Option<&str>, content_type: Option<&str>) -> Result<Vec<ContentItem>, Error> {
        self.store.search_content_items(name_pattern, content_type).map_err(Error::from)
    }

    /// `content.show` — a single ContentItem by its identity (sha256).
    pub fn content_show(&self, sha256: &crate::checksum::Sha256Checksum) -> Result<ContentItem, Error> {
        self.store.get_content_item(sha256).map_err(Error::from)
    }
}

fn to_version_ecosystem(ecosystem: Ecosystem) -> crate::version::Ecosystem {
    match ecosystem {
        Ecosystem::Rpm => crate::version::Ecosystem::Rpm,
        Ecosystem::Deb => crate::version::Ecosystem::Deb,
        Ecosystem::Helm => crate::version::Ecosystem::Helm,
        Ecosystem::Apk => crate::version::Ecosystem::Apk,
    }
}

/// The `(file_type, url)` of a repository's top-level index, per ecosystem
/// (spec §4.D entry points). HOSTED repositories are rejected by the caller
/// before this is reached.
fn top_level_index(repository: &RepositoryConfig) -> Result<(&'static str, url::Url), String> {
    match repository.ecosystem {
        Ecosystem::Rpm => repository
            .feed
            .join("repodata/repomd.xml")
            .map(|url| ("repomd", url))
            .map_err(|error| error.to_string()),
        Ecosystem::Deb => {
            let suite = repository.ecosystem_config.apt_suite.as_deref().unwrap_or("stable");
            repository
                .feed
                .join(&format!("dists/{suite}/InRelease"))
                .map(|url| ("inrelease", url))
                .map_err(|error| error.to_string())
        }
        Ecosystem::Apk => {
            let branch = repository.ecosystem_config.apk_branch.as_deref().unwrap_or("edge");
            let repo = repository.ecosystem_config.apk_repository.as_deref().unwrap_or("main");
            let arch = repository.ecosystem_config.apk_architecture.as_deref().unwrap_or("x86_64");
            repository
                .feed
                .join(&format!("{branch}/{repo}/{arch}/APKINDEX.tar.gz"))
                .map(|url| ("apkindex", url))
                .map_err(|error| error.to_string())
        }
        Ecosystem::Helm => {
            repository.feed.join("index.yaml").map(|url| ("index", url)).map_err(|error| error.to_string())
        }
    }
}
