//! Syncer (component E, spec §4.E). Orchestrates one repository sync: lock,
//! parse, filter, plan, download, register, record history.

mod lock;

pub use lock::RepositoryLock;

use crate::checksum::Sha256Checksum;
use crate::config::{Ecosystem, Mode, RepositoryConfig};
use crate::download::{CancellationToken, DownloadManager};
use crate::ecosystem::{apk, apt, helm, rpm, NormalizedFile, NormalizedItem, ParsedFeed};
use crate::error::{Error, ErrorKind};
use crate::filter;
use crate::model::{NewContentItem, NewRepository, NewRepositoryFile};
use crate::pool::{Bucket, Pool};
use crate::store::{Store, SyncReport};
use crate::time::DateTime;

pub struct Syncer<'a> {
    pool: &'a Pool,
    store: &'a Store,
}

impl<'a> Syncer<'a> {
    pub fn new(pool: &'a Pool, store: &'a Store) -> Self {
        Self { pool, store }
    }

    /// Runs the full pipeline in spec §4.E: acquire lock, parse, filter,
    /// download, register, record `SyncHistory`. MIRROR repositories skip
    /// `only_latest_version` post-processing entirely (enforced earlier, at
    /// config validation); HOSTED repositories have no upstream to parse.
    pub async fn sync_repository(
        &self,
        repository: &RepositoryConfig,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, Error> {
        let started_at = DateTime::now();
        let _lock = RepositoryLock::acquire(self.store, &repository.id)?;

        self.store.upsert_repository(&NewRepository {
            id: &repository.id,
            name: &repository.name,
            ecosystem: ecosystem_tag(repository.ecosystem),
            feed_url: repository.feed.as_str(),
            enabled: repository.enabled,
            mode: mode_tag(repository.mode),
            apt_suite: repository.ecosystem_config.apt_suite.as_deref(),
            apt_components: &repository.ecosystem_config.apt_components,
            apt_architectures: &repository.ecosystem_config.apt_architectures,
            apk_branch: repository.ecosystem_config.apk_branch.as_deref(),
            apk_repository: repository.ecosystem_config.apk_repository.as_deref(),
            apk_architecture: repository.ecosystem_config.apk_architecture.as_deref(),
        })?;

        let mut report = SyncReport::default();

        if repository.mode == Mode::Hosted {
            let finished_at = DateTime::now();
            self.store.mark_synced(&repository.id, finished_at)?;
            self.store.record_sync_history(&repository.id, started_at, finished_at, &report)?;
            return Ok(report);
        }

        let download = DownloadManager::for_repository(&crate::config::DownloadConfig::default(), repository, None)?;

        let parsed = self.parse_upstream(&download, repository).await.map_err(|error| {
            report.failed_count += 1;
            report.errors.push(format!("{}: {error}", ErrorKind::kind(&error)));
            error
        })?;

        for file in &parsed.files {
            self.ingest_file(&download, repository, file, &mut report).await;
        }

        report.discovered_count = parsed.items.len() as i64;
        // Stages (a)-(e) always run; only (f) `only_latest_version`
        // post-processing is gated on mode (spec §4.E "Modes").
        let filtered = filter::apply_stages_a_to_e(repository.ecosystem, &repository.filters, parsed.items);
        let filtered = if repository.mode == Mode::Filtered {
            filter::only_latest_version_if_configured(repository.ecosystem, &repository.filters, filtered)
        } else {
            filtered
        };

        let mut kept_checksums = Vec::new();
        for item in &filtered {
            match self.ingest_item(&download, repository, item, cancel, &mut report).await {
                Ok(Some(sha256)) => kept_checksums.push(sha256),
                Ok(None) => {}
                Err(error) => {
                    report.failed_count += 1;
                    report.errors.push(format!("{}: {error}", item.name));
                }
            }
        }

        // HOSTED already returned above; MIRROR and FILTERED both prune
        // membership down to what survived this sync (spec §4.E step 6
        // exempts only HOSTED, whose membership only grows out-of-band).
        if repository.mode != Mode::Hosted {
            self.store.replace_content_membership(&repository.id, &kept_checksums)?;
        }

        let finished_at = DateTime::now();
        self.store.mark_synced(&repository.id, finished_at)?;
        let history = self.store.record_sync_history(&repository.id, started_at, finished_at, &report)?;
        let _ = history;
        Ok(report)
    }

    async fn parse_upstream(
        &self,
        download: &DownloadManager,
        repository: &RepositoryConfig,
    ) -> Result<ParsedFeed, Error> {
        let feed = &repository.feed;
        let parsed = match repository.ecosystem {
            Ecosystem::Rpm => rpm::parse(download, feed).await?,
            Ecosystem::Deb => {
                let suite = repository.ecosystem_config.apt_suite.as_deref().unwrap_or("stable");
                apt::parse(
                    download,
                    feed,
                    suite,
                    &repository.ecosystem_config.apt_components,
                    &repository.ecosystem_config.apt_architectures,
                    repository.filters.ecosystem.apt_include_source_packages,
                )
                .await?
            }
            Ecosystem::Apk => {
                let branch = repository.ecosystem_config.apk_branch.as_deref().unwrap_or("edge");
                let repo = repository.ecosystem_config.apk_repository.as_deref().unwrap_or("main");
                let arch = repository.ecosystem_config.apk_architecture.as_deref().unwrap_or("x86_64");
                apk::parse(download, feed, branch, repo, arch).await?
            }
            Ecosystem::Helm => helm::parse(download, feed).await?,
        };
        Ok(parsed)
    }

    async fn ingest_file(
        &self,
        download: &DownloadManager,
        repository: &RepositoryConfig,
        file: &NormalizedFile,
        report: &mut SyncReport,
    ) {
        let outcome = match download.get(file.fetch_url.as_str()).await {
            Ok(response) => response.bytes().await,
            Err(error) => {
                report.errors.push(format!("{}: {error}", file.original_path));
                return;
            }
        };
        let Ok(bytes) = outcome else {
            report.errors.push(format!("{}: failed to read body", file.original_path));
            return;
        };

        match self.pool.put(Bucket::Files, bytes.as_ref(), file.expected_sha256, None) {
            Ok(put) => {
                let new_file = NewRepositoryFile {
                    sha256: put.sha256,
                    file_category: file.file_category,
                    file_type: &file.file_type,
                    original_path: &file.original_path,
                    compression: file.compression,
                    size_bytes: bytes.len() as i64,
                };
                if let Err(error) = self.store.register_repository_file(&repository.id, &new_file, 0) {
                    report.errors.push(format!("{}: {error}", file.original_path));
                }
            }
            Err(error) => report.errors.push(format!("{}: {error}", file.original_path)),
        }
    }

    /// Returns `Ok(Some(sha256))` if the item is now a registered member,
    /// `Ok(None)` if it was intentionally skipped (never happens today, kept
    /// for symmetry with item-level failure accumulation).
    async fn ingest_item(
        &self,
        download: &DownloadManager,
        repository: &RepositoryConfig,
        item: &NormalizedItem,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> Result<Option<Sha256Checksum>, Error> {
        if let Some(expected) = item.expected_sha256 {
            if self.pool.has(Bucket::Content, &expected) {
                self.register_content(repository, item, expected, item.size_bytes as i64)?;
                report.skipped_count += 1;
                return Ok(Some(expected));
            }
        }

        let temp_dir = self.pool.root().join("tmp");
        let outcome = download
            .download_to_temp(item.payload_url.as_str(), &temp_dir, item.expected_sha256, cancel)
            .await?;
        let file = std::fs::File::open(&outcome.temp_path)
            .map_err(|source| crate::error::PoolError::Io { path: outcome.temp_path.clone(), source })?;
        let put = self.pool.put(Bucket::Content, file, Some(outcome.sha256), Some(&item.filename))?;
        let _ = std::fs::remove_file(&outcome.temp_path);

        self.register_content(repository, item, put.sha256, outcome.size_bytes as i64)?;
        report.downloaded_count += 1;
        report.bytes_downloaded += outcome.size_bytes as i64;
        Ok(Some(put.sha256))
    }

    fn register_content(
        &self,
        repository: &RepositoryConfig,
        item: &NormalizedItem,
        sha256: Sha256Checksum,
        size_bytes: i64,
    ) -> Result<(), Error> {
        let new_item = NewContentItem {
            sha256,
            filename: &item.filename,
            size_bytes,
            content_type: item.content_type,
            name: &item.name,
            version: &item.version,
            architecture: &item.architecture,
            metadata_json: item.metadata_json.clone(),
        };
        self.store.register_content_item(&repository.id, &new_item, 0)?;
        Ok(())
    }
}

fn ecosystem_tag(ecosystem: Ecosystem) -> &'static str {
    match ecosystem {
        Ecosystem::Rpm => "rpm",
        Ecosystem::Deb => "deb",
        Ecosystem::Helm => "helm",
        Ecosystem::Apk => "apk",
    }
}

fn mode_tag(mode: Mode) -> &'static str {
    match mode {
        Mode::Mirror => "MIRROR",
        Mode::Filtered => "FILTERED",
        Mode::Hosted => "HOSTED",
    }
}
