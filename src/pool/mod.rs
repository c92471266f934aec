//! Content-addressed object store (component A, spec §4.A). Grounded on the
//! teacher's `filesystem.rs` (`upload`/`create_dir`/`calculate_directory_size`,
//! temp-then-rename discipline) generalized from a single posts/thumbnails
//! layout to the two-bucket, fixed fan-out layout the spec requires.

mod bucket;

pub use bucket::Bucket;

use crate::checksum::{self, Sha256Checksum};
use crate::error::PoolError;
use std::io::Read;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Outcome of [`Pool::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Correct,
    Corrupt { actual: Sha256Checksum },
    Missing,
}

/// Outcome of [`Pool::put`].
#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub sha256: Sha256Checksum,
    pub path: PathBuf,
    pub was_new: bool,
}

/// A filesystem-backed, content-addressed store rooted at `pool_root`, with
/// `content/` and `files/` buckets (spec §4.A "why two buckets").
#[derive(Debug, Clone)]
pub struct Pool {
    root: PathBuf,
}

impl Pool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.as_str())
    }

    fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// `<bucket>/<aa>/<bb>/<sha256>[_<filename>]`, per spec §4.A's layout.
    pub fn path_of(&self, bucket: Bucket, sha256: &Sha256Checksum, filename: Option<&str>) -> PathBuf {
        let mut path = self
            .bucket_dir(bucket)
            .join(sha256.bucket_outer())
            .join(sha256.bucket_inner());
        match filename {
            Some(name) => path.push(format!("{sha256}_{name}")),
            None => path.push(sha256.to_string()),
        }
        path
    }

    /// Finds an existing blob under its bucket regardless of the optional
    /// `_<filename>` suffix, since callers may not know which suffix (if any)
    /// an earlier `put` chose.
    pub fn resolve(&self, bucket: Bucket, sha256: &Sha256Checksum) -> Option<PathBuf> {
        let dir = self
            .bucket_dir(bucket)
            .join(sha256.bucket_outer())
            .join(sha256.bucket_inner());
        let prefix = sha256.to_string();
        let bare = dir.join(&prefix);
        if bare.is_file() {
            return Some(bare);
        }
        let entries = std::fs::read_dir(&dir).ok()?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                return Some(entry.path());
            }
        }
        None
    }

    pub fn has(&self, bucket: Bucket, sha256: &Sha256Checksum) -> bool {
        self.resolve(bucket, sha256).is_some()
    }

    /// Streams `reader` to a unique temp file on the pool's own filesystem,
    /// hashing as it writes, then renames to the canonical path. If the
    /// canonical path already exists the temp is discarded (`was_new=false`);
    /// concurrent `put`s of the same sha256 race harmlessly to the same
    /// outcome (spec §5).
    pub fn put<R: Read>(
        &self,
        bucket: Bucket,
        mut reader: R,
        expected_sha256: Option<Sha256Checksum>,
        filename: Option<&str>,
    ) -> Result<PutOutcome, PoolError> {
        let tmp_dir = self.tmp_dir();
        std::fs::create_dir_all(&tmp_dir).map_err(|source| io_err(&tmp_dir, source))?;
        let tmp_path = tmp_dir.join(Uuid::new_v4().to_string());

        let mut tmp_file = std::fs::File::create(&tmp_path).map_err(|source| io_err(&tmp_path, source))?;
        let mut hasher = sha2::Sha256::default();
        {
            use sha2::Digest;
            let mut buffer = [0u8; 64 * 1024];
            loop {
                let read = reader.read(&mut buffer).map_err(|source| io_err(&tmp_path, source))?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[..read]);
                std::io::Write::write_all(&mut tmp_file, &buffer[..read])
                    .map_err(|source| io_err(&tmp_path, source))?;
            }
        }
        drop(tmp_file);
        let actual: Sha256Checksum = {
            use sha2::Digest;
            checksum::Sha256Checksum::from_bytes(hasher.finalize().into())
        };

        if let Some(expected) = expected_sha256 {
            if expected != actual {
                let _ = std::fs::remove_file(&tmp_path);
                return Err(PoolError::ChecksumMismatch { expected, actual });
            }
        }

        let canonical = self.path_of(bucket, &actual, filename);
        if canonical.is_file() {
            let _ = std::fs::remove_file(&tmp_path);
            return Ok(PutOutcome { sha256: actual, path: canonical, was_new: false });
        }

        let parent = canonical.parent().expect("bucket path always has a parent");
        std::fs::create_dir_all(parent).map_err(|source| io_err(parent, source))?;
        match std::fs::rename(&tmp_path, &canonical) {
            Ok(()) => Ok(PutOutcome { sha256: actual, path: canonical, was_new: true }),
            Err(_) if canonical.is_file() => {
                // Lost the race to a concurrent put of the same sha256.
                let _ = std::fs::remove_file(&tmp_path);
                Ok(PutOutcome { sha256: actual, path: canonical, was_new: false })
            }
            Err(source) => {
                let _ = std::fs::remove_file(&tmp_path);
                Err(io_err(&canonical, source))
            }
        }
    }

    /// Re-hashes the on-disk blob and compares against `sha256`.
    pub fn verify(&self, bucket: Bucket, sha256: &Sha256Checksum) -> Result<VerifyOutcome, PoolError> {
        let Some(path) = self.resolve(bucket, sha256) else {
            return Ok(VerifyOutcome::Missing);
        };
        let file = std::fs::File::open(&path).map_err(|source| io_err(&path, source))?;
        let actual = checksum::sha256_digest(file).map_err(|source| io_err(&path, source))?;
        if &actual == sha256 {
            Ok(VerifyOutcome::Correct)
        } else {
            Ok(VerifyOutcome::Corrupt { actual })
        }
    }

    /// True if `target_path` already exists and is hard-linked to `sha256`'s
    /// blob (the "no-op republish" case); false if it doesn't exist or is
    /// linked to something else. Callers use this to tell a harmless rerun
    /// apart from two distinct items wanting the same output filename.
    pub fn linked_at_matches(&self, bucket: Bucket, sha256: &Sha256Checksum, target_path: &Path) -> bool {
        let Some(source_path) = self.resolve(bucket, sha256) else {
            return false;
        };
        match (std::fs::metadata(&source_path), std::fs::metadata(target_path)) {
            (Ok(source_meta), Ok(target_meta)) => same_inode(&source_meta, &target_meta),
            _ => false,
        }
    }

    /// Hard-links the blob into `target_path`. Replaces an existing,
    /// differing target atomically via a sibling-then-rename swap.
    pub fn link_into(&self, bucket: Bucket, sha256: &Sha256Checksum, target_path: &Path) -> Result<(), PoolError> {
        let source_path = self
            .resolve(bucket, sha256)
            .ok_or_else(|| PoolError::Missing(*sha256))?;

        if let Some(parent) = target_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| io_err(parent, source))?;
        }

        if let (Ok(source_meta), Ok(target_meta)) = (std::fs::metadata(&source_path), std::fs::metadata(target_path))
        {
            if same_inode(&source_meta, &target_meta) {
                return Ok(());
            }
        }

        let staging = target_path.with_extension(format!("chantal-link-{}", Uuid::new_v4()));
        let link_result = std::fs::hard_link(&source_path, &staging);
        match link_result {
            Ok(()) => {}
            Err(source) if source.raw_os_error() == Some(libc_exdev()) => {
                let _ = std::fs::remove_file(&staging);
                return Err(PoolError::CrossDevice {
                    source_path: source_path.clone(),
                    target_path: target_path.to_path_buf(),
                });
            }
            Err(source) => return Err(io_err(&staging, source)),
        }

        std::fs::rename(&staging, target_path).map_err(|source| {
            let _ = std::fs::remove_file(&staging);
            io_err(target_path, source)
        })
    }

    /// Unlinks the blob from the pool. Callers must have already removed all
    /// database references; the Pool never consults the Store (spec §9
    /// "Ownership").
    pub fn delete(&self, bucket: Bucket, sha256: &Sha256Checksum) -> Result<(), PoolError> {
        let Some(path) = self.resolve(bucket, sha256) else {
            return Ok(());
        };
        std::fs::remove_file(&path).map_err(|source| io_err(&path, source))
    }

    /// Walks every blob under `bucket`, yielding `(sha256, path, size_bytes)`.
    /// Used by the Reconciler (component I) to enumerate on-disk state
    /// without materializing it in memory; `walkdir` streams entries lazily.
    pub fn iter_blobs(&self, bucket: Bucket) -> impl Iterator<Item = (Sha256Checksum, PathBuf, u64)> {
        walkdir::WalkDir::new(self.bucket_dir(bucket))
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy();
                let hex_part = name.split('_').next().unwrap_or(&name);
                let sha256: Sha256Checksum = hex_part.parse().ok()?;
                let size = entry.metadata().ok()?.len();
                Some((sha256, entry.path().to_path_buf(), size))
            })
    }

    /// Removes dangling temp files left by a crashed `put`, per spec §4.A
    /// "Failure semantics". Safe to call at any time; temps are only ever
    /// referenced for the duration of one `put` call.
    pub fn sweep_tmp(&self) -> Result<u64, PoolError> {
        let tmp_dir = self.tmp_dir();
        if !tmp_dir.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(&tmp_dir).map_err(|source| io_err(&tmp_dir, source))? {
            let entry = entry.map_err(|source| io_err(&tmp_dir, source))?;
            std::fs::remove_file(entry.path()).map_err(|source| io_err(&entry.path(), source))?;
            removed += 1;
        }
        Ok(removed)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> PoolError {
    PoolError::Io { path: path.to_path_buf(), source }
}

#[cfg(unix)]
fn same_inode(a: &std::fs::Metadata, b: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_inode(_a: &std::fs::Metadata, _b: &std::fs::Metadata) -> bool {
    false
}

#[cfg(unix)]
fn libc_exdev() -> i32 {
    18 // EXDEV
}

#[cfg(not(unix))]
fn libc_exdev() -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_idempotent_and_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(dir.path());
        let first = pool.put(Bucket::Content, b"hello".as_slice(), None, None).unwrap();
        assert!(first.was_new);
        let second = pool.put(Bucket::Content, b"hello".as_slice(), None, None).unwrap();
        assert!(!second.was_new);
        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first.path, second.path);
    }

    #[test]
    fn put_rejects_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(dir.path());
        let bogus = checksum::sha256_bytes(b"not hello");
        let err = pool.put(Bucket::Content, b"hello".as_slice(), Some(bogus), None).unwrap_err();
        assert!(matches!(err, PoolError::ChecksumMismatch { .. }));
    }

    #[test]
    fn verify_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(dir.path());
        let outcome = pool.put(Bucket::Content, b"hello".as_slice(), None, None).unwrap();
        std::fs::write(&outcome.path, b"tampered").unwrap();
        let verify = pool.verify(Bucket::Content, &outcome.sha256).unwrap();
        assert!(matches!(verify, VerifyOutcome::Corrupt { .. }));
    }

    #[test]
    fn link_into_creates_hard_link() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(dir.path());
        let outcome = pool.put(Bucket::Content, b"hello".as_slice(), None, None).unwrap();
        let target = dir.path().join("published").join("hello.bin");
        pool.link_into(Bucket::Content, &outcome.sha256, &target).unwrap();
        let source_meta = std::fs::metadata(&outcome.path).unwrap();
        let target_meta = std::fs::metadata(&target).unwrap();
        assert!(same_inode(&source_meta, &target_meta));
    }
}
