use super::{link_content, mirror_files, PublishSet};
use crate::config::Mode;
use crate::error::Error;
use crate::pool::Pool;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

/// APK shape: `<branch>/<repository>/<arch>/*.apk` plus `APKINDEX.tar.gz`
/// (spec §4.F "APK"), under the source repository's own configured
/// branch/repository/architecture rather than a fixed convention.
pub fn emit(pool: &Pool, set: &PublishSet, staging: &Path) -> Result<(), Error> {
    let branch = set.apk_branch.as_deref().unwrap_or("edge");
    let repository = set.apk_repository.as_deref().unwrap_or("main");
    let arch = set.apk_architecture.as_deref().unwrap_or("x86_64");
    let arch_dir = staging.join(branch).join(repository).join(arch);
    std::fs::create_dir_all(&arch_dir).map_err(|source| super::pool_io_err(&arch_dir, source))?;
    for item in &set.content_items {
        link_content(pool, item, &arch_dir.join(&item.filename))?;
    }

    match set.mode {
        Mode::Mirror => mirror_files(pool, set, staging),
        Mode::Filtered | Mode::Hosted => regenerate_index(set, &arch_dir),
    }
}

fn regenerate_index(set: &PublishSet, arch_dir: &Path) -> Result<(), Error> {
    let mut index = String::new();
    for item in &set.content_items {
        let _ = writeln!(index, "P:{}\nV:{}\nA:{}\nS:{}\n", item.name, item.version, item.architecture, item.size_bytes);
    }

    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(index.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "APKINDEX", index.as_bytes())
        .map_err(|source| super::pool_io_err(arch_dir, source))?;
    let tar_bytes = builder.into_inner().map_err(|source| super::pool_io_err(arch_dir, source))?;

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&tar_bytes).map_err(|source| super::pool_io_err(arch_dir, source))?;
    let gz_bytes = encoder.finish().map_err(|source| super::pool_io_err(arch_dir, source))?;

    std::fs::write(arch_dir.join("APKINDEX.tar.gz"), gz_bytes).map_err(|source| super::pool_io_err(arch_dir, source))
}
