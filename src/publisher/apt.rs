use super::{link_content, mirror_files, PublishSet};
use crate::config::Mode;
use crate::error::Error;
use crate::pool::Pool;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

fn component(set: &PublishSet) -> &str {
    set.apt_components.first().map(String::as_str).unwrap_or("main")
}

fn suite(set: &PublishSet) -> &str {
    set.apt_suite.as_deref().unwrap_or("stable")
}

/// APT shape: `pool/<component>/<letter>/<source>/<file>.deb` plus
/// `dists/<suite>/<component>/binary-<arch>/Packages[.gz]` (spec §4.F "APT").
/// Only a repository's first configured component is used for placement:
/// `ContentItem` carries no per-package component assignment to disambiguate
/// a multi-component repository.
pub fn emit(pool: &Pool, set: &PublishSet, staging: &Path) -> Result<(), Error> {
    let component = component(set);
    for item in &set.content_items {
        let letter = item.name.chars().next().unwrap_or('_').to_ascii_lowercase();
        let target = staging.join("pool").join(component).join(letter.to_string()).join(&item.name).join(&item.filename);
        link_content(pool, item, &target)?;
    }

    match set.mode {
        Mode::Mirror => mirror_files(pool, set, staging),
        Mode::Filtered | Mode::Hosted => regenerate_indexes(set, staging),
    }
}

fn regenerate_indexes(set: &PublishSet, staging: &Path) -> Result<(), Error> {
    let component = component(set);
    let suite = suite(set);

    let mut by_arch: BTreeMap<&str, String> = BTreeMap::new();
    for item in &set.content_items {
        let letter = item.name.chars().next().unwrap_or('_');
        let packages = by_arch.entry(item.architecture.as_str()).or_default();
        let _ = writeln!(
            packages,
            "Package: {}\nVersion: {}\nArchitecture: {}\nFilename: pool/{component}/{}/{}/{}/{}\nSize: {}\nSHA256: {}\n",
            item.name, item.version, item.architecture, letter, component, item.name, item.filename, item.size_bytes, item.sha256
        );
    }

    let mut release = format!("Suite: {suite}\nSHA256:\n");
    for (arch, packages) in &by_arch {
        let dists_dir = staging.join("dists").join(suite).join(component).join(format!("binary-{arch}"));
        std::fs::create_dir_all(&dists_dir).map_err(|source| super::pool_io_err(&dists_dir, source))?;
        std::fs::write(dists_dir.join("Packages"), packages).map_err(|source| super::pool_io_err(&dists_dir, source))?;

        let packages_sha256 = crate::checksum::sha256_bytes(packages.as_bytes());
        let _ = writeln!(
            release,
            " {packages_sha256} {} dists/{suite}/{component}/binary-{arch}/Packages",
            packages.len()
        );
    }
    // Unsigned Release: FILTERED mode never carries upstream trust forward
    // (spec §4.F "does not sign; clients require an explicit trust flag").
    let release_dir = staging.join("dists").join(suite);
    std::fs::create_dir_all(&release_dir).map_err(|source| super::pool_io_err(&release_dir, source))?;
    std::fs::write(release_dir.join("Release"), release).map_err(|source| super::pool_io_err(&release_dir, source))?;
    Ok(())
}
