use super::{link_content, mirror_files, PublishSet};
use crate::config::Mode;
use crate::error::Error;
use crate::model::RepositoryFile;
use crate::pool::Pool;
use serde::Deserialize;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

/// RPM shape: `Packages/*.rpm` + `repodata/` (spec §4.F "RPM").
pub fn emit(pool: &Pool, set: &PublishSet, staging: &Path) -> Result<(), Error> {
    let packages_dir = staging.join("Packages");
    std::fs::create_dir_all(&packages_dir).map_err(|source| super::pool_io_err(&packages_dir, source))?;
    for item in &set.content_items {
        link_content(pool, item, &packages_dir.join(&item.filename))?;
    }

    match set.mode {
        Mode::Mirror => mirror_files(pool, set, staging),
        Mode::Filtered | Mode::Hosted => regenerate_repodata(pool, set, staging),
    }
}

/// One entry queued into `repodata/repomd.xml`: the regenerated bytes, their
/// uncompressed form (for the `open-checksum`), and the data type they fill.
struct RepodataEntry {
    data_type: &'static str,
    uncompressed: Vec<u8>,
    gz: Vec<u8>,
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(bytes).map_err(|source| super::pool_io_err(Path::new("repodata"), source))?;
    encoder.finish().map_err(|source| super::pool_io_err(Path::new("repodata"), source))
}

/// Regenerates `primary`, `filelists`, `other`, and a pkglist-filtered
/// `updateinfo` from the published set (spec §4.F "RPM"). `comps`/`modules`
/// blobs, if mirrored previously, publish unchanged at their original paths
/// — FILTERED mode only regenerates `primary`/`filelists`/`other`/`updateinfo`.
fn regenerate_repodata(pool: &Pool, set: &PublishSet, staging: &Path) -> Result<(), Error> {
    let repodata_dir = staging.join("repodata");
    std::fs::create_dir_all(&repodata_dir).map_err(|source| super::pool_io_err(&repodata_dir, source))?;

    let mut entries = vec![build_primary(set)?, build_filelists(set)?, build_other(set)?];
    if let Some(updateinfo) = build_updateinfo(pool, set)? {
        entries.push(updateinfo);
    }

    let mut repomd = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<repomd>\n");
    for entry in &entries {
        let open_sha256 = crate::checksum::sha256_bytes(&entry.uncompressed);
        let gz_sha256 = crate::checksum::sha256_bytes(&entry.gz);
        let filename = format!("{gz_sha256}-{}.xml.gz", entry.data_type);
        std::fs::write(repodata_dir.join(&filename), &entry.gz)
            .map_err(|source| super::pool_io_err(&repodata_dir, source))?;
        let _ = writeln!(
            repomd,
            "  <data type=\"{}\">\n    <checksum type=\"sha256\">{gz_sha256}</checksum>\n    <open-checksum type=\"sha256\">{open_sha256}</open-checksum>\n    <location href=\"repodata/{filename}\"/>\n  </data>",
            entry.data_type
        );
    }
    repomd.push_str("</repomd>\n");
    std::fs::write(repodata_dir.join("repomd.xml"), repomd).map_err(|source| super::pool_io_err(&repodata_dir, source))?;

    mirror_preserved(pool, set, staging)
}

/// Non-regenerated metadata types (`comps`, `modules`) mirror verbatim at
/// their original upstream paths; FILTERED mode never touches them.
fn preserved_verbatim(file: &RepositoryFile) -> bool {
    matches!(file.file_type.as_str(), "comps" | "group" | "modules")
}

fn mirror_preserved(pool: &Pool, set: &PublishSet, staging: &Path) -> Result<(), Error> {
    for file in set.repository_files.iter().filter(|file| preserved_verbatim(file)) {
        let target_path = staging.join(&file.original_path);
        super::link_file(pool, file, &target_path)?;
    }
    Ok(())
}

fn build_primary(set: &PublishSet) -> Result<RepodataEntry, Error> {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<metadata>\n");
    for item in &set.content_items {
        let _ = writeln!(
            xml,
            "  <package><name>{}</name><version ver=\"{}\"/><arch>{}</arch><checksum type=\"sha256\">{}</checksum><location href=\"Packages/{}\"/></package>",
            item.name, item.version, item.architecture, item.sha256, item.filename
        );
    }
    xml.push_str("</metadata>\n");
    let gz = gzip(xml.as_bytes())?;
    Ok(RepodataEntry { data_type: "primary", uncompressed: xml.into_bytes(), gz })
}

/// No payload inspection happens during sync, so per-package file lists are
/// empty; the element still publishes so `repomd.xml` carries a complete set
/// of the regenerated metadata types a client expects to find.
fn build_filelists(set: &PublishSet) -> Result<RepodataEntry, Error> {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<filelists>\n");
    for item in &set.content_items {
        let _ = writeln!(
            xml,
            "  <package pkgid=\"{}\" name=\"{}\" arch=\"{}\"><version ver=\"{}\"/></package>",
            item.sha256, item.name, item.architecture, item.version
        );
    }
    xml.push_str("</filelists>\n");
    let gz = gzip(xml.as_bytes())?;
    Ok(RepodataEntry { data_type: "filelists", uncompressed: xml.into_bytes(), gz })
}

fn build_other(set: &PublishSet) -> Result<RepodataEntry, Error> {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<otherdata>\n");
    for item in &set.content_items {
        let _ = writeln!(
            xml,
            "  <package pkgid=\"{}\" name=\"{}\" arch=\"{}\"><version ver=\"{}\"/></package>",
            item.sha256, item.name, item.architecture, item.version
        );
    }
    xml.push_str("</otherdata>\n");
    let gz = gzip(xml.as_bytes())?;
    Ok(RepodataEntry { data_type: "other", uncompressed: xml.into_bytes(), gz })
}

#[derive(Debug, Deserialize)]
struct UpdateInfo {
    #[serde(rename = "update", default)]
    updates: Vec<Advisory>,
}

#[derive(Debug, Deserialize)]
struct Advisory {
    id: String,
    #[serde(default)]
    title: Option<String>,
    pkglist: Pkglist,
}

#[derive(Debug, Deserialize)]
struct Pkglist {
    #[serde(rename = "collection", default)]
    collections: Vec<Collection>,
}

#[derive(Debug, Deserialize)]
struct Collection {
    #[serde(rename = "package", default)]
    packages: Vec<AdvisoryPackage>,
}

#[derive(Debug, Deserialize)]
struct AdvisoryPackage {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@epoch", default)]
    epoch: Option<String>,
    #[serde(rename = "@version")]
    version: String,
    #[serde(rename = "@release")]
    release: String,
    #[serde(rename = "@arch")]
    arch: String,
}

/// Finds the mirrored `updateinfo` blob among `set`'s repository files,
/// decompresses it, and keeps only advisories with at least one pkglist
/// entry matching a published `(name, version, arch)` — an advisory is
/// retained iff it still applies to what's actually being published (spec
/// §4.D "RPM" / §8 "FILTERED updateinfo"). Returns `None` when the
/// repository never had an `updateinfo.xml.gz`, or it fails to parse.
fn build_updateinfo(pool: &Pool, set: &PublishSet) -> Result<Option<RepodataEntry>, Error> {
    let Some(file) = set.repository_files.iter().find(|file| file.file_type == "updateinfo") else {
        return Ok(None);
    };
    let Some(path) = pool.resolve(crate::pool::Bucket::Files, &file.sha256) else {
        return Ok(None);
    };
    let raw = std::fs::read(&path).map_err(|source| super::pool_io_err(&path, source))?;
    let decompressed = crate::ecosystem::decompress(&raw, &file.original_path)?;
    let parse_result: Result<UpdateInfo, _> = quick_xml::de::from_reader(decompressed.as_slice());
    let Ok(parsed) = parse_result else {
        return Ok(None);
    };

    let published: std::collections::HashSet<(String, String, String)> = set
        .content_items
        .iter()
        .map(|item| (item.name.clone(), item.version.clone(), item.architecture.clone()))
        .collect();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<updates>\n");
    for advisory in &parsed.updates {
        let retained = advisory.pkglist.collections.iter().flat_map(|collection| &collection.packages).any(|package| {
            let version = format!(
                "{}{}-{}",
                package.epoch.as_deref().map(|epoch| format!("{epoch}:")).unwrap_or_default(),
                package.version,
                package.release
            );
            published.contains(&(package.name.clone(), version, package.arch.clone()))
        });
        if !retained {
            continue;
        }
        let _ = writeln!(xml, "  <update id=\"{}\" title=\"{}\"/>", advisory.id, advisory.title.as_deref().unwrap_or_default());
    }
    xml.push_str("</updates>\n");
    let gz = gzip(xml.as_bytes())?;
    Ok(Some(RepodataEntry { data_type: "updateinfo", uncompressed: xml.into_bytes(), gz }))
}
