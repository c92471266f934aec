//! RPM/DNF parser (spec §4.D "RPM (DNF/YUM)"). Entry point `repodata/repomd.xml`.

use super::{compression_of, decompress, NormalizedFile, NormalizedItem, ParsedFeed};
use crate::checksum::Sha256Checksum;
use crate::download::DownloadManager;
use crate::error::ParseError;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct Repomd {
    #[serde(rename = "data", default)]
    data: Vec<RepomdData>,
}

#[derive(Debug, Deserialize)]
struct RepomdData {
    #[serde(rename = "@type")]
    data_type: String,
    location: RepomdLocation,
    checksum: RepomdChecksum,
}

#[derive(Debug, Deserialize)]
struct RepomdLocation {
    #[serde(rename = "@href")]
    href: String,
}

#[derive(Debug, Deserialize)]
struct RepomdChecksum {
    #[serde(rename = "@type")]
    checksum_type: String,
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct PrimaryMetadata {
    #[serde(rename = "package", default)]
    packages: Vec<Package>,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: String,
    arch: String,
    version: PackageVersion,
    checksum: RepomdChecksum,
    size: PackageSize,
    location: RepomdLocation,
    #[serde(default)]
    format: Option<PackageFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageFormat {
    #[serde(rename = "rpm:license", default)]
    license: Option<String>,
    #[serde(rename = "rpm:group", default)]
    group: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackageVersion {
    #[serde(rename = "@epoch")]
    epoch: Option<String>,
    #[serde(rename = "@ver")]
    ver: String,
    #[serde(rename = "@rel")]
    rel: String,
}

#[derive(Debug, Deserialize)]
struct PackageSize {
    #[serde(rename = "@package")]
    package: u64,
}

/// Fetches `repomd.xml`, registers every `<data>` entry as a `RepositoryFile`,
/// then enumerates packages from `primary.xml.gz` (spec §4.D).
pub async fn parse(download: &DownloadManager, feed: &Url) -> Result<ParsedFeed, ParseError> {
    let repomd_url = feed.join("repodata/repomd.xml").map_err(|_| ParseError::Malformed {
        format: "repomd.xml",
        reason: "invalid feed URL".into(),
    })?;
    let repomd_bytes = download
        .get(repomd_url.as_str())
        .await
        .map_err(|_| ParseError::Malformed { format: "repomd.xml", reason: "fetch failed".into() })?
        .bytes()
        .await
        .map_err(|_| ParseError::Malformed { format: "repomd.xml", reason: "read failed".into() })?;

    let repomd: Repomd = quick_xml::de::from_reader(repomd_bytes.as_ref())?;

    let mut parsed = ParsedFeed::default();
    parsed.files.push(NormalizedFile {
        file_category: "metadata",
        file_type: "repomd".into(),
        original_path: "repodata/repomd.xml".into(),
        compression: None,
        fetch_url: repomd_url,
        expected_sha256: None,
    });

    let mut primary_bytes: Option<Vec<u8>> = None;
    for entry in &repomd.data {
        let href = entry.location.href.clone();
        let entry_url = feed
            .join(&href)
            .map_err(|_| ParseError::Malformed { format: "repomd.xml", reason: format!("bad href '{href}'") })?;
        let body = download
            .get(entry_url.as_str())
            .await
            .map_err(|_| ParseError::Malformed { format: "repomd.xml", reason: format!("fetch of '{href}' failed") })?
            .bytes()
            .await
            .map_err(|_| ParseError::Malformed { format: "repomd.xml", reason: format!("read of '{href}' failed") })?;

        let expected_sha256 = (entry.checksum.checksum_type == "sha256").then(|| entry.checksum.value.parse().ok()).flatten();

        parsed.files.push(NormalizedFile {
            file_category: "metadata",
            file_type: entry.data_type.clone(),
            original_path: href.clone(),
            compression: compression_of(&href),
            fetch_url: entry_url,
            expected_sha256,
        });

        if entry.data_type == "primary" {
            primary_bytes = Some(decompress(&body, &href)?);
        }
    }

    let Some(primary_bytes) = primary_bytes else {
        return Ok(parsed);
    };
    let primary: PrimaryMetadata = quick_xml::de::from_reader(primary_bytes.as_slice())?;

    for package in primary.packages {
        let payload_url = feed.join(&package.location.href).map_err(|_| ParseError::Malformed {
            format: "primary.xml",
            reason: format!("bad location '{}'", package.location.href),
        })?;
        let expected_sha256: Option<Sha256Checksum> =
            (package.checksum.checksum_type == "sha256").then(|| package.checksum.value.parse().ok()).flatten();
        let version = format!(
            "{}{}-{}",
            package.version.epoch.as_deref().map(|epoch| format!("{epoch}:")).unwrap_or_default(),
            package.version.ver,
            package.version.rel
        );
        let is_source = package.arch == "src";
        let group = package.format.as_ref().and_then(|format| format.group.clone());
        let license = package.format.as_ref().and_then(|format| format.license.clone());
        parsed.items.push(NormalizedItem {
            name: package.name,
            version,
            architecture: package.arch,
            filename: package
                .location
                .href
                .rsplit('/')
                .next()
                .unwrap_or(&package.location.href)
                .to_string(),
            content_type: "rpm",
            payload_url,
            expected_sha256,
            size_bytes: package.size.package,
            build_time: None,
            metadata_json: serde_json::json!({
                "checksum_type": package.checksum.checksum_type,
                "checksum_value": package.checksum.value,
                "is_source_package": is_source,
                "group": group,
                "license": license,
            }),
        });
    }

    Ok(parsed)
}
