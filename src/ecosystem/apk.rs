//! Alpine APK parser (spec §4.D "APK (Alpine)"). Entry point `APKINDEX.tar.gz`.

use super::{NormalizedFile, NormalizedItem, ParsedFeed};
use crate::checksum::decode_apk_legacy_checksum;
use crate::download::DownloadManager;
use crate::error::ParseError;
use url::Url;

/// Parses APKINDEX's line-oriented key/value records. Each record is a block
/// of `K:value` lines (`P`=name, `V`=version, `A`=arch, `S`=size, `C`=legacy
/// checksum) separated by blank lines.
fn parse_index(text: &str) -> Vec<Vec<(char, String)>> {
    let mut records = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            continue;
        }
        let mut chars = line.chars();
        let Some(key) = chars.next() else { continue };
        if chars.next() != Some(':') {
            continue;
        }
        current.push((key, chars.collect::<String>()));
    }
    if !current.is_empty() {
        records.push(current);
    }
    records
}

fn field(record: &[(char, String)], key: char) -> Option<&str> {
    record.iter().find(|(k, _)| *k == key).map(|(_, value)| value.as_str())
}

pub async fn parse(
    download: &DownloadManager,
    feed: &Url,
    branch: &str,
    repository: &str,
    architecture: &str,
) -> Result<ParsedFeed, ParseError> {
    let path = format!("{branch}/{repository}/{architecture}/APKINDEX.tar.gz");
    let url = feed
        .join(&path)
        .map_err(|_| ParseError::Malformed { format: "APKINDEX", reason: "invalid feed URL".into() })?;
    let body = download
        .get(url.as_str())
        .await
        .map_err(|_| ParseError::Malformed { format: "APKINDEX", reason: "fetch failed".into() })?
        .bytes()
        .await
        .map_err(|_| ParseError::Malformed { format: "APKINDEX", reason: "read failed".into() })?;

    let mut parsed = ParsedFeed::default();
    parsed.files.push(NormalizedFile {
        file_category: "metadata",
        file_type: "apkindex".into(),
        original_path: path,
        compression: Some("gz"),
        fetch_url: url.clone(),
        expected_sha256: None,
    });

    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(body.as_ref()));
    let mut index_text = String::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()?.file_name().map(|name| name == "APKINDEX").unwrap_or(false) {
            std::io::Read::read_to_string(&mut entry, &mut index_text)?;
            break;
        }
    }

    for record in parse_index(&index_text) {
        let Some(name) = field(&record, 'P') else { continue };
        let Some(version) = field(&record, 'V') else { continue };
        let arch = field(&record, 'A').unwrap_or(architecture);
        let filename = format!("{name}-{version}.apk");
        let payload_url = feed
            .join(&format!("{branch}/{repository}/{arch}/{filename}"))
            .map_err(|_| ParseError::Malformed { format: "APKINDEX", reason: format!("bad package path for '{name}'") })?;
        let size_bytes = field(&record, 'S').and_then(|size| size.parse().ok()).unwrap_or(0);

        // Legacy SHA1 mismatches warn but never fail (spec §4.D, §7 "StaleIndex");
        // identity and integrity are always enforced by the sha256 recomputed at
        // download time, so a decode failure here is not itself fatal.
        let legacy_checksum = field(&record, 'C').and_then(|encoded| decode_apk_legacy_checksum(encoded).ok());

        parsed.items.push(NormalizedItem {
            name: name.to_string(),
            version: version.to_string(),
            architecture: arch.to_string(),
            filename,
            content_type: "apk",
            payload_url,
            expected_sha256: None,
            size_bytes,
            build_time: None,
            metadata_json: serde_json::json!({
                "legacy_sha1": legacy_checksum.map(|checksum| checksum.to_string()),
                "depends": field(&record, 'D'),
                "provides": field(&record, 'p'),
                "license": field(&record, 'L'),
            }),
        });
    }

    Ok(parsed)
}
