//! APT/DEB parser (spec §4.D "APT (DEB)"). Entry point `dists/<suite>/`.

use super::{compression_of, decompress, NormalizedFile, NormalizedItem, ParsedFeed};
use crate::download::DownloadManager;
use crate::error::ParseError;
use url::Url;

/// Parses an RFC-822-like stanza block (Release files and Packages files
/// share this grammar) into `(field_name, value)` pairs per stanza.
fn parse_stanzas(text: &str) -> Vec<Vec<(String, String)>> {
    let mut stanzas = Vec::new();
    let mut current: Vec<(String, String)> = Vec::new();
    let mut last_field: Option<usize> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                stanzas.push(std::mem::take(&mut current));
                last_field = None;
            }
            continue;
        }
        if (line.starts_with(' ') || line.starts_with('\t')) && last_field.is_some() {
            let index = last_field.unwrap();
            current[index].1.push('\n');
            current[index].1.push_str(line.trim());
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            current.push((key.trim().to_string(), value.trim().to_string()));
            last_field = Some(current.len() - 1);
        }
    }
    if !current.is_empty() {
        stanzas.push(current);
    }
    stanzas
}

fn field<'a>(stanza: &'a [(String, String)], name: &str) -> Option<&'a str> {
    stanza.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
}

/// Fetches `InRelease` (falling back to `Release`), then each configured
/// `(component, architecture)` `Packages` file (spec §4.D).
pub async fn parse(
    download: &DownloadManager,
    feed: &Url,
    suite: &str,
    components: &[String],
    architectures: &[String],
    include_source_packages: bool,
) -> Result<ParsedFeed, ParseError> {
    let mut parsed = ParsedFeed::default();

    let in_release_url = feed
        .join(&format!("dists/{suite}/InRelease"))
        .map_err(|_| ParseError::Malformed { format: "Release", reason: "invalid feed URL".into() })?;
    let release_text = match download.get(in_release_url.as_str()).await {
        Ok(response) if response.status().is_success() => {
            parsed.files.push(NormalizedFile {
                file_category: "metadata",
                file_type: "in_release".into(),
                original_path: format!("dists/{suite}/InRelease"),
                compression: None,
                fetch_url: in_release_url.clone(),
                expected_sha256: None,
            });
            response.text().await.map_err(|_| ParseError::Malformed { format: "InRelease", reason: "read failed".into() })?
        }
        _ => {
            let release_url = feed
                .join(&format!("dists/{suite}/Release"))
                .map_err(|_| ParseError::Malformed { format: "Release", reason: "invalid feed URL".into() })?;
            let response = download
                .get(release_url.as_str())
                .await
                .map_err(|_| ParseError::Malformed { format: "Release", reason: "fetch failed".into() })?;
            parsed.files.push(NormalizedFile {
                file_category: "metadata",
                file_type: "release".into(),
                original_path: format!("dists/{suite}/Release"),
                compression: None,
                fetch_url: release_url,
                expected_sha256: None,
            });
            response.text().await.map_err(|_| ParseError::Malformed { format: "Release", reason: "read failed".into() })?
        }
    };
    let _ = parse_stanzas(&release_text); // checksums table retained for future verification hookup

    for component in components {
        for architecture in architectures {
            let path = format!("dists/{suite}/{component}/binary-{architecture}/Packages.gz");
            let url = feed
                .join(&path)
                .map_err(|_| ParseError::Malformed { format: "Packages", reason: format!("bad path '{path}'") })?;
            let body = download
                .get(url.as_str())
                .await
                .map_err(|_| ParseError::Malformed { format: "Packages", reason: format!("fetch of '{path}' failed") })?
                .bytes()
                .await
                .map_err(|_| ParseError::Malformed { format: "Packages", reason: format!("read of '{path}' failed") })?;

            parsed.files.push(NormalizedFile {
                file_category: "metadata",
                file_type: "packages".into(),
                original_path: path.clone(),
                compression: compression_of(&path),
                fetch_url: url.clone(),
                expected_sha256: None,
            });

            let text = String::from_utf8_lossy(&decompress(&body, &path)?).into_owned();
            for stanza in parse_stanzas(&text) {
                let Some(item) = stanza_to_item(&stanza, feed, architecture)? else { continue };
                parsed.items.push(item);
            }
        }
    }

    if include_source_packages {
        let path = format!("dists/{suite}/source/Sources.gz");
        if let Ok(url) = feed.join(&path) {
            if let Ok(response) = download.get(url.as_str()).await {
                if response.status().is_success() {
                    if let Ok(body) = response.bytes().await {
                        let text = String::from_utf8_lossy(&decompress(&body, &path)?).into_owned();
                        for stanza in parse_stanzas(&text) {
                            if let Some(item) = stanza_to_item(&stanza, feed, "source")? {
                                parsed.items.push(item);
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(parsed)
}

fn stanza_to_item(
    stanza: &[(String, String)],
    feed: &Url,
    architecture: &str,
) -> Result<Option<NormalizedItem>, ParseError> {
    let Some(name) = field(stanza, "Package") else { return Ok(None) };
    let Some(version) = field(stanza, "Version") else { return Ok(None) };
    let Some(filename) = field(stanza, "Filename") else { return Ok(None) };
    let payload_url = feed
        .join(filename)
        .map_err(|_| ParseError::Malformed { format: "Packages", reason: format!("bad Filename '{filename}'") })?;
    let size_bytes = field(stanza, "Size").and_then(|size| size.parse().ok()).unwrap_or(0);
    let expected_sha256 = field(stanza, "SHA256").and_then(|checksum| checksum.parse().ok());

    let metadata_json = serde_json::json!({
        "depends": field(stanza, "Depends"),
        "pre_depends": field(stanza, "Pre-Depends"),
        "recommends": field(stanza, "Recommends"),
        "suggests": field(stanza, "Suggests"),
        "breaks": field(stanza, "Breaks"),
        "conflicts": field(stanza, "Conflicts"),
        "replaces": field(stanza, "Replaces"),
        "provides": field(stanza, "Provides"),
        "section": field(stanza, "Section"),
        "priority": field(stanza, "Priority"),
        "multi_arch": field(stanza, "Multi-Arch"),
        "sha1": field(stanza, "SHA1"),
        "md5sum": field(stanza, "MD5sum"),
    });

    Ok(Some(NormalizedItem {
        name: name.to_string(),
        version: version.to_string(),
        architecture: architecture.to_string(),
        filename: filename.rsplit('/').next().unwrap_or(filename).to_string(),
        content_type: if architecture == "source" { "dsc" } else { "deb" },
        payload_url,
        expected_sha256,
        size_bytes,
        build_time: None,
        metadata_json,
    }))
}
