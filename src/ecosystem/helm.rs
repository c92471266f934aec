//! Helm chart repository parser (spec §4.D "Helm"). Entry point `index.yaml`.

use super::{NormalizedFile, NormalizedItem, ParsedFeed};
use crate::download::DownloadManager;
use crate::error::ParseError;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct HelmIndex {
    #[serde(default)]
    entries: std::collections::BTreeMap<String, Vec<HelmChartVersion>>,
}

#[derive(Debug, Deserialize)]
struct HelmChartVersion {
    name: String,
    version: String,
    #[serde(rename = "appVersion", default)]
    app_version: Option<String>,
    digest: Option<String>,
    #[serde(default)]
    urls: Vec<String>,
}

pub async fn parse(download: &DownloadManager, feed: &Url) -> Result<ParsedFeed, ParseError> {
    let index_url = feed
        .join("index.yaml")
        .map_err(|_| ParseError::Malformed { format: "index.yaml", reason: "invalid feed URL".into() })?;
    let body = download
        .get(index_url.as_str())
        .await
        .map_err(|_| ParseError::Malformed { format: "index.yaml", reason: "fetch failed".into() })?
        .text()
        .await
        .map_err(|_| ParseError::Malformed { format: "index.yaml", reason: "read failed".into() })?;

    let index: HelmIndex = serde_yaml::from_str(&body)?;

    let mut parsed = ParsedFeed::default();
    parsed.files.push(NormalizedFile {
        file_category: "metadata",
        file_type: "index".into(),
        original_path: "index.yaml".into(),
        compression: None,
        fetch_url: index_url,
        expected_sha256: None,
    });

    for (chart_name, versions) in index.entries {
        for version in versions {
            let Some(raw_url) = version.urls.first() else { continue };
            let payload_url = Url::parse(raw_url).or_else(|_| feed.join(raw_url)).map_err(|_| ParseError::Malformed {
                format: "index.yaml",
                reason: format!("bad url for chart '{chart_name}'"),
            })?;
            let expected_sha256 = version
                .digest
                .as_deref()
                .and_then(|digest| digest.strip_prefix("sha256:").unwrap_or(digest).parse().ok());
            let filename = payload_url.path_segments().and_then(|segments| segments.last()).map(str::to_string)
                .unwrap_or_else(|| format!("{}-{}.tgz", version.name, version.version));

            parsed.items.push(NormalizedItem {
                name: version.name.clone(),
                version: version.version.clone(),
                architecture: "any".into(),
                filename,
                content_type: "chart",
                payload_url,
                expected_sha256,
                size_bytes: 0,
                build_time: None,
                metadata_json: serde_json::json!({ "app_version": version.app_version }),
            });
        }
    }

    Ok(parsed)
}
