use super::{link_content, mirror_files, PublishSet};
use crate::config::Mode;
use crate::error::Error;
use crate::pool::Pool;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(serde::Serialize)]
struct HelmIndex {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    entries: BTreeMap<String, Vec<HelmChartVersion>>,
    generated: String,
}

#[derive(serde::Serialize)]
struct HelmChartVersion {
    name: String,
    version: String,
    digest: String,
    urls: Vec<String>,
    created: String,
}

/// Helm shape: a flat directory of `.tgz` charts plus `index.yaml` (spec
/// §4.F "Helm"). FILTERED mode regenerates `digest`/`urls`/`created` to
/// reflect the published set rather than replaying the upstream index.
pub fn emit(pool: &Pool, set: &PublishSet, staging: &Path) -> Result<(), Error> {
    for item in &set.content_items {
        link_content(pool, item, &staging.join(&item.filename))?;
    }

    match set.mode {
        Mode::Mirror => mirror_files(pool, set, staging),
        Mode::Filtered | Mode::Hosted => regenerate_index(set, staging),
    }
}

fn regenerate_index(set: &PublishSet, staging: &Path) -> Result<(), Error> {
    let mut entries: BTreeMap<String, Vec<HelmChartVersion>> = BTreeMap::new();
    for item in &set.content_items {
        entries.entry(item.name.clone()).or_default().push(HelmChartVersion {
            name: item.name.clone(),
            version: item.version.clone(),
            digest: format!("sha256:{}", item.sha256),
            urls: vec![item.filename.clone()],
            created: crate::time::DateTime::now().to_rfc3339(),
        });
    }

    let index = HelmIndex { api_version: "v1", entries, generated: crate::time::DateTime::now().to_rfc3339() };
    let yaml = serde_yaml::to_string(&index).map_err(|source| crate::error::ParseError::Yaml(source))?;
    std::fs::write(staging.join("index.yaml"), yaml).map_err(|source| super::pool_io_err(staging, source))
}
