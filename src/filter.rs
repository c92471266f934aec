//! The fixed filter pipeline applied during sync (spec §4.E step 4, §9
//! "Filter order is part of the contract"): patterns, then architecture,
//! then size, then build-time, then ecosystem-specific, then
//! `only_latest_version` post-processing.

use crate::config::{Ecosystem, EcosystemFilterConfig, FilterConfig};
use crate::ecosystem::NormalizedItem;
use crate::version;
use regex::Regex;
use std::collections::HashMap;

/// Stages (a)-(e): patterns, architecture, size, build-time, ecosystem-
/// specific. These apply regardless of repository mode — MIRROR only skips
/// stage (f) post-processing, not the (a)-(e) filter stages themselves (spec
/// §4.E "Modes": "all upstream payloads that pass filter stage (a-e) are
/// mirrored; post-processing (f) is disallowed").
pub fn apply_stages_a_to_e(ecosystem: Ecosystem, config: &FilterConfig, items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    let items = filter_patterns(config, items);
    let items = filter_architecture(config, items);
    let items = filter_size(config, items);
    let items = filter_build_time(config, items);
    filter_ecosystem(ecosystem, &config.ecosystem, items)
}

/// The full pipeline, stages (a)-(e) followed by (f) `only_latest_version`
/// post-processing when configured. FILTERED/HOSTED repositories use this;
/// MIRROR repositories call [`apply_stages_a_to_e`] directly and never reach
/// stage (f).
pub fn apply(ecosystem: Ecosystem, config: &FilterConfig, items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    let items = apply_stages_a_to_e(ecosystem, config, items);
    only_latest_version_if_configured(ecosystem, config, items)
}

/// Stage (f), gated on `config.only_latest_version`.
pub fn only_latest_version_if_configured(ecosystem: Ecosystem, config: &FilterConfig, items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    if config.only_latest_version {
        only_latest_version(ecosystem, &config.ecosystem, items)
    } else {
        items
    }
}

fn compile(patterns: &[String]) -> Vec<Regex> {
    patterns.iter().filter_map(|pattern| Regex::new(pattern).ok()).collect()
}

/// Include regex list is a disjunction; empty means include-all, never
/// include-none (spec §8 "Pattern include list empty"). Exclude applies over
/// the result of include.
fn filter_patterns(config: &FilterConfig, items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    let includes = compile(&config.include_patterns);
    let excludes = compile(&config.exclude_patterns);
    items
        .into_iter()
        .filter(|item| includes.is_empty() || includes.iter().any(|pattern| pattern.is_match(&item.name)))
        .filter(|item| !excludes.iter().any(|pattern| pattern.is_match(&item.name)))
        .collect()
}

fn filter_architecture(config: &FilterConfig, items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    items
        .into_iter()
        .filter(|item| {
            config.include_architectures.is_empty()
                || config.include_architectures.iter().any(|arch| arch == &item.architecture)
        })
        .filter(|item| !config.exclude_architectures.iter().any(|arch| arch == &item.architecture))
        .collect()
}

fn filter_size(config: &FilterConfig, items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    items
        .into_iter()
        .filter(|item| config.min_bytes.map(|min| item.size_bytes >= min).unwrap_or(true))
        .filter(|item| config.max_bytes.map(|max| item.size_bytes <= max).unwrap_or(true))
        .collect()
}

fn filter_build_time(config: &FilterConfig, items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    items
        .into_iter()
        .filter(|item| match (item.build_time, config.build_time_after) {
            (Some(build_time), Some(after)) => build_time >= after,
            _ => true,
        })
        .filter(|item| match (item.build_time, config.build_time_before) {
            (Some(build_time), Some(before)) => build_time <= before,
            _ => true,
        })
        .collect()
}

fn filter_ecosystem(ecosystem: Ecosystem, config: &EcosystemFilterConfig, items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    match ecosystem {
        Ecosystem::Rpm => items
            .into_iter()
            .filter(|item| !(config.rpm_exclude_source && item.architecture == "src"))
            .filter(|item| {
                config.rpm_include_groups.is_empty()
                    || item
                        .metadata_json
                        .get("group")
                        .and_then(|group| group.as_str())
                        .map(|group| config.rpm_include_groups.iter().any(|g| g == group))
                        .unwrap_or(false)
            })
            .filter(|item| {
                config.rpm_include_licenses.is_empty()
                    || item
                        .metadata_json
                        .get("license")
                        .and_then(|license| license.as_str())
                        .map(|license| config.rpm_include_licenses.iter().any(|l| l == license))
                        .unwrap_or(false)
            })
            .collect(),
        Ecosystem::Deb => items
            .into_iter()
            .filter(|item| {
                item.architecture != "source" || config.apt_include_source_packages
            })
            .filter(|item| {
                config.apt_include_priorities.is_empty()
                    || item
                        .metadata_json
                        .get("priority")
                        .and_then(|priority| priority.as_str())
                        .map(|priority| config.apt_include_priorities.iter().any(|p| p == priority))
                        .unwrap_or(false)
            })
            .collect(),
        Ecosystem::Helm | Ecosystem::Apk => items,
    }
}

/// Groups by `(name, architecture)` and keeps the maximum version under the
/// ecosystem's native ordering (spec §4.E step 4.f). Per §9's resolved open
/// question, `include_source_packages` items (`architecture == "source"`)
/// are grouped under their own `(name, "source")` key rather than mixed with
/// binary architectures of the same name.
fn only_latest_version(
    ecosystem: Ecosystem,
    _config: &EcosystemFilterConfig,
    items: Vec<NormalizedItem>,
) -> Vec<NormalizedItem> {
    let version_ecosystem = match ecosystem {
        Ecosystem::Rpm => version::Ecosystem::Rpm,
        Ecosystem::Deb => version::Ecosystem::Deb,
        Ecosystem::Helm => version::Ecosystem::Helm,
        Ecosystem::Apk => version::Ecosystem::Apk,
    };

    let mut groups: HashMap<(String, String), NormalizedItem> = HashMap::new();
    for item in items {
        let key = (item.name.clone(), item.architecture.clone());
        match groups.get(&key) {
            Some(existing) if version::compare(version_ecosystem, &existing.version, &item.version).is_ge() => {}
            _ => {
                groups.insert(key, item);
            }
        }
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn item(name: &str, version: &str, architecture: &str) -> NormalizedItem {
        NormalizedItem {
            name: name.into(),
            version: version.into(),
            architecture: architecture.into(),
            filename: format!("{name}-{version}.rpm"),
            content_type: "rpm",
            payload_url: Url::parse("https://example.test/p").unwrap(),
            expected_sha256: None,
            size_bytes: 100,
            build_time: None,
            metadata_json: serde_json::json!({}),
        }
    }

    #[test]
    fn empty_include_patterns_admit_all() {
        let config = FilterConfig::default();
        let items = vec![item("nginx", "1.0", "x86_64")];
        assert_eq!(filter_patterns(&config, items).len(), 1);
    }

    #[test]
    fn only_latest_version_keeps_max_under_rpm_rules() {
        let items = vec![item("pkg", "1.0-1", "x86_64"), item("pkg", "1.10-1", "x86_64"), item("pkg", "1.9-1", "x86_64")];
        let config = EcosystemFilterConfig::default();
        let kept = only_latest_version(Ecosystem::Rpm, &config, items);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].version, "1.10-1");
    }
}
