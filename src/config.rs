//! Configuration types the core consumes. Per spec.md §1 the YAML/TOML loader
//! and CLI dispatch are external collaborators; this module owns the *shape*
//! of a validated configuration object (mirrors the teacher's `config.rs`,
//! which owns `Config`'s shape even though deployment supplies the file) plus
//! a `GlobalConfig::validate` pass the core runs on every config it is handed,
//! since it must defend its own invariants regardless of what validated it
//! upstream.

use crate::time::DateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use strum::Display;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Rpm,
    Deb,
    Helm,
    Apk,
}

/// How a repository's published tree relates to its upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Mirror,
    Filtered,
    Hosted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub ssl: Option<SslConfig>,
    #[serde(default)]
    pub download: DownloadConfig,
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    pub pool_root: PathBuf,
    pub published_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadConfig {
    #[serde(default = "DownloadConfig::default_workers")]
    pub workers: usize,
    #[serde(default = "DownloadConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "DownloadConfig::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "DownloadConfig::default_response_timeout_secs")]
    pub response_timeout_secs: u64,
}

impl DownloadConfig {
    fn default_workers() -> usize {
        4
    }
    fn default_max_attempts() -> u32 {
        3
    }
    fn default_connect_timeout_secs() -> u64 {
        10
    }
    fn default_response_timeout_secs() -> u64 {
        300
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            max_attempts: Self::default_max_attempts(),
            connect_timeout_secs: Self::default_connect_timeout_secs(),
            response_timeout_secs: Self::default_response_timeout_secs(),
        }
    }
}

/// Proxy resolution follows spec.md §4.C: repository-level config wins over
/// global config wins over environment variables wins over none. A
/// repository-level `enabled = false` disables proxying outright and
/// overrides higher-precedence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default = "ProxyConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub http_proxy: Option<Url>,
    #[serde(default)]
    pub https_proxy: Option<Url>,
    #[serde(default)]
    pub no_proxy: Vec<String>,
}

impl ProxyConfig {
    fn default_enabled() -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SslConfig {
    #[serde(default)]
    pub ca_bundle_path: Option<PathBuf>,
    #[serde(default = "SslConfig::default_verify")]
    pub verify: bool,
}

impl SslConfig {
    fn default_verify() -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AuthConfig {
    Basic { username: String, password: String },
    Bearer { token: String },
    Header { name: String, value: String },
    Mtls { client_cert_path: PathBuf, client_key_path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub ecosystem: Ecosystem,
    pub feed: Url,
    #[serde(default = "RepositoryConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "RepositoryConfig::default_mode")]
    pub mode: Mode,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub ssl: Option<SslConfig>,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub ecosystem_config: EcosystemRepoConfig,
}

impl RepositoryConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_mode() -> Mode {
        Mode::Mirror
    }
}

/// Ecosystem-specific repository attributes named in spec.md §3: APT
/// distribution/components/architectures, APK branch/repository/arch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EcosystemRepoConfig {
    #[serde(default)]
    pub apt_suite: Option<String>,
    #[serde(default)]
    pub apt_components: Vec<String>,
    #[serde(default)]
    pub apt_architectures: Vec<String>,
    #[serde(default)]
    pub apk_branch: Option<String>,
    #[serde(default)]
    pub apk_repository: Option<String>,
    #[serde(default)]
    pub apk_architecture: Option<String>,
}

/// Filter stages applied in the fixed order documented in spec.md §4.E and §9
/// ("Filter order is part of the contract"): patterns, architecture, size,
/// build-time, ecosystem-specific, then post-processing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub include_architectures: Vec<String>,
    #[serde(default)]
    pub exclude_architectures: Vec<String>,
    #[serde(default)]
    pub min_bytes: Option<u64>,
    #[serde(default)]
    pub max_bytes: Option<u64>,
    #[serde(default)]
    pub build_time_after: Option<DateTime>,
    #[serde(default)]
    pub build_time_before: Option<DateTime>,
    #[serde(default)]
    pub ecosystem: EcosystemFilterConfig,
    #[serde(default)]
    pub only_latest_version: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EcosystemFilterConfig {
    /// RPM: exclude `.src.rpm` packages.
    #[serde(default = "EcosystemFilterConfig::default_true")]
    pub rpm_exclude_source: bool,
    #[serde(default)]
    pub rpm_include_groups: Vec<String>,
    #[serde(default)]
    pub rpm_include_licenses: Vec<String>,
    #[serde(default)]
    pub apt_include_components: Vec<String>,
    #[serde(default)]
    pub apt_include_priorities: Vec<String>,
    #[serde(default)]
    pub apt_include_source_packages: bool,
}

impl EcosystemFilterConfig {
    fn default_true() -> bool {
        true
    }
}

impl GlobalConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigParseError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigParseError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Defends invariants the core relies on regardless of who built this
    /// value: spec.md §9 "MIRROR vs FILTERED as distinct subsystems" and
    /// unique repository ids.
    pub fn validate(&self) -> Result<(), ConfigParseError> {
        if self.storage.pool_root.as_os_str().is_empty() {
            return Err(ConfigParseError::Invalid("storage.pool_root must not be empty".into()));
        }
        if self.storage.published_root.as_os_str().is_empty() {
            return Err(ConfigParseError::Invalid(
                "storage.published_root must not be empty".into(),
            ));
        }
        let mut seen_ids = std::collections::HashSet::new();
        for repository in &self.repositories {
            if !seen_ids.insert(repository.id.as_str()) {
                return Err(ConfigParseError::Invalid(format!(
                    "duplicate repository id '{}'",
                    repository.id
                )));
            }
            if repository.mode == Mode::Mirror && repository.filters.only_latest_version {
                return Err(ConfigParseError::Invalid(format!(
                    "repository '{}': only_latest_version post-processing is disallowed in MIRROR mode (spec §9)",
                    repository.id
                )));
            }
            if repository.mode == Mode::Hosted && repository.filters.only_latest_version {
                return Err(ConfigParseError::Invalid(format!(
                    "repository '{}': only_latest_version is meaningless in HOSTED mode with no upstream to filter",
                    repository.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigParseError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
