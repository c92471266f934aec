//! Ecosystem parsers and publishers (components D and F, spec §4.D/§4.F).
//! Per spec §9 "Interface polymorphism over ecosystems", the core only
//! switches on ecosystem at these two dispatch points — everywhere else
//! operates on the normalized types below.

pub mod apk;
pub mod apt;
pub mod helm;
pub mod rpm;

use crate::checksum::Sha256Checksum;
use crate::config::Ecosystem;
use crate::error::ParseError;
use serde_json::Value as Json;
use url::Url;

/// One candidate artifact discovered in upstream metadata, before filtering
/// (spec §4.D "normalized record set").
#[derive(Debug, Clone)]
pub struct NormalizedItem {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub filename: String,
    pub content_type: &'static str,
    pub payload_url: Url,
    pub expected_sha256: Option<Sha256Checksum>,
    pub size_bytes: u64,
    pub build_time: Option<crate::time::DateTime>,
    pub metadata_json: Json,
}

/// One metadata or kickstart blob to preserve as a `RepositoryFile`.
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    pub file_category: &'static str,
    pub file_type: String,
    pub original_path: String,
    pub compression: Option<&'static str>,
    pub fetch_url: Url,
    pub expected_sha256: Option<Sha256Checksum>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub items: Vec<NormalizedItem>,
    pub files: Vec<NormalizedFile>,
}

pub fn decompress(bytes: &[u8], path: &str) -> Result<Vec<u8>, ParseError> {
    if path.ends_with(".gz") {
        use std::io::Read;
        let mut decoder = flate2::read::GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    } else if path.ends_with(".xz") {
        use std::io::Read;
        let mut decoder = xz2::read::XzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    } else if path.ends_with(".bz2") {
        use std::io::Read;
        let mut decoder = bzip2::read::BzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    } else if path.ends_with(".zst") {
        zstd::stream::decode_all(bytes).map_err(ParseError::from)
    } else {
        Ok(bytes.to_vec())
    }
}

pub fn compression_of(path: &str) -> Option<&'static str> {
    if path.ends_with(".gz") {
        Some("gz")
    } else if path.ends_with(".xz") {
        Some("xz")
    } else if path.ends_with(".bz2") {
        Some("bz2")
    } else if path.ends_with(".zst") {
        Some("zst")
    } else {
        None
    }
}

pub fn ecosystem_of(content_type: &str) -> Option<Ecosystem> {
    match content_type {
        "rpm" => Some(Ecosystem::Rpm),
        "deb" | "dsc" => Some(Ecosystem::Deb),
        "chart" => Some(Ecosystem::Helm),
        "apk" => Some(Ecosystem::Apk),
        _ => None,
    }
}
