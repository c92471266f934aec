use crate::checksum::Sha256Checksum;
use crate::schema::{content_items, repository_files};
use crate::time::DateTime;
use diesel::prelude::*;
use serde_json::Value as Json;

/// One logical artifact, identified by `sha256` across the whole system
/// (spec §3 "ContentItem"). Two upstreams delivering bit-identical blobs
/// share one row.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = content_items, check_for_backend(diesel::pg::Pg), primary_key(sha256))]
pub struct ContentItem {
    pub sha256: Sha256Checksum,
    pub filename: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub metadata_json: Json,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = content_items, check_for_backend(diesel::pg::Pg))]
pub struct NewContentItem<'a> {
    pub sha256: Sha256Checksum,
    pub filename: &'a str,
    pub size_bytes: i64,
    pub content_type: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub architecture: &'a str,
    pub metadata_json: Json,
}

/// A metadata blob attached to a repository (repomd.xml, Packages.gz,
/// APKINDEX.tar.gz, kickstart assets, ...). Stored in a distinct pool bucket
/// from `ContentItem` because its churn and identity rules differ.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = repository_files, check_for_backend(diesel::pg::Pg), primary_key(sha256))]
pub struct RepositoryFile {
    pub sha256: Sha256Checksum,
    pub file_category: String,
    pub file_type: String,
    pub original_path: String,
    pub compression: Option<String>,
    pub size_bytes: i64,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = repository_files, check_for_backend(diesel::pg::Pg))]
pub struct NewRepositoryFile<'a> {
    pub sha256: Sha256Checksum,
    pub file_category: &'a str,
    pub file_type: &'a str,
    pub original_path: &'a str,
    pub compression: Option<&'a str>,
    pub size_bytes: i64,
}
