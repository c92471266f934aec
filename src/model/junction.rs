use crate::checksum::Sha256Checksum;
use crate::schema::{repository_content_items, repository_files_junction};
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = repository_content_items, check_for_backend(diesel::pg::Pg), primary_key(repository_id, sha256))]
pub struct RepositoryContentItem {
    pub repository_id: String,
    pub sha256: Sha256Checksum,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = repository_content_items, check_for_backend(diesel::pg::Pg))]
pub struct NewRepositoryContentItem<'a> {
    pub repository_id: &'a str,
    pub sha256: Sha256Checksum,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = repository_files_junction, check_for_backend(diesel::pg::Pg), primary_key(repository_id, sha256))]
pub struct RepositoryFilesJunction {
    pub repository_id: String,
    pub sha256: Sha256Checksum,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = repository_files_junction, check_for_backend(diesel::pg::Pg))]
pub struct NewRepositoryFilesJunction<'a> {
    pub repository_id: &'a str,
    pub sha256: Sha256Checksum,
    pub sort_order: i32,
}
