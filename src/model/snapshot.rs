use crate::schema::snapshots;
use crate::time::DateTime;
use diesel::prelude::*;

/// Named, immutable frozen selection of a repository's members at one instant
/// (spec §3 "Snapshot"). Never mutates after creation; deletion does not
/// remove pool blobs (the Reconciler does).
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = snapshots, check_for_backend(diesel::pg::Pg), primary_key(id))]
pub struct Snapshot {
    pub id: i64,
    pub repository_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = snapshots, check_for_backend(diesel::pg::Pg))]
pub struct NewSnapshot<'a> {
    pub repository_id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
}
