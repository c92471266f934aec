use crate::schema::{view_snapshot_members, view_snapshots, views};
use crate::time::DateTime;
use diesel::prelude::*;

/// A named ordered list of repository ids sharing one ecosystem (spec §3
/// "View"). Views have no content of their own; they compose.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = views, check_for_backend(diesel::pg::Pg), primary_key(name))]
pub struct View {
    pub name: String,
    pub description: Option<String>,
    pub ecosystem: String,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = views, check_for_backend(diesel::pg::Pg))]
pub struct NewView<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub ecosystem: &'a str,
}

/// An atomic freeze of a view: one sibling [`Snapshot`](super::Snapshot) per
/// constituent repository, all sharing this row's `name` (spec §3
/// "ViewSnapshot", invariant 3).
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = view_snapshots, check_for_backend(diesel::pg::Pg), primary_key(id))]
pub struct ViewSnapshot {
    pub id: i64,
    pub view_name: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = view_snapshots, check_for_backend(diesel::pg::Pg))]
pub struct NewViewSnapshot<'a> {
    pub view_name: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = view_snapshot_members, check_for_backend(diesel::pg::Pg), primary_key(view_snapshot_id, repository_id))]
pub struct ViewSnapshotMember {
    pub view_snapshot_id: i64,
    pub repository_id: String,
    pub snapshot_id: i64,
}
