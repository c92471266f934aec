use crate::config::{Ecosystem, Mode};
use crate::schema::repositories;
use crate::time::DateTime;
use diesel::prelude::*;

/// A logical upstream feed (spec §3 "Repository"). Materialized on first sync;
/// never auto-deleted when it disappears from config (orphan reconciliation
/// handles cleanup per spec §9's caller-policy open question).
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = repositories, check_for_backend(diesel::pg::Pg), primary_key(id))]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub ecosystem: String,
    pub feed_url: String,
    pub enabled: bool,
    pub mode: String,
    pub last_sync_at: Option<DateTime>,
    pub apt_suite: Option<String>,
    pub apt_components: Vec<String>,
    pub apt_architectures: Vec<String>,
    pub apk_branch: Option<String>,
    pub apk_repository: Option<String>,
    pub apk_architecture: Option<String>,
    pub created_at: DateTime,
}

impl Repository {
    pub fn ecosystem(&self) -> Option<Ecosystem> {
        match self.ecosystem.as_str() {
            "rpm" => Some(Ecosystem::Rpm),
            "deb" => Some(Ecosystem::Deb),
            "helm" => Some(Ecosystem::Helm),
            "apk" => Some(Ecosystem::Apk),
            _ => None,
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        match self.mode.as_str() {
            "MIRROR" => Some(Mode::Mirror),
            "FILTERED" => Some(Mode::Filtered),
            "HOSTED" => Some(Mode::Hosted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = repositories, check_for_backend(diesel::pg::Pg))]
pub struct NewRepository<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub ecosystem: &'a str,
    pub feed_url: &'a str,
    pub enabled: bool,
    pub mode: &'a str,
    pub apt_suite: Option<&'a str>,
    pub apt_components: &'a [String],
    pub apt_architectures: &'a [String],
    pub apk_branch: Option<&'a str>,
    pub apk_repository: Option<&'a str>,
    pub apk_architecture: Option<&'a str>,
}
