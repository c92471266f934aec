use super::Store;
use crate::error::StoreError;
use crate::model::{ContentItem, NewSnapshot, RepositoryFile, Snapshot};
use crate::schema::{content_items, repository_files, snapshot_content_items, snapshot_repository_files, snapshots};
use crate::version;
use diesel::prelude::*;
use std::collections::BTreeMap;

/// The outcome of [`Store::diff_snapshots`] (spec §4.G "Diff").
#[derive(Debug, Clone, Default)]
pub struct SnapshotDiff {
    pub added: Vec<ContentItem>,
    pub removed: Vec<ContentItem>,
    pub updated: Vec<(ContentItem, ContentItem)>,
}

impl Store {
    /// Freezes a repository's current membership into a new, immutable
    /// Snapshot, in one transaction (spec §4.G "Create (repository snapshot)").
    pub fn create_snapshot(
        &self,
        repository_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Snapshot, StoreError> {
        let mut conn = self.conn()?;
        super::serializable(&mut conn, |conn| {
            let exists = snapshots::table
                .filter(snapshots::repository_id.eq(repository_id).and(snapshots::name.eq(name)))
                .first::<Snapshot>(conn)
                .optional()?;
            if exists.is_some() {
                return Err(StoreError::AlreadyExists { entity: "Snapshot", name: name.to_string() });
            }

            let snapshot: Snapshot = diesel::insert_into(snapshots::table)
                .values(NewSnapshot { repository_id, name, description })
                .get_result(conn)?;

            diesel::sql_query(
                "INSERT INTO snapshot_content_items (snapshot_id, sha256) \
                 SELECT $1, sha256 FROM repository_content_items WHERE repository_id = $2",
            )
            .bind::<diesel::sql_types::BigInt, _>(snapshot.id)
            .bind::<diesel::sql_types::Text, _>(repository_id)
            .execute(conn)?;

            diesel::sql_query(
                "INSERT INTO snapshot_repository_files (snapshot_id, sha256) \
                 SELECT $1, sha256 FROM repository_files_junction WHERE repository_id = $2",
            )
            .bind::<diesel::sql_types::BigInt, _>(snapshot.id)
            .bind::<diesel::sql_types::Text, _>(repository_id)
            .execute(conn)?;

            Ok(snapshot)
        })
    }

    pub fn get_snapshot(&self, repository_id: &str, name: &str) -> Result<Snapshot, StoreError> {
        let mut conn = self.conn()?;
        snapshots::table
            .filter(snapshots::repository_id.eq(repository_id).and(snapshots::name.eq(name)))
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound { entity: "Snapshot", name: name.to_string() })
    }

    pub fn content_items_for_snapshot(&self, snapshot_id: i64) -> Result<Vec<ContentItem>, StoreError> {
        let mut conn = self.conn()?;
        content_items::table
            .inner_join(snapshot_content_items::table.on(snapshot_content_items::sha256.eq(content_items::sha256)))
            .filter(snapshot_content_items::snapshot_id.eq(snapshot_id))
            .select(ContentItem::as_select())
            .load(&mut conn)
            .map_err(Into::into)
    }

    pub fn repository_files_for_snapshot(&self, snapshot_id: i64) -> Result<Vec<RepositoryFile>, StoreError> {
        let mut conn = self.conn()?;
        repository_files::table
            .inner_join(
                snapshot_repository_files::table.on(snapshot_repository_files::sha256.eq(repository_files::sha256)),
            )
            .filter(snapshot_repository_files::snapshot_id.eq(snapshot_id))
            .select(RepositoryFile::as_select())
            .load(&mut conn)
            .map_err(Into::into)
    }

    /// Computes `added = b \ a`, `removed = a \ b`, and version-upgraded
    /// `updated` pairs sharing `(name, architecture)`, per spec §4.G "Diff".
    pub fn diff_snapshots(&self, a: &Snapshot, b: &Snapshot, ecosystem: version::Ecosystem) -> Result<SnapshotDiff, StoreError> {
        let items_a = self.content_items_for_snapshot(a.id)?;
        let items_b = self.content_items_for_snapshot(b.id)?;

        let set_a: std::collections::HashMap<_, _> = items_a.iter().map(|item| (item.sha256, item)).collect();
        let set_b: std::collections::HashMap<_, _> = items_b.iter().map(|item| (item.sha256, item)).collect();

        let mut diff = SnapshotDiff::default();
        for item in &items_b {
            if !set_a.contains_key(&item.sha256) {
                diff.added.push(item.clone());
            }
        }
        for item in &items_a {
            if !set_b.contains_key(&item.sha256) {
                diff.removed.push(item.clone());
            }
        }

        let mut by_key_a: BTreeMap<(&str, &str), &ContentItem> = BTreeMap::new();
        for item in &items_a {
            by_key_a.insert((item.name.as_str(), item.architecture.as_str()), item);
        }
        for item_b in &items_b {
            let key = (item_b.name.as_str(), item_b.architecture.as_str());
            if let Some(item_a) = by_key_a.get(&key) {
                if item_a.sha256 != item_b.sha256 && version::compare(ecosystem, &item_a.version, &item_b.version) != std::cmp::Ordering::Equal {
                    diff.updated.push(((*item_a).clone(), item_b.clone()));
                }
            }
        }

        Ok(diff)
    }

    /// Copies a snapshot's membership into a new Snapshot under a (possibly
    /// different) repository of the same ecosystem type. Database-only: zero
    /// bytes touched in the Pool (spec §4.G "Copy (promotion)").
    pub fn copy_snapshot(
        &self,
        source_repository_id: &str,
        source_name: &str,
        target_repository_id: &str,
        target_name: &str,
    ) -> Result<Snapshot, StoreError> {
        let mut conn = self.conn()?;
        let source = self.get_snapshot(source_repository_id, source_name)?;
        super::serializable(&mut conn, |conn| {
            let target: Snapshot = diesel::insert_into(snapshots::table)
                .values(NewSnapshot { repository_id: target_repository_id, name: target_name, description: None })
                .get_result(conn)?;

            diesel::sql_query(
                "INSERT INTO snapshot_content_items (snapshot_id, sha256) \
                 SELECT $1, sha256 FROM snapshot_content_items WHERE snapshot_id = $2",
            )
            .bind::<diesel::sql_types::BigInt, _>(target.id)
            .bind::<diesel::sql_types::BigInt, _>(source.id)
            .execute(conn)?;

            diesel::sql_query(
                "INSERT INTO snapshot_repository_files (snapshot_id, sha256) \
                 SELECT $1, sha256 FROM snapshot_repository_files WHERE snapshot_id = $2",
            )
            .bind::<diesel::sql_types::BigInt, _>(target.id)
            .bind::<diesel::sql_types::BigInt, _>(source.id)
            .execute(conn)?;

            Ok(target)
        })
    }

    /// Deletes a Snapshot and its junction rows. Never removes pool blobs
    /// (the Reconciler does).
    pub fn delete_snapshot(&self, repository_id: &str, name: &str) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let snapshot = self.get_snapshot(repository_id, name)?;
        diesel::delete(snapshots::table.find(snapshot.id)).execute(&mut conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{NewContentItem, NewRepository};
    use crate::test::test_store;
    use serde_json::json;

    fn repo(store: &crate::store::Store, id: &str) {
        store
            .upsert_repository(&NewRepository {
                id,
                name: id,
                ecosystem: "rpm",
                feed_url: "https://example.invalid/repo/",
                enabled: true,
                mode: "MIRROR",
                apt_suite: None,
                apt_components: &[],
                apt_architectures: &[],
                apk_branch: None,
                apk_repository: None,
                apk_architecture: None,
            })
            .unwrap();
    }

    fn item(sha_byte: u8, name: &str, version: &str) -> NewContentItem<'static> {
        let sha256 = crate::checksum::Sha256Checksum::from_bytes([sha_byte; 32]);
        NewContentItem {
            sha256,
            filename: Box::leak(format!("{name}-{version}.rpm").into_boxed_str()),
            size_bytes: 1024,
            content_type: "rpm",
            name: Box::leak(name.to_string().into_boxed_str()),
            version: Box::leak(version.to_string().into_boxed_str()),
            architecture: "x86_64",
            metadata_json: json!({}),
        }
    }

    #[test]
    fn diff_is_empty_between_a_snapshot_and_itself() {
        let store = test_store();
        repo(&store, "diff-self");
        store.register_content_item("diff-self", &item(0x11, "nginx", "1.20.2"), 0).unwrap();

        let snapshot = store.create_snapshot("diff-self", "X", None).unwrap();
        let diff = store.diff_snapshots(&snapshot, &snapshot, crate::version::Ecosystem::Rpm).unwrap();
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert!(diff.updated.is_empty());
    }

    #[test]
    fn diff_detects_added_removed_and_updated() {
        let store = test_store();
        repo(&store, "diff-change");
        store.register_content_item("diff-change", &item(0x21, "nginx", "1.20.1"), 0).unwrap();
        store.register_content_item("diff-change", &item(0x22, "kernel", "5.14.0"), 0).unwrap();
        let before = store.create_snapshot("diff-change", "before", None).unwrap();

        store.replace_content_membership("diff-change", &[]).unwrap();
        store.register_content_item("diff-change", &item(0x23, "nginx", "1.20.2"), 0).unwrap();
        let after = store.create_snapshot("diff-change", "after", None).unwrap();

        let diff = store.diff_snapshots(&before, &after, crate::version::Ecosystem::Rpm).unwrap();
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].name, "kernel");
        assert_eq!(diff.updated.len(), 1);
        assert_eq!(diff.updated[0].0.version, "1.20.1");
        assert_eq!(diff.updated[0].1.version, "1.20.2");
    }

    #[test]
    fn copy_snapshot_is_database_only() {
        let store = test_store();
        repo(&store, "copy-src");
        repo(&store, "copy-dst");
        store.register_content_item("copy-src", &item(0x31, "vim", "9.0.2120"), 0).unwrap();
        store.create_snapshot("copy-src", "2025-02", None).unwrap();

        let copied = store.copy_snapshot("copy-src", "2025-02", "copy-dst", "2025-02").unwrap();
        let members = store.content_items_for_snapshot(copied.id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "vim");
    }

    #[test]
    fn snapshot_name_must_be_unique_within_repository() {
        let store = test_store();
        repo(&store, "unique-name");
        store.create_snapshot("unique-name", "dup", None).unwrap();
        let err = store.create_snapshot("unique-name", "dup", None).unwrap_err();
        assert!(matches!(err, crate::error::StoreError::AlreadyExists { .. }));
    }
}
