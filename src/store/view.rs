use super::Store;
use crate::error::StoreError;
use crate::model::{NewView, NewViewSnapshot, Repository, Snapshot, View, ViewSnapshot, ViewSnapshotMember};
use crate::schema::{repositories, view_members, view_snapshot_members, view_snapshots, views};
use diesel::prelude::*;

/// One constituent of a resolved [`View`]: its repository plus either its
/// current membership or a named sibling snapshot, depending on the caller.
pub struct ViewMember {
    pub repository: Repository,
    pub sort_order: i32,
}

impl Store {
    pub fn create_view(&self, name: &str, description: Option<&str>, ecosystem: &str) -> Result<View, StoreError> {
        let mut conn = self.conn()?;
        diesel::insert_into(views::table)
            .values(NewView { name, description, ecosystem })
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    pub fn set_view_members(&self, view_name: &str, repository_ids: &[&str]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        super::serializable(&mut conn, |conn| {
            diesel::delete(view_members::table.filter(view_members::view_name.eq(view_name))).execute(conn)?;
            for (index, repository_id) in repository_ids.iter().enumerate() {
                diesel::insert_into(view_members::table)
                    .values((
                        view_members::view_name.eq(view_name),
                        view_members::repository_id.eq(*repository_id),
                        view_members::sort_order.eq(index as i32),
                    ))
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    /// Resolves a view to its ordered constituent repositories (spec §4.H).
    /// All constituents must share one ecosystem `type`, enforced at
    /// membership-assignment time rather than here.
    pub fn resolve_view(&self, view_name: &str) -> Result<Vec<ViewMember>, StoreError> {
        let mut conn = self.conn()?;
        let rows: Vec<(Repository, i32)> = repositories::table
            .inner_join(view_members::table.on(view_members::repository_id.eq(repositories::id)))
            .filter(view_members::view_name.eq(view_name))
            .order(view_members::sort_order.asc())
            .select((Repository::as_select(), view_members::sort_order))
            .load(&mut conn)?;
        Ok(rows.into_iter().map(|(repository, sort_order)| ViewMember { repository, sort_order }).collect())
    }

    /// Creates a ViewSnapshot as an atomic bundle of sibling repository
    /// snapshots sharing `name`, per spec §4.G "Create (view snapshot)" and
    /// the invariant in §3 ("All sibling snapshots must exist..."). Any
    /// failure (a name collision or an empty repository, unless
    /// `skip_empty` is set) rolls back every sibling snapshot created so far.
    pub fn create_view_snapshot(
        &self,
        view_name: &str,
        name: &str,
        description: Option<&str>,
        skip_empty: bool,
    ) -> Result<ViewSnapshot, StoreError> {
        let mut conn = self.conn()?;
        super::serializable(&mut conn, |conn| {
            let members: Vec<(Repository, i32)> = repositories::table
                .inner_join(view_members::table.on(view_members::repository_id.eq(repositories::id)))
                .filter(view_members::view_name.eq(view_name))
                .order(view_members::sort_order.asc())
                .select((Repository::as_select(), view_members::sort_order))
                .load(conn)?;

            let view_snapshot: ViewSnapshot = diesel::insert_into(view_snapshots::table)
                .values(NewViewSnapshot { view_name, name, description })
                .get_result(conn)?;

            for (repository, _) in &members {
                let item_count: i64 = crate::schema::repository_content_items::table
                    .filter(crate::schema::repository_content_items::repository_id.eq(&repository.id))
                    .count()
                    .get_result(conn)?;
                if item_count == 0 {
                    if skip_empty {
                        continue;
                    }
                    return Err(StoreError::IncompleteViewSnapshot {
                        view: view_name.to_string(),
                        snapshot: name.to_string(),
                        repository: repository.id.clone(),
                    });
                }

                let sibling: Snapshot = diesel::insert_into(crate::schema::snapshots::table)
                    .values(crate::model::NewSnapshot { repository_id: &repository.id, name, description: None })
                    .get_result(conn)?;

                diesel::sql_query(
                    "INSERT INTO snapshot_content_items (snapshot_id, sha256) \
                     SELECT $1, sha256 FROM repository_content_items WHERE repository_id = $2",
                )
                .bind::<diesel::sql_types::BigInt, _>(sibling.id)
                .bind::<diesel::sql_types::Text, _>(&repository.id)
                .execute(conn)?;

                diesel::insert_into(view_snapshot_members::table)
                    .values(ViewSnapshotMemberNew {
                        view_snapshot_id: view_snapshot.id,
                        repository_id: &repository.id,
                        snapshot_id: sibling.id,
                    })
                    .execute(conn)?;
            }

            Ok(view_snapshot)
        })
    }

    pub fn view_snapshot_members(&self, view_snapshot_id: i64) -> Result<Vec<ViewSnapshotMember>, StoreError> {
        let mut conn = self.conn()?;
        view_snapshot_members::table
            .filter(view_snapshot_members::view_snapshot_id.eq(view_snapshot_id))
            .load(&mut conn)
            .map_err(Into::into)
    }

    pub fn get_view(&self, view_name: &str) -> Result<View, StoreError> {
        let mut conn = self.conn()?;
        views::table
            .find(view_name)
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound { entity: "View", name: view_name.to_string() })
    }

    pub fn get_view_snapshot(&self, view_name: &str, name: &str) -> Result<ViewSnapshot, StoreError> {
        let mut conn = self.conn()?;
        view_snapshots::table
            .filter(view_snapshots::view_name.eq(view_name).and(view_snapshots::name.eq(name)))
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound { entity: "ViewSnapshot", name: name.to_string() })
    }

    /// Deletes a ViewSnapshot and the sibling repository Snapshots created
    /// solely to back it, in one transaction. Never removes pool blobs.
    pub fn delete_view_snapshot(&self, view_name: &str, name: &str) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        super::serializable(&mut conn, |conn| {
            let view_snapshot = view_snapshots::table
                .filter(view_snapshots::view_name.eq(view_name).and(view_snapshots::name.eq(name)))
                .first::<ViewSnapshot>(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound { entity: "ViewSnapshot", name: name.to_string() })?;

            let members: Vec<ViewSnapshotMember> = view_snapshot_members::table
                .filter(view_snapshot_members::view_snapshot_id.eq(view_snapshot.id))
                .load(conn)?;

            diesel::delete(view_snapshots::table.find(view_snapshot.id)).execute(conn)?;
            for member in members {
                diesel::delete(crate::schema::snapshots::table.find(member.snapshot_id)).execute(conn)?;
            }
            Ok(())
        })
    }
}

#[derive(diesel::Insertable)]
#[diesel(table_name = view_snapshot_members)]
struct ViewSnapshotMemberNew<'a> {
    view_snapshot_id: i64,
    repository_id: &'a str,
    snapshot_id: i64,
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

    /// Spec §8 seed test 4: a view snapshot over an empty constituent
    /// repository must fail atomically, leaving no sibling snapshot behind
    /// for the non-empty repository either.
    #[test]
    fn view_snapshot_rolls_back_atomically_when_a_member_is_empty() {
        let store = test_store();
        repo(&store, "baseos");
        repo(&store, "appstream");
        store
            .register_content_item(
                "baseos",
                &NewContentItem {
                    sha256: crate::checksum::Sha256Checksum::from_bytes([0x55; 32]),
                    filename: "nginx-1.20.2-1.el9.x86_64.rpm",
                    size_bytes: 1024,
                    content_type: "rpm",
                    name: "nginx",
                    version: "1.20.2",
                    architecture: "x86_64",
                    metadata_json: json!({}),
                },
                0,
            )
            .unwrap();

        store.create_view("webserver", None, "rpm").unwrap();
        store.set_view_members("webserver", &["baseos", "appstream"]).unwrap();

        let result = store.create_view_snapshot("webserver", "2025-02", None, false);
        assert!(result.is_err());
        assert!(store.get_snapshot("baseos", "2025-02").is_err());
        assert!(store.get_view_snapshot("webserver", "2025-02").is_err());
    }

    #[test]
    fn view_snapshot_succeeds_with_skip_empty() {
        let store = test_store();
        repo(&store, "baseos-2");
        repo(&store, "appstream-2");
        store
            .register_content_item(
                "baseos-2",
                &NewContentItem {
                    sha256: crate::checksum::Sha256Checksum::from_bytes([0x66; 32]),
                    filename: "nginx-1.20.2-1.el9.x86_64.rpm",
                    size_bytes: 1024,
                    content_type: "rpm",
                    name: "nginx",
                    version: "1.20.2",
                    architecture: "x86_64",
                    metadata_json: json!({}),
                },
                0,
            )
            .unwrap();

        store.create_view("webserver-2", None, "rpm").unwrap();
        store.set_view_members("webserver-2", &["baseos-2", "appstream-2"]).unwrap();

        let view_snapshot = store.create_view_snapshot("webserver-2", "2025-02", None, true).unwrap();
        assert!(store.get_snapshot("baseos-2", "2025-02").is_ok());
        assert!(store.get_snapshot("appstream-2", "2025-02").is_err());

        store.delete_view_snapshot("webserver-2", "2025-02").unwrap();
        assert!(store.get_snapshot("baseos-2", "2025-02").is_err());
        let _ = view_snapshot;
    }
}
