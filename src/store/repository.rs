use super::Store;
use crate::checksum::Sha256Checksum;
use crate::error::StoreError;
use crate::model::{
    ContentItem, NewContentItem, NewRepository, NewRepositoryContentItem, NewRepositoryFile,
    NewRepositoryFilesJunction, Repository, RepositoryFile,
};
use crate::schema::{content_items, repositories, repository_content_items, repository_files, repository_files_junction};
use diesel::dsl::exists;
use diesel::expression_methods::PgTextExpressionMethods;
use diesel::prelude::*;

impl Store {
    pub fn upsert_repository(&self, new: &NewRepository<'_>) -> Result<Repository, StoreError> {
        let mut conn = self.conn()?;
        diesel::insert_into(repositories::table)
            .values(new)
            .on_conflict(repositories::id)
            .do_update()
            .set((
                repositories::name.eq(new.name),
                repositories::feed_url.eq(new.feed_url),
                repositories::enabled.eq(new.enabled),
                repositories::mode.eq(new.mode),
                repositories::apt_suite.eq(new.apt_suite),
                repositories::apt_components.eq(new.apt_components),
                repositories::apt_architectures.eq(new.apt_architectures),
                repositories::apk_branch.eq(new.apk_branch),
                repositories::apk_repository.eq(new.apk_repository),
                repositories::apk_architecture.eq(new.apk_architecture),
            ))
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    pub fn get_repository(&self, id: &str) -> Result<Repository, StoreError> {
        let mut conn = self.conn()?;
        repositories::table
            .find(id)
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound { entity: "Repository", name: id.to_string() })
    }

    pub fn list_repositories(&self) -> Result<Vec<Repository>, StoreError> {
        let mut conn = self.conn()?;
        repositories::table.load(&mut conn).map_err(Into::into)
    }

    pub fn mark_synced(&self, id: &str, at: crate::time::DateTime) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::update(repositories::table.find(id))
            .set(repositories::last_sync_at.eq(at))
            .execute(&mut conn)?;
        Ok(())
    }

    /// Registers (or refreshes `metadata_json` on) a ContentItem and ensures
    /// it is a member of `repository_id` at `sort_order`. Collapses via
    /// `ON CONFLICT (sha256) DO NOTHING`, per spec §4.B/§5.
    pub fn register_content_item(
        &self,
        repository_id: &str,
        new_item: &NewContentItem<'_>,
        sort_order: i32,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        super::serializable(&mut conn, |conn| {
            diesel::insert_into(content_items::table)
                .values(new_item)
                .on_conflict(content_items::sha256)
                .do_update()
                .set(content_items::metadata_json.eq(&new_item.metadata_json))
                .execute(conn)?;

            diesel::insert_into(repository_content_items::table)
                .values(NewRepositoryContentItem {
                    repository_id,
                    sha256: new_item.sha256,
                    sort_order,
                })
                .on_conflict((repository_content_items::repository_id, repository_content_items::sha256))
                .do_update()
                .set(repository_content_items::sort_order.eq(sort_order))
                .execute(conn)?;
            Ok(())
        })
    }

    pub fn register_repository_file(
        &self,
        repository_id: &str,
        new_file: &NewRepositoryFile<'_>,
        sort_order: i32,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        super::serializable(&mut conn, |conn| {
            diesel::insert_into(repository_files::table)
                .values(new_file)
                .on_conflict(repository_files::sha256)
                .do_nothing()
                .execute(conn)?;

            diesel::insert_into(repository_files_junction::table)
                .values(NewRepositoryFilesJunction {
                    repository_id,
                    sha256: new_file.sha256,
                    sort_order,
                })
                .on_conflict((repository_files_junction::repository_id, repository_files_junction::sha256))
                .do_update()
                .set(repository_files_junction::sort_order.eq(sort_order))
                .execute(conn)?;
            Ok(())
        })
    }

    /// Replaces a repository's full ContentItem membership with exactly
    /// `keep`, in one transaction — the "membership is replaced, not
    /// accumulated" rule of spec §4.E step 6. HOSTED repositories never call
    /// this (their membership only grows out-of-band).
    pub fn replace_content_membership(
        &self,
        repository_id: &str,
        keep: &[Sha256Checksum],
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        super::serializable(&mut conn, |conn| {
            diesel::delete(
                repository_content_items::table.filter(
                    repository_content_items::repository_id
                        .eq(repository_id)
                        .and(repository_content_items::sha256.ne_all(keep)),
                ),
            )
            .execute(conn)?;
            Ok(())
        })
    }

    pub fn content_items_for_repository(&self, repository_id: &str) -> Result<Vec<ContentItem>, StoreError> {
        let mut conn = self.conn()?;
        content_items::table
            .inner_join(
                repository_content_items::table.on(repository_content_items::sha256.eq(content_items::sha256)),
            )
            .filter(repository_content_items::repository_id.eq(repository_id))
            .order(repository_content_items::sort_order.asc())
            .select(ContentItem::as_select())
            .load(&mut conn)
            .map_err(Into::into)
    }

    pub fn repository_files_for_repository(&self, repository_id: &str) -> Result<Vec<RepositoryFile>, StoreError> {
        let mut conn = self.conn()?;
        repository_files::table
            .inner_join(
                repository_files_junction::table.on(repository_files_junction::sha256.eq(repository_files::sha256)),
            )
            .filter(repository_files_junction::repository_id.eq(repository_id))
            .order(repository_files_junction::sort_order.asc())
            .select(RepositoryFile::as_select())
            .load(&mut conn)
            .map_err(Into::into)
    }

    /// Deletes a repository's own rows (junctions, SyncHistory) but never
    /// cascades to shared `ContentItem`s, per spec §4.B.
    pub fn delete_repository(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::delete(repositories::table.find(id)).execute(&mut conn)?;
        Ok(())
    }

    pub fn all_content_item_checksums(&self) -> Result<Vec<Sha256Checksum>, StoreError> {
        let mut conn = self.conn()?;
        content_items::table.select(content_items::sha256).load(&mut conn).map_err(Into::into)
    }

    pub fn all_repository_file_checksums(&self) -> Result<Vec<Sha256Checksum>, StoreError> {
        let mut conn = self.conn()?;
        repository_files::table.select(repository_files::sha256).load(&mut conn).map_err(Into::into)
    }

    pub fn repository_content_item_checksums(&self, repository_id: &str) -> Result<Vec<Sha256Checksum>, StoreError> {
        let mut conn = self.conn()?;
        repository_content_items::table
            .filter(repository_content_items::repository_id.eq(repository_id))
            .select(repository_content_items::sha256)
            .load(&mut conn)
            .map_err(Into::into)
    }

    pub fn repository_file_checksums(&self, repository_id: &str) -> Result<Vec<Sha256Checksum>, StoreError> {
        let mut conn = self.conn()?;
        repository_files_junction::table
            .filter(repository_files_junction::repository_id.eq(repository_id))
            .select(repository_files_junction::sha256)
            .load(&mut conn)
            .map_err(Into::into)
    }

    pub fn content_item_exists(&self, sha256: &Sha256Checksum) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        diesel::select(exists(content_items::table.filter(content_items::sha256.eq(sha256))))
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    /// Most recently registered `RepositoryFile` of `file_type` for a
    /// repository — used by [`crate::ops::check_updates`] to compare the
    /// freshly fetched top-level index against what was last mirrored,
    /// without downloading any payload.
    pub fn latest_repository_file(
        &self,
        repository_id: &str,
        file_type: &str,
    ) -> Result<Option<RepositoryFile>, StoreError> {
        let mut conn = self.conn()?;
        repository_files::table
            .inner_join(
                repository_files_junction::table.on(repository_files_junction::sha256.eq(repository_files::sha256)),
            )
            .filter(
                repository_files_junction::repository_id
                    .eq(repository_id)
                    .and(repository_files::file_type.eq(file_type)),
            )
            .order(repository_files::created_at.desc())
            .select(RepositoryFile::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn search_content_items(
        &self,
        name_pattern: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Vec<ContentItem>, StoreError> {
        let mut conn = self.conn()?;
        let mut query = content_items::table.into_boxed::<diesel::pg::Pg>();
        if let Some(pattern) = name_pattern {
            query = query.filter(content_items::name.ilike(format!("%{pattern}%")));
        }
        if let Some(content_type) = content_type {
            query = query.filter(content_items::content_type.eq(content_type));
        }
        query.order(content_items::name.asc()).select(ContentItem::as_select()).load(&mut conn).map_err(Into::into)
    }

    pub fn get_content_item(&self, sha256: &Sha256Checksum) -> Result<ContentItem, StoreError> {
        let mut conn = self.conn()?;
        content_items::table
            .find(sha256)
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound { entity: "ContentItem", name: sha256.to_string() })
    }
}
