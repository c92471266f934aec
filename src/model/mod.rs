//! Diesel row types for the entity graph in §3: one module per entity family,
//! mirroring the teacher's `model/` layout (see `examples/liamw1-oxibooru/server/src/model/pool.rs`
//! for the Queryable/Insertable/Associations shape this crate generalizes).

mod content;
mod junction;
mod repository;
mod snapshot;
mod sync_history;
mod view;

pub use content::{ContentItem, NewContentItem, NewRepositoryFile, RepositoryFile};
pub use junction::{
    NewRepositoryContentItem, NewRepositoryFilesJunction, RepositoryContentItem, RepositoryFilesJunction,
};
pub use repository::{NewRepository, Repository};
pub use snapshot::{NewSnapshot, Snapshot};
pub use sync_history::{NewSyncHistory, SyncHistory, SyncStatus};
pub use view::{NewView, NewViewSnapshot, View, ViewSnapshot, ViewSnapshotMember};
