//! Folders and tags.
//!
//! Both are independent of the assets that reference them. Deleting one
//! detaches it from every asset in the same transaction; the assets stay.

use crate::{
    errors::{LibraryError, LibraryResult},
    models::{
        asset::{FolderId, TagId},
        taxonomy::{Folder, Tag},
    },
    services::asset_store::{now, timestamp},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

const MAX_NAME_LEN: usize = 255;

#[derive(Clone)]
pub struct TaxonomyManager {
    db: Arc<SqlitePool>,
}

impl TaxonomyManager {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Create a folder. Names need not be unique; duplicates are separate folders.
    pub async fn create_folder(&self, name: &str) -> LibraryResult<Folder> {
        let name = clean_name(name)?;
        let created_at = now();
        let id: FolderId =
            sqlx::query_scalar("INSERT INTO folders (name, created_at) VALUES (?, ?) RETURNING id")
                .bind(&name)
                .bind(timestamp(created_at))
                .fetch_one(&*self.db)
                .await?;
        info!(folder_id = id, name = %name, "folder created");
        Ok(Folder {
            id,
            name,
            created_at,
            asset_count: 0,
        })
    }

    pub async fn create_tag(&self, name: &str) -> LibraryResult<Tag> {
        let name = clean_name(name)?;
        let created_at = now();
        let id: TagId =
            sqlx::query_scalar("INSERT INTO tags (name, created_at) VALUES (?, ?) RETURNING id")
                .bind(&name)
                .bind(timestamp(created_at))
                .fetch_one(&*self.db)
                .await?;
        info!(tag_id = id, name = %name, "tag created");
        Ok(Tag {
            id,
            name,
            created_at,
            asset_count: 0,
        })
    }

    /// All folders by name, then id, with the number of assets in each.
    pub async fn list_folders(&self) -> LibraryResult<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT f.id, f.name, f.created_at,
                    (SELECT COUNT(*) FROM assets a WHERE a.folder_id = f.id) AS asset_count
             FROM folders f
             ORDER BY f.name COLLATE NOCASE ASC, f.id ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(folders)
    }

    pub async fn list_tags(&self) -> LibraryResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.name, t.created_at,
                    (SELECT COUNT(*) FROM asset_tags l WHERE l.tag_id = t.id) AS asset_count
             FROM tags t
             ORDER BY t.name COLLATE NOCASE ASC, t.id ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(tags)
    }

    /// Delete a folder; its assets become folder-less. Returns how many
    /// assets were detached.
    pub async fn delete_folder(&self, id: FolderId) -> LibraryResult<u64> {
        let mut tx = self.db.begin().await?;
        let detached = sqlx::query(
            "UPDATE assets SET folder_id = NULL, updated_at = ? WHERE folder_id = ?",
        )
        .bind(timestamp(now()))
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let removed = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(LibraryError::folder_not_found(id));
        }
        tx.commit().await?;

        info!(folder_id = id, detached, "folder deleted");
        Ok(detached)
    }

    /// Delete a tag and remove it from every asset. Returns how many assets
    /// carried it.
    pub async fn delete_tag(&self, id: TagId) -> LibraryResult<u64> {
        let mut tx = self.db.begin().await?;
        let detached = sqlx::query("DELETE FROM asset_tags WHERE tag_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let removed = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(LibraryError::tag_not_found(id));
        }
        tx.commit().await?;

        info!(tag_id = id, detached, "tag deleted");
        Ok(detached)
    }
}

fn clean_name(raw: &str) -> LibraryResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LibraryError::InvalidInput("name cannot be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(LibraryError::InvalidInput(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}
