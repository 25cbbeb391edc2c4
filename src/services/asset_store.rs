//! src/services/asset_store.rs
//!
//! AssetStore: durable asset records backed by SQLite for metadata and local
//! disk for original and variant bytes. Originals are sharded beneath
//! `base_path/originals/{shard}/{shard}/`, variants live under
//! `base_path/variants/{asset_id}/`.
//!
//! The store is the only owner of asset and variant lifetimes. It keeps the
//! [`DedupIndex`] in step on create, replace and delete.

use crate::{
    errors::{LibraryError, LibraryResult},
    models::{
        asset::{
            Asset, AssetContent, AssetPatch, AssetRow, FolderId, NewAsset, TagId, Variant,
            VariantKind, WEB_VARIANT_MIME,
        },
        query::{AssetFilter, Pagination, SortOrder},
    },
    services::{dedup_index::DedupIndex, run_detached},
};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::{
    collections::{BTreeSet, HashMap},
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

const ASSET_COLUMNS: &str = "a.id, a.checksum, a.filename, a.mime_type, a.size_bytes, a.width, \
     a.height, a.folder_id, a.storage_key, a.created_at, a.updated_at";

#[derive(Clone)]
pub struct AssetStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where originals and variants are stored.
    pub base_path: PathBuf,

    dedup: Arc<DedupIndex>,
}

impl AssetStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>, dedup: Arc<DedupIndex>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            dedup,
        }
    }

    pub fn dedup(&self) -> &DedupIndex {
        &self.dedup
    }

    /// Two-level shard for an asset id: first two bytes of MD5(id) in hex.
    fn shards(id: Uuid) -> (String, String) {
        let digest = md5::compute(id.as_bytes());
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Key of an original. The checksum prefix keeps a replace from
    /// overwriting the previous bytes before the record points at the new ones.
    fn original_key(id: Uuid, checksum: &str) -> String {
        let (shard_a, shard_b) = Self::shards(id);
        let tag = checksum.get(..16).unwrap_or(checksum);
        format!("originals/{}/{}/{}-{}", shard_a, shard_b, id, tag)
    }

    /// Key of a variant, scoped like originals to the content it renders.
    fn variant_key(id: Uuid, checksum: &str, kind: VariantKind) -> String {
        let tag = checksum.get(..16).unwrap_or(checksum);
        format!("variants/{}/{}-{}.webp", id, kind, tag)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    /// Write bytes to `key` durably.
    ///
    /// - Writes into a temporary sibling file and fsyncs it.
    /// - Atomically renames into the final location, replacing any old file.
    /// - Cleans up the temporary file on errors.
    async fn write_stored(&self, key: &str, bytes: &[u8]) -> LibraryResult<PathBuf> {
        let file_path = self.path_for(key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            io::Error::new(ErrorKind::Other, "storage path missing parent directory")
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let written = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(err.into());
            }
        }
        Ok(file_path)
    }

    /// Best-effort removal of a stored file and its emptied parent dirs.
    async fn remove_stored(&self, key: &str) {
        let file_path = self.path_for(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed stored file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => {
                warn!("failed to remove {}: {}", file_path.display(), err);
                return;
            }
        }
        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.base_path).await;
        }
    }

    /// Open a stored file for streaming out.
    pub async fn open(&self, key: &str) -> LibraryResult<File> {
        File::open(self.path_for(key)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                LibraryError::NotFound {
                    entity: "file",
                    id: key.to_string(),
                }
            } else {
                LibraryError::Io(err)
            }
        })
    }

    /// Read a stored file fully into memory.
    pub async fn read(&self, key: &str) -> LibraryResult<Vec<u8>> {
        fs::read(self.path_for(key)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                LibraryError::NotFound {
                    entity: "file",
                    id: key.to_string(),
                }
            } else {
                LibraryError::Io(err)
            }
        })
    }

    async fn fetch_row(&self, id: Uuid) -> LibraryResult<Option<AssetRow>> {
        let row = sqlx::query_as::<_, AssetRow>(&format!(
            "SELECT {} FROM assets a WHERE a.id = ?",
            ASSET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    /// Attach tag ids and variants to a set of rows, preserving row order.
    async fn hydrate(&self, rows: Vec<AssetRow>) -> LibraryResult<Vec<Asset>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut tag_query =
            QueryBuilder::<Sqlite>::new("SELECT asset_id, tag_id FROM asset_tags WHERE asset_id IN (");
        let mut ids = tag_query.separated(", ");
        for row in &rows {
            ids.push_bind(row.id);
        }
        ids.push_unseparated(") ORDER BY tag_id ASC");
        let tag_rows: Vec<(Uuid, TagId)> = tag_query.build_query_as().fetch_all(&*self.db).await?;

        let mut variant_query = QueryBuilder::<Sqlite>::new(
            "SELECT asset_id, kind, mime_type, storage_key, size_bytes, width, height, created_at \
             FROM variants WHERE asset_id IN (",
        );
        let mut ids = variant_query.separated(", ");
        for row in &rows {
            ids.push_bind(row.id);
        }
        ids.push_unseparated(") ORDER BY created_at ASC, kind ASC");
        let variant_rows: Vec<Variant> =
            variant_query.build_query_as().fetch_all(&*self.db).await?;

        let mut tags: HashMap<Uuid, Vec<TagId>> = HashMap::new();
        for (asset_id, tag_id) in tag_rows {
            tags.entry(asset_id).or_default().push(tag_id);
        }
        let mut variants: HashMap<Uuid, Vec<Variant>> = HashMap::new();
        for variant in variant_rows {
            variants.entry(variant.asset_id).or_default().push(variant);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                row.into_asset(
                    tags.remove(&id).unwrap_or_default(),
                    variants.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }

    /// Persist the original bytes and insert the asset record.
    ///
    /// Runs to completion once started, even if the caller goes away. The
    /// file is removed again if the metadata insert fails, so a failed create
    /// leaves nothing behind.
    pub async fn create(&self, new: NewAsset, bytes: Bytes) -> LibraryResult<Asset> {
        let store = self.clone();
        run_detached(async move { store.insert_asset(new, &bytes).await }).await
    }

    async fn insert_asset(&self, new: NewAsset, bytes: &[u8]) -> LibraryResult<Asset> {
        let id = Uuid::new_v4();
        let key = Self::original_key(id, &new.content.checksum);
        self.write_stored(&key, bytes).await?;

        let now = now();
        let content = &new.content;
        let inserted = sqlx::query(
            "INSERT INTO assets (
                id, checksum, filename, mime_type, size_bytes, width, height,
                folder_id, storage_key, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?)",
        )
        .bind(id)
        .bind(&content.checksum)
        .bind(&new.filename)
        .bind(&content.mime_type)
        .bind(content.size_bytes)
        .bind(content.width)
        .bind(content.height)
        .bind(&key)
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&*self.db)
        .await;

        if let Err(err) = inserted {
            self.remove_stored(&key).await;
            return Err(err.into());
        }

        self.dedup.insert(&content.checksum, id);
        info!(asset_id = %id, checksum = %content.checksum, "asset created");

        Ok(Asset {
            id,
            checksum: content.checksum.clone(),
            filename: new.filename,
            mime_type: content.mime_type.clone(),
            size_bytes: content.size_bytes,
            width: content.width,
            height: content.height,
            folder_id: None,
            storage_key: key,
            tag_ids: Vec::new(),
            variants: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get(&self, id: Uuid) -> LibraryResult<Asset> {
        let row = self
            .fetch_row(id)
            .await?
            .ok_or_else(|| LibraryError::asset_not_found(id))?;
        let mut assets = self.hydrate(vec![row]).await?;
        assets.pop().ok_or_else(|| LibraryError::asset_not_found(id))
    }

    /// Apply a partial metadata patch. Omitted fields are left untouched.
    pub async fn update(&self, id: Uuid, patch: AssetPatch) -> LibraryResult<Asset> {
        if let Some(name) = &patch.filename {
            if name.trim().is_empty() {
                return Err(LibraryError::InvalidInput("filename cannot be empty".into()));
            }
        }
        if let Some(Some(folder_id)) = patch.folder_id {
            self.ensure_folder_exists(folder_id).await?;
        }
        let tag_ids = match &patch.tag_ids {
            Some(ids) => Some(self.ensure_tags_exist(ids).await?),
            None => None,
        };
        self.apply_patch(
            id,
            AssetPatch {
                tag_ids,
                ..patch
            },
        )
        .await
    }

    /// Write a patch whose tag ids are de-duplicated.
    ///
    /// Folder and tag ids are normally checked beforehand; the foreign keys
    /// catch one deleted in between and the patch then fails with `NotFound`.
    pub(crate) async fn apply_patch(&self, id: Uuid, patch: AssetPatch) -> LibraryResult<Asset> {
        let written = async {
            let mut tx = self.db.begin().await?;
            let mut update = QueryBuilder::<Sqlite>::new("UPDATE assets SET updated_at = ");
            update.push_bind(timestamp(now()));
            if let Some(name) = &patch.filename {
                update.push(", filename = ");
                update.push_bind(name.trim().to_string());
            }
            if let Some(folder_id) = patch.folder_id {
                update.push(", folder_id = ");
                update.push_bind(folder_id);
            }
            update.push(" WHERE id = ");
            update.push_bind(id);
            let result = update.build().execute(&mut *tx).await?;
            if result.rows_affected() == 0 {
                return Ok(false);
            }

            if let Some(tag_ids) = &patch.tag_ids {
                sqlx::query("DELETE FROM asset_tags WHERE asset_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                for tag_id in tag_ids {
                    sqlx::query("INSERT INTO asset_tags (asset_id, tag_id) VALUES (?, ?)")
                        .bind(id)
                        .bind(*tag_id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
            tx.commit().await?;
            Ok::<_, sqlx::Error>(true)
        }
        .await;

        match written {
            Ok(true) => {}
            Ok(false) => return Err(LibraryError::asset_not_found(id)),
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(self.missing_reference(&patch).await);
            }
            Err(err) => return Err(err.into()),
        }

        debug!(asset_id = %id, "asset metadata updated");
        self.get(id).await
    }

    /// The folder or tag of `patch` that no longer resolves.
    async fn missing_reference(&self, patch: &AssetPatch) -> LibraryError {
        if let Some(Some(folder_id)) = patch.folder_id {
            if let Err(err) = self.ensure_folder_exists(folder_id).await {
                return err;
            }
        }
        if let Some(tag_ids) = &patch.tag_ids {
            if let Err(err) = self.ensure_tags_exist(tag_ids).await {
                return err;
            }
        }
        LibraryError::NotFound {
            entity: "folder or tag",
            id: id_list(patch),
        }
    }

    /// Swap an asset's bytes while keeping its id.
    ///
    /// Checksum, size, MIME type and dimensions are replaced and every
    /// existing variant is discarded as stale. Runs to completion once started.
    pub async fn replace_content(
        &self,
        id: Uuid,
        content: AssetContent,
        bytes: Bytes,
    ) -> LibraryResult<Asset> {
        let store = self.clone();
        run_detached(async move { store.swap_content(id, content, &bytes).await }).await
    }

    async fn swap_content(
        &self,
        id: Uuid,
        content: AssetContent,
        bytes: &[u8],
    ) -> LibraryResult<Asset> {
        let previous = self
            .fetch_row(id)
            .await?
            .ok_or_else(|| LibraryError::asset_not_found(id))?;

        let key = Self::original_key(id, &content.checksum);
        self.write_stored(&key, bytes).await?;

        let replaced = async {
            let mut tx = self.db.begin().await?;
            let result = sqlx::query(
                "UPDATE assets SET checksum = ?, mime_type = ?, size_bytes = ?, width = ?,
                    height = ?, storage_key = ?, updated_at = ?
                 WHERE id = ?",
            )
            .bind(&content.checksum)
            .bind(&content.mime_type)
            .bind(content.size_bytes)
            .bind(content.width)
            .bind(content.height)
            .bind(&key)
            .bind(timestamp(now()))
            .bind(id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Ok(None);
            }
            let stale: Vec<String> =
                sqlx::query_scalar("DELETE FROM variants WHERE asset_id = ? RETURNING storage_key")
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(Some(stale))
        }
        .await;

        let stale_variants = match replaced {
            Ok(Some(stale)) => stale,
            Ok(None) => {
                // Deleted concurrently.
                if key != previous.storage_key {
                    self.remove_stored(&key).await;
                }
                return Err(LibraryError::asset_not_found(id));
            }
            Err(err) => {
                if key != previous.storage_key {
                    self.remove_stored(&key).await;
                }
                return Err(err.into());
            }
        };

        if key != previous.storage_key {
            self.remove_stored(&previous.storage_key).await;
        }
        for stale in &stale_variants {
            self.remove_stored(stale).await;
        }
        self.dedup.remove(&previous.checksum, id);
        self.dedup.insert(&content.checksum, id);
        info!(
            asset_id = %id,
            old_checksum = %previous.checksum,
            new_checksum = %content.checksum,
            "asset content replaced"
        );

        self.get(id).await
    }

    /// Delete an asset, its variants, tag links and stored bytes.
    ///
    /// Idempotent: a missing id is a no-op. Returns whether a record was
    /// actually removed by this call. Runs to completion once started.
    pub async fn delete(&self, id: Uuid) -> LibraryResult<bool> {
        let store = self.clone();
        run_detached(async move { store.remove_asset(id).await }).await
    }

    async fn remove_asset(&self, id: Uuid) -> LibraryResult<bool> {
        let mut tx = self.db.begin().await?;
        let variant_keys: Vec<String> =
            sqlx::query_scalar("DELETE FROM variants WHERE asset_id = ? RETURNING storage_key")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        // Tag links go with the row.
        let removed: Option<(String, String)> =
            sqlx::query_as("DELETE FROM assets WHERE id = ? RETURNING checksum, storage_key")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        tx.commit().await?;

        let Some((checksum, storage_key)) = removed else {
            debug!(asset_id = %id, "delete of missing asset ignored");
            return Ok(false);
        };

        self.dedup.remove(&checksum, id);
        self.remove_stored(&storage_key).await;
        for key in &variant_keys {
            self.remove_stored(key).await;
        }
        info!(asset_id = %id, "asset deleted");
        Ok(true)
    }

    /// Page through assets matching the persisted filters.
    ///
    /// Applies search, folder and tag; the `format` facet is left to the
    /// caller. Ordering falls back to `id` in the same direction so that
    /// equal timestamps still page deterministically.
    pub async fn list(
        &self,
        filter: &AssetFilter,
        sort: SortOrder,
        page: u32,
        page_size: u32,
    ) -> LibraryResult<(Vec<Asset>, u64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM assets a WHERE 1 = 1");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&*self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM assets a WHERE 1 = 1",
            ASSET_COLUMNS
        ));
        push_filters(&mut select, filter);
        select.push(match sort {
            SortOrder::Newest => " ORDER BY a.created_at DESC, a.id DESC",
            SortOrder::Oldest => " ORDER BY a.created_at ASC, a.id ASC",
        });
        select.push(" LIMIT ");
        select.push_bind(i64::from(page_size));
        select.push(" OFFSET ");
        select.push_bind(Pagination::offset(page, page_size) as i64);

        let rows: Vec<AssetRow> = select.build_query_as().fetch_all(&*self.db).await?;
        let assets = self.hydrate(rows).await?;
        Ok((assets, total.max(0) as u64))
    }

    /// Insert or overwrite the variant of `kind` for an asset, provided the
    /// asset still holds the content (`checksum`) it was rendered from.
    ///
    /// Fails with `NotFound` once the asset is gone and with `Conflict` when
    /// its bytes were replaced meanwhile; the rendition is discarded then.
    pub async fn put_variant(
        &self,
        asset_id: Uuid,
        checksum: &str,
        kind: VariantKind,
        bytes: Vec<u8>,
        dimensions: (u32, u32),
    ) -> LibraryResult<Variant> {
        let store = self.clone();
        let checksum = checksum.to_string();
        run_detached(async move {
            store
                .insert_variant(asset_id, &checksum, kind, &bytes, dimensions)
                .await
        })
        .await
    }

    async fn insert_variant(
        &self,
        asset_id: Uuid,
        checksum: &str,
        kind: VariantKind,
        bytes: &[u8],
        dimensions: (u32, u32),
    ) -> LibraryResult<Variant> {
        let key = Self::variant_key(asset_id, checksum, kind);
        self.write_stored(&key, bytes).await?;

        // The WHERE clause also keeps SQLite from reading ON as a join.
        let inserted = sqlx::query_as::<_, Variant>(
            r#"
            INSERT INTO variants (
                asset_id, kind, mime_type, storage_key, size_bytes, width, height, created_at
            )
            SELECT ?, ?, ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM assets WHERE id = ? AND checksum = ?)
            ON CONFLICT(asset_id, kind) DO UPDATE SET
                mime_type = excluded.mime_type,
                storage_key = excluded.storage_key,
                size_bytes = excluded.size_bytes,
                width = excluded.width,
                height = excluded.height,
                created_at = excluded.created_at
            RETURNING asset_id, kind, mime_type, storage_key, size_bytes, width, height, created_at
            "#,
        )
        .bind(asset_id)
        .bind(kind.to_string())
        .bind(WEB_VARIANT_MIME)
        .bind(&key)
        .bind(bytes.len() as i64)
        .bind(dimensions.0)
        .bind(dimensions.1)
        .bind(timestamp(now()))
        .bind(asset_id)
        .bind(checksum)
        .fetch_optional(&*self.db)
        .await?;

        if let Some(variant) = inserted {
            return Ok(variant);
        }

        // Nothing can point at a key for content the asset no longer holds.
        self.remove_stored(&key).await;
        match self.fetch_row(asset_id).await? {
            None => Err(LibraryError::asset_not_found(asset_id)),
            Some(_) => {
                warn!(asset_id = %asset_id, kind = %kind, "discarded variant of replaced content");
                Err(LibraryError::Conflict(format!(
                    "asset `{}` was replaced while its {} variant was rendered",
                    asset_id, kind
                )))
            }
        }
    }

    pub async fn get_variant(&self, asset_id: Uuid, kind: &str) -> LibraryResult<Variant> {
        sqlx::query_as::<_, Variant>(
            "SELECT asset_id, kind, mime_type, storage_key, size_bytes, width, height, created_at
             FROM variants WHERE asset_id = ? AND kind = ?",
        )
        .bind(asset_id)
        .bind(kind)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| LibraryError::NotFound {
            entity: "variant",
            id: format!("{}/{}", asset_id, kind),
        })
    }

    /// Recompute the dedup index from the `assets` table.
    ///
    /// On failure the index is marked unknown and the error is returned for
    /// the caller to log; nothing on the write path depends on it.
    pub async fn rebuild_dedup_index(&self) -> LibraryResult<usize> {
        let scanned = sqlx::query_as::<_, (Uuid, String)>("SELECT id, checksum FROM assets")
            .fetch_all(&*self.db)
            .await;
        match scanned {
            Ok(pairs) => {
                let assets = pairs.len();
                let checksums = self.dedup.replace_all(pairs);
                info!(assets, checksums, "dedup index rebuilt");
                Ok(checksums)
            }
            Err(err) => {
                self.dedup.invalidate();
                Err(err.into())
            }
        }
    }

    /// Fails with `NotFound` unless the folder exists.
    pub async fn ensure_folder_exists(&self, folder_id: FolderId) -> LibraryResult<()> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM folders WHERE id = ?")
            .bind(folder_id)
            .fetch_optional(&*self.db)
            .await?;
        found
            .map(|_| ())
            .ok_or_else(|| LibraryError::folder_not_found(folder_id))
    }

    /// Validate tag ids, returning them de-duplicated and ascending.
    pub async fn ensure_tags_exist(&self, tag_ids: &[TagId]) -> LibraryResult<Vec<TagId>> {
        let wanted: BTreeSet<TagId> = tag_ids.iter().copied().collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM tags WHERE id IN (");
        let mut ids = query.separated(", ");
        for id in &wanted {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
        let found: BTreeSet<TagId> = query
            .build_query_scalar::<TagId>()
            .fetch_all(&*self.db)
            .await?
            .into_iter()
            .collect();
        if let Some(missing) = wanted.iter().find(|id| !found.contains(id)) {
            return Err(LibraryError::tag_not_found(*missing));
        }
        Ok(wanted.into_iter().collect())
    }

    /// Recursively remove empty directories up to the storage root.
    ///
    /// Stops when:
    /// - directory not empty
    /// - directory not found
    /// - reached root
    /// - encountered unexpected I/O errors
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &AssetFilter) {
    if let Some(folder_id) = filter.folder_id {
        builder.push(" AND a.folder_id = ");
        builder.push_bind(folder_id);
    }
    if let Some(tag_id) = filter.tag_id {
        builder.push(
            " AND EXISTS (SELECT 1 FROM asset_tags t WHERE t.asset_id = a.id AND t.tag_id = ",
        );
        builder.push_bind(tag_id);
        builder.push(")");
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder.push(" AND a.filename LIKE ");
        builder.push_bind(format!("%{}%", escape_like(search)));
        builder.push(" ESCAPE '\\'");
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn id_list(patch: &AssetPatch) -> String {
    let mut ids = Vec::new();
    if let Some(Some(folder_id)) = patch.folder_id {
        ids.push(format!("folder {}", folder_id));
    }
    for tag_id in patch.tag_ids.iter().flatten() {
        ids.push(format!("tag {}", tag_id));
    }
    ids.join(", ")
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Current time at the precision timestamps are persisted with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so that text ordering in SQLite is time ordering.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
