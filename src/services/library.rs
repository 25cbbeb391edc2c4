//! MediaLibrary, the single entry point UI and automation callers use.
//!
//! A thin façade that sequences calls into the store, taxonomy, ingestion,
//! query and batch components. It keeps no per-request state; an optional
//! [`ActivityObserver`] hears about every mutating call (e.g. to drive a
//! loading indicator).

use crate::{
    config::LibraryConfig,
    errors::{LibraryError, LibraryResult},
    imaging::{ImageBackend, RustBackend},
    models::{
        asset::{Asset, AssetPatch, AssetSummary, FolderId, TagId, Variant, VariantKind},
        batch::{BatchOp, BatchResult},
        query::{AssetFilter, Page, SortOrder},
        taxonomy::{Folder, Tag},
        upload::{Upload, UploadOutcome},
    },
    services::{
        asset_store::AssetStore, batch::BatchExecutor, dedup_index::DedupIndex,
        ingestion::IngestionPipeline, query::QueryEngine, taxonomy::TaxonomyManager,
        variant_generator::VariantGenerator,
    },
};
use bytes::Bytes;
use sqlx::SqlitePool;
use std::{collections::HashSet, future::Future, path::PathBuf, sync::Arc};
use tokio::fs::File;
use uuid::Uuid;

/// A mutating call announced to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Upload { files: usize },
    Replace(Uuid),
    Update(Uuid),
    Delete(Uuid),
    Convert(Uuid),
    Batch { op: &'static str, items: usize },
    Taxonomy(&'static str),
}

/// Callback hook for request start/end.
pub trait ActivityObserver: Send + Sync {
    fn started(&self, activity: &Activity);
    fn finished(&self, activity: &Activity, succeeded: bool);
}

/// An ordered multi-select of asset ids without repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<Uuid>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` unless it is already selected.
    pub fn select(&mut self, id: Uuid) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    pub fn deselect(&mut self, id: Uuid) {
        self.ids.retain(|selected| *selected != id);
    }

    /// Flip membership; returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, id: Uuid) -> bool {
        if self.contains(id) {
            self.deselect(id);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    /// Select every id in `ids` (e.g. the current page), keeping order.
    pub fn select_all(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        let mut present: HashSet<Uuid> = self.ids.iter().copied().collect();
        for id in ids {
            if present.insert(id) {
                self.ids.push(id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<Uuid> for Selection {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        let mut selection = Self::new();
        selection.select_all(iter);
        selection
    }
}

#[derive(Clone)]
pub struct MediaLibrary {
    config: Arc<LibraryConfig>,
    store: AssetStore,
    taxonomy: TaxonomyManager,
    generator: VariantGenerator,
    ingestion: IngestionPipeline,
    query: QueryEngine,
    batch: BatchExecutor,
    observer: Option<Arc<dyn ActivityObserver>>,
}

impl MediaLibrary {
    /// Wire every component over one pool and storage root using the
    /// built-in image backend.
    pub fn new(db: Arc<SqlitePool>, storage_dir: impl Into<PathBuf>, config: LibraryConfig) -> Self {
        Self::with_backend(db, storage_dir, config, Arc::new(RustBackend::new()))
    }

    pub fn with_backend(
        db: Arc<SqlitePool>,
        storage_dir: impl Into<PathBuf>,
        config: LibraryConfig,
        backend: Arc<dyn ImageBackend>,
    ) -> Self {
        let config = Arc::new(config);
        // Unknown until the first rebuild scans the store.
        let dedup = Arc::new(DedupIndex::unknown());
        let store = AssetStore::new(db.clone(), storage_dir, dedup);
        let taxonomy = TaxonomyManager::new(db);
        let generator = VariantGenerator::new(store.clone(), backend.clone(), config.item_timeout);
        let ingestion = IngestionPipeline::new(store.clone(), backend, config.clone());
        let query = QueryEngine::new(store.clone(), config.clone());
        let batch = BatchExecutor::new(store.clone(), generator.clone(), config.clone());
        Self {
            config,
            store,
            taxonomy,
            generator,
            ingestion,
            query,
            batch,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ActivityObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    async fn observed<T>(
        &self,
        activity: Activity,
        work: impl Future<Output = LibraryResult<T>>,
    ) -> LibraryResult<T> {
        if let Some(observer) = &self.observer {
            observer.started(&activity);
        }
        let result = work.await;
        if let Some(observer) = &self.observer {
            observer.finished(&activity, result.is_ok());
        }
        result
    }

    // --- Assets ---

    pub async fn upload(&self, upload: Upload) -> LibraryResult<Asset> {
        self.observed(
            Activity::Upload { files: 1 },
            self.ingestion.ingest(
                upload.bytes.clone(),
                &upload.filename,
                upload.declared_mime.as_deref(),
            ),
        )
        .await
    }

    /// Queue-style upload: every file is attempted, outcomes in input order.
    pub async fn upload_many(&self, uploads: Vec<Upload>) -> Vec<UploadOutcome> {
        let activity = Activity::Upload {
            files: uploads.len(),
        };
        if let Some(observer) = &self.observer {
            observer.started(&activity);
        }
        let outcomes = self.ingestion.ingest_many(uploads).await;
        if let Some(observer) = &self.observer {
            let all_ok = outcomes.iter().all(|o| o.failure().is_none());
            observer.finished(&activity, all_ok);
        }
        outcomes
    }

    pub async fn replace(
        &self,
        id: Uuid,
        bytes: Bytes,
        declared_mime: Option<&str>,
    ) -> LibraryResult<Asset> {
        self.observed(
            Activity::Replace(id),
            self.ingestion.replace(id, bytes, declared_mime),
        )
        .await
    }

    pub async fn get(&self, id: Uuid) -> LibraryResult<AssetSummary> {
        self.query.get(id).await
    }

    pub async fn list(
        &self,
        filter: &AssetFilter,
        sort: SortOrder,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> LibraryResult<Page<AssetSummary>> {
        self.query.list(filter, sort, page, page_size).await
    }

    pub async fn update(&self, id: Uuid, patch: AssetPatch) -> LibraryResult<Asset> {
        if patch.is_empty() {
            return self.store.get(id).await;
        }
        self.observed(Activity::Update(id), self.store.update(id, patch))
            .await
    }

    /// Idempotent: deleting a missing asset succeeds without changes.
    pub async fn delete(&self, id: Uuid) -> LibraryResult<()> {
        self.observed(Activity::Delete(id), async {
            self.store.delete(id).await.map(|_| ())
        })
        .await
    }

    /// Generate a web variant, `None` meaning the configured width.
    pub async fn convert(&self, id: Uuid, width: Option<u32>) -> LibraryResult<Variant> {
        let width = width.unwrap_or(self.config.web_variant_width);
        if width == 0 {
            return Err(LibraryError::InvalidInput(
                "conversion width must be at least 1".into(),
            ));
        }
        self.observed(
            Activity::Convert(id),
            self.generator.generate(id, VariantKind::web(width)),
        )
        .await
    }

    pub async fn run_batch(&self, op: &BatchOp, asset_ids: &[Uuid]) -> LibraryResult<BatchResult> {
        self.observed(
            Activity::Batch {
                op: op.name(),
                items: asset_ids.len(),
            },
            self.batch.execute(op, asset_ids),
        )
        .await
    }

    pub async fn run_on_selection(
        &self,
        op: &BatchOp,
        selection: &Selection,
    ) -> LibraryResult<BatchResult> {
        self.run_batch(op, selection.ids()).await
    }

    /// The asset record and an open handle to its original bytes.
    pub async fn open_original(&self, id: Uuid) -> LibraryResult<(Asset, File)> {
        let asset = self.store.get(id).await?;
        let file = self.store.open(&asset.storage_key).await?;
        Ok((asset, file))
    }

    pub async fn open_variant(&self, id: Uuid, kind: &str) -> LibraryResult<(Variant, File)> {
        let variant = self.store.get_variant(id, kind).await?;
        let file = self.store.open(&variant.storage_key).await?;
        Ok((variant, file))
    }

    pub async fn rebuild_dedup_index(&self) -> LibraryResult<usize> {
        self.store.rebuild_dedup_index().await
    }

    // --- Taxonomy ---

    pub async fn create_folder(&self, name: &str) -> LibraryResult<Folder> {
        self.observed(
            Activity::Taxonomy("createFolder"),
            self.taxonomy.create_folder(name),
        )
        .await
    }

    pub async fn list_folders(&self) -> LibraryResult<Vec<Folder>> {
        self.taxonomy.list_folders().await
    }

    pub async fn delete_folder(&self, id: FolderId) -> LibraryResult<u64> {
        self.observed(
            Activity::Taxonomy("deleteFolder"),
            self.taxonomy.delete_folder(id),
        )
        .await
    }

    pub async fn create_tag(&self, name: &str) -> LibraryResult<Tag> {
        self.observed(Activity::Taxonomy("createTag"), self.taxonomy.create_tag(name))
            .await
    }

    pub async fn list_tags(&self) -> LibraryResult<Vec<Tag>> {
        self.taxonomy.list_tags().await
    }

    pub async fn delete_tag(&self, id: TagId) -> LibraryResult<u64> {
        self.observed(Activity::Taxonomy("deleteTag"), self.taxonomy.delete_tag(id))
            .await
    }
}
