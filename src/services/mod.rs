//! Library components, leaves first: store and dedup index, taxonomy,
//! variant generation, ingestion, queries, batches, and the controller that
//! fronts them.

pub mod asset_store;
pub mod batch;
pub mod dedup_index;
pub mod ingestion;
pub mod library;
pub mod query;
pub mod taxonomy;
pub mod variant_generator;

use crate::errors::{LibraryError, LibraryResult};
use std::{future::Future, io, time::Duration};

/// Bound a cancellation-safe step (decode, encode, byte reads), failing it
/// with `Timeout`. Steps that commit state must not be wrapped.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    work: impl Future<Output = LibraryResult<T>>,
) -> LibraryResult<T> {
    tokio::time::timeout(limit, work)
        .await
        .unwrap_or(Err(LibraryError::Timeout(limit)))
}

/// Run a multi-step write (file, row, cleanup) on its own task so that it
/// completes even if the caller's future is dropped halfway.
pub(crate) async fn run_detached<T>(
    work: impl Future<Output = LibraryResult<T>> + Send + 'static,
) -> LibraryResult<T>
where
    T: Send + 'static,
{
    tokio::spawn(work).await.map_err(|err| {
        LibraryError::Io(io::Error::other(format!("storage task failed: {}", err)))
    })?
}
