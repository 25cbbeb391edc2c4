//! Core data models for the media asset library.
//!
//! Assets, variants, folders and tags map to SQLite tables via
//! `sqlx::FromRow` and serialize as camelCase JSON via `serde`.

pub mod asset;
pub mod batch;
pub mod query;
pub mod taxonomy;
pub mod upload;
