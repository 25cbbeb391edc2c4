//! Media asset library: ingestion with duplicate detection, web variants,
//! folder and tag organisation, filtered listings and batch operations,
//! served over a small JSON HTTP API.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod imaging;
pub mod models;
pub mod routes;
pub mod services;

pub use services::library::{Activity, ActivityObserver, MediaLibrary, Selection};
