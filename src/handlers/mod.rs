pub mod asset_handlers;
pub mod health_handlers;
pub mod taxonomy_handlers;
