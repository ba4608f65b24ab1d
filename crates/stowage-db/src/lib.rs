//! Catalog persistence for uploaded files.
//!
//! [`CatalogRepository`] is the contract the services depend on.
//! [`PgCatalogRepository`] stores entries in PostgreSQL (see
//! `migrations/` at the workspace root); [`InMemoryCatalogRepository`] keeps
//! them in process.

pub mod memory;
pub mod postgres;
pub mod repository;

pub use memory::InMemoryCatalogRepository;
pub use postgres::{PgCatalogRepository, UploadedFileRow};
pub use repository::CatalogRepository;
