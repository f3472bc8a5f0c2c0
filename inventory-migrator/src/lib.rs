//! Schema version management for the cloud asset inventory.
//!
//! The database schema moves along a ladder of numbered migrations. The
//! [`SchemaManager`] walks the ladder one rung at a time and records
//! `(version, dirty)` so an interrupted migration is detected and must be
//! resolved with [`SchemaManager::force`] before anything else runs.
//!
//! Named thresholds of the ladder tell the rest of the inventory which tables
//! to read and write while a rolling migration is in progress:
//!
//! | Version | Constant | Meaning |
//! |---|---|---|
//! | 1 | [`MINIMUM_SCHEMA_VERSION`] | legacy event schema |
//! | 2 | [`M1_SCHEMA_VERSION`] | catalog and binding tables exist |
//! | 3 | [`DUAL_WRITES_SCHEMA_VERSION`] | writes go to both schemas |
//! | 4 | [`READS_FROM_NEW_SCHEMA_VERSION`] | lookups use the binding tables |
//! | 6 | [`NEW_SCHEMA_ONLY_VERSION`] | legacy tables stop receiving writes |
//!
//! # Features
//!
//! - **`memory`** - in-process [`MemoryMigrator`], used by tests
//! - **`pg`** - [`pg::PgMigrator`] with the embedded PostgreSQL ladder

#![forbid(unsafe_code)]

mod error;
mod manager;
#[cfg(feature = "memory")]
mod memory;
mod migrator;
mod source;
mod version;

#[cfg(feature = "pg")]
pub mod pg;

pub use error::*;
pub use manager::*;
#[cfg(feature = "memory")]
pub use memory::*;
pub use migrator::*;
pub use source::*;
pub use version::*;
