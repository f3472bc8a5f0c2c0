//! Marks the point where the legacy event table stops receiving writes. The
//! tables are kept so the ladder can be walked back down.

postgres_migration!(M0006, crate::NEW_SCHEMA_ONLY_VERSION, "new_schema_only", []);
