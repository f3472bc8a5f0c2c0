use std::fmt;

/// Version of database schema that cleans the database completely.
pub const EMPTY_SCHEMA_VERSION: u32 = 0;

/// Lowest version of database schema the inventory is able to handle.
pub const MINIMUM_SCHEMA_VERSION: u32 = 1;

/// Adds the catalog and binding tables; back-fill becomes possible.
pub const M1_SCHEMA_VERSION: u32 = 2;

/// Lowest version that writes both the legacy and the new schema.
pub const DUAL_WRITES_SCHEMA_VERSION: u32 = 3;

/// Lowest version that answers lookups from the new schema.
pub const READS_FROM_NEW_SCHEMA_VERSION: u32 = 4;

/// Lowest version that stops writing the legacy event table.
pub const NEW_SCHEMA_ONLY_VERSION: u32 = 6;

/// Applied schema version as recorded in the version table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaVersion {
    pub version: u32,
    pub dirty: bool,
}

impl SchemaVersion {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            dirty: false,
        }
    }

    pub fn dirty(version: u32) -> Self {
        Self {
            version,
            dirty: true,
        }
    }

    pub fn writes_legacy(&self) -> bool {
        self.version < NEW_SCHEMA_ONLY_VERSION
    }

    pub fn writes_new(&self) -> bool {
        self.version >= DUAL_WRITES_SCHEMA_VERSION
    }

    pub fn reads_new(&self) -> bool {
        self.version >= READS_FROM_NEW_SCHEMA_VERSION
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dirty {
            write!(f, "{} (dirty)", self.version)
        } else {
            write!(f, "{}", self.version)
        }
    }
}

/// Direction a single migration step runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}
