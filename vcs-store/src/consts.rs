//! Layout of the payload table holding one variant call support.

/// Values of the `section` column.
pub const SECTION_HEADER: &str = "header";
pub const SECTION_MANIFEST: &str = "manifest";
pub const SECTION_NODE: &str = "node";
pub const SECTION_FIELD: &str = "field";

pub const SECTION_WIDTH: usize = 8;
pub const NAME_WIDTH: usize = 64;

/// Width of the JSON column schema kept in manifest rows.
pub const SCHEMA_WIDTH: usize = 4096;

/// Columns of field `k` are stored as `f<k>_<column>`.
pub const FIELD_COLUMN_PREFIX: &str = "f";
