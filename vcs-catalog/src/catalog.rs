use vcs_core::{Column, VcsResult, Vid};

use crate::objects::{Object, ObjectKind};
use crate::record::Record;
use crate::selector::Selector;

///
/// One page of a table scan.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    pub rows: Vec<Record>,
    /// Row position to resume the scan from, `None` once the table is exhausted.
    pub next: Option<usize>,
}

///
/// An open connection to a catalog backend.
///
/// Tables are addressed by name and hold [Record]s; objects are addressed by
/// VID and get a numeric catalog id when saved. A table that does not exist
/// is a [vcs_core::VcsError::NotFound].
///
pub trait Catalog {
    fn create_table(&mut self, name: &str, columns: &[Column]) -> VcsResult<()>;

    fn has_table(&self, name: &str) -> VcsResult<bool>;

    fn table_columns(&self, name: &str) -> VcsResult<Vec<Column>>;

    fn table_len(&self, name: &str) -> VcsResult<usize>;

    /// Append all rows or none of them; returns the table length afterwards.
    fn append_rows(&mut self, name: &str, rows: &[Record]) -> VcsResult<usize>;

    ///
    /// Scan from row position `start`, returning at most `limit` rows that
    /// match `selector`, projected on `columns` (all when empty).
    ///
    fn scan_rows(
        &self,
        name: &str,
        selector: &Selector,
        columns: &[String],
        start: usize,
        limit: usize,
    ) -> VcsResult<Batch>;

    fn rows_at(&self, name: &str, indices: &[usize], columns: &[String]) -> VcsResult<Vec<Record>>;

    /// Update the single row matching `selector`.
    fn update_row(&mut self, name: &str, selector: &Selector, updates: &Record) -> VcsResult<()>;

    fn drop_table(&mut self, name: &str) -> VcsResult<()>;

    ///
    /// Save all objects or none of them. An object whose VID is already
    /// stored replaces the stored one; any other clash on the kind's unique
    /// key is a [vcs_core::VcsError::AlreadyExists].
    ///
    fn save_objects(&mut self, objects: Vec<Object>) -> VcsResult<Vec<u64>>;

    fn delete_object(&mut self, vid: &Vid) -> VcsResult<u64>;

    fn list_objects(&self, kind: ObjectKind) -> VcsResult<Vec<(u64, Object)>>;

    fn get_object(&self, vid: &Vid) -> VcsResult<Option<(u64, Object)>>;
}

///
/// Opens connections to a catalog.
///
pub trait Connector {
    type Connection: Catalog;

    fn connect(&self) -> VcsResult<Self::Connection>;
}
