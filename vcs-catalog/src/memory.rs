//! In-memory catalog backend.
//!
//! This module provides [`MemoryCatalog`], the reference [`Catalog`]
//! implementation. Clones share one state, so every session connected to the
//! same catalog sees the same tables and objects. The whole state can be
//! written to and restored from a gzip compressed bincode snapshot.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use vcs_core::{Column, VcsError, VcsResult, Vid};

use crate::catalog::{Batch, Catalog, Connector};
use crate::objects::{Object, ObjectKind};
use crate::record::Record;
use crate::selector::Selector;
use crate::table::Table;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogState {
    tables: BTreeMap<String, Table>,
    objects: BTreeMap<u64, Object>,
    by_vid: BTreeMap<Vid, u64>,
    next_id: u64,
}

impl CatalogState {
    fn table(&self, name: &str) -> VcsResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| VcsError::NotFound(format!("No table named {}", name)))
    }

    fn table_mut(&mut self, name: &str) -> VcsResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| VcsError::NotFound(format!("No table named {}", name)))
    }

    fn clashes(&self, object: &Object) -> Option<&Object> {
        let key = object.unique_key();
        self.objects.values().find(|stored| {
            stored.kind() == object.kind() && stored.vid() != object.vid() && stored.unique_key() == key
        })
    }
}

/// Builder for a [`MemoryCatalog`].
///
/// ```rust
/// use vcs_catalog::memory::MemoryCatalog;
///
/// let catalog = MemoryCatalog::builder().finish().unwrap();
/// assert!(catalog.is_online());
/// ```
#[derive(Default)]
pub struct MemoryCatalogBuilder {
    snapshot: Option<PathBuf>,
    offline: bool,
}

impl MemoryCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the state from this snapshot, when the file exists.
    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot = Some(path);
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn finish(self) -> VcsResult<MemoryCatalog> {
        let catalog = MemoryCatalog::new();
        if let Some(path) = self.snapshot.filter(|p| p.exists()) {
            catalog.load_snapshot(&path)?;
        }
        catalog.set_online(!self.offline);
        Ok(catalog)
    }
}

///
/// A catalog kept in memory. Cheap to clone; clones share state.
///
#[derive(Clone, Debug)]
pub struct MemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
    online: Arc<AtomicBool>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        MemoryCatalog::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        MemoryCatalog {
            state: Arc::new(RwLock::new(CatalogState::default())),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn builder() -> MemoryCatalogBuilder {
        MemoryCatalogBuilder::new()
    }

    /// Take the catalog off line: every call fails `Unavailable` until it is back.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn read(&self) -> VcsResult<RwLockReadGuard<'_, CatalogState>> {
        if !self.is_online() {
            return Err(VcsError::Unavailable("catalog is off line".to_string()));
        }
        self.state
            .read()
            .map_err(|_| VcsError::Unavailable("catalog state is poisoned".to_string()))
    }

    fn write(&self) -> VcsResult<RwLockWriteGuard<'_, CatalogState>> {
        if !self.is_online() {
            return Err(VcsError::Unavailable("catalog is off line".to_string()));
        }
        self.state
            .write()
            .map_err(|_| VcsError::Unavailable("catalog state is poisoned".to_string()))
    }

    ///
    /// Write the whole catalog state to `path`.
    ///
    pub fn save_snapshot(&self, path: &Path) -> VcsResult<()> {
        let state = self.read()?;
        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        bincode::serialize_into(&mut encoder, &*state)
            .map_err(|e| VcsError::Io(std::io::Error::other(e)))?;
        encoder.finish()?.flush()?;
        info!(
            "Saved catalog snapshot with {} tables and {} objects to {}",
            state.tables.len(),
            state.objects.len(),
            path.display()
        );
        Ok(())
    }

    ///
    /// Replace the catalog state with the snapshot at `path`.
    ///
    pub fn load_snapshot(&self, path: &Path) -> VcsResult<()> {
        let file = File::open(path)?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let restored: CatalogState = bincode::deserialize_from(decoder).map_err(|e| {
            VcsError::Corrupt(format!("Bad catalog snapshot {}: {}", path.display(), e))
        })?;
        let mut state = self
            .state
            .write()
            .map_err(|_| VcsError::Unavailable("catalog state is poisoned".to_string()))?;
        info!(
            "Loaded catalog snapshot with {} tables and {} objects from {}",
            restored.tables.len(),
            restored.objects.len(),
            path.display()
        );
        *state = restored;
        Ok(())
    }
}

impl Connector for MemoryCatalog {
    type Connection = MemoryCatalog;

    fn connect(&self) -> VcsResult<Self::Connection> {
        if !self.is_online() {
            return Err(VcsError::Unavailable("catalog is off line".to_string()));
        }
        debug!("Opening in-memory catalog connection");
        Ok(self.clone())
    }
}

impl Catalog for MemoryCatalog {
    fn create_table(&mut self, name: &str, columns: &[Column]) -> VcsResult<()> {
        let mut state = self.write()?;
        if state.tables.contains_key(name) {
            return Err(VcsError::AlreadyExists(format!("Table {} already exists", name)));
        }
        let table = Table::new(name, columns.to_vec())?;
        state.tables.insert(name.to_string(), table);
        debug!("Created table {} with {} columns", name, columns.len());
        Ok(())
    }

    fn has_table(&self, name: &str) -> VcsResult<bool> {
        Ok(self.read()?.tables.contains_key(name))
    }

    fn table_columns(&self, name: &str) -> VcsResult<Vec<Column>> {
        Ok(self.read()?.table(name)?.columns.clone())
    }

    fn table_len(&self, name: &str) -> VcsResult<usize> {
        Ok(self.read()?.table(name)?.len())
    }

    fn append_rows(&mut self, name: &str, rows: &[Record]) -> VcsResult<usize> {
        let mut state = self.write()?;
        let table = state.table_mut(name)?;
        let coerced = rows
            .iter()
            .map(|r| table.coerce(r))
            .collect::<VcsResult<Vec<_>>>()?;
        table.rows.extend(coerced);
        Ok(table.len())
    }

    fn scan_rows(
        &self,
        name: &str,
        selector: &Selector,
        columns: &[String],
        start: usize,
        limit: usize,
    ) -> VcsResult<Batch> {
        let state = self.read()?;
        let table = state.table(name)?;
        selector.validate(&table.columns)?;
        let mut batch = Batch::default();
        for (i, row) in table.rows.iter().enumerate().skip(start) {
            if batch.rows.len() == limit {
                batch.next = Some(i);
                break;
            }
            if table.row_matches(row, selector)? {
                batch.rows.push(table.to_record(row, columns)?);
            }
        }
        Ok(batch)
    }

    fn rows_at(&self, name: &str, indices: &[usize], columns: &[String]) -> VcsResult<Vec<Record>> {
        let state = self.read()?;
        let table = state.table(name)?;
        indices
            .iter()
            .map(|&i| {
                let row = table.rows.get(i).ok_or_else(|| {
                    VcsError::Usage(format!(
                        "Row {} out of range for table {} of {} rows",
                        i,
                        name,
                        table.len()
                    ))
                })?;
                table.to_record(row, columns)
            })
            .collect()
    }

    fn update_row(&mut self, name: &str, selector: &Selector, updates: &Record) -> VcsResult<()> {
        let mut state = self.write()?;
        let table = state.table_mut(name)?;
        selector.validate(&table.columns)?;
        let mut hits = Vec::new();
        for (i, row) in table.rows.iter().enumerate() {
            if table.row_matches(row, selector)? {
                hits.push(i);
            }
        }
        if hits.len() != 1 {
            return Err(VcsError::Ambiguous(format!(
                "Selector {} matches {} rows of table {}",
                selector,
                hits.len(),
                name
            )));
        }
        let mut row = table.rows[hits[0]].clone();
        table.update(&mut row, updates)?;
        table.rows[hits[0]] = row;
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> VcsResult<()> {
        let mut state = self.write()?;
        state
            .tables
            .remove(name)
            .map(|_| debug!("Dropped table {}", name))
            .ok_or_else(|| VcsError::NotFound(format!("No table named {}", name)))
    }

    fn save_objects(&mut self, objects: Vec<Object>) -> VcsResult<Vec<u64>> {
        let mut state = self.write()?;
        for (i, object) in objects.iter().enumerate() {
            let in_batch = objects[..i].iter().any(|o| {
                o.kind() == object.kind() && (o.vid() == object.vid() || o.unique_key() == object.unique_key())
            });
            if in_batch || state.clashes(object).is_some() {
                return Err(VcsError::AlreadyExists(format!(
                    "{} {:?} clashes with a stored object on {:?}",
                    object.kind(),
                    object.header().label,
                    object.unique_key()
                )));
            }
            if let Some(stored) = state.by_vid.get(object.vid()).and_then(|id| state.objects.get(id)) {
                if stored.kind() != object.kind() {
                    return Err(VcsError::AlreadyExists(format!(
                        "VID {} already names a {}",
                        object.vid(),
                        stored.kind()
                    )));
                }
            }
        }
        let mut ids = Vec::with_capacity(objects.len());
        for object in objects {
            let existing = state.by_vid.get(object.vid()).copied();
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = state.next_id;
                    state.next_id += 1;
                    state.by_vid.insert(object.vid().clone(), id);
                    id
                }
            };
            debug!("Saved {} {} as #{}", object.kind(), object.vid(), id);
            state.objects.insert(id, object);
            ids.push(id);
        }
        Ok(ids)
    }

    fn delete_object(&mut self, vid: &Vid) -> VcsResult<u64> {
        let mut state = self.write()?;
        let id = state
            .by_vid
            .remove(vid)
            .ok_or_else(|| VcsError::NotFound(format!("No object with VID {}", vid)))?;
        state.objects.remove(&id);
        debug!("Deleted object {} (#{})", vid, id);
        Ok(id)
    }

    fn list_objects(&self, kind: ObjectKind) -> VcsResult<Vec<(u64, Object)>> {
        Ok(self
            .read()?
            .objects
            .iter()
            .filter(|(_, o)| o.kind() == kind)
            .map(|(id, o)| (*id, o.clone()))
            .collect())
    }

    fn get_object(&self, vid: &Vid) -> VcsResult<Option<(u64, Object)>> {
        let state = self.read()?;
        Ok(state
            .by_vid
            .get(vid)
            .and_then(|id| state.objects.get(id).map(|o| (*id, o.clone()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use vcs_core::{ColumnKind, ReferenceGenome, Value};

    use crate::objects::{CatalogObject, ReferenceGenomeRecord};
    use crate::record::record;

    #[fixture]
    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        catalog
            .create_table(
                "t",
                &[
                    Column::new(ColumnKind::String(8), "label", ""),
                    Column::new(ColumnKind::Long, "pos", ""),
                ],
            )
            .unwrap();
        let rows: Vec<Record> = (0..5)
            .map(|i| record([("label", Value::from(format!("m{}", i))), ("pos", Value::Long(i * 10))]))
            .collect();
        catalog.append_rows("t", &rows).unwrap();
        catalog
    }

    fn genome_object(label: &str, release: &str) -> Object {
        ReferenceGenomeRecord::from(&ReferenceGenome::new(label, 26, "GRC", "h", release).unwrap())
            .into_object()
    }

    #[rstest]
    fn test_duplicate_table(mut catalog: MemoryCatalog) {
        assert!(matches!(
            catalog.create_table("t", &[Column::new(ColumnKind::Long, "x", "")]),
            Err(VcsError::AlreadyExists(_))
        ));
    }

    #[rstest]
    fn test_missing_table(catalog: MemoryCatalog) {
        assert!(matches!(catalog.table_len("nope"), Err(VcsError::NotFound(_))));
    }

    #[rstest]
    fn test_append_is_atomic(mut catalog: MemoryCatalog) {
        let rows = vec![
            record([("pos", Value::Long(99))]),
            record([("label", Value::from("way too long"))]),
        ];
        assert!(catalog.append_rows("t", &rows).is_err());
        assert_eq!(catalog.table_len("t").unwrap(), 5);
    }

    #[rstest]
    fn test_scan_pages(catalog: MemoryCatalog) {
        let selector = Selector::parse("pos >= 10").unwrap();
        let first = catalog.scan_rows("t", &selector, &[], 0, 2).unwrap();
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.next, Some(3));
        let second = catalog
            .scan_rows("t", &selector, &["label".to_string()], 3, 2)
            .unwrap();
        assert_eq!(
            second.rows,
            vec![record([("label", "m3")]), record([("label", "m4")])]
        );
        assert_eq!(second.next, None);
    }

    #[rstest]
    fn test_update_row(mut catalog: MemoryCatalog) {
        let one = Selector::parse("label == 'm2'").unwrap();
        catalog
            .update_row("t", &one, &record([("pos", Value::Long(7))]))
            .unwrap();
        let rows = catalog.rows_at("t", &[2], &[]).unwrap();
        assert_eq!(rows[0]["pos"], Value::Long(7));

        let many = Selector::parse("pos > 0").unwrap();
        assert!(matches!(
            catalog.update_row("t", &many, &record([("pos", Value::Long(1))])),
            Err(VcsError::Ambiguous(_))
        ));
        let none = Selector::parse("pos > 1000").unwrap();
        assert!(matches!(
            catalog.update_row("t", &none, &record([("pos", Value::Long(1))])),
            Err(VcsError::Ambiguous(_))
        ));
    }

    #[rstest]
    fn test_unique_keys(mut catalog: MemoryCatalog) {
        let a = genome_object("hg19", "19");
        let ids = catalog.save_objects(vec![a.clone()]).unwrap();
        assert_eq!(ids, vec![0]);
        // re-saving the same object replaces it
        assert_eq!(catalog.save_objects(vec![a.clone()]).unwrap(), vec![0]);
        let clash = genome_object("other", "19");
        assert!(matches!(
            catalog.save_objects(vec![genome_object("x", "38"), clash]),
            Err(VcsError::AlreadyExists(_))
        ));
        assert_eq!(catalog.list_objects(ObjectKind::ReferenceGenome).unwrap().len(), 1);
    }

    #[rstest]
    fn test_delete_object(mut catalog: MemoryCatalog) {
        let a = genome_object("hg19", "19");
        catalog.save_objects(vec![a.clone()]).unwrap();
        assert_eq!(catalog.delete_object(a.vid()).unwrap(), 0);
        assert_eq!(catalog.get_object(a.vid()).unwrap(), None);
        assert!(matches!(
            catalog.delete_object(a.vid()),
            Err(VcsError::NotFound(_))
        ));
    }

    #[rstest]
    fn test_offline(catalog: MemoryCatalog) {
        catalog.set_online(false);
        assert!(matches!(catalog.connect(), Err(VcsError::Unavailable(_))));
        assert!(matches!(catalog.table_len("t"), Err(VcsError::Unavailable(_))));
        catalog.set_online(true);
        assert_eq!(catalog.table_len("t").unwrap(), 5);
    }

    #[rstest]
    fn test_snapshot_round_trip(mut catalog: MemoryCatalog) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.bin.gz");
        let genome = genome_object("hg19", "19");
        catalog.save_objects(vec![genome.clone()]).unwrap();
        catalog.save_snapshot(&path).unwrap();

        let restored = MemoryCatalog::builder()
            .with_snapshot(path.clone())
            .finish()
            .unwrap();
        assert_eq!(restored.table_len("t").unwrap(), 5);
        assert_eq!(
            restored.get_object(genome.vid()).unwrap(),
            Some((0, genome))
        );
    }

    #[rstest]
    fn test_bad_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin.gz");
        std::fs::write(&path, b"not a snapshot").unwrap();
        assert!(matches!(
            MemoryCatalog::new().load_snapshot(&path),
            Err(VcsError::Corrupt(_))
        ));
    }
}
