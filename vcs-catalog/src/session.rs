//! Catalog sessions.
//!
//! A [`Session`] is the façade every higher layer talks to. It opens its
//! connection on demand and closes it again once the keep-tokens counter runs
//! out after a successful operation. [`RowStream`] reads tables lazily, one
//! whole batch at a time, holding the connection from the first pull until
//! it is exhausted or dropped.

use log::debug;
use std::collections::VecDeque;

use vcs_core::{Column, VcsError, VcsResult, Vid};

use crate::cache::ObjectCache;
use crate::catalog::{Catalog, Connector};
use crate::config::CatalogConfig;
use crate::objects::{CatalogObject, Object};
use crate::record::{Record, RecordArray};
use crate::selector::Selector;

pub struct Session<C: Connector> {
    connector: C,
    config: CatalogConfig,
    connection: Option<C::Connection>,
    tokens: usize,
    cache: ObjectCache,
}

impl<C: Connector> Session<C> {
    pub fn new(connector: C, config: CatalogConfig) -> Self {
        let tokens = config.keep_tokens.max(1);
        Session {
            connector,
            config,
            connection: None,
            tokens,
            cache: ObjectCache::new(),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    ///
    /// Keep the connection open for the next `n` successful operations.
    ///
    pub fn keep_alive(&mut self, n: usize) {
        self.tokens = n.max(1);
    }

    pub fn mint_vid(&self) -> Vid {
        self.config.mint_vid()
    }

    fn acquire(&mut self) -> VcsResult<&mut C::Connection> {
        if self.connection.is_none() {
            debug!("Opening catalog connection");
            self.connection = Some(self.connector.connect()?);
        }
        self.connection
            .as_mut()
            .ok_or_else(|| VcsError::Unavailable("no catalog connection".to_string()))
    }

    fn release(&mut self) {
        self.tokens = self.tokens.saturating_sub(1);
        if self.tokens == 0 {
            debug!("Closing catalog connection");
            self.connection = None;
            self.tokens = self.config.keep_tokens.max(1);
        }
    }

    fn settle<T>(&mut self, result: &VcsResult<T>) {
        match result {
            Ok(_) => self.release(),
            Err(VcsError::Unavailable(_)) => {
                debug!("Dropping unavailable catalog connection");
                self.connection = None;
                self.tokens = self.config.keep_tokens.max(1);
            }
            Err(_) => {}
        }
    }

    fn run<T, F>(&mut self, op: F) -> VcsResult<T>
    where
        F: FnOnce(&mut C::Connection) -> VcsResult<T>,
    {
        let result = self.acquire().and_then(op);
        self.settle(&result);
        result
    }

    fn batch_size(&self, batch_size: Option<usize>) -> usize {
        batch_size.unwrap_or(self.config.batch_size).max(1)
    }

    // tables

    pub fn create_table(&mut self, name: &str, columns: &[Column]) -> VcsResult<()> {
        self.run(|c| c.create_table(name, columns))
    }

    pub fn has_table(&mut self, name: &str) -> VcsResult<bool> {
        self.run(|c| c.has_table(name))
    }

    pub fn table_columns(&mut self, name: &str) -> VcsResult<Vec<Column>> {
        self.run(|c| c.table_columns(name))
    }

    pub fn table_len(&mut self, name: &str) -> VcsResult<usize> {
        self.run(|c| c.table_len(name))
    }

    pub fn add_table_row(&mut self, name: &str, record: Record) -> VcsResult<()> {
        self.run(|c| c.append_rows(name, &[record]).map(|_| ()))
    }

    ///
    /// Append every record of `rows`, `batch_size` records at a time.
    /// Returns how many were written. A failure leaves the batches already
    /// written in place.
    ///
    pub fn add_table_rows_stream<I>(
        &mut self,
        name: &str,
        rows: I,
        batch_size: Option<usize>,
    ) -> VcsResult<usize>
    where
        I: IntoIterator<Item = Record>,
    {
        let batch_size = self.batch_size(batch_size);
        self.run(|c| {
            let mut written = 0;
            let mut batch = Vec::with_capacity(batch_size);
            for record in rows {
                batch.push(record);
                if batch.len() == batch_size {
                    c.append_rows(name, &batch)?;
                    written += batch.len();
                    batch.clear();
                }
            }
            if !batch.is_empty() {
                c.append_rows(name, &batch)?;
                written += batch.len();
            }
            debug!("Wrote {} rows to {}", written, name);
            Ok(written)
        })
    }

    ///
    /// Lazily read the rows of `name` matching `selector`, projected on
    /// `columns` (all of them when empty).
    ///
    pub fn get_table_rows(
        &mut self,
        name: &str,
        selector: &Selector,
        columns: &[&str],
        batch_size: Option<usize>,
    ) -> RowStream<'_, C> {
        let batch_size = self.batch_size(batch_size);
        RowStream {
            session: self,
            table: name.to_string(),
            selector: selector.clone(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            batch_size,
            buffer: VecDeque::new(),
            next: Some(0),
            started: false,
            done: false,
        }
    }

    pub fn get_table_slice(
        &mut self,
        name: &str,
        indices: &[usize],
        columns: &[&str],
    ) -> VcsResult<Vec<Record>> {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        self.run(|c| c.rows_at(name, indices, &columns))
    }

    pub fn update_table_row(
        &mut self,
        name: &str,
        selector: &Selector,
        updates: &Record,
    ) -> VcsResult<()> {
        self.run(|c| c.update_row(name, selector, updates))
    }

    pub fn delete_table(&mut self, name: &str) -> VcsResult<()> {
        self.run(|c| c.drop_table(name))
    }

    ///
    /// Create `name` with the schema of `array` and fill it.
    ///
    pub fn store_as_a_table(
        &mut self,
        name: &str,
        array: &RecordArray,
        batch_size: Option<usize>,
    ) -> VcsResult<usize> {
        self.create_table(name, &array.columns)?;
        let records = (0..array.len()).filter_map(|i| array.record(i));
        self.add_table_rows_stream(name, records, batch_size)
    }

    pub fn read_whole_table(
        &mut self,
        name: &str,
        batch_size: Option<usize>,
    ) -> VcsResult<RecordArray> {
        let columns = self.table_columns(name)?;
        let mut array = RecordArray::new(columns);
        for record in self.get_table_rows(name, &Selector::all(), &[], batch_size) {
            array.push_record(&record?)?;
        }
        Ok(array)
    }

    // objects

    pub fn save<T: CatalogObject + Clone>(&mut self, object: &T) -> VcsResult<u64> {
        let ids = self.save_objects(vec![object.clone().into_object()])?;
        ids.into_iter()
            .next()
            .ok_or_else(|| VcsError::Unavailable("catalog returned no id".to_string()))
    }

    /// Save all of `objects` or none of them.
    pub fn save_array<T: CatalogObject + Clone>(&mut self, objects: &[T]) -> VcsResult<Vec<u64>> {
        self.save_objects(objects.iter().cloned().map(T::into_object).collect())
    }

    pub fn save_objects(&mut self, objects: Vec<Object>) -> VcsResult<Vec<u64>> {
        let ids = self.run(|c| c.save_objects(objects.clone()))?;
        for (id, object) in ids.iter().zip(objects) {
            self.cache.insert(*id, object);
        }
        Ok(ids)
    }

    pub fn delete<T: CatalogObject>(&mut self, object: &T) -> VcsResult<()> {
        self.delete_by_vid(&object.header().vid)
    }

    pub fn delete_by_vid(&mut self, vid: &Vid) -> VcsResult<()> {
        self.cache.evict(vid);
        self.run(|c| c.delete_object(vid)).map(|_| ())
    }

    ///
    /// Fetch the object with this VID, `None` when it does not exist or is
    /// of another kind.
    ///
    pub fn get_by_vid<T: CatalogObject>(&mut self, vid: &Vid) -> VcsResult<Option<T>> {
        if let Some(object) = self.cache.get_by_vid(vid) {
            return Ok(T::from_object(object.clone()));
        }
        let found = self.run(|c| c.get_object(vid))?;
        Ok(found.and_then(|(id, object)| {
            self.cache.insert(id, object.clone());
            T::from_object(object)
        }))
    }

    ///
    /// All objects of type `T` whose attributes match `query`, with every
    /// `:name` placeholder bound from `params`.
    ///
    pub fn find_by_query<T: CatalogObject>(
        &mut self,
        query: &str,
        params: &Record,
    ) -> VcsResult<Vec<T>> {
        let selector = Selector::parse(query)?.bind(params)?;
        let candidates = self.run(|c| c.list_objects(T::KIND))?;
        let mut found = Vec::new();
        for (id, object) in candidates {
            if selector.matches(&object.attributes())? {
                self.cache.insert(id, object.clone());
                found.extend(T::from_object(object));
            }
        }
        Ok(found)
    }

    /// Like [Session::find_by_query], failing unless exactly one object matches.
    pub fn find_one<T: CatalogObject>(&mut self, query: &str, params: &Record) -> VcsResult<T> {
        let mut found = self.find_by_query::<T>(query, params)?;
        match found.len() {
            1 => found
                .pop()
                .ok_or_else(|| VcsError::NotFound(query.to_string())),
            0 => Err(VcsError::NotFound(format!(
                "No {} matches {}",
                T::KIND,
                query
            ))),
            n => Err(VcsError::Ambiguous(format!(
                "{} objects of kind {} match {}",
                n,
                T::KIND,
                query
            ))),
        }
    }

    pub fn cached_objects(&self) -> usize {
        self.cache.len()
    }
}

///
/// Lazy stream of table rows. Yields whole batches only; a failed pull ends
/// the stream.
///
pub struct RowStream<'s, C: Connector> {
    session: &'s mut Session<C>,
    table: String,
    selector: Selector,
    columns: Vec<String>,
    batch_size: usize,
    buffer: VecDeque<Record>,
    next: Option<usize>,
    started: bool,
    done: bool,
}

impl<C: Connector> RowStream<'_, C> {
    fn finish<T>(&mut self, result: &VcsResult<T>) {
        if self.started && !self.done {
            self.session.settle(result);
        }
        self.done = true;
    }

    fn pull(&mut self, start: usize) -> VcsResult<()> {
        let connection = self.session.acquire()?;
        self.started = true;
        let batch = connection.scan_rows(
            &self.table,
            &self.selector,
            &self.columns,
            start,
            self.batch_size,
        )?;
        self.next = batch.next;
        self.buffer.extend(batch.rows);
        Ok(())
    }
}

impl<C: Connector> Iterator for RowStream<'_, C> {
    type Item = VcsResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            let Some(start) = self.next else {
                self.finish(&Ok(()));
                return None;
            };
            if let Err(e) = self.pull(start) {
                let failed = Err(e);
                self.finish::<()>(&failed);
                return failed.err().map(Err);
            }
        }
    }
}

impl<C: Connector> Drop for RowStream<'_, C> {
    fn drop(&mut self) {
        self.finish(&Ok(()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use vcs_core::{ColumnKind, ReferenceGenome, Value};

    use crate::memory::MemoryCatalog;
    use crate::objects::ReferenceGenomeRecord;
    use crate::record::record;

    #[fixture]
    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
    }

    #[fixture]
    fn session(catalog: MemoryCatalog) -> Session<MemoryCatalog> {
        let mut session = Session::new(catalog, CatalogConfig::default());
        session
            .create_table(
                "markers",
                &[
                    Column::new(ColumnKind::String(8), "label", ""),
                    Column::new(ColumnKind::Long, "pos", ""),
                ],
            )
            .unwrap();
        let rows = (0..12).map(|i| record([("label", Value::from(format!("m{}", i))), ("pos", Value::Long(i))]));
        session.add_table_rows_stream("markers", rows, Some(5)).unwrap();
        session
    }

    #[rstest]
    fn test_stream_reads_everything(mut session: Session<MemoryCatalog>) {
        let labels: Vec<String> = session
            .get_table_rows("markers", &Selector::parse("pos >= 3").unwrap(), &["label"], Some(4))
            .map(|r| r.unwrap()["label"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(labels.len(), 9);
        assert_eq!(labels[0], "m3");
        assert_eq!(labels[8], "m11");
        assert!(!session.is_connected());
    }

    #[rstest]
    fn test_stream_releases_on_drop(mut session: Session<MemoryCatalog>) {
        {
            let mut stream = session.get_table_rows("markers", &Selector::all(), &[], Some(2));
            assert!(stream.next().is_some());
        }
        assert!(!session.is_connected());
    }

    #[rstest]
    fn test_stream_missing_table(mut session: Session<MemoryCatalog>) {
        let mut stream = session.get_table_rows("nope", &Selector::all(), &[], None);
        assert!(matches!(stream.next(), Some(Err(VcsError::NotFound(_)))));
        assert!(stream.next().is_none());
    }

    #[rstest]
    fn test_keep_alive(mut session: Session<MemoryCatalog>) {
        session.keep_alive(2);
        session.table_len("markers").unwrap();
        assert!(session.is_connected());
        session.table_len("markers").unwrap();
        assert!(!session.is_connected());
    }

    #[rstest]
    fn test_unavailable_drops_connection(catalog: MemoryCatalog) {
        let mut session = Session::new(catalog.clone(), CatalogConfig::default());
        session.keep_alive(10);
        session.has_table("x").unwrap();
        assert!(session.is_connected());
        catalog.set_online(false);
        assert!(matches!(session.has_table("x"), Err(VcsError::Unavailable(_))));
        assert!(!session.is_connected());
        catalog.set_online(true);
        assert!(!session.has_table("x").unwrap());
    }

    #[rstest]
    fn test_slice_and_update(mut session: Session<MemoryCatalog>) {
        session
            .update_table_row(
                "markers",
                &Selector::parse("label == 'm7'").unwrap(),
                &record([("pos", Value::Long(70))]),
            )
            .unwrap();
        let rows = session.get_table_slice("markers", &[7, 0], &["pos"]).unwrap();
        assert_eq!(rows, vec![record([("pos", 70i64)]), record([("pos", 0i64)])]);
    }

    #[rstest]
    fn test_whole_table_round_trip(mut session: Session<MemoryCatalog>) {
        let array = session.read_whole_table("markers", Some(5)).unwrap();
        assert_eq!(array.len(), 12);
        session.store_as_a_table("copy", &array, Some(5)).unwrap();
        assert_eq!(session.read_whole_table("copy", None).unwrap(), array);
        session.delete_table("copy").unwrap();
        assert!(!session.has_table("copy").unwrap());
    }

    #[rstest]
    fn test_objects(mut session: Session<MemoryCatalog>) {
        let genome = ReferenceGenome::new("hg19", 26, "GRC", "h", "19").unwrap();
        let stored = ReferenceGenomeRecord::from(&genome);
        session.save(&stored).unwrap();

        let found: Vec<ReferenceGenomeRecord> = session
            .find_by_query("label == :label", &record([("label", "hg19")]))
            .unwrap();
        assert_eq!(found, vec![stored.clone()]);

        let by_vid: Option<ReferenceGenomeRecord> = session.get_by_vid(&genome.vid).unwrap();
        assert_eq!(by_vid, Some(stored.clone()));
        assert!(session.cached_objects() > 0);

        session.delete(&stored).unwrap();
        assert_eq!(session.cached_objects(), 0);
        let gone: Option<ReferenceGenomeRecord> = session.get_by_vid(&genome.vid).unwrap();
        assert_eq!(gone, None);
        assert!(matches!(
            session.find_one::<ReferenceGenomeRecord>("label == 'hg19'", &Record::new()),
            Err(VcsError::NotFound(_))
        ));
    }
}
