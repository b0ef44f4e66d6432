use indexmap::IndexMap;

use vcs_core::{Column, Value, VcsError, VcsResult, Vid};

///
/// One table row: column name -> value, in column order.
///
pub type Record = IndexMap<String, Value>;

/// Build a record from `(column, value)` pairs.
pub fn record<I, K, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

///
/// Typed accessors over a [Record]. A missing column or a value of the wrong
/// kind means the stored data does not follow its schema and is reported as
/// corrupt.
///
pub trait RecordExt {
    fn value(&self, column: &str) -> VcsResult<&Value>;

    fn get_str(&self, column: &str) -> VcsResult<&str> {
        let value = self.value(column)?;
        value.as_str().ok_or_else(|| wrong_kind(column, value))
    }

    fn get_long(&self, column: &str) -> VcsResult<i64> {
        let value = self.value(column)?;
        value.as_long().ok_or_else(|| wrong_kind(column, value))
    }

    fn get_bool(&self, column: &str) -> VcsResult<bool> {
        let value = self.value(column)?;
        value.as_bool().ok_or_else(|| wrong_kind(column, value))
    }

    fn get_float_array(&self, column: &str) -> VcsResult<&[f32]> {
        let value = self.value(column)?;
        value.as_float_array().ok_or_else(|| wrong_kind(column, value))
    }

    fn get_vid(&self, column: &str) -> VcsResult<Vid> {
        let raw = self.get_str(column)?;
        Vid::parse(raw).map_err(|_| VcsError::Corrupt(format!("Column {} holds {:?}", column, raw)))
    }
}

fn wrong_kind(column: &str, value: &Value) -> VcsError {
    VcsError::Corrupt(format!("Unexpected value {} in column {}", value, column))
}

impl RecordExt for Record {
    fn value(&self, column: &str) -> VcsResult<&Value> {
        self.get(column)
            .ok_or_else(|| VcsError::Corrupt(format!("Missing column {}", column)))
    }
}

///
/// A typed record array: a column schema plus rows laid out in that order.
/// Round-trips verbatim through `store_as_a_table` / `read_whole_table`.
///
#[derive(Clone, Debug, PartialEq)]
pub struct RecordArray {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl RecordArray {
    pub fn new(columns: Vec<Column>) -> Self {
        RecordArray {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row `i` as a [Record].
    pub fn record(&self, i: usize) -> Option<Record> {
        self.rows.get(i).map(|row| {
            self.columns
                .iter()
                .zip(row)
                .map(|(c, v)| (c.name.clone(), v.clone()))
                .collect()
        })
    }

    /// Append a record, taking its values in schema order.
    pub fn push_record(&mut self, record: &Record) -> VcsResult<()> {
        let row = self
            .columns
            .iter()
            .map(|c| {
                record.get(&c.name).cloned().ok_or_else(|| {
                    VcsError::SchemaMismatch(format!("Record lacks column {}", c.name))
                })
            })
            .collect::<VcsResult<Vec<_>>>()?;
        self.rows.push(row);
        Ok(())
    }
}
