use serde::{Deserialize, Serialize};

use super::column::{Column, ColumnKind, Value};
use crate::consts::FIELD_INDEX_COLUMN;
use crate::errors::{VcsError, VcsResult};

///
/// One row of a field: the node it annotates plus one value per schema column.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRow {
    pub index: u32,
    pub values: Vec<Value>,
}

impl FieldRow {
    pub fn new(index: u32, values: Vec<Value>) -> Self {
        FieldRow { index, values }
    }

    /// Same node and bitwise identical values.
    pub fn same_as(&self, other: &FieldRow) -> bool {
        self.index == other.index && self.same_values(other)
    }

    pub fn same_values(&self, other: &FieldRow) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.identical(b))
    }
}

///
/// A structured array indexed into the node array of a support. The schema
/// lists the columns beyond the mandatory `index` one.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldArray {
    columns: Vec<Column>,
    rows: Vec<FieldRow>,
}

impl FieldArray {
    ///
    /// Create an empty field with the given extra columns.
    ///
    pub fn new(columns: Vec<Column>) -> VcsResult<Self> {
        for (i, column) in columns.iter().enumerate() {
            if column.name == FIELD_INDEX_COLUMN {
                return Err(VcsError::SchemaMismatch(format!(
                    "Column name {} is reserved",
                    FIELD_INDEX_COLUMN
                )));
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(VcsError::SchemaMismatch(format!(
                    "Duplicated column {}",
                    column.name
                )));
            }
        }
        Ok(FieldArray {
            columns,
            rows: Vec::new(),
        })
    }

    ///
    /// Build a field from rows, checking every value against the schema.
    ///
    pub fn with_rows(columns: Vec<Column>, rows: Vec<FieldRow>) -> VcsResult<Self> {
        let mut field = FieldArray::new(columns)?;
        for row in rows {
            field.push(row.index, row.values)?;
        }
        Ok(field)
    }

    pub fn push(&mut self, index: u32, values: Vec<Value>) -> VcsResult<()> {
        if values.len() != self.columns.len() {
            return Err(VcsError::SchemaMismatch(format!(
                "Row has {} values, field declares {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        let values = self
            .columns
            .iter()
            .zip(values)
            .map(|(column, value)| column.kind.coerce(&column.name, value))
            .collect::<VcsResult<Vec<_>>>()?;
        self.rows.push(FieldRow { index, values });
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[FieldRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the schema.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, name: &str) -> VcsResult<Vec<&Value>> {
        let pos = self
            .column_position(name)
            .ok_or_else(|| VcsError::NotFound(format!("Column {} not in field", name)))?;
        Ok(self.rows.iter().map(|r| &r.values[pos]).collect())
    }

    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.iter().map(|r| r.index)
    }

    ///
    /// Whether two fields can have their rows concatenated: same column
    /// names and kinds in the same order. Descriptions are not compared.
    ///
    pub fn same_schema(&self, other: &FieldArray) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name && a.kind == b.kind)
    }

    /// Every index in `0..n` is referenced by at least one row.
    pub fn covers(&self, n: usize) -> bool {
        let mut seen = vec![false; n];
        for row in &self.rows {
            if let Some(flag) = seen.get_mut(row.index as usize) {
                *flag = true;
            }
        }
        seen.into_iter().all(|s| s)
    }

    pub(crate) fn from_sorted_rows(columns: Vec<Column>, rows: Vec<FieldRow>) -> Self {
        FieldArray { columns, rows }
    }

    pub(crate) fn sort_by_index(&mut self) {
        // stable: rows sharing an index keep their input order
        self.rows.sort_by_key(|r| r.index);
    }
}

///
/// Convenience constructor for the common case of a field made only of
/// string columns.
///
pub fn string_columns(layout: &[(&str, usize)]) -> Vec<Column> {
    layout.iter()
        .map(|(name, len)| Column::new(ColumnKind::String(*len), name, ""))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_reserved_index_column() {
        let columns = vec![Column::new(ColumnKind::Long, "index", "")];
        assert!(matches!(
            FieldArray::new(columns),
            Err(VcsError::SchemaMismatch(_))
        ));
    }

    #[rstest]
    fn test_push_checks_arity_and_kinds() {
        let mut field = FieldArray::new(string_columns(&[("origin", 34)])).unwrap();
        assert!(field.push(0, vec![Value::from("a")]).is_ok());
        assert!(field.push(0, vec![]).is_err());
        assert!(field.push(0, vec![Value::Long(1)]).is_err());
        assert_eq!(field.len(), 1);
    }

    #[rstest]
    fn test_sort_by_index_is_stable() {
        let mut field = FieldArray::with_rows(
            string_columns(&[("tag", 4)]),
            vec![
                FieldRow::new(2, vec![Value::from("x")]),
                FieldRow::new(0, vec![Value::from("y")]),
                FieldRow::new(2, vec![Value::from("z")]),
            ],
        )
        .unwrap();
        field.sort_by_index();
        let tags: Vec<_> = field
            .column_values("tag")
            .unwrap()
            .into_iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(tags, vec!["y", "x", "z"]);
    }

    #[rstest]
    fn test_covers() {
        let field = FieldArray::with_rows(
            vec![],
            vec![FieldRow::new(0, vec![]), FieldRow::new(2, vec![])],
        )
        .unwrap();
        assert!(!field.covers(3));
        assert!(field.covers(0));
    }
}
