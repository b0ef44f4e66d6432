use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use vcs_core::{Column, Value, VcsError, VcsResult};

use crate::record::Record;
use crate::selector::Selector;

///
/// A named table: fixed schema plus rows stored in insertion order.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<Column>) -> VcsResult<Self> {
        if name.trim().is_empty() {
            return Err(VcsError::Usage("Table name cannot be empty".to_string()));
        }
        if columns.is_empty() {
            return Err(VcsError::Usage(format!("Table {} has no columns", name)));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if column.name.is_empty() || !seen.insert(column.name.as_str()) {
                return Err(VcsError::Usage(format!(
                    "Bad or duplicate column name {:?} in table {}",
                    column.name, name
                )));
            }
        }
        Ok(Table {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }

    ///
    /// Turn a record into a row of this table. Missing columns get the
    /// default value of their kind; unknown columns and values that do not
    /// fit their column are a [VcsError::SchemaMismatch].
    ///
    pub fn coerce(&self, record: &Record) -> VcsResult<Vec<Value>> {
        if let Some(unknown) = record.keys().find(|k| self.position(k).is_none()) {
            return Err(VcsError::SchemaMismatch(format!(
                "Table {} has no column {}",
                self.name, unknown
            )));
        }
        self.columns
            .iter()
            .map(|c| match record.get(&c.name) {
                Some(value) => c.kind.coerce(&c.name, value.clone()),
                None => Ok(c.kind.default_value()),
            })
            .collect()
    }

    pub fn row_matches(&self, row: &[Value], selector: &Selector) -> VcsResult<bool> {
        selector.matches_with(|name| self.position(name).and_then(|i| row.get(i)))
    }

    ///
    /// Project a row on `columns`, all of them when `columns` is empty.
    ///
    pub fn to_record(&self, row: &[Value], columns: &[String]) -> VcsResult<Record> {
        if columns.is_empty() {
            return Ok(self
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| (c.name.clone(), v.clone()))
                .collect());
        }
        columns
            .iter()
            .map(|name| {
                let i = self.position(name).ok_or_else(|| {
                    VcsError::SchemaMismatch(format!("Table {} has no column {}", self.name, name))
                })?;
                Ok((name.clone(), row[i].clone()))
            })
            .collect()
    }

    /// Apply `updates` to a row in place.
    pub fn update(&self, row: &mut [Value], updates: &Record) -> VcsResult<()> {
        let mut staged = Vec::with_capacity(updates.len());
        for (name, value) in updates {
            let i = self.position(name).ok_or_else(|| {
                VcsError::SchemaMismatch(format!("Table {} has no column {}", self.name, name))
            })?;
            staged.push((i, self.columns[i].kind.coerce(name, value.clone())?));
        }
        for (i, value) in staged {
            row[i] = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use vcs_core::ColumnKind;

    use crate::record::record;

    #[fixture]
    fn table() -> Table {
        Table::new(
            "markers",
            vec![
                Column::new(ColumnKind::String(8), "label", "marker label"),
                Column::new(ColumnKind::Long, "pos", "position"),
                Column::new(ColumnKind::Bool, "strand", ""),
            ],
        )
        .unwrap()
    }

    #[rstest]
    fn test_defaults_fill_missing(table: Table) {
        let row = table.coerce(&record([("label", Value::from("rs1"))])).unwrap();
        assert_eq!(
            row,
            vec![Value::from("rs1"), Value::Long(0), Value::Bool(false)]
        );
    }

    #[rstest]
    fn test_unknown_column(table: Table) {
        let result = table.coerce(&record([("nope", Value::Long(1))]));
        assert!(matches!(result, Err(VcsError::SchemaMismatch(_))));
    }

    #[rstest]
    fn test_too_wide(table: Table) {
        let result = table.coerce(&record([("label", Value::from("far too wide"))]));
        assert!(matches!(result, Err(VcsError::SchemaMismatch(_))));
    }

    #[rstest]
    fn test_duplicate_columns() {
        let columns = vec![
            Column::new(ColumnKind::Long, "a", ""),
            Column::new(ColumnKind::Long, "a", ""),
        ];
        assert!(matches!(Table::new("t", columns), Err(VcsError::Usage(_))));
    }

    #[rstest]
    fn test_projection(table: Table) {
        let row = table
            .coerce(&record([("label", Value::from("rs1")), ("pos", Value::Long(9))]))
            .unwrap();
        let projected = table.to_record(&row, &["pos".to_string()]).unwrap();
        assert_eq!(projected, record([("pos", Value::Long(9))]));
        assert_eq!(table.to_record(&row, &[]).unwrap().len(), 3);
    }
}
