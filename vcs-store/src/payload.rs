//! Encoding of a [VariantCallSupport] as the rows of one table.
//!
//! Every row carries a `section` tag. There is one `header` row, one
//! `manifest` row per field (name, slot, row count, density and the JSON
//! column schema), one `node` row per node and one `field` row per field
//! row. Field `k` owns the columns `f<k>_<column>`, so fields never share
//! a column.

use std::collections::{BTreeMap, BTreeSet};

use vcs_catalog::{Record, RecordExt, record};
use vcs_core::{
    Column, ColumnKind, FieldArray, FieldRow, Node, ReferenceGenome, Value, VariantCallSupport,
    VcsError, VcsResult, Vid,
};

use crate::consts::{
    FIELD_COLUMN_PREFIX, NAME_WIDTH, SCHEMA_WIDTH, SECTION_FIELD, SECTION_HEADER,
    SECTION_MANIFEST, SECTION_NODE, SECTION_WIDTH,
};

pub fn field_column(slot: usize, column: &str) -> String {
    format!("{}{}_{}", FIELD_COLUMN_PREFIX, slot, column)
}

fn fixed_columns() -> Vec<Column> {
    vec![
        Column::new(ColumnKind::String(SECTION_WIDTH), "section", "row kind"),
        Column::new(ColumnKind::String(NAME_WIDTH), "name", "field name"),
        Column::new(ColumnKind::Long, "n_nodes", "nodes in the support"),
        Column::new(ColumnKind::Long, "n_fields", "fields in the support"),
        Column::new(ColumnKind::Long, "n_rows", "rows of one field"),
        Column::new(ColumnKind::Long, "chromosome", "chromosome code"),
        Column::new(ColumnKind::Long, "position", "position on the chromosome"),
        Column::new(ColumnKind::Long, "index", "node index or field slot"),
        Column::new(ColumnKind::Long, "multiplicity", "times the node was given"),
        Column::new(ColumnKind::Long, "row", "position of a row within its field"),
        Column::new(ColumnKind::Bool, "dense", "field annotates every node"),
        Column::new(ColumnKind::String(SCHEMA_WIDTH), "schema", "JSON column schema"),
    ]
}

///
/// Schema of the payload table of `vcs`.
///
pub fn payload_columns(vcs: &VariantCallSupport) -> Vec<Column> {
    let mut columns = fixed_columns();
    for (slot, field) in vcs.get_fields().values().enumerate() {
        columns.extend(
            field
                .columns()
                .iter()
                .map(|c| Column::new(c.kind, &field_column(slot, &c.name), &c.descr)),
        );
    }
    columns
}

pub fn node_rows(vcs: &VariantCallSupport) -> impl Iterator<Item = Record> + '_ {
    let multiplicity: BTreeMap<u32, u32> = {
        let [indices, counts] = vcs.get_multiple_origins_nodes();
        indices.into_iter().zip(counts).collect()
    };
    vcs.iter().enumerate().map(move |(i, node)| {
        record([
            ("section", Value::from(SECTION_NODE)),
            ("chromosome", Value::Long(node.chrom as i64)),
            ("position", Value::Long(node.pos as i64)),
            ("index", Value::Long(i as i64)),
            (
                "multiplicity",
                Value::Long(*multiplicity.get(&(i as u32)).unwrap_or(&1) as i64),
            ),
        ])
    })
}

pub fn field_rows(vcs: &VariantCallSupport) -> impl Iterator<Item = Record> + '_ {
    vcs.get_fields()
        .iter()
        .enumerate()
        .flat_map(|(slot, (name, field))| {
            field.rows().iter().enumerate().map(move |(ordinal, row)| {
                let mut rec = record([
                    ("section", Value::from(SECTION_FIELD)),
                    ("name", Value::from(name.as_str())),
                    ("index", Value::Long(row.index as i64)),
                    ("row", Value::Long(ordinal as i64)),
                ]);
                for (column, value) in field.columns().iter().zip(&row.values) {
                    rec.insert(field_column(slot, &column.name), value.clone());
                }
                rec
            })
        })
}

///
/// The header row followed by one manifest row per field.
///
pub fn manifest_rows(vcs: &VariantCallSupport) -> VcsResult<Vec<Record>> {
    let mut rows = vec![record([
        ("section", Value::from(SECTION_HEADER)),
        ("n_nodes", Value::Long(vcs.len() as i64)),
        ("n_fields", Value::Long(vcs.get_fields().len() as i64)),
    ])];
    for (slot, (name, field)) in vcs.get_fields().iter().enumerate() {
        let schema = serde_json::to_string(field.columns()).map_err(|e| {
            VcsError::SchemaMismatch(format!("Cannot encode schema of field {}: {}", name, e))
        })?;
        rows.push(record([
            ("section", Value::from(SECTION_MANIFEST)),
            ("name", Value::from(name.as_str())),
            ("n_rows", Value::Long(field.len() as i64)),
            ("index", Value::Long(slot as i64)),
            ("dense", Value::Bool(vcs.is_dense(name))),
            ("schema", Value::from(schema)),
        ]));
    }
    Ok(rows)
}

struct ManifestEntry {
    name: String,
    slot: usize,
    n_rows: usize,
    dense: bool,
    columns: Vec<Column>,
}

fn corrupt(vid: &Vid, what: impl std::fmt::Display) -> VcsError {
    VcsError::Corrupt(format!("Payload of {}: {}", vid, what))
}

fn non_negative(row: &Record, column: &str, vid: &Vid) -> VcsResult<usize> {
    let value = row.get_long(column)?;
    usize::try_from(value).map_err(|_| corrupt(vid, format!("negative {} {}", column, value)))
}

///
/// Rebuilds a support from payload rows given in any order.
///
pub struct PayloadDecoder {
    vid: Vid,
    header: Option<(usize, usize)>,
    manifest: Vec<ManifestEntry>,
    nodes: Vec<(usize, Node, u32)>,
    fields: Vec<Record>,
}

impl PayloadDecoder {
    pub fn new(vid: &Vid) -> Self {
        PayloadDecoder {
            vid: vid.clone(),
            header: None,
            manifest: Vec::new(),
            nodes: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Record) -> VcsResult<()> {
        let vid = &self.vid;
        let section = row.get_str("section")?.to_string();
        match section.as_str() {
            SECTION_HEADER => {
                if self.header.is_some() {
                    return Err(corrupt(vid, "more than one header"));
                }
                self.header = Some((
                    non_negative(&row, "n_nodes", vid)?,
                    non_negative(&row, "n_fields", vid)?,
                ));
            }
            SECTION_MANIFEST => {
                let name = row.get_str("name")?;
                let columns: Vec<Column> = serde_json::from_str(row.get_str("schema")?)
                    .map_err(|e| corrupt(vid, format!("schema of field {}: {}", name, e)))?;
                self.manifest.push(ManifestEntry {
                    name: name.to_string(),
                    slot: non_negative(&row, "index", vid)?,
                    n_rows: non_negative(&row, "n_rows", vid)?,
                    dense: row.get_bool("dense")?,
                    columns,
                });
            }
            SECTION_NODE => {
                let chrom = u8::try_from(row.get_long("chromosome")?)
                    .map_err(|_| corrupt(vid, "chromosome out of range"))?;
                let pos = u32::try_from(row.get_long("position")?)
                    .map_err(|_| corrupt(vid, "position out of range"))?;
                let multiplicity = u32::try_from(row.get_long("multiplicity")?)
                    .ok()
                    .filter(|m| *m >= 1)
                    .ok_or_else(|| corrupt(vid, "bad node multiplicity"))?;
                self.nodes.push((
                    non_negative(&row, "index", vid)?,
                    Node::new(chrom, pos),
                    multiplicity,
                ));
            }
            SECTION_FIELD => self.fields.push(row),
            other => return Err(corrupt(vid, format!("unknown section {:?}", other))),
        }
        Ok(())
    }

    pub fn finish(mut self, label: &str, genome: &ReferenceGenome) -> VcsResult<VariantCallSupport> {
        let vid = self.vid.clone();
        let (n_nodes, n_fields) = self.header.ok_or_else(|| corrupt(&vid, "no header"))?;
        if self.manifest.len() != n_fields {
            return Err(corrupt(
                &vid,
                format!("{} manifest rows for {} fields", self.manifest.len(), n_fields),
            ));
        }
        if self.nodes.len() != n_nodes {
            return Err(corrupt(
                &vid,
                format!("{} node rows for {} nodes", self.nodes.len(), n_nodes),
            ));
        }

        self.nodes.sort_by_key(|(i, _, _)| *i);
        let mut nodes = Vec::with_capacity(n_nodes);
        let mut origins = Vec::new();
        for (expected, (i, node, multiplicity)) in self.nodes.into_iter().enumerate() {
            if i != expected {
                return Err(corrupt(&vid, format!("node index {} missing", expected)));
            }
            if !genome.has_chromosome(node.chrom) {
                return Err(corrupt(
                    &vid,
                    format!("node {} outside of {}", node, genome.label),
                ));
            }
            if nodes.last().is_some_and(|last| *last >= node) {
                return Err(corrupt(&vid, format!("node {} out of order", node)));
            }
            if multiplicity > 1 {
                origins.push((i as u32, multiplicity));
            }
            nodes.push(node);
        }

        let mut rows_by_field: BTreeMap<String, Vec<(usize, FieldRow)>> = BTreeMap::new();
        for row in &self.fields {
            let name = row.get_str("name")?;
            let entry = self
                .manifest
                .iter()
                .find(|m| m.name == name)
                .ok_or_else(|| corrupt(&vid, format!("rows for undeclared field {}", name)))?;
            let index = non_negative(row, "index", &vid)?;
            let ordinal = non_negative(row, "row", &vid)?;
            if index >= n_nodes {
                return Err(corrupt(
                    &vid,
                    format!("field {} points at node {} of {}", name, index, n_nodes),
                ));
            }
            let values = entry
                .columns
                .iter()
                .map(|c| {
                    row.get(&field_column(entry.slot, &c.name))
                        .cloned()
                        .ok_or_else(|| corrupt(&vid, format!("column {} of field {}", c.name, name)))
                })
                .collect::<VcsResult<Vec<_>>>()?;
            rows_by_field
                .entry(name.to_string())
                .or_default()
                .push((ordinal, FieldRow::new(index as u32, values)));
        }

        let mut fields = BTreeMap::new();
        let mut dense = BTreeSet::new();
        for entry in self.manifest {
            let mut rows = rows_by_field.remove(&entry.name).unwrap_or_default();
            if rows.len() != entry.n_rows {
                return Err(corrupt(
                    &vid,
                    format!(
                        "field {} has {} rows, manifest says {}",
                        entry.name,
                        rows.len(),
                        entry.n_rows
                    ),
                ));
            }
            rows.sort_by_key(|(ordinal, _)| *ordinal);
            if let Some((expected, _)) = rows
                .iter()
                .enumerate()
                .find(|(expected, (ordinal, _))| expected != ordinal)
            {
                return Err(corrupt(
                    &vid,
                    format!("row {} of field {} missing", expected, entry.name),
                ));
            }
            let rows = rows.into_iter().map(|(_, row)| row).collect();
            let field = FieldArray::with_rows(entry.columns, rows)
                .map_err(|e| corrupt(&vid, format!("field {}: {}", entry.name, e)))?;
            if entry.dense {
                dense.insert(entry.name.clone());
            }
            if fields.insert(entry.name.clone(), field).is_some() {
                return Err(corrupt(&vid, format!("field {} declared twice", entry.name)));
            }
        }

        VariantCallSupport::from_parts(label, vid.clone(), genome, nodes, origins, fields, dense)
            .map_err(|e| corrupt(&vid, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use vcs_core::models::field::string_columns;

    #[fixture]
    fn genome() -> ReferenceGenome {
        ReferenceGenome::new("GRCh37", 26, "GRC", "h", "37").unwrap()
    }

    #[fixture]
    fn vcs(genome: ReferenceGenome) -> VariantCallSupport {
        let mut vcs = VariantCallSupport::new("probe", &genome);
        vcs.define_support(vec![
            Node::new(1, 10),
            Node::new(2, 5),
            Node::new(1, 10),
            Node::new(23, 7),
        ])
        .unwrap();
        let mut origin = FieldArray::new(string_columns(&[("source", 8)])).unwrap();
        for (i, source) in [(0, "a"), (0, "b"), (1, "a"), (2, "c")] {
            origin.push(i, vec![Value::from(source)]).unwrap();
        }
        vcs.define_dense_field("origin", origin).unwrap();
        let mut scores = FieldArray::new(vec![
            Column::new(ColumnKind::Float, "score", ""),
            Column::new(ColumnKind::FloatArray(2), "probs", "p_AA, p_BB"),
        ])
        .unwrap();
        scores
            .push(2, vec![Value::Float(0.5), Value::FloatArray(vec![0.25, 0.75])])
            .unwrap();
        vcs.define_field("scores", scores).unwrap();
        vcs
    }

    fn rows(vcs: &VariantCallSupport) -> Vec<Record> {
        let mut rows: Vec<Record> = node_rows(vcs).collect();
        rows.extend(field_rows(vcs));
        rows.extend(manifest_rows(vcs).unwrap());
        rows
    }

    fn decode(vcs: &VariantCallSupport, rows: Vec<Record>) -> VcsResult<VariantCallSupport> {
        let mut decoder = PayloadDecoder::new(vcs.vid());
        for row in rows {
            decoder.push(row)?;
        }
        decoder.finish(vcs.label(), vcs.reference_genome())
    }

    #[rstest]
    fn test_columns(vcs: VariantCallSupport) {
        let names: Vec<String> = payload_columns(&vcs).into_iter().map(|c| c.name).collect();
        assert_eq!(names.len(), 12 + 3);
        assert_eq!(&names[12..], &["f0_source", "f1_score", "f1_probs"]);
    }

    #[rstest]
    fn test_decode_in_any_order(vcs: VariantCallSupport) {
        let mut all = rows(&vcs);
        all.reverse();
        let rows_before = vcs.get_field("origin").unwrap().rows().to_vec();
        let decoded = decode(&vcs, all).unwrap();
        assert_eq!(decoded, vcs);
        assert_eq!(decoded.get_field("origin").unwrap().rows(), rows_before.as_slice());
        assert_eq!(decoded.get_multiple_origins_nodes(), [vec![0], vec![2]]);
        assert!(decoded.is_dense("origin"));
        assert!(!decoded.is_dense("scores"));
    }

    #[rstest]
    fn test_missing_header(vcs: VariantCallSupport) {
        let all: Vec<Record> = rows(&vcs)
            .into_iter()
            .filter(|r| r.get_str("section").unwrap() != SECTION_HEADER)
            .collect();
        assert!(matches!(decode(&vcs, all), Err(VcsError::Corrupt(_))));
    }

    #[rstest]
    fn test_missing_node(vcs: VariantCallSupport) {
        let mut all = rows(&vcs);
        all.remove(1);
        assert!(matches!(decode(&vcs, all), Err(VcsError::Corrupt(_))));
    }

    #[rstest]
    fn test_field_index_out_of_range(vcs: VariantCallSupport) {
        let mut all = rows(&vcs);
        let row = all
            .iter_mut()
            .find(|r| r.get_str("section").unwrap() == SECTION_FIELD)
            .unwrap();
        row.insert("index".to_string(), Value::Long(3));
        assert!(matches!(decode(&vcs, all), Err(VcsError::Corrupt(_))));
    }

    #[rstest]
    fn test_field_rows_shuffled_within_field(vcs: VariantCallSupport) {
        let mut all = rows(&vcs);
        // swap the two rows annotating node 0
        let first = all
            .iter()
            .position(|r| r.get_str("section").unwrap() == SECTION_FIELD)
            .unwrap();
        all.swap(first, first + 1);
        let decoded = decode(&vcs, all).unwrap();
        assert_eq!(decoded, vcs);
    }

    #[rstest]
    fn test_duplicate_field_row(vcs: VariantCallSupport) {
        let mut all = rows(&vcs);
        let first = all
            .iter()
            .position(|r| r.get_str("section").unwrap() == SECTION_FIELD)
            .unwrap();
        all[first + 1].insert("row".to_string(), Value::Long(0));
        assert!(matches!(decode(&vcs, all), Err(VcsError::Corrupt(_))));
    }

    #[rstest]
    fn test_node_off_genome(vcs: VariantCallSupport) {
        let small = ReferenceGenome::new("tiny", 2, "x", "y", "z").unwrap();
        let mut decoder = PayloadDecoder::new(vcs.vid());
        for row in rows(&vcs) {
            decoder.push(row).unwrap();
        }
        assert!(matches!(
            decoder.finish(vcs.label(), &small),
            Err(VcsError::Corrupt(_))
        ));
    }

    #[rstest]
    fn test_unknown_section(vcs: VariantCallSupport) {
        let mut decoder = PayloadDecoder::new(vcs.vid());
        let row = record([("section", Value::from("bogus"))]);
        assert!(matches!(decoder.push(row), Err(VcsError::Corrupt(_))));
    }
}
