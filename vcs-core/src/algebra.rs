//! Set algebra over variant call supports.
//!
//! All operations walk the two sorted node arrays once with two cursors and
//! build a brand new support; operands are never modified. Field rows are
//! carried along by rewriting their `index` through the old-to-new maps the
//! merge produces. Because those maps are monotone, rows stay sorted by
//! index without a second sort.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::consts::DEFAULT_VID_PREFIX;
use crate::errors::{VcsError, VcsResult};
use crate::models::{FieldArray, FieldRow, Node, Vid};
use crate::support::VariantCallSupport;

/// Old index -> new index, `None` for dropped nodes.
type IndexMap = Vec<Option<u32>>;

struct Merge {
    nodes: Vec<Node>,
    a_map: IndexMap,
    b_map: IndexMap,
    /// b nodes that are also in a
    b_shared: Vec<bool>,
}

#[derive(Clone, Copy, PartialEq)]
enum Keep {
    Union,
    Intersection,
    Complement,
}

fn merge_nodes(a: &[Node], b: &[Node], keep: Keep) -> Merge {
    let mut nodes = Vec::with_capacity(match keep {
        Keep::Union => a.len() + b.len(),
        _ => a.len(),
    });
    let mut a_map = vec![None; a.len()];
    let mut b_map = vec![None; b.len()];
    let mut b_shared = vec![false; b.len()];

    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let take_a = j >= b.len() || (i < a.len() && a[i] < b[j]);
        let take_b = i >= a.len() || (j < b.len() && b[j] < a[i]);
        if take_a {
            if keep != Keep::Intersection {
                a_map[i] = Some(nodes.len() as u32);
                nodes.push(a[i]);
            }
            i += 1;
        } else if take_b {
            if keep == Keep::Union {
                b_map[j] = Some(nodes.len() as u32);
                nodes.push(b[j]);
            }
            j += 1;
        } else {
            b_shared[j] = true;
            if keep != Keep::Complement {
                a_map[i] = Some(nodes.len() as u32);
                b_map[j] = Some(nodes.len() as u32);
                nodes.push(a[i]);
            }
            i += 1;
            j += 1;
        }
    }
    Merge {
        nodes,
        a_map,
        b_map,
        b_shared,
    }
}

/// Keep rows whose node survived, pointing them at the new array.
fn remap_rows(field: &FieldArray, map: &IndexMap) -> Vec<FieldRow> {
    field
        .rows()
        .iter()
        .filter_map(|row| {
            map[row.index as usize].map(|index| FieldRow {
                index,
                values: row.values.clone(),
            })
        })
        .collect()
}

/// Split rows sorted by index into runs sharing one index.
fn runs(rows: &[FieldRow]) -> Vec<&[FieldRow]> {
    rows.chunk_by(|x, y| x.index == y.index).collect()
}

///
/// Rows of `a` followed, for each index, by the rows of `b` that have no
/// identical copy in `a` at that index.
///
fn union_rows(a: Vec<FieldRow>, b: Vec<FieldRow>) -> Vec<FieldRow> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let a_runs = runs(&a);
    let b_runs = runs(&b);
    let (mut i, mut j) = (0, 0);
    while i < a_runs.len() || j < b_runs.len() {
        let a_index = a_runs.get(i).map(|r| r[0].index);
        let b_index = b_runs.get(j).map(|r| r[0].index);
        match (a_index, b_index) {
            (Some(x), Some(y)) if x == y => {
                out.extend_from_slice(a_runs[i]);
                out.extend(
                    b_runs[j]
                        .iter()
                        .filter(|row| !a_runs[i].iter().any(|other| other.same_values(row)))
                        .cloned(),
                );
                i += 1;
                j += 1;
            }
            (Some(x), Some(y)) if x < y => {
                out.extend_from_slice(a_runs[i]);
                i += 1;
            }
            (Some(_), None) => {
                out.extend_from_slice(a_runs[i]);
                i += 1;
            }
            _ => {
                out.extend_from_slice(b_runs[j]);
                j += 1;
            }
        }
    }
    out
}

/// Rows of `a` that have an identical row in `b` at the same index.
fn intersection_rows(a: Vec<FieldRow>, b: Vec<FieldRow>) -> Vec<FieldRow> {
    let b_runs = runs(&b);
    let mut j = 0;
    a.into_iter()
        .filter(|row| {
            while j < b_runs.len() && b_runs[j][0].index < row.index {
                j += 1;
            }
            j < b_runs.len()
                && b_runs[j][0].index == row.index
                && b_runs[j].iter().any(|other| other.same_values(row))
        })
        .collect()
}

fn remap_origins(origins: &[(u32, u32)], map: &IndexMap) -> Vec<(u32, u32)> {
    origins
        .iter()
        .filter_map(|(i, c)| map[*i as usize].map(|j| (j, *c)))
        .collect()
}

impl VariantCallSupport {
    fn check_same_genome(&self, other: &VariantCallSupport) -> VcsResult<()> {
        if self.reference_genome().vid != other.reference_genome().vid {
            return Err(VcsError::Usage(format!(
                "{} is on {} but {} is on {}",
                self.label(),
                self.reference_genome().label,
                other.label(),
                other.reference_genome().label
            )));
        }
        Ok(())
    }

    fn check_shared_schemas(&self, other: &VariantCallSupport) -> VcsResult<()> {
        for (name, field) in self.get_fields() {
            if let Some(other_field) = other.get_fields().get(name) {
                if !field.same_schema(other_field) {
                    return Err(VcsError::SchemaMismatch(format!(
                        "Field {} has different columns in {} and {}",
                        name,
                        self.label(),
                        other.label()
                    )));
                }
            }
        }
        Ok(())
    }

    ///
    /// Assemble a result, declaring dense every field that was dense in an
    /// operand and still covers every node.
    ///
    fn assemble(
        &self,
        label: String,
        nodes: Vec<Node>,
        origins: Vec<(u32, u32)>,
        fields: BTreeMap<String, FieldArray>,
        dense_candidates: BTreeSet<String>,
    ) -> VcsResult<VariantCallSupport> {
        let dense = dense_candidates
            .into_iter()
            .filter(|name| fields.get(name).is_some_and(|f| f.covers(nodes.len())))
            .collect();
        VariantCallSupport::from_parts(
            &label,
            Vid::mint(DEFAULT_VID_PREFIX),
            self.reference_genome(),
            nodes,
            origins,
            fields,
            dense,
        )
    }

    fn dense_names(&self) -> impl Iterator<Item = String> + '_ {
        self.field_names()
            .filter(|name| self.is_dense(name))
            .cloned()
    }

    ///
    /// Nodes `n` with `low <= n < high`, fields restricted and re-indexed.
    ///
    pub fn selection(&self, range: (Node, Node)) -> VcsResult<VariantCallSupport> {
        let (low, high) = range;
        if low > high {
            return Err(VcsError::Usage(format!(
                "Empty selection range: {} is after {}",
                low, high
            )));
        }
        let nodes = self.get_nodes();
        let start = nodes.partition_point(|n| *n < low);
        let end = nodes.partition_point(|n| *n < high);

        let map: IndexMap = (0..nodes.len())
            .map(|i| (start <= i && i < end).then(|| (i - start) as u32))
            .collect();

        let fields = self
            .get_fields()
            .iter()
            .map(|(name, field)| {
                let rows = remap_rows(field, &map);
                (
                    name.clone(),
                    FieldArray::from_sorted_rows(field.columns().to_vec(), rows),
                )
            })
            .collect();

        self.assemble(
            format!("selection({},{}-{})", self.label(), low, high),
            nodes[start..end].to_vec(),
            remap_origins(self.origins(), &map),
            fields,
            self.dense_names().collect(),
        )
    }

    ///
    /// Ordered merge of both node arrays. Fields present in either operand
    /// are concatenated and re-indexed; a row of `other` identical to a row
    /// of `self` on the same node is dropped.
    ///
    pub fn union(&self, other: &VariantCallSupport) -> VcsResult<VariantCallSupport> {
        self.check_same_genome(other)?;
        self.check_shared_schemas(other)?;

        let merge = merge_nodes(self.get_nodes(), other.get_nodes(), Keep::Union);

        let mut fields = BTreeMap::new();
        for (name, field) in self.get_fields() {
            let rows = remap_rows(field, &merge.a_map);
            let rows = match other.get_fields().get(name) {
                Some(other_field) => union_rows(rows, remap_rows(other_field, &merge.b_map)),
                None => rows,
            };
            fields.insert(
                name.clone(),
                FieldArray::from_sorted_rows(field.columns().to_vec(), rows),
            );
        }
        for (name, field) in other.get_fields() {
            if !fields.contains_key(name) {
                let rows = remap_rows(field, &merge.b_map);
                fields.insert(
                    name.clone(),
                    FieldArray::from_sorted_rows(field.columns().to_vec(), rows),
                );
            }
        }

        let mut origins = remap_origins(self.origins(), &merge.a_map);
        origins.extend(
            other
                .origins()
                .iter()
                .filter(|(i, _)| !merge.b_shared[*i as usize])
                .filter_map(|(i, c)| merge.b_map[*i as usize].map(|j| (j, *c))),
        );
        origins.sort_unstable_by_key(|(i, _)| *i);

        debug!(
            "union of {} ({}) and {} ({}) has {} nodes",
            self.label(),
            self.len(),
            other.label(),
            other.len(),
            merge.nodes.len()
        );
        self.assemble(
            format!("union({},{})", self.label(), other.label()),
            merge.nodes,
            origins,
            fields,
            self.dense_names().chain(other.dense_names()).collect(),
        )
    }

    ///
    /// Nodes present in both operands. Shared fields keep the rows found in
    /// both; fields of a single operand are restricted to surviving nodes.
    ///
    pub fn intersection(&self, other: &VariantCallSupport) -> VcsResult<VariantCallSupport> {
        self.check_same_genome(other)?;
        self.check_shared_schemas(other)?;

        let merge = merge_nodes(self.get_nodes(), other.get_nodes(), Keep::Intersection);

        let mut fields = BTreeMap::new();
        for (name, field) in self.get_fields() {
            let rows = remap_rows(field, &merge.a_map);
            let rows = match other.get_fields().get(name) {
                Some(other_field) => {
                    intersection_rows(rows, remap_rows(other_field, &merge.b_map))
                }
                None => rows,
            };
            fields.insert(
                name.clone(),
                FieldArray::from_sorted_rows(field.columns().to_vec(), rows),
            );
        }
        for (name, field) in other.get_fields() {
            if !fields.contains_key(name) {
                let rows = remap_rows(field, &merge.b_map);
                fields.insert(
                    name.clone(),
                    FieldArray::from_sorted_rows(field.columns().to_vec(), rows),
                );
            }
        }

        debug!(
            "intersection of {} ({}) and {} ({}) has {} nodes",
            self.label(),
            self.len(),
            other.label(),
            other.len(),
            merge.nodes.len()
        );
        self.assemble(
            format!("intersection({},{})", self.label(), other.label()),
            merge.nodes,
            remap_origins(self.origins(), &merge.a_map),
            fields,
            self.dense_names().chain(other.dense_names()).collect(),
        )
    }

    ///
    /// Nodes of `self` absent from `other`, with the fields of `self`
    /// restricted and renumbered to the result.
    ///
    pub fn complement(&self, other: &VariantCallSupport) -> VcsResult<VariantCallSupport> {
        self.check_same_genome(other)?;
        self.check_shared_schemas(other)?;

        let merge = merge_nodes(self.get_nodes(), other.get_nodes(), Keep::Complement);

        let fields = self
            .get_fields()
            .iter()
            .map(|(name, field)| {
                let rows = remap_rows(field, &merge.a_map);
                (
                    name.clone(),
                    FieldArray::from_sorted_rows(field.columns().to_vec(), rows),
                )
            })
            .collect();

        self.assemble(
            format!("complement({},{})", self.label(), other.label()),
            merge.nodes,
            remap_origins(self.origins(), &merge.a_map),
            fields,
            self.dense_names().collect(),
        )
    }
}
