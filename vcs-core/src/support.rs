use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};
use std::ops::Index;

use log::debug;

use crate::consts::DEFAULT_VID_PREFIX;
use crate::errors::{VcsError, VcsResult};
use crate::models::{FieldArray, Node, ReferenceGenome, Vid};

///
/// VariantCallSupport struct: a sorted, deduplicated array of nodes on one
/// reference genome plus any number of named fields indexed into it.
///
/// A support is filled once, with [VariantCallSupport::define_support] and
/// [VariantCallSupport::define_field], and is treated as immutable after
/// that. The set operations in [crate::algebra] always build new supports.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantCallSupport {
    label: String,
    vid: Vid,
    reference_genome: ReferenceGenome,
    nodes: Vec<Node>,
    /// (node index, multiplicity) for nodes that appeared more than once
    origins: Vec<(u32, u32)>,
    fields: BTreeMap<String, FieldArray>,
    dense: BTreeSet<String>,
    defined: bool,
}

impl VariantCallSupport {
    ///
    /// Create an empty support with a freshly minted VID.
    ///
    pub fn new(label: &str, reference_genome: &ReferenceGenome) -> Self {
        VariantCallSupport::with_vid(label, Vid::mint(DEFAULT_VID_PREFIX), reference_genome)
    }

    pub fn with_vid(label: &str, vid: Vid, reference_genome: &ReferenceGenome) -> Self {
        VariantCallSupport {
            label: label.to_string(),
            vid,
            reference_genome: reference_genome.clone(),
            nodes: Vec::new(),
            origins: Vec::new(),
            fields: BTreeMap::new(),
            dense: BTreeSet::new(),
            defined: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vid(&self) -> &Vid {
        &self.vid
    }

    pub fn reference_genome(&self) -> &ReferenceGenome {
        &self.reference_genome
    }

    /// Rename a support, typically the result of a set operation.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    ///
    /// Set the node array of the support.
    ///
    /// The input may be in any order and may repeat nodes. The stored support
    /// is the sorted, deduplicated array; for every node seen more than once
    /// the number of occurrences is kept, see
    /// [VariantCallSupport::get_multiple_origins_nodes].
    ///
    pub fn define_support<I>(&mut self, nodes: I) -> VcsResult<()>
    where
        I: IntoIterator<Item = Node>,
    {
        if self.defined {
            return Err(VcsError::Usage(format!(
                "Support of {} is already defined",
                self.label
            )));
        }
        let mut nodes: Vec<Node> = nodes.into_iter().collect();
        if let Some(bad) = nodes
            .iter()
            .find(|n| !self.reference_genome.has_chromosome(n.chrom))
        {
            return Err(VcsError::Usage(format!(
                "Node {} is outside of reference genome {} ({} chromosomes)",
                bad, self.reference_genome.label, self.reference_genome.n_chroms
            )));
        }
        nodes.sort_unstable();

        let mut unique: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut origins: Vec<(u32, u32)> = Vec::new();
        let mut run = 0u32;
        for node in nodes {
            if unique.last() == Some(&node) {
                run += 1;
                continue;
            }
            if run > 1 {
                origins.push(((unique.len() - 1) as u32, run));
            }
            unique.push(node);
            run = 1;
        }
        if run > 1 {
            origins.push(((unique.len() - 1) as u32, run));
        }

        debug!(
            "Defined support of {}: {} nodes, {} with multiple origins",
            self.label,
            unique.len(),
            origins.len()
        );
        self.nodes = unique;
        self.origins = origins;
        self.defined = true;
        Ok(())
    }

    pub fn get_nodes(&self) -> &[Node] {
        &self.nodes
    }

    ///
    /// `[[i_1, ..., i_K], [c_1, ..., c_K]]`: the index of every node that
    /// appeared more than once in the input and how many times it did.
    ///
    pub fn get_multiple_origins_nodes(&self) -> [Vec<u32>; 2] {
        let (indices, counts) = self.origins.iter().copied().unzip();
        [indices, counts]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Node> {
        self.nodes.get(i)
    }

    /// Index of a node, if present.
    pub fn find(&self, node: &Node) -> Option<usize> {
        self.nodes.binary_search(node).ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    ///
    /// Attach a field. Every row must point at a node of the support; rows are
    /// kept sorted by index, rows sharing an index keep their input order.
    ///
    pub fn define_field(&mut self, name: &str, field: FieldArray) -> VcsResult<()> {
        self.insert_field(name, field, false)
    }

    ///
    /// Attach a field that annotates every node at least once.
    ///
    pub fn define_dense_field(&mut self, name: &str, field: FieldArray) -> VcsResult<()> {
        self.insert_field(name, field, true)
    }

    fn insert_field(&mut self, name: &str, mut field: FieldArray, dense: bool) -> VcsResult<()> {
        if !self.defined {
            return Err(VcsError::Usage(format!(
                "Support of {} must be defined before field {}",
                self.label, name
            )));
        }
        if self.fields.contains_key(name) {
            return Err(VcsError::AlreadyExists(format!(
                "Field {} already defined on {}",
                name, self.label
            )));
        }
        if let Some(bad) = field.indices().find(|i| *i as usize >= self.nodes.len()) {
            return Err(VcsError::Usage(format!(
                "Field {} references node {} but support {} has {} nodes",
                name,
                bad,
                self.label,
                self.nodes.len()
            )));
        }
        if dense && !field.covers(self.nodes.len()) {
            return Err(VcsError::Usage(format!(
                "Field {} is declared dense but leaves nodes of {} unannotated",
                name, self.label
            )));
        }
        field.sort_by_index();
        if dense {
            self.dense.insert(name.to_string());
        }
        self.fields.insert(name.to_string(), field);
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> VcsResult<&FieldArray> {
        self.fields
            .get(name)
            .ok_or_else(|| VcsError::NotFound(format!("Field {} not in {}", name, self.label)))
    }

    pub fn get_fields(&self) -> &BTreeMap<String, FieldArray> {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Whether `name` was declared dense.
    pub fn is_dense(&self, name: &str) -> bool {
        self.dense.contains(name)
    }

    pub(crate) fn origins(&self) -> &[(u32, u32)] {
        &self.origins
    }

    ///
    /// Rebuild a support from already canonical parts, as produced by a set
    /// operation or read back from storage. Checks every invariant.
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        label: &str,
        vid: Vid,
        reference_genome: &ReferenceGenome,
        nodes: Vec<Node>,
        origins: Vec<(u32, u32)>,
        fields: BTreeMap<String, FieldArray>,
        dense: BTreeSet<String>,
    ) -> VcsResult<Self> {
        if nodes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(VcsError::Usage(format!(
                "Nodes of {} are not strictly increasing",
                label
            )));
        }
        if let Some(bad) = nodes
            .iter()
            .find(|n| !reference_genome.has_chromosome(n.chrom))
        {
            return Err(VcsError::Usage(format!(
                "Node {} is outside of reference genome {}",
                bad, reference_genome.label
            )));
        }
        if origins
            .iter()
            .any(|(i, c)| *i as usize >= nodes.len() || *c < 2)
            || origins.windows(2).any(|w| w[0].0 >= w[1].0)
        {
            return Err(VcsError::Usage(format!(
                "Inconsistent multiple origin table for {}",
                label
            )));
        }
        for (name, field) in &fields {
            if field.indices().any(|i| i as usize >= nodes.len())
                || field.rows().windows(2).any(|w| w[0].index > w[1].index)
            {
                return Err(VcsError::Usage(format!(
                    "Rows of field {} are not sorted valid node indices",
                    name
                )));
            }
        }
        if let Some(name) = dense
            .iter()
            .find(|name| fields.get(*name).is_none_or(|f| !f.covers(nodes.len())))
        {
            return Err(VcsError::Usage(format!(
                "Dense field {} does not cover every node",
                name
            )));
        }
        Ok(VariantCallSupport {
            label: label.to_string(),
            vid,
            reference_genome: reference_genome.clone(),
            nodes,
            origins,
            fields,
            dense,
            defined: true,
        })
    }
}

impl Index<usize> for VariantCallSupport {
    type Output = Node;

    fn index(&self, index: usize) -> &Self::Output {
        &self.nodes[index]
    }
}

impl<'a> IntoIterator for &'a VariantCallSupport {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl Display for VariantCallSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VariantCallSupport {} on {} with {} nodes and {} fields.",
            self.label,
            self.reference_genome.label,
            self.len(),
            self.fields.len()
        )
    }
}
