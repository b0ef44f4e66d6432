//! Marker sets and their alignments on reference genomes.
//!
//! A marker set is an ordered list of markers. Its content lives in a
//! dedicated table, one row per marker; its alignments live in a second
//! table shared by every reference genome the set has been aligned on, with
//! one row per aligned copy of a marker and a single `(0, 0)` row for
//! markers that did not align.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::ops::Index;

use vcs_catalog::{
    Connector, DataSampleRecord, Header, MarkerSetRecord, RecordExt, Selector, Session, record,
};
use vcs_core::{
    Column, ColumnKind, FieldArray, Node, ReferenceGenome, Value, VariantCallSupport, VcsError,
    VcsResult, Vid,
};

use crate::consts::{
    GDO_TABLE_PREFIX, ORIGIN_FIELD, SNP_ALIGNMENT_PREFIX, SNP_SET_CONTENT_PREFIX,
    VID_WIDTH, alignment_columns, content_columns,
};
use crate::definitions::{ensure_table, get_snp_markers};
use vcs_catalog::selector::literal;

/// One entry of a marker set as supplied at creation.
#[derive(Clone, Debug, PartialEq)]
pub struct SetEntry {
    pub marker_vid: Vid,
    pub index: u32,
    pub allele_flip: bool,
}

impl SetEntry {
    pub fn new(marker_vid: Vid, index: u32, allele_flip: bool) -> Self {
        SetEntry {
            marker_vid,
            index,
            allele_flip,
        }
    }
}

///
/// One alignment row: where one copy of a marker lands on a reference
/// genome. Unaligned markers have `copies == 0` and a `(0, 0)` position.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
    pub marker_vid: Vid,
    pub chromosome: u8,
    pub pos: u32,
    pub strand: bool,
    pub allele: char,
    pub copies: u32,
}

impl Alignment {
    pub fn new(marker_vid: Vid, chromosome: u8, pos: u32, strand: bool, allele: char, copies: u32) -> Self {
        Alignment {
            marker_vid,
            chromosome,
            pos,
            strand,
            allele,
            copies,
        }
    }

    pub fn unaligned(marker_vid: Vid) -> Self {
        Alignment::new(marker_vid, 0, 0, true, 'N', 0)
    }

    pub fn node(&self) -> Node {
        Node::new(self.chromosome, self.pos)
    }
}

/// A hydrated member of a marker set.
#[derive(Clone, Debug, PartialEq)]
pub struct SetMarker {
    pub marker_vid: Vid,
    pub label: String,
    pub index: u32,
    pub allele_flip: bool,
    /// Single aligned position, `(0, 0)` when unaligned, multi-copy or not loaded.
    pub position: Node,
}

#[derive(Clone, Debug)]
pub struct MarkerSet {
    record: MarkerSetRecord,
    markers: Vec<SetMarker>,
    genome: Option<ReferenceGenome>,
    copies: Vec<Vec<Node>>,
}

impl MarkerSet {
    pub fn vid(&self) -> &Vid {
        &self.record.header.vid
    }

    pub fn label(&self) -> &str {
        &self.record.header.label
    }

    pub fn record(&self) -> &MarkerSetRecord {
        &self.record
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&SetMarker> {
        self.markers.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SetMarker> {
        self.markers.iter()
    }

    /// Genome of the loaded alignments.
    pub fn reference_genome(&self) -> Option<&ReferenceGenome> {
        self.genome.as_ref()
    }

    /// Every aligned copy of marker `i`, empty when unaligned.
    pub fn alignments_of(&self, i: usize) -> &[Node] {
        self.copies.get(i).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn allele_flips(&self) -> Vec<bool> {
        self.markers.iter().map(|m| m.allele_flip).collect()
    }

    fn aligned_genome(&self) -> VcsResult<&ReferenceGenome> {
        self.genome.as_ref().ok_or_else(|| {
            VcsError::Usage(format!("Marker set {} has no alignment loaded", self.label()))
        })
    }
}

impl Index<usize> for MarkerSet {
    type Output = SetMarker;

    fn index(&self, i: usize) -> &Self::Output {
        &self.markers[i]
    }
}

pub fn content_table(vid: &Vid) -> String {
    format!("{}_{}", SNP_SET_CONTENT_PREFIX, vid)
}

pub fn alignment_table(vid: &Vid) -> String {
    format!("{}_{}", SNP_ALIGNMENT_PREFIX, vid)
}

pub fn gdo_table(vid: &Vid) -> String {
    format!("{}_{}", GDO_TABLE_PREFIX, vid)
}

fn action_value(action: Option<&Vid>) -> Value {
    Value::from(action.map(|a| a.as_str()).unwrap_or_default())
}

///
/// Create a marker set of `n` markers.
///
/// `entries` must yield exactly `n` entries whose indices are a permutation
/// of `[0, n)` and whose markers are all defined. The `(maker, model,
/// release)` triple must not be taken by another set.
///
#[allow(clippy::too_many_arguments)]
pub fn create_snp_markers_set<C, I>(
    session: &mut Session<C>,
    label: &str,
    maker: &str,
    model: &str,
    release: &str,
    n: usize,
    entries: I,
    action: Option<&Vid>,
) -> VcsResult<MarkerSet>
where
    C: Connector,
    I: IntoIterator<Item = SetEntry>,
{
    let mut entries: Vec<SetEntry> = entries.into_iter().collect();
    if entries.len() != n {
        return Err(VcsError::Usage(format!(
            "Marker set {} declares {} markers, got {}",
            label,
            n,
            entries.len()
        )));
    }
    let mut seen = vec![false; n];
    for entry in &entries {
        match seen.get_mut(entry.index as usize) {
            Some(slot) if !*slot => *slot = true,
            _ => {
                return Err(VcsError::Usage(format!(
                    "Indices of marker set {} are not a permutation of [0, {})",
                    label, n
                )));
            }
        }
    }
    entries.sort_by_key(|e| e.index);

    let params = record([("maker", maker), ("model", model), ("release", release)]);
    let taken = session.find_by_query::<MarkerSetRecord>(
        "(maker == :maker) & (model == :model) & (release == :release)",
        &params,
    )?;
    if !taken.is_empty() {
        return Err(VcsError::AlreadyExists(format!(
            "A marker set for {}/{}/{} already exists",
            maker, model, release
        )));
    }

    let vids: Vec<Vid> = entries.iter().map(|e| e.marker_vid.clone()).collect();
    let mut unique = vids.clone();
    unique.sort();
    unique.dedup();
    if unique.len() != vids.len() {
        return Err(VcsError::Usage(format!(
            "Marker set {} lists a marker twice",
            label
        )));
    }
    let labels: Vec<String> = if vids.is_empty() {
        Vec::new()
    } else {
        get_snp_markers(session, None, Some(vids.as_slice()))?
            .into_iter()
            .map(|m| m.label)
            .collect()
    };

    let set_record = MarkerSetRecord {
        header: Header::new(session.mint_vid(), label).with_action(action),
        maker: maker.to_string(),
        model: model.to_string(),
        release: release.to_string(),
        size: n as u64,
    };
    session.save(&set_record)?;

    let table = content_table(&set_record.header.vid);
    let rows = entries.iter().zip(&labels).map(|(e, l)| {
        record([
            ("vid", Value::from(set_record.header.vid.as_str())),
            ("marker_vid", Value::from(e.marker_vid.as_str())),
            ("marker_indx", Value::Long(e.index as i64)),
            ("label", Value::from(l.as_str())),
            ("allele_flip", Value::Bool(e.allele_flip)),
            ("op_vid", action_value(action)),
        ])
    });
    let stored = session
        .create_table(&table, &content_columns())
        .and_then(|_| session.add_table_rows_stream(&table, rows, None));
    if let Err(e) = stored {
        warn!("Creating marker set {} failed, rolling back: {}", label, e);
        session.delete(&set_record)?;
        let _ = session.delete_table(&table);
        return Err(e);
    }
    info!("Created marker set {} with {} markers", label, n);

    let markers = entries
        .into_iter()
        .zip(labels)
        .map(|(e, label)| SetMarker {
            marker_vid: e.marker_vid,
            label,
            index: e.index,
            allele_flip: e.allele_flip,
            position: Node::default(),
        })
        .collect();
    Ok(MarkerSet {
        record: set_record,
        markers,
        genome: None,
        copies: Vec::new(),
    })
}

///
/// Fetch a marker set by VID with its markers loaded.
///
pub fn get_snp_markers_set<C: Connector>(
    session: &mut Session<C>,
    vid: &Vid,
) -> VcsResult<Option<MarkerSet>> {
    let Some(set_record) = session.get_by_vid::<MarkerSetRecord>(vid)? else {
        return Ok(None);
    };
    let mut mset = MarkerSet {
        record: set_record,
        markers: Vec::new(),
        genome: None,
        copies: Vec::new(),
    };
    load_markers(session, &mut mset)?;
    Ok(Some(mset))
}

///
/// Read the content of `mset` back from the catalog, dropping any loaded
/// alignment.
///
pub fn load_markers<C: Connector>(session: &mut Session<C>, mset: &mut MarkerSet) -> VcsResult<()> {
    let table = content_table(mset.vid());
    let mut markers = Vec::with_capacity(mset.record.size as usize);
    for row in session.get_table_rows(&table, &Selector::all(), &[], None) {
        let row = row?;
        markers.push(SetMarker {
            marker_vid: row.get_vid("marker_vid")?,
            label: row.get_str("label")?.to_string(),
            index: row.get_long("marker_indx")? as u32,
            allele_flip: row.get_bool("allele_flip")?,
            position: Node::default(),
        });
    }
    markers.sort_by_key(|m| m.index);
    let consistent = markers.len() as u64 == mset.record.size
        && markers.iter().enumerate().all(|(i, m)| m.index as usize == i);
    if !consistent {
        return Err(VcsError::Corrupt(format!(
            "Content of marker set {} does not match its size {}",
            mset.label(),
            mset.record.size
        )));
    }
    mset.markers = markers;
    mset.genome = None;
    mset.copies = Vec::new();
    Ok(())
}

fn genome_selector(genome: &ReferenceGenome) -> VcsResult<Selector> {
    Selector::parse(&format!("ref_genome == {}", literal(&Value::from(genome.label.as_str()))))
}

///
/// Store the alignment of `mset` on `genome`.
///
/// Every marker of the set must appear: `copies` rows for a marker aligned
/// `copies` times, a single unaligned row otherwise. A set is aligned at
/// most once per genome.
///
pub fn align_snp_markers_set<C, I>(
    session: &mut Session<C>,
    mset: &MarkerSet,
    genome: &ReferenceGenome,
    alignments: I,
    action: Option<&Vid>,
) -> VcsResult<usize>
where
    C: Connector,
    I: IntoIterator<Item = Alignment>,
{
    let members: HashMap<&Vid, usize> = mset
        .iter()
        .enumerate()
        .map(|(i, m)| (&m.marker_vid, i))
        .collect();
    let alignments: Vec<Alignment> = alignments.into_iter().collect();

    let mut rows_per_marker = vec![0u32; mset.len()];
    let mut declared = vec![None; mset.len()];
    for a in &alignments {
        let i = *members.get(&a.marker_vid).ok_or_else(|| {
            VcsError::Usage(format!(
                "Marker {} is not in marker set {}",
                a.marker_vid,
                mset.label()
            ))
        })?;
        let placed = if a.copies == 0 {
            a.node().is_null()
        } else {
            genome.has_chromosome(a.chromosome) && a.pos >= 1
        };
        if !placed {
            return Err(VcsError::Usage(format!(
                "Alignment of marker {} at {} with {} copies does not fit genome {}",
                a.marker_vid,
                a.node(),
                a.copies,
                genome.label
            )));
        }
        if *declared[i].get_or_insert(a.copies) != a.copies {
            return Err(VcsError::Usage(format!(
                "Marker {} declares different copy numbers",
                a.marker_vid
            )));
        }
        rows_per_marker[i] += 1;
    }
    for (i, marker) in mset.iter().enumerate() {
        let expected = declared[i].map(|c| c.max(1));
        if expected != Some(rows_per_marker[i]) {
            return Err(VcsError::Usage(format!(
                "Marker {} of set {} has {} alignment rows, expected {}",
                marker.label,
                mset.label(),
                rows_per_marker[i],
                expected.unwrap_or(1)
            )));
        }
    }

    let table = alignment_table(mset.vid());
    ensure_table(session, &table, alignment_columns())?;
    let selector = genome_selector(genome)?;
    let already = session
        .get_table_rows(&table, &selector, &["marker_vid"], Some(1))
        .next()
        .transpose()?
        .is_some();
    if already {
        return Err(VcsError::AlreadyExists(format!(
            "Marker set {} is already aligned on {}",
            mset.label(),
            genome.label
        )));
    }

    let rows = alignments.iter().map(|a| {
        record([
            ("marker_vid", Value::from(a.marker_vid.as_str())),
            ("ref_genome", Value::from(genome.label.as_str())),
            ("chromosome", Value::Long(a.chromosome as i64)),
            ("pos", Value::Long(a.pos as i64)),
            ("global_pos", Value::Long(a.node().global_pos() as i64)),
            ("strand", Value::Bool(a.strand)),
            ("allele", Value::from(a.allele.to_string())),
            ("copies", Value::Long(a.copies as i64)),
            ("op_vid", action_value(action)),
        ])
    });
    let written = session.add_table_rows_stream(&table, rows, None)?;
    info!(
        "Aligned marker set {} on {}: {} rows",
        mset.label(),
        genome.label,
        written
    );
    Ok(written)
}

///
/// Load the alignment of `mset` on `genome`. Afterwards every marker has a
/// position: its single aligned copy, or `(0, 0)` when it has none or
/// several.
///
pub fn load_alignments<C: Connector>(
    session: &mut Session<C>,
    mset: &mut MarkerSet,
    genome: &ReferenceGenome,
) -> VcsResult<()> {
    let index: HashMap<Vid, usize> = mset
        .iter()
        .enumerate()
        .map(|(i, m)| (m.marker_vid.clone(), i))
        .collect();
    let mut copies: Vec<Vec<Node>> = vec![Vec::new(); mset.len()];
    let mut seen = vec![false; mset.len()];

    let table = alignment_table(mset.vid());
    let selector = genome_selector(genome)?;
    let columns = ["marker_vid", "chromosome", "pos", "copies"];
    for row in session.get_table_rows(&table, &selector, &columns, None) {
        let row = row?;
        let vid = row.get_vid("marker_vid")?;
        let i = *index.get(&vid).ok_or_else(|| {
            VcsError::Corrupt(format!("Alignment row for foreign marker {}", vid))
        })?;
        seen[i] = true;
        if row.get_long("copies")? > 0 {
            copies[i].push(Node::new(
                row.get_long("chromosome")? as u8,
                row.get_long("pos")? as u32,
            ));
        }
    }
    if !seen.iter().any(|s| *s) && !mset.is_empty() {
        return Err(VcsError::NotFound(format!(
            "Marker set {} is not aligned on {}",
            mset.label(),
            genome.label
        )));
    }
    if let Some(i) = seen.iter().position(|s| !s) {
        return Err(VcsError::Corrupt(format!(
            "Marker {} of set {} has no alignment on {}",
            mset[i].label,
            mset.label(),
            genome.label
        )));
    }

    for (marker, nodes) in mset.markers.iter_mut().zip(copies.iter_mut()) {
        nodes.sort();
        marker.position = match nodes.as_slice() {
            [single] => *single,
            _ => Node::default(),
        };
    }
    debug!("Loaded alignments of {} on {}", mset.label(), genome.label);
    mset.copies = copies;
    mset.genome = Some(genome.clone());
    Ok(())
}

fn positioned(mset: &MarkerSet) -> Vec<(Node, usize)> {
    let mut positions: Vec<(Node, usize)> = mset
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.position.is_null())
        .map(|(i, m)| (m.position, i))
        .collect();
    positions.sort();
    positions
}

///
/// Pair up the markers of `a` and `b` sitting on the same position.
///
/// Both sets must have alignments loaded on the same genome. Pairs come in
/// ascending position order; markers sharing a position pair up as a cross
/// product.
///
pub fn intersect(a: &MarkerSet, b: &MarkerSet) -> VcsResult<(Vec<usize>, Vec<usize>)> {
    let (ga, gb) = (a.aligned_genome()?, b.aligned_genome()?);
    if ga.vid != gb.vid {
        return Err(VcsError::Usage(format!(
            "Marker sets aligned on different genomes: {} and {}",
            ga.label, gb.label
        )));
    }
    let (pa, pb) = (positioned(a), positioned(b));
    let (mut idx_a, mut idx_b) = (Vec::new(), Vec::new());
    let (mut i, mut j) = (0, 0);
    while i < pa.len() && j < pb.len() {
        let (na, nb) = (pa[i].0, pb[j].0);
        if na < nb {
            i += 1;
        } else if nb < na {
            j += 1;
        } else {
            let end_a = i + pa[i..].iter().take_while(|p| p.0 == na).count();
            let end_b = j + pb[j..].iter().take_while(|p| p.0 == nb).count();
            for (_, x) in &pa[i..end_a] {
                for (_, y) in &pb[j..end_b] {
                    idx_a.push(*x);
                    idx_b.push(*y);
                }
            }
            i = end_a;
            j = end_b;
        }
    }
    Ok((idx_a, idx_b))
}

///
/// Indices of the markers of `mset` positioned in `[low, high)`.
///
/// `high` may be `(n_chroms + 1, 0)`, the node just past the last
/// chromosome, so that a range can reach the end of the genome.
///
pub fn extract_range(mset: &MarkerSet, range: (Node, Node)) -> VcsResult<Vec<usize>> {
    let genome = mset.aligned_genome()?;
    let (low, high) = range;
    let past_end = u16::from(high.chrom) == u16::from(genome.n_chroms) + 1 && high.pos == 0;
    if !genome.has_chromosome(low.chrom) || !(genome.has_chromosome(high.chrom) || past_end) {
        return Err(VcsError::Usage(format!(
            "Range {}..{} is not on reference genome {}",
            low, high, genome.label
        )));
    }
    Ok(mset
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.position.is_null() && low <= m.position && m.position < high)
        .map(|(i, _)| i)
        .collect())
}

fn origin_columns() -> Vec<Column> {
    vec![
        Column::new(ColumnKind::String(VID_WIDTH), "marker_set", "marker set VID"),
        Column::new(ColumnKind::String(VID_WIDTH), "marker_vid", "marker VID"),
        Column::new(ColumnKind::Long, "marker_indx", "index of the marker in its set"),
        Column::new(ColumnKind::Bool, "allele_flip", "A/B swapped relative to the mask"),
    ]
}

///
/// Build a support from every aligned copy of every marker of `mset`,
/// recording in the dense `origin` field which markers each node came from.
///
pub fn to_support(mset: &MarkerSet, label: &str) -> VcsResult<VariantCallSupport> {
    let genome = mset.aligned_genome()?;
    let mut vcs = VariantCallSupport::new(label, genome);
    vcs.define_support((0..mset.len()).flat_map(|i| mset.alignments_of(i).iter().copied()))?;

    let mut origin = FieldArray::new(origin_columns())?;
    for (i, marker) in mset.iter().enumerate() {
        for node in mset.alignments_of(i) {
            let index = vcs.find(node).ok_or_else(|| {
                VcsError::Corrupt(format!("Node {} lost while building {}", node, label))
            })?;
            origin.push(
                index as u32,
                vec![
                    Value::from(mset.vid().as_str()),
                    Value::from(marker.marker_vid.as_str()),
                    Value::Long(marker.index as i64),
                    Value::Bool(marker.allele_flip),
                ],
            )?;
        }
    }
    vcs.define_dense_field(ORIGIN_FIELD, origin)?;
    Ok(vcs)
}

///
/// Delete `mset` with its content, its alignments and its genotype data.
///
pub fn delete_snp_markers_set<C: Connector>(session: &mut Session<C>, mset: MarkerSet) -> VcsResult<()> {
    for table in [
        content_table(mset.vid()),
        alignment_table(mset.vid()),
        gdo_table(mset.vid()),
    ] {
        if session.has_table(&table)? {
            session.delete_table(&table)?;
        }
    }
    let params = record([("marker_set", mset.vid().as_str())]);
    let samples = session.find_by_query::<DataSampleRecord>("marker_set == :marker_set", &params)?;
    for sample in &samples {
        session.delete(sample)?;
    }
    session.delete(mset.record())?;
    info!(
        "Deleted marker set {} and {} data samples",
        mset.label(),
        samples.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use vcs_catalog::{CatalogConfig, MemoryCatalog};

    use crate::definitions::{SnpMarkerDefinition, add_snp_marker_definitions};

    struct World {
        session: Session<MemoryCatalog>,
        genome: ReferenceGenome,
        markers: Vec<Vid>,
    }

    #[fixture]
    fn world() -> World {
        let mut session = Session::new(MemoryCatalog::new(), CatalogConfig::default());
        let op = session.mint_vid();
        let definitions = (0..5).map(|i| SnpMarkerDefinition {
            label: format!("m{}", i),
            mask: "GG[A/C]TT".to_string(),
            ..Default::default()
        });
        let markers = add_snp_marker_definitions(&mut session, definitions, &op, false)
            .unwrap()
            .into_iter()
            .map(|(_, vid)| vid)
            .collect();
        World {
            session,
            genome: ReferenceGenome::new("GRCh37", 26, "GRC", "h", "37").unwrap(),
            markers,
        }
    }

    /// m1, m2, m0 (two copies), m3 (unaligned)
    fn chip_a(world: &mut World) -> MarkerSet {
        let m = world.markers.clone();
        let entries = vec![
            SetEntry::new(m[0].clone(), 2, false),
            SetEntry::new(m[1].clone(), 0, true),
            SetEntry::new(m[2].clone(), 1, false),
            SetEntry::new(m[3].clone(), 3, false),
        ];
        let mut mset =
            create_snp_markers_set(&mut world.session, "chipA", "acme", "A", "1", 4, entries, None)
                .unwrap();
        let alignments = vec![
            Alignment::new(m[1].clone(), 1, 100, true, 'A', 1),
            Alignment::new(m[2].clone(), 1, 200, true, 'C', 1),
            Alignment::new(m[0].clone(), 2, 50, true, 'A', 2),
            Alignment::new(m[0].clone(), 3, 70, false, 'A', 2),
            Alignment::unaligned(m[3].clone()),
        ];
        align_snp_markers_set(&mut world.session, &mset, &world.genome, alignments, None).unwrap();
        load_alignments(&mut world.session, &mut mset, &world.genome).unwrap();
        mset
    }

    /// m2, m4 (same position as m2), m1
    fn chip_b(world: &mut World) -> MarkerSet {
        let m = world.markers.clone();
        let entries = vec![
            SetEntry::new(m[2].clone(), 0, false),
            SetEntry::new(m[4].clone(), 1, false),
            SetEntry::new(m[1].clone(), 2, false),
        ];
        let mut mset =
            create_snp_markers_set(&mut world.session, "chipB", "acme", "B", "1", 3, entries, None)
                .unwrap();
        let alignments = vec![
            Alignment::new(m[2].clone(), 1, 200, true, 'C', 1),
            Alignment::new(m[4].clone(), 1, 200, true, 'C', 1),
            Alignment::new(m[1].clone(), 1, 100, true, 'A', 1),
        ];
        align_snp_markers_set(&mut world.session, &mset, &world.genome, alignments, None).unwrap();
        load_alignments(&mut world.session, &mut mset, &world.genome).unwrap();
        mset
    }

    #[rstest]
    fn test_hydration(mut world: World) {
        let mset = chip_a(&mut world);
        assert_eq!(mset.len(), 4);
        assert_eq!(mset[0].label, "m1");
        assert!(mset[0].allele_flip);
        assert_eq!(mset[0].position, Node::new(1, 100));
        assert_eq!(mset[1].position, Node::new(1, 200));
        assert_eq!(mset[2].position, Node::new(0, 0));
        assert_eq!(mset.alignments_of(2), &[Node::new(2, 50), Node::new(3, 70)]);
        assert_eq!(mset[3].position, Node::new(0, 0));
        assert!(mset.alignments_of(3).is_empty());

        let reloaded = get_snp_markers_set(&mut world.session, mset.vid())
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.len(), 4);
        assert_eq!(reloaded[2].label, "m0");
        assert_eq!(reloaded.reference_genome(), None);
    }

    #[rstest]
    fn test_create_errors(mut world: World) {
        let m = world.markers.clone();
        let wrong_count = create_snp_markers_set(
            &mut world.session,
            "x",
            "acme",
            "X",
            "1",
            2,
            vec![SetEntry::new(m[0].clone(), 0, false)],
            None,
        );
        assert!(matches!(wrong_count, Err(VcsError::Usage(_))));

        let not_a_permutation = create_snp_markers_set(
            &mut world.session,
            "x",
            "acme",
            "X",
            "1",
            2,
            vec![
                SetEntry::new(m[0].clone(), 0, false),
                SetEntry::new(m[1].clone(), 0, false),
            ],
            None,
        );
        assert!(matches!(not_a_permutation, Err(VcsError::Usage(_))));

        let unknown = create_snp_markers_set(
            &mut world.session,
            "x",
            "acme",
            "X",
            "1",
            1,
            vec![SetEntry::new(Vid::mint('V'), 0, false)],
            None,
        );
        assert!(matches!(unknown, Err(VcsError::NotFound(_))));

        chip_a(&mut world);
        let taken = create_snp_markers_set(
            &mut world.session,
            "again",
            "acme",
            "A",
            "1",
            1,
            vec![SetEntry::new(m[0].clone(), 0, false)],
            None,
        );
        assert!(matches!(taken, Err(VcsError::AlreadyExists(_))));
    }

    #[rstest]
    fn test_align_errors(mut world: World) {
        let mset = chip_a(&mut world);
        let m = world.markers.clone();
        let genome = world.genome.clone();
        let full = |extra: Vec<Alignment>| {
            let mut rows = vec![
                Alignment::new(m[1].clone(), 1, 100, true, 'A', 1),
                Alignment::new(m[2].clone(), 1, 200, true, 'C', 1),
                Alignment::unaligned(m[3].clone()),
            ];
            rows.extend(extra);
            rows
        };

        let again = align_snp_markers_set(
            &mut world.session,
            &mset,
            &genome,
            full(vec![Alignment::unaligned(m[0].clone())]),
            None,
        );
        assert!(matches!(again, Err(VcsError::AlreadyExists(_))));

        let other = ReferenceGenome::new("GRCh38", 24, "GRC", "h", "38").unwrap();
        let missing = align_snp_markers_set(&mut world.session, &mset, &other, full(vec![]), None);
        assert!(matches!(missing, Err(VcsError::Usage(_))));

        let foreign = align_snp_markers_set(
            &mut world.session,
            &mset,
            &other,
            full(vec![
                Alignment::unaligned(m[0].clone()),
                Alignment::unaligned(m[4].clone()),
            ]),
            None,
        );
        assert!(matches!(foreign, Err(VcsError::Usage(_))));

        let off_genome = align_snp_markers_set(
            &mut world.session,
            &mset,
            &other,
            full(vec![Alignment::new(m[0].clone(), 26, 5, true, 'A', 1)]),
            None,
        );
        assert!(matches!(off_genome, Err(VcsError::Usage(_))));

        let short_copies = align_snp_markers_set(
            &mut world.session,
            &mset,
            &other,
            full(vec![Alignment::new(m[0].clone(), 2, 5, true, 'A', 2)]),
            None,
        );
        assert!(matches!(short_copies, Err(VcsError::Usage(_))));

        let fine = align_snp_markers_set(
            &mut world.session,
            &mset,
            &other,
            full(vec![Alignment::new(m[0].clone(), 2, 5, true, 'A', 1)]),
            None,
        );
        assert_eq!(fine.unwrap(), 4);
    }

    #[rstest]
    fn test_not_aligned(mut world: World) {
        let mset = chip_a(&mut world);
        let other = ReferenceGenome::new("GRCh38", 24, "GRC", "h", "38").unwrap();
        let mut copy = mset.clone();
        assert!(matches!(
            load_alignments(&mut world.session, &mut copy, &other),
            Err(VcsError::NotFound(_))
        ));
    }

    #[rstest]
    fn test_intersect_cross_product(mut world: World) {
        let a = chip_a(&mut world);
        let b = chip_b(&mut world);
        let (idx_a, idx_b) = intersect(&a, &b).unwrap();
        assert_eq!(idx_a, vec![0, 1, 1]);
        assert_eq!(idx_b, vec![2, 0, 1]);
        for (i, j) in idx_a.iter().zip(&idx_b) {
            assert_eq!(a[*i].position, b[*j].position);
        }
    }

    #[rstest]
    fn test_intersect_needs_same_genome(mut world: World) {
        let a = chip_a(&mut world);
        let mut b = chip_b(&mut world);
        b.genome = Some(ReferenceGenome::new("GRCh38", 24, "GRC", "h", "38").unwrap());
        assert!(matches!(intersect(&a, &b), Err(VcsError::Usage(_))));

        let unloaded = get_snp_markers_set(&mut world.session, a.vid()).unwrap().unwrap();
        assert!(matches!(intersect(&a, &unloaded), Err(VcsError::Usage(_))));
    }

    #[rstest]
    fn test_extract_range(mut world: World) {
        let mset = chip_a(&mut world);
        let found = extract_range(&mset, (Node::new(1, 150), Node::new(2, 0))).unwrap();
        assert_eq!(found, vec![1]);
        let found = extract_range(&mset, (Node::new(1, 100), Node::new(1, 200))).unwrap();
        assert_eq!(found, vec![0]);
        let found = extract_range(&mset, (Node::new(1, 150), Node::new(27, 0))).unwrap();
        assert_eq!(found, vec![1]);
    }

    #[rstest]
    #[case(Node::new(0, 1), Node::new(2, 0))]
    #[case(Node::new(1, 1), Node::new(27, 1))]
    #[case(Node::new(1, 1), Node::new(28, 0))]
    fn test_extract_range_off_genome(mut world: World, #[case] low: Node, #[case] high: Node) {
        let mset = chip_a(&mut world);
        assert!(matches!(
            extract_range(&mset, (low, high)),
            Err(VcsError::Usage(_))
        ));
    }

    #[rstest]
    fn test_to_support(mut world: World) {
        let a = chip_a(&mut world);
        let vcs = to_support(&a, "chipA").unwrap();
        assert_eq!(
            vcs.get_nodes(),
            &[
                Node::new(1, 100),
                Node::new(1, 200),
                Node::new(2, 50),
                Node::new(3, 70)
            ]
        );
        assert!(vcs.is_dense(ORIGIN_FIELD));
        let origin = vcs.get_field(ORIGIN_FIELD).unwrap();
        assert_eq!(origin.len(), 4);
        assert_eq!(
            origin.rows()[2].values[2],
            Value::Long(2),
            "node (2,50) comes from set index 2"
        );

        // markers sharing a position give one node with two origins
        let b = chip_b(&mut world);
        let vcs = to_support(&b, "chipB").unwrap();
        assert_eq!(vcs.len(), 2);
        assert_eq!(vcs.get_multiple_origins_nodes(), [vec![1], vec![2]]);
        assert_eq!(vcs.get_field(ORIGIN_FIELD).unwrap().len(), 3);
    }

    #[rstest]
    fn test_delete(mut world: World) {
        let a = chip_a(&mut world);
        let vid = a.vid().clone();
        delete_snp_markers_set(&mut world.session, a).unwrap();
        assert!(!world.session.has_table(&content_table(&vid)).unwrap());
        assert!(!world.session.has_table(&alignment_table(&vid)).unwrap());
        assert!(get_snp_markers_set(&mut world.session, &vid).unwrap().is_none());
    }
}
