//! Table names and column layouts of the marker store.

use vcs_core::{Column, ColumnKind};

pub const SNP_DEFINITIONS_TABLE: &str = "snp_marker_definitions";

/// Prefix of the per-set content tables.
pub const SNP_SET_CONTENT_PREFIX: &str = "snp_markers_set";

/// Prefix of the per-set alignment tables.
pub const SNP_ALIGNMENT_PREFIX: &str = "snp_alignment";

/// Prefix of the per-set genotype tables.
pub const GDO_TABLE_PREFIX: &str = "gdo";

/// Name of the dense field attached to supports built from marker sets.
pub const ORIGIN_FIELD: &str = "origin";

pub const VID_WIDTH: usize = 34;
pub const SOURCE_WIDTH: usize = 16;
pub const CONTEXT_WIDTH: usize = 16;
pub const RELEASE_WIDTH: usize = 16;
pub const LABEL_WIDTH: usize = 48;
pub const RS_LABEL_WIDTH: usize = 32;
pub const MASK_WIDTH: usize = 133;
pub const REF_GENOME_WIDTH: usize = 16;

pub fn definition_columns() -> Vec<Column> {
    vec![
        Column::new(ColumnKind::String(VID_WIDTH), "vid", "marker VID"),
        Column::new(ColumnKind::String(SOURCE_WIDTH), "source", "origin of the definition"),
        Column::new(ColumnKind::String(CONTEXT_WIDTH), "context", "naming context of the label"),
        Column::new(ColumnKind::String(RELEASE_WIDTH), "release", "release of the source"),
        Column::new(ColumnKind::String(LABEL_WIDTH), "label", "marker label"),
        Column::new(ColumnKind::String(RS_LABEL_WIDTH), "rs_label", "dbSNP identifier"),
        Column::new(ColumnKind::String(MASK_WIDTH), "mask", "flank[A/B]flank"),
        Column::new(ColumnKind::String(VID_WIDTH), "op_vid", "importing action"),
    ]
}

pub fn content_columns() -> Vec<Column> {
    vec![
        Column::new(ColumnKind::String(VID_WIDTH), "vid", "marker set VID"),
        Column::new(ColumnKind::String(VID_WIDTH), "marker_vid", "marker VID"),
        Column::new(ColumnKind::Long, "marker_indx", "position of the marker in the set"),
        Column::new(ColumnKind::String(LABEL_WIDTH), "label", "marker label"),
        Column::new(ColumnKind::Bool, "allele_flip", "A/B swapped relative to the mask"),
        Column::new(ColumnKind::String(VID_WIDTH), "op_vid", "creating action"),
    ]
}

pub fn alignment_columns() -> Vec<Column> {
    vec![
        Column::new(ColumnKind::String(VID_WIDTH), "marker_vid", "marker VID"),
        Column::new(ColumnKind::String(REF_GENOME_WIDTH), "ref_genome", "reference genome label"),
        Column::new(ColumnKind::Long, "chromosome", "chromosome code"),
        Column::new(ColumnKind::Long, "pos", "1-based position"),
        Column::new(ColumnKind::Long, "global_pos", "chromosome * 10^10 + pos"),
        Column::new(ColumnKind::Bool, "strand", "true on the forward strand"),
        Column::new(ColumnKind::String(1), "allele", "allele seen on the reference"),
        Column::new(ColumnKind::Long, "copies", "number of aligned copies"),
        Column::new(ColumnKind::String(VID_WIDTH), "op_vid", "aligning action"),
    ]
}

pub fn gdo_columns(n_markers: usize) -> Vec<Column> {
    vec![
        Column::new(ColumnKind::String(VID_WIDTH), "vid", "genotype data object VID"),
        Column::new(ColumnKind::String(VID_WIDTH), "op_vid", "producing action"),
        Column::new(ColumnKind::FloatArray(2 * n_markers), "probs", "p_AA then p_BB"),
        Column::new(ColumnKind::FloatArray(n_markers), "confidence", "per marker confidence"),
    ]
}
