//! SNP markers for the vcs workspace.
//!
//! Marker definitions are imported once into a shared table. A marker set
//! orders a selection of them, gets aligned on one or more reference
//! genomes, and collects genotype data objects (one per sample) with a
//! probability pair per marker. An aligned set can be turned into a
//! [vcs_core::VariantCallSupport] with [to_support].

pub mod consts;
pub mod definitions;
pub mod errors;
pub mod genotypes;
pub mod marker_set;
pub mod mask;

// re-exports
pub use self::definitions::{Marker, SnpMarkerDefinition, add_snp_marker_definitions, get_snp_markers};
pub use self::errors::{MaskError, MaskResult};
pub use self::genotypes::{Gdo, add_gdo, get_gdo, get_gdo_stream};
pub use self::marker_set::{
    Alignment, MarkerSet, SetEntry, SetMarker, align_snp_markers_set, create_snp_markers_set,
    delete_snp_markers_set, extract_range, get_snp_markers_set, intersect, load_alignments,
    load_markers, to_support,
};
pub use self::mask::{Strand, convert_to_top, is_valid_mask, strand_of};
