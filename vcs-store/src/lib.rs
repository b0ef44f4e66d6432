//! Persistence of variant call supports.
//!
//! A [vcs_core::VariantCallSupport] is saved as a catalog object plus one
//! payload table named after its VID, holding its nodes, the rows of every
//! field and a manifest of the field schemas. Loading rebuilds the support
//! and checks every structural invariant on the way, reporting damage as
//! [vcs_core::VcsError::Corrupt].
//!
//! ```rust
//! use vcs_catalog::{CatalogConfig, MemoryCatalog, Session};
//! use vcs_core::{Node, ReferenceGenome, VariantCallSupport};
//! use vcs_store::{get_vcs_by_label, save_vcs};
//!
//! let mut session = Session::new(MemoryCatalog::new(), CatalogConfig::default());
//! let genome = ReferenceGenome::new("GRCh37", 26, "GRC", "h", "37").unwrap();
//! let mut vcs = VariantCallSupport::new("calls", &genome);
//! vcs.define_support(vec![Node::new(1, 100), Node::new(2, 50)]).unwrap();
//!
//! save_vcs(&mut session, &vcs, None).unwrap();
//! let loaded = get_vcs_by_label(&mut session, "calls", None).unwrap().unwrap();
//! assert_eq!(loaded.get_nodes(), vcs.get_nodes());
//! ```

pub mod consts;
pub mod payload;
pub mod store;

// re-exports
pub use self::payload::PayloadDecoder;
pub use self::store::{
    delete_vcs, get_reference_genome, get_vcs_by_label, get_vcs_by_vid, payload_table,
    register_reference_genome, save_vcs,
};
