//! Core data model of the vcs workspace.
//!
//! A [VariantCallSupport] is a sorted set of genomic [Node]s on one
//! [ReferenceGenome], overlaid with named [FieldArray]s whose rows point into
//! the node array. Supports combine with exact set operations (see
//! [algebra]) that carry every field along.
//!
//! ```rust
//! use vcs_core::{Node, ReferenceGenome, VariantCallSupport};
//!
//! let genome = ReferenceGenome::new("hg19", 26, "GRC", "hg", "19").unwrap();
//!
//! let mut a = VariantCallSupport::new("a", &genome);
//! a.define_support(vec![Node::new(1, 10), Node::new(1, 20)]).unwrap();
//!
//! let mut b = VariantCallSupport::new("b", &genome);
//! b.define_support(vec![Node::new(1, 20), Node::new(2, 5)]).unwrap();
//!
//! assert_eq!(a.union(&b).unwrap().len(), 3);
//! assert_eq!(a.intersection(&b).unwrap().get_nodes(), &[Node::new(1, 20)]);
//! ```

pub mod algebra;
pub mod calls;
pub mod consts;
pub mod errors;
pub mod models;
pub mod support;
pub mod utils;

// re-exports
pub use self::calls::Call;
pub use self::errors::{VcsError, VcsResult};
pub use self::models::{
    Column, ColumnKind, FieldArray, FieldRow, Node, ReferenceGenome, Value, Vid,
};
pub use self::support::VariantCallSupport;
