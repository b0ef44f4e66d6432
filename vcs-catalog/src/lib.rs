//! Catalog façade of the vcs workspace.
//!
//! Everything the higher layers persist goes through a [Session]: typed
//! tables addressed by name, read back as lazy [RowStream]s filtered with
//! [Selector]s, and domain [Object]s addressed by VID. [MemoryCatalog] is the
//! bundled backend; any other backend implements [Catalog] and [Connector].
//!
//! ```rust
//! use vcs_catalog::{CatalogConfig, MemoryCatalog, Selector, Session, record};
//! use vcs_core::{Column, ColumnKind, Value};
//!
//! let mut session = Session::new(MemoryCatalog::new(), CatalogConfig::default());
//! session
//!     .create_table("t", &[Column::new(ColumnKind::Long, "pos", "")])
//!     .unwrap();
//! session
//!     .add_table_rows_stream("t", (0..10).map(|i| record([("pos", Value::Long(i))])), None)
//!     .unwrap();
//!
//! let selector = Selector::parse("pos < 3").unwrap();
//! let rows: Vec<_> = session
//!     .get_table_rows("t", &selector, &[], None)
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(rows.len(), 3);
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod consts;
pub mod memory;
pub mod objects;
pub mod record;
pub mod selector;
pub mod session;
pub mod table;
pub mod utils;

// re-exports
pub use self::catalog::{Batch, Catalog, Connector};
pub use self::config::{CatalogConfig, CatalogConfigError, CatalogConfigResult};
pub use self::memory::MemoryCatalog;
pub use self::objects::{
    ActionRecord, CatalogObject, DataSampleRecord, Header, MarkerSetRecord, Object, ObjectKind,
    ReferenceGenomeRecord, Status, VcsRecord,
};
pub use self::record::{Record, RecordArray, RecordExt, record};
pub use self::selector::{Selector, chunked_disjunction};
pub use self::session::{RowStream, Session};
pub use self::table::Table;
