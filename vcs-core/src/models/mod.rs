pub mod column;
pub mod field;
pub mod node;
pub mod reference_genome;
pub mod vid;

// re-export for cleaner imports
pub use self::column::{Column, ColumnKind, Value};
pub use self::field::{FieldArray, FieldRow};
pub use self::node::Node;
pub use self::reference_genome::ReferenceGenome;
pub use self::vid::Vid;
