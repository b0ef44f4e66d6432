use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::utils::{chromosome_name, global_pos};

///
/// Node struct, one `(chromosome, position)` pair on a reference genome.
///
/// Ordering is lexicographic on `(chrom, pos)`, which is the order of every
/// node array held by a [crate::VariantCallSupport].
///
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Node {
    pub chrom: u8,
    pub pos: u32,
}

impl Node {
    pub fn new(chrom: u8, pos: u32) -> Self {
        Node { chrom, pos }
    }

    /// `chrom * 10^10 + pos`
    pub fn global_pos(&self) -> u64 {
        global_pos(self.chrom, self.pos)
    }

    /// The `(0, 0)` node marks a marker without an alignment.
    pub fn is_null(&self) -> bool {
        self.chrom == 0 && self.pos == 0
    }
}

impl From<(u8, u32)> for Node {
    fn from(value: (u8, u32)) -> Self {
        Node::new(value.0, value.1)
    }
}

impl From<Node> for (u8, u32) {
    fn from(value: Node) -> Self {
        (value.chrom, value.pos)
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", chromosome_name(self.chrom), self.pos)
    }
}
