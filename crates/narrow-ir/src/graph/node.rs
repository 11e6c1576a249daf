use id_arena::Id;

use crate::convert::ConvertNode;
use crate::stamp::IntegerStamp;

pub type NodeId = Id<Node>;

/// A value node. The conversion family is the interesting part; the other
/// variants are the minimum neighborhood the canonicalizer inspects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// External input with a declared stamp.
    Param { index: u32, stamp: IntegerStamp },
    /// Constant, stored sign-extended at its own width.
    Constant { bits: u32, value: i64 },
    /// Bitwise AND of two same-width values.
    And { bits: u32, x: NodeId, y: NodeId },
    Convert(ConvertNode),
}

impl Node {
    /// Width of the value this node computes.
    #[must_use]
    pub fn bits(&self) -> u32 {
        match self {
            Node::Param { stamp, .. } => stamp.bits(),
            Node::Constant { bits, .. } | Node::And { bits, .. } => *bits,
            Node::Convert(c) => c.result_bits,
        }
    }

    pub(crate) fn operands(&self) -> impl Iterator<Item = NodeId> + '_ {
        let (a, b) = match self {
            Node::And { x, y, .. } => (Some(*x), Some(*y)),
            Node::Convert(c) => (Some(c.operand), None),
            Node::Param { .. } | Node::Constant { .. } => (None, None),
        };
        a.into_iter().chain(b)
    }

    /// Rewire every edge to `old` over to `new`; returns the number of
    /// edges touched.
    pub(crate) fn replace_operand(&mut self, old: NodeId, new: NodeId) -> u32 {
        let mut rewired = 0;
        match self {
            Node::And { x, y, .. } => {
                if *x == old {
                    *x = new;
                    rewired += 1;
                }
                if *y == old {
                    *y = new;
                    rewired += 1;
                }
            }
            Node::Convert(c) => {
                if c.operand == old {
                    c.operand = new;
                    rewired += 1;
                }
            }
            Node::Param { .. } | Node::Constant { .. } => {}
        }
        rewired
    }
}
