use crate::convert::ConvertKind;
use crate::graph::NodeId;

/// Internal-consistency failures. Every variant indicates a bug in the
/// surrounding compiler, not a recoverable condition: callers abort
/// compilation of the enclosing unit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bit width {bits} outside the supported range 1..=64")]
    WidthOutOfRange { bits: u32 },

    #[error("{kind} from {input_bits} to {result_bits} bits violates the width contract")]
    WidthContract {
        kind: ConvertKind,
        input_bits: u32,
        result_bits: u32,
    },

    #[error("operand {operand:?} of node {node:?} is {found} bits wide, expected {expected}")]
    OperandWidthMismatch {
        node: NodeId,
        operand: NodeId,
        expected: u32,
        found: u32,
    },

    #[error("bitwise AND operands differ in width: {left} vs {right} bits")]
    MixedOperandWidths { left: u32, right: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
