//! The conversion node family: narrowing and widening of integer values.

mod canon;

pub use canon::{Canonical, CanonTool, CostModel, canonicalize};

use std::fmt;

use crate::error::{Error, Result};
use crate::graph::NodeId;
use crate::stamp::IntegerStamp;
use crate::width::{self, ConvertWidths};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertKind {
    Narrow,
    SignExtend,
    ZeroExtend,
}

impl ConvertKind {
    /// Widening always preserves the value; truncation may not.
    #[must_use]
    pub fn is_lossless(self) -> bool {
        !matches!(self, ConvertKind::Narrow)
    }

    /// Whether a null-check elision pass may treat the conversion as a
    /// transparent wrapper around its input. Truncation changes the
    /// representable value set, so it never qualifies.
    #[must_use]
    pub fn may_null_check_skip_conversion(self) -> bool {
        self.is_lossless()
    }

    /// Apply the conversion to a constant. `value` is sign-extended at
    /// `input_bits`; the result is sign-extended at `result_bits`.
    #[must_use]
    pub fn fold_constant(self, input_bits: u32, result_bits: u32, value: i64) -> i64 {
        match self {
            ConvertKind::Narrow => width::narrow(value, result_bits),
            ConvertKind::SignExtend => width::narrow(value, input_bits),
            ConvertKind::ZeroExtend => {
                width::narrow(width::zero_extend(value, input_bits), result_bits)
            }
        }
    }

    /// Apply the conversion to a stamp.
    #[must_use]
    pub fn fold_stamp(self, input_bits: u32, result_bits: u32, input: IntegerStamp) -> IntegerStamp {
        debug_assert_eq!(input.bits(), input_bits);
        if input_bits == result_bits {
            return input;
        }
        match self {
            ConvertKind::Narrow => {
                let m = width::mask(result_bits);
                let down = input.down_mask() & m;
                let up = input.up_mask() & m;
                if input.lower() >= width::min_value(result_bits)
                    && input.upper() <= width::max_value(result_bits)
                {
                    IntegerStamp::with_bounds(result_bits, input.lower(), input.upper(), down, up)
                } else {
                    IntegerStamp::from_masks(result_bits, down, up)
                }
            }
            ConvertKind::SignExtend => {
                // The new high bits are copies of the input's sign bit.
                let ext = width::mask(result_bits) & !width::mask(input_bits);
                let sign = width::sign_bit(input_bits);
                let down = if input.down_mask() & sign == 0 {
                    input.down_mask()
                } else {
                    input.down_mask() | ext
                };
                let up = if input.up_mask() & sign == 0 {
                    input.up_mask()
                } else {
                    input.up_mask() | ext
                };
                IntegerStamp::with_bounds(result_bits, input.lower(), input.upper(), down, up)
            }
            ConvertKind::ZeroExtend => {
                // Bounds re-interpret the input unsigned; input_bits < 64
                // here since the widths differ.
                let wrap = 1i64 << input_bits;
                let (lower, upper) = if input.lower() >= 0 {
                    (input.lower(), input.upper())
                } else if input.upper() < 0 {
                    (input.lower() + wrap, input.upper() + wrap)
                } else {
                    (0, wrap - 1)
                };
                IntegerStamp::with_bounds(
                    result_bits,
                    lower,
                    upper,
                    input.down_mask(),
                    input.up_mask(),
                )
            }
        }
    }
}

impl fmt::Display for ConvertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertKind::Narrow => write!(f, "narrow"),
            ConvertKind::SignExtend => write!(f, "sign-extend"),
            ConvertKind::ZeroExtend => write!(f, "zero-extend"),
        }
    }
}

/// One integer conversion.
///
/// `input_always_positive` is a hint from range analysis that the operand's
/// sign bit is provably zero; it is only meaningful on `ZeroExtend` and is
/// forced to `false` on the other kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConvertNode {
    pub kind: ConvertKind,
    pub operand: NodeId,
    pub input_bits: u32,
    pub result_bits: u32,
    pub input_always_positive: bool,
}

impl ConvertNode {
    /// Width contracts are enforced here, at construction: widths must be
    /// in range, Narrow must not widen, the extend kinds must not narrow.
    pub fn new(
        kind: ConvertKind,
        operand: NodeId,
        input_bits: u32,
        result_bits: u32,
        input_always_positive: bool,
    ) -> Result<Self> {
        let widths = ConvertWidths::checked(input_bits, result_bits)?;
        let ok = match kind {
            ConvertKind::Narrow => widths.is_narrowing(),
            ConvertKind::SignExtend | ConvertKind::ZeroExtend => widths.is_widening(),
        };
        if !ok {
            return Err(Error::WidthContract {
                kind,
                input_bits,
                result_bits,
            });
        }
        Ok(Self {
            kind,
            operand,
            input_bits,
            result_bits,
            input_always_positive: input_always_positive && kind == ConvertKind::ZeroExtend,
        })
    }

    pub fn narrow(operand: NodeId, input_bits: u32, result_bits: u32) -> Result<Self> {
        Self::new(ConvertKind::Narrow, operand, input_bits, result_bits, false)
    }

    pub fn sign_extend(operand: NodeId, input_bits: u32, result_bits: u32) -> Result<Self> {
        Self::new(
            ConvertKind::SignExtend,
            operand,
            input_bits,
            result_bits,
            false,
        )
    }

    pub fn zero_extend(
        operand: NodeId,
        input_bits: u32,
        result_bits: u32,
        input_always_positive: bool,
    ) -> Result<Self> {
        Self::new(
            ConvertKind::ZeroExtend,
            operand,
            input_bits,
            result_bits,
            input_always_positive,
        )
    }

    #[must_use]
    pub fn is_lossless(&self) -> bool {
        self.kind.is_lossless()
    }
}

impl fmt::Display for ConvertNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} i{} -> i{}", self.kind, self.input_bits, self.result_bits)
    }
}
