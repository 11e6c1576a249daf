//! Code-emitter boundary.
//!
//! A conversion node that survives canonicalization is lowered exactly
//! once, after its fixed point is reached; the emitter is target-specific
//! and lives behind this trait.

use crate::convert::{ConvertKind, ConvertNode};

pub trait ConvertEmitter {
    /// Whatever the target backend uses to name a value (register,
    /// virtual register, stack slot).
    type Operand;

    fn emit_truncate(&mut self, src: Self::Operand, result_bits: u32) -> Self::Operand;
    fn emit_sign_extend(
        &mut self,
        src: Self::Operand,
        input_bits: u32,
        result_bits: u32,
    ) -> Self::Operand;
    fn emit_zero_extend(
        &mut self,
        src: Self::Operand,
        input_bits: u32,
        result_bits: u32,
    ) -> Self::Operand;
}

/// Lower one surviving conversion.
pub fn generate<E: ConvertEmitter>(node: &ConvertNode, src: E::Operand, emitter: &mut E) -> E::Operand {
    match node.kind {
        ConvertKind::Narrow => emitter.emit_truncate(src, node.result_bits),
        ConvertKind::SignExtend => emitter.emit_sign_extend(src, node.input_bits, node.result_bits),
        ConvertKind::ZeroExtend => emitter.emit_zero_extend(src, node.input_bits, node.result_bits),
    }
}
