//! Test harness for narrow-ir unit tests.
//!
//! This module provides utilities for testing the canonicalizer without a
//! full compilation pipeline: one-shot canonicalization helpers, use-count
//! overrides for exercising the cost guard, a reference interpreter, and a
//! recording emitter for lowering tests.
//!
//! It is only available when running tests or when the `test-harness`
//! feature is enabled.

#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

use std::collections::HashMap;

use crate::convert::{Canonical, CanonTool, CostModel, canonicalize};
use crate::graph::{Graph, Node, NodeId, UseCounts};
use crate::lower::ConvertEmitter;
use crate::width;

/// Canonicalize one node with the graph acting as both oracles.
pub fn canon(graph: &Graph, id: NodeId) -> Canonical {
    canonicalize(&CanonTool::new(graph), id)
}

/// Canonicalize with overridden use counts, so the cost guard can be
/// exercised without building extra consumers.
pub fn canon_with_uses(graph: &Graph, overrides: &HashMap<NodeId, u32>, id: NodeId) -> Canonical {
    let uses = OverrideUses { graph, overrides };
    canonicalize(
        &CanonTool::with_views(graph, graph, &uses, CostModel::default()),
        id,
    )
}

/// Use-count view with per-node overrides on top of the live graph.
pub struct OverrideUses<'a> {
    pub graph: &'a Graph,
    pub overrides: &'a HashMap<NodeId, u32>,
}

impl UseCounts for OverrideUses<'_> {
    fn uses_of(&self, id: NodeId) -> u32 {
        self.overrides
            .get(&id)
            .copied()
            .unwrap_or_else(|| self.graph.uses_of(id))
    }
}

/// Reference interpreter. Parameter values are indexed by `Param::index`
/// and truncated to the parameter's width; every node normalizes its
/// result at its own width, matching the folding rules.
pub fn eval(graph: &Graph, id: NodeId, params: &[i64]) -> i64 {
    match graph.node(id) {
        Node::Param { index, stamp } => width::narrow(params[*index as usize], stamp.bits()),
        Node::Constant { value, .. } => *value,
        Node::And { bits, x, y } => {
            width::narrow(eval(graph, *x, params) & eval(graph, *y, params), *bits)
        }
        Node::Convert(c) => {
            c.kind
                .fold_constant(c.input_bits, c.result_bits, eval(graph, c.operand, params))
        }
    }
}

/// Target operations produced by [`RecordingEmitter`], mirroring a
/// fixed-width register machine's conversion repertoire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOp {
    SignExtend8,
    SignExtend16,
    SignExtend32,
    ZeroExtend8,
    ZeroExtend16,
    ZeroExtend32,
    /// 64 -> 32 truncation; the target sign-extends the low word.
    Trunc32,
    /// Truncation to an odd width via an AND mask.
    TruncMask { bits: u32 },
    /// Width change that needs no instruction.
    Move,
}

#[derive(Debug, Default)]
pub struct RecordingEmitter {
    pub ops: Vec<TargetOp>,
}

impl ConvertEmitter for RecordingEmitter {
    type Operand = ();

    fn emit_truncate(&mut self, _src: (), result_bits: u32) {
        let op = match result_bits {
            32 => TargetOp::Trunc32,
            64 => TargetOp::Move,
            bits => TargetOp::TruncMask { bits },
        };
        self.ops.push(op);
    }

    fn emit_sign_extend(&mut self, _src: (), input_bits: u32, _result_bits: u32) {
        let op = match input_bits {
            8 => TargetOp::SignExtend8,
            16 => TargetOp::SignExtend16,
            32 => TargetOp::SignExtend32,
            _ => TargetOp::Move,
        };
        self.ops.push(op);
    }

    fn emit_zero_extend(&mut self, _src: (), input_bits: u32, _result_bits: u32) {
        let op = match input_bits {
            8 => TargetOp::ZeroExtend8,
            16 => TargetOp::ZeroExtend16,
            32 => TargetOp::ZeroExtend32,
            _ => TargetOp::Move,
        };
        self.ops.push(op);
    }
}
