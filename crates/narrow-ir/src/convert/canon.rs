//! Canonicalization of conversion nodes.
//!
//! Each kind has a priority-ordered table of named rules; the first rule
//! that fires wins. Rules are pure: they read a snapshot of the node's
//! operand chain, stamps and use counts, and return a proposal the graph
//! mutator commits. A rule either strictly shortens the conversion chain
//! or replaces a conversion with an equal-size form no later rule turns
//! back, so fixed-point iteration terminates.

use std::cmp::Ordering;

use crate::convert::{ConvertKind, ConvertNode};
use crate::graph::{Graph, Node, NodeId, StampOracle, UseCounts};
use crate::width;

/// Use-count thresholds for rewrites that can extend an operand's live
/// range. The defaults decline an extend-narrow fusion when the extend's
/// input has exactly one use while the extend itself has several; other
/// cost models (code size vs. register pressure) may pick different
/// thresholds.
#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    pub operand_uses_at_most: u32,
    pub convert_uses_above: u32,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            operand_uses_at_most: 1,
            convert_uses_above: 1,
        }
    }
}

/// Read-only context for one canonicalization call.
pub struct CanonTool<'a> {
    graph: &'a Graph,
    stamps: &'a dyn StampOracle,
    uses: &'a dyn UseCounts,
    cost: CostModel,
}

impl<'a> CanonTool<'a> {
    /// The graph itself provides stamps and use counts.
    #[must_use]
    pub fn new(graph: &'a Graph) -> Self {
        Self::with_cost(graph, CostModel::default())
    }

    #[must_use]
    pub fn with_cost(graph: &'a Graph, cost: CostModel) -> Self {
        Self {
            graph,
            stamps: graph,
            uses: graph,
            cost,
        }
    }

    /// Fully explicit views, for tests that stub out an oracle.
    #[must_use]
    pub fn with_views(
        graph: &'a Graph,
        stamps: &'a dyn StampOracle,
        uses: &'a dyn UseCounts,
        cost: CostModel,
    ) -> Self {
        Self {
            graph,
            stamps,
            uses,
            cost,
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        self.graph.node(id)
    }
}

/// Result of canonicalizing a conversion node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonical {
    /// Already canonical; also the outcome of a declined cost guard.
    Unchanged,
    /// Replace with an existing value.
    Existing(NodeId),
    /// Replace with a constant.
    Constant { bits: u32, value: i64 },
    /// Replace with a (possibly new) conversion.
    Convert(ConvertNode),
}

type Rule = fn(&CanonTool<'_>, &ConvertNode) -> Option<Canonical>;

const NARROW_RULES: &[(&str, Rule)] = &[
    ("narrow-narrow", narrow_of_narrow),
    ("extend-narrow", narrow_of_extend),
    ("and-mask", narrow_of_and),
];

const SIGN_EXTEND_RULES: &[(&str, Rule)] = &[
    ("sign-extend-sign-extend", sign_extend_of_sign_extend),
    ("sign-extend-zero-extend", sign_extend_of_zero_extend),
    ("positive-sign-extend", sign_extend_of_positive),
];

const ZERO_EXTEND_RULES: &[(&str, Rule)] = &[
    ("zero-extend-zero-extend", zero_extend_of_zero_extend),
    ("zero-extend-narrow", zero_extend_of_narrow),
];

/// Canonicalize one conversion node against a snapshot of its operand
/// chain. Pure: never mutates the graph. Non-conversion nodes are always
/// `Unchanged`.
#[must_use]
pub fn canonicalize(tool: &CanonTool<'_>, id: NodeId) -> Canonical {
    let Node::Convert(node) = tool.node(id) else {
        return Canonical::Unchanged;
    };
    let node = *node;
    if let Some(out) = find_synonym(tool, &node) {
        return out;
    }
    let rules = match node.kind {
        ConvertKind::Narrow => NARROW_RULES,
        ConvertKind::SignExtend => SIGN_EXTEND_RULES,
        ConvertKind::ZeroExtend => ZERO_EXTEND_RULES,
    };
    for (name, rule) in rules {
        if let Some(out) = rule(tool, &node) {
            tracing::debug!(rule = *name, node = %node, "conversion rewrite");
            return out;
        }
    }
    Canonical::Unchanged
}

/// Rewrites shared by all three kinds: identity conversions disappear and
/// constant operands fold.
fn find_synonym(tool: &CanonTool<'_>, node: &ConvertNode) -> Option<Canonical> {
    if node.input_bits == node.result_bits {
        return Some(Canonical::Existing(node.operand));
    }
    if let Node::Constant { value, .. } = tool.node(node.operand) {
        return Some(Canonical::Constant {
            bits: node.result_bits,
            value: node
                .kind
                .fold_constant(node.input_bits, node.result_bits, *value),
        });
    }
    None
}

fn as_convert<'t>(tool: &'t CanonTool<'_>, id: NodeId) -> Option<&'t ConvertNode> {
    match tool.node(id) {
        Node::Convert(c) => Some(c),
        _ => None,
    }
}

fn narrow_spec(operand: NodeId, input_bits: u32, result_bits: u32) -> ConvertNode {
    ConvertNode {
        kind: ConvertKind::Narrow,
        operand,
        input_bits,
        result_bits,
        input_always_positive: false,
    }
}

fn extend_spec(
    kind: ConvertKind,
    operand: NodeId,
    input_bits: u32,
    result_bits: u32,
    input_always_positive: bool,
) -> ConvertNode {
    ConvertNode {
        kind,
        operand,
        input_bits,
        result_bits,
        input_always_positive: input_always_positive && kind == ConvertKind::ZeroExtend,
    }
}

// zzzzzzzz yyyyxxxx -(narrow)-> yyyyxxxx -(narrow)-> xxxx
// ==> zzzzzzzz yyyyxxxx -(narrow)-> xxxx
fn narrow_of_narrow(tool: &CanonTool<'_>, node: &ConvertNode) -> Option<Canonical> {
    let inner = as_convert(tool, node.operand)?;
    if inner.kind != ConvertKind::Narrow {
        return None;
    }
    Some(Canonical::Convert(narrow_spec(
        inner.operand,
        inner.input_bits,
        node.result_bits,
    )))
}

fn narrow_of_extend(tool: &CanonTool<'_>, node: &ConvertNode) -> Option<Canonical> {
    let inner = *as_convert(tool, node.operand)?;
    if inner.kind == ConvertKind::Narrow {
        return None;
    }
    // Do not introduce a new live value: if the extend's input has no other
    // user, fusing keeps it alive while the extend survives for its own
    // remaining users; declining lets dead-code removal take the extend.
    if tool.uses.uses_of(inner.operand) <= tool.cost.operand_uses_at_most
        && tool.uses.uses_of(node.operand) > tool.cost.convert_uses_above
    {
        return None;
    }
    Some(match node.result_bits.cmp(&inner.input_bits) {
        // xxxx -(extend)-> yyyy xxxx -(narrow)-> xxxx
        // ==> no-op
        Ordering::Equal => Canonical::Existing(inner.operand),
        // yyyyxxxx -(extend)-> zzzzzzzz yyyyxxxx -(narrow)-> xxxx
        // ==> yyyyxxxx -(narrow)-> xxxx
        Ordering::Less => Canonical::Convert(narrow_spec(
            inner.operand,
            inner.input_bits,
            node.result_bits,
        )),
        // sxxx -(sign-extend)-> ssssssss sssssxxx -(narrow)-> sssssxxx
        // ==> sxxx -(sign-extend)-> sssssxxx
        // (same-kind collapse; zero-extend keeps its positive hint)
        Ordering::Greater => Canonical::Convert(extend_spec(
            inner.kind,
            inner.operand,
            inner.input_bits,
            node.result_bits,
            inner.input_always_positive,
        )),
    })
}

// A conjunct whose known-one bits cover the narrowed width contributes
// nothing below the truncation point; only the other operand survives.
fn narrow_of_and(tool: &CanonTool<'_>, node: &ConvertNode) -> Option<Canonical> {
    let Node::And { x, y, .. } = tool.node(node.operand) else {
        return None;
    };
    let (x, y) = (*x, *y);
    let relevant = width::mask(node.result_bits);
    if tool.stamps.range_of(y).down_mask() & relevant == relevant {
        return Some(narrowed(tool, x, node.input_bits, node.result_bits));
    }
    if tool.stamps.range_of(x).down_mask() & relevant == relevant {
        return Some(narrowed(tool, y, node.input_bits, node.result_bits));
    }
    None
}

/// Narrow `operand` to `result_bits`, re-applying the synonym and fusion
/// rules to the new conversion before falling back to a plain narrow.
fn narrowed(tool: &CanonTool<'_>, operand: NodeId, input_bits: u32, result_bits: u32) -> Canonical {
    let spec = narrow_spec(operand, input_bits, result_bits);
    if let Some(out) = find_synonym(tool, &spec) {
        return out;
    }
    if let Some(out) = narrow_of_narrow(tool, &spec) {
        return out;
    }
    if let Some(out) = narrow_of_extend(tool, &spec) {
        return out;
    }
    Canonical::Convert(spec)
}

// sxxx -(sign-extend)-> ssss sxxx -(sign-extend)-> ssssssss sssssxxx
// ==> sxxx -(sign-extend)-> ssssssss sssssxxx
fn sign_extend_of_sign_extend(tool: &CanonTool<'_>, node: &ConvertNode) -> Option<Canonical> {
    let inner = as_convert(tool, node.operand)?;
    if inner.kind != ConvertKind::SignExtend {
        return None;
    }
    Some(Canonical::Convert(extend_spec(
        ConvertKind::SignExtend,
        inner.operand,
        inner.input_bits,
        node.result_bits,
        false,
    )))
}

// xxxx -(zero-extend)-> 0000 xxxx -(sign-extend)-> 00000000 0000xxxx
// ==> xxxx -(zero-extend)-> 00000000 0000xxxx
fn sign_extend_of_zero_extend(tool: &CanonTool<'_>, node: &ConvertNode) -> Option<Canonical> {
    let inner = as_convert(tool, node.operand)?;
    if inner.kind != ConvertKind::ZeroExtend {
        return None;
    }
    Some(Canonical::Convert(extend_spec(
        ConvertKind::ZeroExtend,
        inner.operand,
        inner.input_bits,
        node.result_bits,
        inner.input_always_positive,
    )))
}

// 0xxx -(sign-extend)-> 0000 0xxx
// ==> 0xxx -(zero-extend)-> 0000 0xxx
fn sign_extend_of_positive(tool: &CanonTool<'_>, node: &ConvertNode) -> Option<Canonical> {
    let stamp = tool.stamps.range_of(node.operand);
    if stamp.up_mask() & width::sign_bit(node.input_bits) != 0 {
        return None;
    }
    Some(Canonical::Convert(extend_spec(
        ConvertKind::ZeroExtend,
        node.operand,
        node.input_bits,
        node.result_bits,
        true,
    )))
}

// xxxx -(zero-extend)-> 0000 xxxx -(zero-extend)-> 00000000 0000xxxx
// ==> xxxx -(zero-extend)-> 00000000 0000xxxx
fn zero_extend_of_zero_extend(tool: &CanonTool<'_>, node: &ConvertNode) -> Option<Canonical> {
    let inner = as_convert(tool, node.operand)?;
    if inner.kind != ConvertKind::ZeroExtend {
        return None;
    }
    Some(Canonical::Convert(extend_spec(
        ConvertKind::ZeroExtend,
        inner.operand,
        inner.input_bits,
        node.result_bits,
        inner.input_always_positive,
    )))
}

// When the truncation only discarded bits already known zero, narrowing
// then zero-extending reproduces the original value; keep whichever
// single conversion the widths still require.
fn zero_extend_of_narrow(tool: &CanonTool<'_>, node: &ConvertNode) -> Option<Canonical> {
    let inner = *as_convert(tool, node.operand)?;
    if inner.kind != ConvertKind::Narrow {
        return None;
    }
    let original = inner.operand;
    let stamp = tool.stamps.range_of(original);
    if stamp.up_mask() & !width::mask(inner.result_bits) != 0 {
        return None;
    }
    Some(match inner.input_bits.cmp(&node.result_bits) {
        // The original is even narrower than the target: extend it the
        // rest of the way. Its sign bit lies above the known-zero cutoff,
        // so the input is provably positive.
        Ordering::Less => Canonical::Convert(extend_spec(
            ConvertKind::ZeroExtend,
            original,
            inner.input_bits,
            node.result_bits,
            true,
        )),
        Ordering::Greater => narrowed(tool, original, inner.input_bits, node.result_bits),
        Ordering::Equal => Canonical::Existing(original),
    })
}
