//! End-to-end worklist runs: proposals are committed, neighbors requeued,
//! and the graph settles at a fixed point.

use narrow_ir::{ConvertKind, Graph, Mutator, Node};

fn convert_at(graph: &Graph, id: narrow_ir::NodeId) -> &narrow_ir::ConvertNode {
    match graph.node(id) {
        Node::Convert(c) => c,
        other => panic!("expected a conversion, got {other:?}"),
    }
}

#[test]
fn narrow_chain_collapses_to_one_node() {
    let mut g = Graph::new();
    let x = g.param(64).unwrap();
    let a = g.narrow(x, 48).unwrap();
    let b = g.narrow(a, 32).unwrap();
    let c = g.narrow(b, 8).unwrap();

    let mut m = Mutator::new(g);
    m.pin(c);
    let rewrites = m.run().unwrap();
    assert!(rewrites >= 2);

    let root = m.resolve(c);
    let node = convert_at(m.graph(), root);
    assert_eq!(node.kind, ConvertKind::Narrow);
    assert_eq!(node.operand, x);
    assert_eq!(node.input_bits, 64);
    assert_eq!(node.result_bits, 8);
    assert_eq!(m.graph().live_count(), 2);
}

#[test]
fn mixed_chain_settles_on_the_short_form() {
    let mut g = Graph::new();
    let x = g.param(8).unwrap();
    let zx = g.zero_extend(x, 32).unwrap();
    let n = g.narrow(zx, 16).unwrap();

    let mut m = Mutator::new(g);
    m.pin(n);
    m.run().unwrap();

    let node = convert_at(m.graph(), m.resolve(n));
    assert_eq!(node.kind, ConvertKind::ZeroExtend);
    assert_eq!(node.operand, x);
    assert_eq!(node.result_bits, 16);
    assert_eq!(m.graph().live_count(), 2);
}

#[test]
fn cost_guard_holds_at_the_fixed_point() {
    let mut g = Graph::new();
    let x = g.param(8).unwrap();
    let sx = g.sign_extend(x, 32).unwrap();
    let n8 = g.narrow(sx, 8).unwrap();
    let n16 = g.narrow(sx, 16).unwrap();

    let mut m = Mutator::new(g);
    m.pin(n8);
    m.pin(n16);
    let rewrites = m.run().unwrap();

    // Both narrows would keep the extend's single-use input alive, so
    // neither fires and the graph is already canonical.
    assert_eq!(rewrites, 0);
    assert_eq!(m.resolve(n8), n8);
    assert_eq!(m.resolve(n16), n16);
    assert_eq!(m.graph().live_count(), 4);
}

#[test]
fn shared_input_lets_the_fusion_fire() {
    let mut g = Graph::new();
    let x = g.param(8).unwrap();
    let sx = g.sign_extend(x, 32).unwrap();
    let other = g.zero_extend(x, 16).unwrap();
    let n = g.narrow(sx, 8).unwrap();

    let mut m = Mutator::new(g);
    m.pin(n);
    m.pin(other);
    m.run().unwrap();

    // x already has another user, so cancelling the extend is free.
    assert_eq!(m.resolve(n), x);
    assert!(m.graph().is_live(other));
    assert_eq!(m.graph().live_count(), 2);
}

#[test]
fn pruning_a_consumer_unblocks_the_declined_rewrite() {
    let mut g = Graph::new();
    let x = g.param(8).unwrap();
    let sx = g.sign_extend(x, 32).unwrap();
    let n = g.narrow(sx, 8).unwrap();
    // A second consumer that canonicalizes into the same narrow: once it
    // merges away, the extend has one use left and the cancellation the
    // cost guard declined earlier becomes free.
    let m_const = g.constant(32, 0xFF).unwrap();
    let a = g.and(sx, m_const).unwrap();
    let t = g.narrow(a, 8).unwrap();

    let mut m = Mutator::new(g);
    m.pin(n);
    m.pin(t);
    m.run().unwrap();

    assert_eq!(m.resolve(n), x);
    assert_eq!(m.resolve(t), x);
    assert_eq!(m.graph().live_count(), 1);
}

#[test]
fn and_mask_pipeline_reduces_to_the_parameter() {
    let mut g = Graph::new();
    let x = g.param(8).unwrap();
    let sx = g.sign_extend(x, 32).unwrap();
    let m_const = g.constant(32, 0xFF).unwrap();
    let a = g.and(sx, m_const).unwrap();
    let n = g.narrow(a, 8).unwrap();

    let mut m = Mutator::new(g);
    m.pin(n);
    m.run().unwrap();

    assert_eq!(m.resolve(n), x);
    // Everything between the parameter and the root went dead.
    assert_eq!(m.graph().live_count(), 1);
}

#[test]
fn positive_sign_extend_chain_becomes_zero_extend() {
    let mut g = Graph::new();
    let p = g.param_with_stamp(narrow_ir::IntegerStamp::from_masks(8, 0, 0x7F));
    let inner = g.sign_extend(p, 16).unwrap();
    let outer = g.sign_extend(inner, 32).unwrap();

    let mut m = Mutator::new(g);
    m.pin(outer);
    let rewrites = m.run().unwrap();
    assert!(rewrites >= 2);

    let node = convert_at(m.graph(), m.resolve(outer));
    assert_eq!(node.kind, ConvertKind::ZeroExtend);
    assert_eq!(node.operand, p);
    assert_eq!(node.input_bits, 8);
    assert_eq!(node.result_bits, 32);
    assert!(node.input_always_positive);
    assert_eq!(m.graph().live_count(), 2);
}

#[test]
fn constants_fold_through_the_whole_chain() {
    let mut g = Graph::new();
    let c = g.constant(32, -2).unwrap();
    let n = g.narrow(c, 8).unwrap();
    let zx = g.zero_extend(n, 64).unwrap();

    let mut m = Mutator::new(g);
    m.pin(zx);
    m.run().unwrap();

    let root = m.resolve(zx);
    match m.graph().node(root) {
        Node::Constant { bits: 64, value } => assert_eq!(*value, 254),
        other => panic!("expected a folded constant, got {other:?}"),
    }
}
