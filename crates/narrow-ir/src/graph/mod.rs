//! Node storage and def-use bookkeeping.
//!
//! Nodes live in an arena and are addressed by stable ids; operand
//! references are ids, never pointers, so a replacement can never dangle.
//! The graph hash-conses structurally identical nodes on insert and keeps
//! the use counts the canonicalizer's cost heuristics read.

mod mutator;
mod node;

pub use mutator::Mutator;
pub use node::{Node, NodeId};

use std::collections::{HashMap, HashSet};

use id_arena::Arena;

use crate::convert::ConvertNode;
use crate::error::{Error, Result};
use crate::stamp::IntegerStamp;
use crate::width;

/// Read-only snapshot of use counts, fetched by the pass driver right
/// before a canonicalization call.
pub trait UseCounts {
    fn uses_of(&self, id: NodeId) -> u32;
}

/// Source of value-range information for graph values.
pub trait StampOracle {
    fn range_of(&self, id: NodeId) -> IntegerStamp;
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Arena<Node>,
    dedup: HashMap<Node, NodeId>,
    uses: HashMap<NodeId, u32>,
    users: HashMap<NodeId, Vec<NodeId>>,
    dead: HashSet<NodeId>,
    params: u32,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[must_use]
    pub fn bits_of(&self, id: NodeId) -> u32 {
        self.nodes[id].bits()
    }

    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        !self.dead.contains(&id)
    }

    /// Number of live nodes. Rewrites must never increase this.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.dead.len()
    }

    #[must_use]
    pub fn uses_of(&self, id: NodeId) -> u32 {
        self.uses.get(&id).copied().unwrap_or(0)
    }

    /// Insert a node, returning the id of an existing structurally
    /// identical live node when there is one.
    pub fn insert(&mut self, node: Node) -> NodeId {
        if let Some(&id) = self.dedup.get(&node) {
            return id;
        }
        let id = self.nodes.alloc(node.clone());
        self.dedup.insert(node, id);
        self.uses.entry(id).or_insert(0);
        let operands: Vec<NodeId> = self.nodes[id].operands().collect();
        for op in operands {
            self.add_use(op, id);
        }
        id
    }

    /// External input covering the full range of its width.
    pub fn param(&mut self, bits: u32) -> Result<NodeId> {
        width::check(bits)?;
        Ok(self.param_with_stamp(IntegerStamp::full(bits)))
    }

    /// External input with a stamp provided by earlier range analysis.
    pub fn param_with_stamp(&mut self, stamp: IntegerStamp) -> NodeId {
        let index = self.params;
        self.params += 1;
        self.insert(Node::Param { index, stamp })
    }

    pub fn constant(&mut self, bits: u32, value: i64) -> Result<NodeId> {
        width::check(bits)?;
        Ok(self.insert(Node::Constant {
            bits,
            value: width::narrow(value, bits),
        }))
    }

    pub fn and(&mut self, x: NodeId, y: NodeId) -> Result<NodeId> {
        let (bx, by) = (self.bits_of(x), self.bits_of(y));
        if bx != by {
            return Err(Error::MixedOperandWidths {
                left: bx,
                right: by,
            });
        }
        Ok(self.insert(Node::And { bits: bx, x, y }))
    }

    pub fn narrow(&mut self, value: NodeId, result_bits: u32) -> Result<NodeId> {
        let node = ConvertNode::narrow(value, self.bits_of(value), result_bits)?;
        Ok(self.insert(Node::Convert(node)))
    }

    pub fn sign_extend(&mut self, value: NodeId, result_bits: u32) -> Result<NodeId> {
        let node = ConvertNode::sign_extend(value, self.bits_of(value), result_bits)?;
        Ok(self.insert(Node::Convert(node)))
    }

    pub fn zero_extend(&mut self, value: NodeId, result_bits: u32) -> Result<NodeId> {
        self.zero_extend_with_hint(value, result_bits, false)
    }

    pub fn zero_extend_with_hint(
        &mut self,
        value: NodeId,
        result_bits: u32,
        input_always_positive: bool,
    ) -> Result<NodeId> {
        let node = ConvertNode::zero_extend(
            value,
            self.bits_of(value),
            result_bits,
            input_always_positive,
        )?;
        Ok(self.insert(Node::Convert(node)))
    }

    fn add_use(&mut self, op: NodeId, user: NodeId) {
        *self.uses.entry(op).or_insert(0) += 1;
        self.users.entry(op).or_default().push(user);
    }

    pub(crate) fn add_external_use(&mut self, id: NodeId) {
        *self.uses.entry(id).or_insert(0) += 1;
    }

    pub(crate) fn remove_external_use(&mut self, id: NodeId) {
        if let Some(count) = self.uses.get_mut(&id) {
            *count = count.saturating_sub(1);
        }
    }

    /// Distinct live users of `id`, in first-use order.
    pub(crate) fn users_of(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.users
            .get(&id)
            .map(|list| list.iter().copied().filter(|u| seen.insert(*u)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn live_convert_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(id, n)| self.is_live(*id) && matches!(n, Node::Convert(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// Move every edge `user -> old` over to `new`, re-validating the
    /// user's width invariant. Returns an existing node the rewired user
    /// has become structurally identical to, if any; merging the two is
    /// the caller's job.
    pub(crate) fn rewire(
        &mut self,
        user: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<Option<NodeId>> {
        let edges = self.nodes[user].operands().filter(|&op| op == old).count() as u32;
        if edges == 0 {
            return Ok(None);
        }
        // A conversion's input width must match whatever its operand now
        // denotes; same for an AND's common width.
        let found = self.bits_of(new);
        let expected = match &self.nodes[user] {
            Node::Convert(c) => c.input_bits,
            Node::And { bits, .. } => *bits,
            Node::Param { .. } | Node::Constant { .. } => found,
        };
        if expected != found {
            return Err(Error::OperandWidthMismatch {
                node: user,
                operand: new,
                expected,
                found,
            });
        }

        let stale_key = self.nodes[user].clone();
        self.dedup.remove(&stale_key);
        self.nodes[user].replace_operand(old, new);

        if let Some(count) = self.uses.get_mut(&old) {
            *count = count.saturating_sub(edges);
        }
        if let Some(list) = self.users.get_mut(&old) {
            let mut remaining = edges;
            list.retain(|u| {
                if *u == user && remaining > 0 {
                    remaining -= 1;
                    false
                } else {
                    true
                }
            });
        }
        for _ in 0..edges {
            self.add_use(new, user);
        }

        let key = self.nodes[user].clone();
        match self.dedup.get(&key) {
            Some(&existing) if existing != user => Ok(Some(existing)),
            Some(_) => Ok(None),
            None => {
                self.dedup.insert(key, user);
                Ok(None)
            }
        }
    }

    /// Discard `id` if nothing references it any more, cascading into
    /// operands whose last use this removes. Returns the surviving nodes
    /// that lost a use, so the worklist can revisit their users (a
    /// use-count drop can unblock a previously declined rewrite).
    pub(crate) fn prune_if_dead(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut survivors = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if !self.is_live(id) || self.uses_of(id) != 0 {
                continue;
            }
            self.dead.insert(id);
            let key = self.nodes[id].clone();
            self.dedup.remove(&key);
            self.users.remove(&id);
            let operands: Vec<NodeId> = self.nodes[id].operands().collect();
            for op in operands {
                if let Some(count) = self.uses.get_mut(&op) {
                    *count = count.saturating_sub(1);
                }
                if let Some(list) = self.users.get_mut(&op)
                    && let Some(pos) = list.iter().position(|u| *u == id)
                {
                    list.swap_remove(pos);
                }
                if self.uses_of(op) == 0 {
                    stack.push(op);
                } else {
                    survivors.push(op);
                }
            }
        }
        survivors.retain(|op| self.is_live(*op));
        survivors
    }
}

impl UseCounts for Graph {
    fn uses_of(&self, id: NodeId) -> u32 {
        Graph::uses_of(self, id)
    }
}

impl StampOracle for Graph {
    fn range_of(&self, id: NodeId) -> IntegerStamp {
        match &self.nodes[id] {
            Node::Param { stamp, .. } => *stamp,
            Node::Constant { bits, value } => IntegerStamp::constant(*value, *bits),
            Node::And { x, y, .. } => self.range_of(*x).and(self.range_of(*y)),
            Node::Convert(c) => {
                c.kind
                    .fold_stamp(c.input_bits, c.result_bits, self.range_of(c.operand))
            }
        }
    }
}
