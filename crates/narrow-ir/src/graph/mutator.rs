//! Worklist-driven application of canonicalization proposals.
//!
//! Single-writer discipline: every proposal is computed against an
//! immutable borrow of the graph, then validated and committed while the
//! mutator holds the only mutable reference. Rewiring marks affected
//! neighbors dirty again, so the loop runs each node to its fixed point.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{Graph, Node, NodeId};
use crate::convert::{Canonical, CanonTool, ConvertNode, CostModel, canonicalize};
use crate::error::{Error, Result};

pub struct Mutator {
    graph: Graph,
    cost: CostModel,
    queue: VecDeque<NodeId>,
    queued: HashSet<NodeId>,
    forwarded: HashMap<NodeId, NodeId>,
    pinned: HashSet<NodeId>,
}

impl Mutator {
    /// Take ownership of the graph and enqueue every live conversion node.
    #[must_use]
    pub fn new(graph: Graph) -> Self {
        Self::with_cost_model(graph, CostModel::default())
    }

    #[must_use]
    pub fn with_cost_model(graph: Graph, cost: CostModel) -> Self {
        let mut mutator = Self {
            graph,
            cost,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            forwarded: HashMap::new(),
            pinned: HashSet::new(),
        };
        for id in mutator.graph.live_convert_ids() {
            mutator.mark_dirty(id);
        }
        mutator
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Keep `id` alive across rewrites (an external root). Replacements
    /// transfer the pin; [`resolve`](Self::resolve) finds the current node.
    pub fn pin(&mut self, id: NodeId) {
        if self.pinned.insert(id) {
            self.graph.add_external_use(id);
        }
    }

    /// Follow the replacement trail from a possibly stale id.
    #[must_use]
    pub fn resolve(&self, id: NodeId) -> NodeId {
        let mut id = id;
        while let Some(&next) = self.forwarded.get(&id) {
            id = next;
        }
        id
    }

    pub fn mark_dirty(&mut self, id: NodeId) {
        if self.queued.insert(id) {
            self.queue.push_back(id);
        }
    }

    /// Drain the worklist. Returns the number of applied rewrites.
    pub fn run(&mut self) -> Result<usize> {
        let mut rewrites = 0;
        while let Some(id) = self.queue.pop_front() {
            self.queued.remove(&id);
            if !self.graph.is_live(id) {
                continue;
            }
            let proposal = canonicalize(&CanonTool::with_cost(&self.graph, self.cost), id);
            if self.commit(id, proposal)? {
                rewrites += 1;
            }
        }
        tracing::debug!(rewrites, "canonicalization reached a fixed point");
        Ok(rewrites)
    }

    /// Validate a proposal against the current graph state and apply it.
    fn commit(&mut self, id: NodeId, proposal: Canonical) -> Result<bool> {
        match proposal {
            Canonical::Unchanged => Ok(false),
            Canonical::Existing(value) => {
                let value = self.resolve(value);
                if value == id {
                    return Ok(false);
                }
                self.replace(id, value)?;
                Ok(true)
            }
            Canonical::Constant { bits, value } => {
                let constant = self.graph.constant(bits, value)?;
                self.replace(id, constant)?;
                Ok(true)
            }
            Canonical::Convert(spec) => {
                let node = ConvertNode::new(
                    spec.kind,
                    spec.operand,
                    spec.input_bits,
                    spec.result_bits,
                    spec.input_always_positive,
                )?;
                let found = self.graph.bits_of(node.operand);
                if found != node.input_bits {
                    return Err(Error::OperandWidthMismatch {
                        node: id,
                        operand: node.operand,
                        expected: node.input_bits,
                        found,
                    });
                }
                let new = self.graph.insert(Node::Convert(node));
                if new == id {
                    return Ok(false);
                }
                self.mark_dirty(new);
                self.replace(id, new)?;
                Ok(true)
            }
        }
    }

    /// Rewire every use of `old` to `new`, merge users that become
    /// duplicates of existing nodes, and discard whatever goes dead.
    fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        let mut pending = vec![(old, new)];
        while let Some((old, new)) = pending.pop() {
            let old = self.resolve(old);
            let new = self.resolve(new);
            if old == new || !self.graph.is_live(old) {
                continue;
            }
            for user in self.graph.users_of(old) {
                if !self.graph.is_live(user) {
                    continue;
                }
                if let Some(duplicate) = self.graph.rewire(user, old, new)? {
                    pending.push((user, duplicate));
                }
                self.mark_dirty(user);
            }
            self.forwarded.insert(old, new);
            if self.pinned.remove(&old) {
                self.graph.remove_external_use(old);
                self.pin(new);
            }
            self.mark_dirty(new);
            for survivor in self.graph.prune_if_dead(old) {
                for user in self.graph.users_of(survivor) {
                    self.mark_dirty(user);
                }
            }
        }
        Ok(())
    }
}
