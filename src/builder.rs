//! The merge engine: the stateful assembler itself.
//!
//! `Eab` ("expression AST builder") is the single type a driver talks to.
//! It owns a [`NodePool`], the `root`/`active` handles for the in-flight
//! expression, and the save stack for nested groupings. Every public
//! method corresponds to one driver-facing operation from the crate docs;
//! none of them parse or validate -- a malformed call sequence produces an
//! unspecified tree, never a reported error (the one error this builder
//! knows about is running out of memory).

use smallvec::SmallVec;
use tracing::trace;

use crate::error::{EabError, Result};
use crate::line::LineSource;
use crate::node::{GroupKind, Node, NodeId, NodeKind};
use crate::pool::NodePool;
use crate::precedence::{priority_for_binary_op, priority_for_unary_op, BinaryOp, UnaryOp};
use crate::symbols::{LiteralId, SymbolId, TypeId};

/// Pre-allocation sizing for a new [`Eab`]. Both fields have sane
/// defaults; embedders that know their typical expression size up front
/// can avoid the first few growth events.
#[derive(Debug, Clone, Copy)]
pub struct EabConfig {
    pub initial_pool_size: usize,
    pub initial_save_stack_size: usize,
}

impl Default for EabConfig {
    fn default() -> Self {
        EabConfig {
            initial_pool_size: 16,
            initial_save_stack_size: 8,
        }
    }
}

/// One (saved-root, enter-node) pair, pushed on `enter_tree` and popped on
/// `leave_tree`.
type SaveFrame = (NodeId, NodeId);

/// Grouping nesting rarely runs more than a few levels deep, so the save
/// stack lives inline up to this depth before it spills to the heap.
const INLINE_SAVE_DEPTH: usize = 8;

/// The expression AST builder.
///
/// Construct one per parser instance, drive it with the `push_*`/
/// `enter_tree`/`collect_arg`/`leave_tree` operations for one expression,
/// read [`Eab::root`] when the driver knows the expression is complete,
/// then call [`Eab::reset`] before starting the next one. Not `Send` (it
/// is meant to live on the parser's single thread); see the crate docs'
/// concurrency section.
pub struct Eab {
    pool: NodePool,
    root: NodeId,
    active: NodeId,
    save_stack: SmallVec<[SaveFrame; INLINE_SAVE_DEPTH]>,
    line_source: Box<dyn LineSource>,
}

impl Eab {
    pub fn new(config: EabConfig, line_source: impl LineSource + 'static) -> Self {
        let mut save_stack = SmallVec::new();
        save_stack.reserve(config.initial_save_stack_size);
        Eab {
            pool: NodePool::with_capacity(config.initial_pool_size),
            root: NodeId::NONE,
            active: NodeId::NONE,
            save_stack,
            line_source: Box::new(line_source),
        }
    }

    /// The topmost node of the expression currently being built (or just
    /// finished). `NodeId::NONE` before the first value of an expression
    /// has been pushed.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node the next value/operator merge will be applied to.
    pub fn active(&self) -> NodeId {
        self.active
    }

    /// How many grouping trees (call/list/subscript/parenth) are
    /// currently open. Zero between expressions and at a well-formed
    /// expression's end.
    pub fn save_depth(&self) -> usize {
        self.save_stack.len()
    }

    /// Look up a node by id, for the emitter to walk once the expression
    /// is complete.
    pub fn node(&self, id: NodeId) -> &Node {
        self.pool.get(id)
    }

    fn cur_line(&self) -> u32 {
        self.line_source.current_line()
    }

    // ---- builder operations -------------------------------------------------

    pub fn push_local_var(&mut self, sym: SymbolId) -> Result<()> {
        let line = self.cur_line();
        let n = self.pool.acquire(NodeKind::LocalVar(sym), line)?;
        self.merge_value(n);
        Ok(())
    }

    pub fn push_sym(&mut self, sym: SymbolId) -> Result<()> {
        let line = self.cur_line();
        let n = self.pool.acquire(NodeKind::Var(sym), line)?;
        self.merge_value(n);
        Ok(())
    }

    pub fn push_literal(&mut self, lit: LiteralId) -> Result<()> {
        let line = self.cur_line();
        let n = self.pool.acquire(NodeKind::Literal(lit), line)?;
        self.merge_value(n);
        Ok(())
    }

    pub fn push_sig(&mut self, target_type: TypeId) -> Result<()> {
        let line = self.cur_line();
        let n = self.pool.acquire(NodeKind::Typecast(target_type), line)?;
        self.merge_value(n);
        Ok(())
    }

    pub fn push_empty_list(&mut self, elem_type: TypeId) -> Result<()> {
        let line = self.cur_line();
        let n = self.pool.acquire(NodeKind::List(Some(elem_type)), line)?;
        self.merge_value(n);
        Ok(())
    }

    /// Merge a unary operator. Special-cased against the four leaf-like
    /// active kinds (they're overwritten directly, becoming the operator's
    /// operand); every other active kind falls through to `merge_unary`,
    /// which handles operating over an already-composite value (a list, a
    /// parenthesized expression, a subscript, or a typecast) and chaining
    /// consecutive unary operators. See the crate docs' resolved open
    /// question on this split.
    pub fn push_unary_op(&mut self, op: UnaryOp) -> Result<()> {
        let line = self.cur_line();
        let n = self.pool.acquire(NodeKind::Unary(op), line)?;
        self.pool.get_mut(n).priority = priority_for_unary_op(op);

        if self.active.is_none() {
            self.active = n;
            self.root = n;
            return Ok(());
        }

        let active = self.active;
        let short_circuits = matches!(
            self.pool.get(active).kind,
            NodeKind::Var(_) | NodeKind::LocalVar(_) | NodeKind::Call(_) | NodeKind::Literal(_)
        );
        if short_circuits {
            self.pool.get_mut(active).parent = n;
            self.active = n;
            self.root = n;
        } else {
            self.merge_unary(active, n);
        }
        Ok(())
    }

    pub fn push_binary_op(&mut self, op: BinaryOp) -> Result<()> {
        let line = self.cur_line();
        let n = self.pool.acquire(NodeKind::Binary(op), line)?;
        let new_prio = priority_for_binary_op(op);
        self.pool.get_mut(n).priority = new_prio;

        // Always non-empty by contract: push_binary_op follows a value-ish
        // node, which may physically still be a Typecast or Unary node
        // that absorbed its operand without itself being replaced as
        // `active` (see `-a + b` in the crate docs).
        let active = self.active;
        if !self.pool.get(active).kind.is_binary() {
            self.pool.get_mut(n).left = active;
            if self.root == active {
                self.root = n;
            }
            self.active = n;
            return Ok(());
        }

        let cur_prio = self.pool.get(active).priority;
        if new_prio > cur_prio || new_prio == 0 {
            // Tighter-binding, or right-associative assignment: steal the
            // rhs and still need a right of our own.
            let active_right = self.pool.get(active).right;
            self.pool.get_mut(n).left = active_right;
            self.pool.get_mut(active).right = n;
            self.pool.get_mut(n).parent = active;
            self.active = n;
            return Ok(());
        }

        // Climb until we find a strictly-lower-priority ancestor (or run
        // out of ancestors), then splice in above what we found.
        let mut t = active;
        loop {
            let t_parent = self.pool.get(t).parent;
            if t_parent.is_none() {
                break;
            }
            if new_prio > self.pool.get(t_parent).priority {
                break;
            }
            t = t_parent;
        }

        let t_parent = self.pool.get(t).parent;
        if t_parent.is_some() {
            if self.pool.get(t_parent).left == t {
                self.pool.get_mut(t_parent).left = n;
            } else {
                self.pool.get_mut(t_parent).right = n;
            }
            self.pool.get_mut(n).parent = t_parent;
        } else {
            self.root = n;
        }
        self.pool.get_mut(n).left = t;
        self.pool.get_mut(t).parent = n;
        self.active = n;
        Ok(())
    }

    pub fn enter_tree(&mut self, kind: GroupKind, sym: Option<SymbolId>) -> Result<()> {
        let line = self.cur_line();
        let node_kind = match kind {
            GroupKind::Call => NodeKind::Call(sym),
            GroupKind::List => NodeKind::List(None),
            GroupKind::Subscript => NodeKind::Subscript,
            GroupKind::Parenth => NodeKind::Parenth,
        };
        let n = self.pool.acquire(node_kind, line)?;
        self.merge_value(n);

        // Record the active node at the moment of attachment. This may be
        // `n` itself (it just became root and active) -- corrected in
        // `leave_tree` once we know better.
        self.pool.get_mut(n).parent = self.active;

        if self.save_stack.len() == self.save_stack.capacity() {
            self.save_stack
                .try_reserve(1)
                .map_err(|_| EabError::OutOfMemory)?;
        }
        self.save_stack.push((self.root, n));
        trace!(depth = self.save_stack.len(), "entered grouping tree");

        self.root = NodeId::NONE;
        self.active = NodeId::NONE;
        Ok(())
    }

    pub fn collect_arg(&mut self) {
        let (_, g) = *self
            .save_stack
            .last()
            .expect("collect_arg called outside a grouping");
        self.push_tree_arg(g, self.root);
        self.root = NodeId::NONE;
        self.active = NodeId::NONE;
    }

    pub fn leave_tree(&mut self) {
        let (saved_root, g) = self
            .save_stack
            .pop()
            .expect("leave_tree called without a matching enter_tree");
        self.push_tree_arg(g, self.root);

        self.root = saved_root;
        let g_parent = self.pool.get(g).parent;
        self.active = g_parent;
        if g_parent == g {
            self.pool.get_mut(g).parent = NodeId::NONE;
        }
        trace!(depth = self.save_stack.len(), "left grouping tree");
    }

    /// The kind of the grouping currently collecting arguments, so the
    /// driver can demand the matching closing token.
    pub fn caller_tree_type(&self) -> Option<GroupKind> {
        let (_, g) = *self.save_stack.last()?;
        Some(match self.pool.get(g).kind {
            NodeKind::Call(_) => GroupKind::Call,
            NodeKind::List(_) => GroupKind::List,
            NodeKind::Subscript => GroupKind::Subscript,
            NodeKind::Parenth => GroupKind::Parenth,
            ref other => unreachable!("save stack held a non-grouping kind: {other:?}"),
        })
    }

    /// Recycle every node for the next expression. Never allocates.
    pub fn reset(&mut self) {
        self.pool.reset();
        self.root = NodeId::NONE;
        self.active = NodeId::NONE;
        self.save_stack.clear();
    }

    // ---- merge protocols -----------------------------------------------------

    /// Append `tree` (typically `root`) as an argument of `call`. Shared by
    /// `collect_arg` and `leave_tree`.
    fn push_tree_arg(&mut self, call: NodeId, tree: NodeId) {
        if self.pool.get(call).arg_start.is_none() {
            self.pool.get_mut(call).arg_start = tree;
            self.pool.get_mut(call).arg_top = tree;
        } else {
            let top = self.pool.get(call).arg_top;
            self.pool.get_mut(top).next_arg = tree;
            self.pool.get_mut(call).arg_top = tree;
        }
        // Calls with zero args leave `tree` empty; nothing further to link.
        if tree.is_some() {
            self.pool.get_mut(tree).parent = call;
            self.pool.get_mut(tree).next_arg = NodeId::NONE;
            self.pool.get_mut(call).args_collected += 1;
        }
    }

    /// Merge a value-ish node (leaf, grouping, List, or Typecast-as-value)
    /// into the tree against the current `active`.
    fn merge_value(&mut self, new_id: NodeId) {
        let active = self.active;
        if active.is_none() {
            if self.root.is_none() {
                self.root = new_id;
            }
            self.active = new_id;
            return;
        }

        let active_kind = self.pool.get(active).kind;
        if active_kind.is_unary() {
            self.merge_unary(active, new_id);
            return;
        }
        if active_kind.has_right_slot() {
            let right = self.pool.get(active).right;
            if right.is_none() {
                self.pool.get_mut(active).right = new_id;
                self.pool.get_mut(new_id).parent = active;
            } else if self.pool.get(right).kind.is_unary() {
                self.merge_unary(active, new_id);
            } else {
                self.merge_absorb(active, new_id);
            }
            return;
        }
        self.merge_absorb(active, new_id);
    }

    /// Merge against an active unary chain. `start` is either the unary
    /// node itself, or a Typecast/Binary whose `right` already holds the
    /// pending unary chain (the original dispatch convention: the caller
    /// doesn't have to know which, `merge_unary` figures it out).
    fn merge_unary(&mut self, start: NodeId, new_id: NodeId) {
        let mut a = start;

        if self.pool.get(a).kind.has_right_slot() && self.pool.get(a).right.is_none() {
            self.pool.get_mut(a).right = new_id;
            self.pool.get_mut(new_id).parent = a;
            return;
        }

        if self.pool.get(a).kind.has_right_slot() {
            a = self.pool.get(a).right;
        }
        loop {
            if !self.pool.get(a).kind.is_unary() {
                break;
            }
            let left = self.pool.get(a).left;
            if left.is_none() || !self.pool.get(left).kind.is_unary() {
                break;
            }
            a = left;
        }

        let left = self.pool.get(a).left;
        if left.is_none() {
            self.pool.get_mut(a).left = new_id;
        } else if self.pool.get(new_id).kind.is_subscript() {
            self.merge_absorb(left, new_id);
            self.pool.get_mut(a).left = new_id;
        }
        self.pool.get_mut(new_id).parent = a;
    }

    /// Rewrite `X.f(...)`/`X[...]` by making the prior value `active` the
    /// first argument of the just-created grouping node `new_id`.
    fn merge_absorb(&mut self, active: NodeId, new_id: NodeId) {
        let target = if self.pool.get(active).kind.is_value_ish() {
            if self.root == active {
                self.root = new_id;
            }
            self.active = new_id;
            active
        } else {
            let target = self.pool.get(active).right;
            self.pool.get_mut(active).right = new_id;
            target
        };

        let n = self.pool.get_mut(new_id);
        n.arg_start = target;
        n.arg_top = target;
        n.args_collected = 1;
        n.next_arg = NodeId::NONE;
    }
}
