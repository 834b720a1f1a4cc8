//! The mutable syntax tree.
//!
//! Nodes live in an arena owned by [`Ast`] and are addressed through copyable
//! [`NodeId`] handles, so broadcasters, queues and subscribers can hold on to
//! units without borrowing the tree. Every node carries:
//!
//! - its [`Syntax`] payload,
//! - a broadcast [`Status`],
//! - an optional source position (absent for dynamically created nodes),
//! - an optional parent, set once the node is attached,
//! - an ordered child collection,
//! - for refinable kinds, the raw text waiting to be refined.
//!
//! Structural operations that are relative to an anchor (insert before/after,
//! move, replace) require the anchor to be attached. Destroyed nodes stay in
//! the arena but are detached and permanently marked [`Status::NeverEmit`].

pub mod syntax;

use std::fmt;
use std::ops::Index;

pub use syntax::{
    AtRule, AttributeMatch, AttributeOperator, Capabilities, CombinatorKind, Declaration, Kind,
    Numeric, OperatorKind, Raw, Syntax,
};

use crate::error::TreeError;
use crate::status::{Phase, Status};

/// Line and column (both 1-based) of a unit in its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Handle to a node inside an [`Ast`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    syntax: Syntax,
    status: Status,
    position: Option<SourcePosition>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    raw: Option<Raw>,
    refined: bool,
}

impl Node {
    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn syntax_mut(&mut self) -> &mut Syntax {
        &mut self.syntax
    }

    pub fn kind(&self) -> Kind {
        self.syntax.kind()
    }

    pub fn name(&self) -> Option<&str> {
        self.syntax.name()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn position(&self) -> Option<SourcePosition> {
        self.position
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Raw text of a refinable node that has not been refined yet.
    pub fn raw(&self) -> Option<&Raw> {
        self.raw.as_ref()
    }

    /// True when the node was built directly from structured children or
    /// refinement has already run.
    pub fn is_refined(&self) -> bool {
        self.refined
    }

    pub fn is_destroyed(&self) -> bool {
        self.status == Status::NeverEmit
    }

    /// Whether dispatch of `phase` should stop for this unit before the next
    /// subscription runs.
    pub fn breaks_broadcast(&self, phase: Phase) -> bool {
        self.is_destroyed() || (phase == Phase::Refine && self.refined)
    }
}

/// Arena-backed syntax tree.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Creates a node that needs no refinement, e.g. a parsed selector part or
    /// a node built by subscriber code.
    pub fn create(&mut self, syntax: Syntax, position: Option<SourcePosition>) -> NodeId {
        self.push(Node {
            syntax,
            status: Status::Unbroadcasted,
            position,
            parent: None,
            children: Vec::new(),
            raw: None,
            refined: true,
        })
    }

    /// Creates a refinable node whose content stays unparsed until refined.
    ///
    /// At-rules keep their raw expression and block inside their [`AtRule`]
    /// payload and pass `None` here.
    pub fn create_lazy(
        &mut self,
        syntax: Syntax,
        raw: Option<Raw>,
        position: Option<SourcePosition>,
    ) -> NodeId {
        let refined = !syntax.kind().is_refinable();
        self.push(Node {
            syntax,
            status: Status::Unbroadcasted,
            position,
            parent: None,
            children: Vec::new(),
            raw,
            refined,
        })
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> Kind {
        self.node(id).kind()
    }

    pub fn syntax(&self, id: NodeId) -> &Syntax {
        self.node(id).syntax()
    }

    pub fn status(&self, id: NodeId) -> Status {
        self.node(id).status
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.node(id).parent.is_some()
    }

    pub fn is_refined(&self, id: NodeId) -> bool {
        self.node(id).refined
    }

    /// Children of `id` with the given kind, in order.
    pub fn children_of_kind(&self, id: NodeId, kind: Kind) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.kind(*child) == kind)
            .collect()
    }

    pub fn selectors(&self, rule: NodeId) -> Vec<NodeId> {
        self.children_of_kind(rule, Kind::Selector)
    }

    pub fn declarations(&self, block: NodeId) -> Vec<NodeId> {
        self.children_of_kind(block, Kind::Declaration)
    }

    /// The node and every descendant, pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Moves the status of `id` forward; never regresses.
    pub(crate) fn advance(&mut self, id: NodeId, status: Status) {
        let node = self.node_mut(id);
        node.status = node.status.advance(status);
    }

    pub(crate) fn mark_refined(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.refined = true;
        node.raw = None;
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_insertable(parent, child)?;
        self.link(parent, child, None);
        Ok(())
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_insertable(parent, child)?;
        self.link(parent, child, Some(0));
        Ok(())
    }

    pub fn insert_before(&mut self, anchor: NodeId, unit: NodeId) -> Result<(), TreeError> {
        let (parent, index) = self.anchor(anchor)?;
        self.check_insertable(parent, unit)?;
        self.link(parent, unit, Some(index));
        Ok(())
    }

    pub fn insert_after(&mut self, anchor: NodeId, unit: NodeId) -> Result<(), TreeError> {
        let (parent, index) = self.anchor(anchor)?;
        self.check_insertable(parent, unit)?;
        self.link(parent, unit, Some(index + 1));
        Ok(())
    }

    /// Moves an attached unit so it sits right before `anchor`.
    pub fn move_before(&mut self, unit: NodeId, anchor: NodeId) -> Result<(), TreeError> {
        self.anchor(unit)?;
        self.anchor(anchor)?;
        if unit == anchor {
            return Ok(());
        }
        self.detach(unit)?;
        self.insert_before(anchor, unit)
    }

    /// Moves an attached unit so it sits right after `anchor`.
    pub fn move_after(&mut self, unit: NodeId, anchor: NodeId) -> Result<(), TreeError> {
        self.anchor(unit)?;
        self.anchor(anchor)?;
        if unit == anchor {
            return Ok(());
        }
        self.detach(unit)?;
        self.insert_after(anchor, unit)
    }

    /// Puts `replacement` where `existing` is and detaches `existing`.
    pub fn replace(&mut self, existing: NodeId, replacement: NodeId) -> Result<(), TreeError> {
        let (parent, index) = self.anchor(existing)?;
        self.check_insertable(parent, replacement)?;
        self.detach(existing)?;
        self.link(parent, replacement, Some(index));
        Ok(())
    }

    pub fn detach(&mut self, unit: NodeId) -> Result<(), TreeError> {
        let (parent, index) = self.anchor(unit)?;
        self.node_mut(parent).children.remove(index);
        self.node_mut(unit).parent = None;
        Ok(())
    }

    /// Detaches the unit and excludes it and its sub-tree from any future
    /// dispatch. Destroying twice is harmless.
    pub fn destroy(&mut self, unit: NodeId) {
        if !self.contains(unit) {
            return;
        }
        if self.is_attached(unit) {
            let _ = self.detach(unit);
        }
        for id in self.descendants(unit) {
            self.node_mut(id).status = Status::NeverEmit;
        }
    }

    /// Deep copy of `unit`. Copies are detached, unbroadcasted and carry no
    /// source position.
    pub fn copy(&mut self, unit: NodeId) -> NodeId {
        let source = self.node(unit);
        let syntax = source.syntax.clone();
        let raw = source.raw.clone();
        let refined = source.refined;
        let children = source.children.clone();

        let copy = self.push(Node {
            syntax,
            status: Status::Unbroadcasted,
            position: None,
            parent: None,
            children: Vec::new(),
            raw,
            refined,
        });
        for child in children {
            let child_copy = self.copy(child);
            self.link(copy, child_copy, None);
        }
        copy
    }

    fn anchor(&self, unit: NodeId) -> Result<(NodeId, usize), TreeError> {
        if !self.contains(unit) {
            return Err(TreeError::Missing(unit));
        }
        let parent = self.parent(unit).ok_or(TreeError::Detached(unit))?;
        let index = self
            .children(parent)
            .iter()
            .position(|child| *child == unit)
            .ok_or(TreeError::Detached(unit))?;
        Ok((parent, index))
    }

    fn check_insertable(&self, parent: NodeId, unit: NodeId) -> Result<(), TreeError> {
        for id in [parent, unit] {
            if !self.contains(id) {
                return Err(TreeError::Missing(id));
            }
            if self.node(id).is_destroyed() {
                return Err(TreeError::Destroyed(id));
            }
        }
        if self.is_attached(unit) {
            return Err(TreeError::AlreadyAttached(unit));
        }
        if parent == unit || self.ancestors(parent).contains(&unit) {
            return Err(TreeError::Cycle(unit));
        }
        Ok(())
    }

    fn link(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        let children = &mut self.node_mut(parent).children;
        match index {
            Some(index) if index < children.len() => children.insert(index, child),
            _ => children.push(child),
        }
        self.node_mut(child).parent = Some(parent);
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.node(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(ast: &mut Ast, name: &str) -> NodeId {
        ast.create(
            Syntax::ClassSelector {
                name: name.to_string(),
            },
            None,
        )
    }

    #[test]
    fn append_and_navigate() {
        let mut ast = Ast::new();
        let selector = ast.create(Syntax::Selector, None);
        let a = class(&mut ast, "a");
        let b = class(&mut ast, "b");
        ast.append(selector, a).unwrap();
        ast.append(selector, b).unwrap();

        assert_eq!(ast.children(selector), &[a, b]);
        assert_eq!(ast.next_sibling(a), Some(b));
        assert_eq!(ast.previous_sibling(b), Some(a));
        assert_eq!(ast.previous_sibling(a), None);
    }

    #[test]
    fn insert_relative_to_detached_anchor_fails() {
        let mut ast = Ast::new();
        let a = class(&mut ast, "a");
        let b = class(&mut ast, "b");
        assert_eq!(ast.insert_before(a, b), Err(TreeError::Detached(a)));
        assert_eq!(ast.move_after(b, a), Err(TreeError::Detached(b)));
    }

    #[test]
    fn attaching_twice_fails() {
        let mut ast = Ast::new();
        let selector = ast.create(Syntax::Selector, None);
        let a = class(&mut ast, "a");
        ast.append(selector, a).unwrap();
        assert_eq!(ast.append(selector, a), Err(TreeError::AlreadyAttached(a)));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut ast = Ast::new();
        let outer = ast.create(Syntax::Rule, None);
        let inner = ast.create(Syntax::Selector, None);
        ast.append(outer, inner).unwrap();
        assert_eq!(ast.append(inner, outer), Err(TreeError::Cycle(outer)));
    }

    #[test]
    fn move_and_replace_keep_order() {
        let mut ast = Ast::new();
        let selector = ast.create(Syntax::Selector, None);
        let a = class(&mut ast, "a");
        let b = class(&mut ast, "b");
        let c = class(&mut ast, "c");
        for id in [a, b, c] {
            ast.append(selector, id).unwrap();
        }

        ast.move_before(c, a).unwrap();
        assert_eq!(ast.children(selector), &[c, a, b]);

        let d = class(&mut ast, "d");
        ast.replace(a, d).unwrap();
        assert_eq!(ast.children(selector), &[c, d, b]);
        assert!(!ast.is_attached(a));
    }

    #[test]
    fn destroy_marks_subtree_and_detaches() {
        let mut ast = Ast::new();
        let rule = ast.create(Syntax::Rule, None);
        let selector = ast.create(Syntax::Selector, None);
        let a = class(&mut ast, "a");
        ast.append(rule, selector).unwrap();
        ast.append(selector, a).unwrap();

        ast.destroy(selector);
        assert!(ast.children(rule).is_empty());
        assert_eq!(ast.status(selector), Status::NeverEmit);
        assert_eq!(ast.status(a), Status::NeverEmit);
        assert_eq!(ast.append(rule, selector), Err(TreeError::Destroyed(selector)));
    }

    #[test]
    fn copy_is_deep_and_fresh() {
        let mut ast = Ast::new();
        let selector = ast.create(Syntax::Selector, Some(SourcePosition::new(1, 1)));
        let a = class(&mut ast, "a");
        ast.append(selector, a).unwrap();
        ast.advance(selector, Status::Processed);

        let copy = ast.copy(selector);
        assert_ne!(copy, selector);
        assert_eq!(ast.status(copy), Status::Unbroadcasted);
        assert_eq!(ast.node(copy).position(), None);
        assert_eq!(ast.children(copy).len(), 1);
        assert_ne!(ast.children(copy)[0], a);
        assert_eq!(ast.syntax(ast.children(copy)[0]), ast.syntax(a));
    }

    #[test]
    fn lazy_nodes_start_unrefined() {
        let mut ast = Ast::new();
        let selector = ast.create_lazy(Syntax::Selector, Some(Raw::new(".a", None)), None);
        assert!(!ast.is_refined(selector));
        assert!(!ast.node(selector).breaks_broadcast(Phase::Process));

        let rule = ast.create_lazy(Syntax::Rule, None, None);
        assert!(ast.is_refined(rule));
    }
}
