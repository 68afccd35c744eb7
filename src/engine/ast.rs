// src/engine/ast.rs
use std::fmt;

use super::source::{SourceLocation, Span, Spanned};

/// Node type id from the parser's vocabulary. Every node named `kind` maps to
/// the same id, so ids can key dispatch tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKind(pub u16);

impl NodeKind {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A field child. `node` is set when the child is itself an AST node;
/// anonymous children (operators, keywords) only keep their kind and span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: &'static str,
    pub span: Span,
    pub node: Option<NodeId>,
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    name: &'static str,
    span: Span,
    loc: SourceLocation,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    fields: Vec<Field>,
}

/// Read-only syntax tree, built once per parse. Parents are indices into the
/// arena, so they never keep anything alive.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    nodes: Vec<NodeData>,
}

impl Ast {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node; children must be pushed in source order after their parent.
    pub fn push(
        &mut self,
        kind: NodeKind,
        name: &'static str,
        span: Span,
        loc: SourceLocation,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(NodeData {
            kind,
            name,
            span,
            loc,
            parent,
            children: Vec::new(),
            fields: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p.index()].children.push(id);
        }
        id
    }

    pub fn add_field(&mut self, node: NodeId, field: Field) {
        self.nodes[node.index()].fields.push(field);
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// # Panics
    /// On an empty tree.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        assert!(!self.nodes.is_empty(), "empty syntax tree");
        self.get(NodeId(0))
    }

    #[must_use]
    pub const fn get(&self, id: NodeId) -> Node<'_> {
        Node { ast: self, id }
    }

    /// Innermost node whose span contains `offset`.
    #[must_use]
    pub fn node_by_range_index(&self, offset: usize) -> Option<Node<'_>> {
        let mut cur = self.nodes.first().map(|_| self.root())?;
        if !cur.span().contains(offset) {
            return None;
        }
        loop {
            let children = &self.nodes[cur.id.index()].children;
            let i = children.partition_point(|c| self.nodes[c.index()].span.end <= offset);
            match children.get(i) {
                Some(&c) if self.nodes[c.index()].span.contains(offset) => cur = self.get(c),
                _ => return Some(cur),
            }
        }
    }

    /// Pre-order walk producing enter and exit events.
    pub fn walk(&self) -> impl Iterator<Item = WalkEvent<'_>> + '_ {
        let mut stack: Vec<(NodeId, bool)> = Vec::new();
        if !self.nodes.is_empty() {
            stack.push((NodeId(0), false));
        }
        std::iter::from_fn(move || {
            let (id, exiting) = stack.pop()?;
            if exiting {
                return Some(WalkEvent::Exit(self.get(id)));
            }
            stack.push((id, true));
            stack.extend(self.nodes[id.index()].children.iter().rev().map(|&c| (c, false)));
            Some(WalkEvent::Enter(self.get(id)))
        })
    }

    /// Every node of the given kind, in source order.
    pub fn descendants_of_kind<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Node<'a>> + 'a {
        self.walk().filter_map(move |ev| match ev {
            WalkEvent::Enter(n) if n.kind_name() == name => Some(n),
            _ => None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEvent<'a> {
    Enter(Node<'a>),
    Exit(Node<'a>),
}

/// Borrowed handle to one node of an [`Ast`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    ast: &'a Ast,
    id: NodeId,
}

impl<'a> Node<'a> {
    fn data(&self) -> &'a NodeData {
        &self.ast.nodes[self.id.index()]
    }

    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.data().name
    }

    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.data().name == name
    }

    #[must_use]
    pub fn loc(&self) -> SourceLocation {
        self.data().loc
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.data().parent.map(|p| self.ast.get(p))
    }

    pub fn ancestors(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        std::iter::successors(self.parent(), Node::parent)
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = Node<'a>> + DoubleEndedIterator + 'a {
        let ast = self.ast;
        self.data().children.iter().map(move |&c| ast.get(c))
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    #[must_use]
    pub fn fields(&self) -> &'a [Field] {
        &self.data().fields
    }

    #[must_use]
    pub fn field_info(&self, name: &str) -> Option<&'a Field> {
        self.data().fields.iter().find(|f| f.name == name)
    }

    /// The AST node stored under field `name`, if the field holds one.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Self> {
        self.field_info(name)
            .and_then(|f| f.node)
            .map(|id| self.ast.get(id))
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field_info(name).is_some()
    }

    #[must_use]
    pub fn is_on_single_line(&self) -> bool {
        let loc = self.loc();
        loc.start.line == loc.end.line
    }
}

impl Spanned for Node<'_> {
    fn span(&self) -> Span {
        self.data().span
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ast, other.ast) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = self.span();
        write!(f, "{}@{}..{}", self.kind_name(), span.start, span.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::source::SourceBuffer;

    // program > [call(0..5) > ident(0..1), args(1..5)], ident(7..8)
    fn tree() -> Ast {
        let buf = SourceBuffer::new("f(ab);\nx");
        let loc = |s, e| buf.location_of(Span::new(s, e)).unwrap();
        let mut ast = Ast::new();
        let root = ast.push(NodeKind(1), "program", Span::new(0, 8), loc(0, 8), None);
        let call = ast.push(NodeKind(2), "call", Span::new(0, 5), loc(0, 5), Some(root));
        let callee = ast.push(NodeKind(3), "identifier", Span::new(0, 1), loc(0, 1), Some(call));
        ast.add_field(call, Field {
            name: "function",
            kind: "identifier",
            span: Span::new(0, 1),
            node: Some(callee),
        });
        ast.push(NodeKind(4), "arguments", Span::new(1, 5), loc(1, 5), Some(call));
        ast.push(NodeKind(3), "identifier", Span::new(7, 8), loc(7, 8), Some(root));
        ast
    }

    #[test]
    fn innermost_node_wins() {
        let ast = tree();
        assert_eq!(ast.node_by_range_index(0).unwrap().kind_name(), "identifier");
        assert_eq!(ast.node_by_range_index(3).unwrap().kind_name(), "arguments");
        assert_eq!(ast.node_by_range_index(5).unwrap().kind_name(), "program");
        assert!(ast.node_by_range_index(8).is_none());
    }

    #[test]
    fn walk_is_pre_order_with_exits() {
        let ast = tree();
        let trace: Vec<String> = ast
            .walk()
            .map(|ev| match ev {
                WalkEvent::Enter(n) => format!("+{}", n.kind_name()),
                WalkEvent::Exit(n) => format!("-{}", n.kind_name()),
            })
            .collect();
        assert_eq!(
            trace,
            [
                "+program", "+call", "+identifier", "-identifier", "+arguments", "-arguments",
                "-call", "+identifier", "-identifier", "-program"
            ]
        );
    }

    #[test]
    fn fields_and_parents() {
        let ast = tree();
        let call = ast.descendants_of_kind("call").next().unwrap();
        assert_eq!(call.field("function").unwrap().span(), Span::new(0, 1));
        assert!(!call.has_field("arguments"));
        let args = call.children().last().unwrap();
        assert_eq!(args.parent(), Some(call));
        assert_eq!(args.ancestors().count(), 2);
    }
}
