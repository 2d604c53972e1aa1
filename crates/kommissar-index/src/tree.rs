//! The classification tree and its recursive insertion algorithm.
//!
//! Nodes live in an arena owned by [`ClassificationTree`] and refer to each
//! other by [`NodeId`]. Children are held in insertion order; the parent
//! link is a plain index used only for upward queries.

use kommissar_types::Event;

use crate::error::IndexError;
use crate::level::ClassificationLevel;

/// Index of a node inside a [`ClassificationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node, present in every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Returns the arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node {}", self.0)
    }
}

/// A node in the classification tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    level: ClassificationLevel,
    label: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    fn new(level: ClassificationLevel, parent: Option<NodeId>) -> Self {
        Self {
            label: level.label(),
            level,
            parent,
            children: Vec::new(),
        }
    }

    /// The display label derived from the node's level.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The classification level attached to this node.
    pub fn level(&self) -> &ClassificationLevel {
        &self.level
    }

    /// The parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in first-seen order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Outcome of a successful [`ClassificationTree::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingested {
    /// The `ResourceVersion` leaf now holding the event.
    pub leaf: NodeId,
    /// Number of nodes created by this call; zero for a repeated observation.
    pub created: usize,
}

/// The owner of all tree nodes. All mutation goes through [`ingest`](Self::ingest).
#[derive(Debug, Clone)]
pub struct ClassificationTree {
    nodes: Vec<TreeNode>,
}

impl Default for ClassificationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationTree {
    /// Creates a tree holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode::new(ClassificationLevel::Root, None)],
        }
    }

    /// Classifies `event` and attaches it as a leaf, creating missing nodes.
    ///
    /// Re-ingesting an event whose path already exists creates nothing and
    /// replaces the event stored on the existing leaf.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidEvent` if kind or API version is empty;
    /// the tree is left untouched in that case.
    pub fn ingest(&mut self, event: Event) -> Result<Ingested, IndexError> {
        event.validate()?;

        let mut created = 0;
        let leaf = self.ingest_at(NodeId::ROOT, event, &mut created)?;

        tracing::trace!(leaf = %leaf, created, "ingested event");
        Ok(Ingested { leaf, created })
    }

    pub(crate) fn ingest_at(
        &mut self,
        id: NodeId,
        event: Event,
        created: &mut usize,
    ) -> Result<NodeId, IndexError> {
        let node = self.get(id)?;

        let mut matched = None;
        for &child in &node.children {
            if self.get(child)?.level.matches(&event) {
                matched = Some(child);
                break;
            }
        }
        if let Some(child) = matched {
            return self.ingest_at(child, event, created);
        }

        let next = node.level.next_level(&event);
        match next {
            None => {
                self.get_mut(id)?.level.record(event);
                Ok(id)
            }
            Some(level) => {
                let child = self.push_child(id, level)?;
                *created += 1;
                self.ingest_at(child, event, created)
            }
        }
    }

    fn push_child(
        &mut self,
        parent: NodeId,
        level: ClassificationLevel,
    ) -> Result<NodeId, IndexError> {
        let id = NodeId(self.nodes.len());
        self.get_mut(parent)?.children.push(id);

        tracing::trace!(parent = %parent, level = level.variant(), "created node");
        self.nodes.push(TreeNode::new(level, Some(parent)));
        Ok(id)
    }

    fn get(&self, id: NodeId) -> Result<&TreeNode, IndexError> {
        self.nodes
            .get(id.0)
            .ok_or(IndexError::CorruptTreeState { node: id })
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut TreeNode, IndexError> {
        self.nodes
            .get_mut(id.0)
            .ok_or(IndexError::CorruptTreeState { node: id })
    }

    /// The root node.
    pub fn root(&self) -> NodeRef<'_> {
        // The root is created by `new` and nodes are never removed.
        NodeRef {
            tree: self,
            id: NodeId::ROOT,
            node: &self.nodes[0],
        }
    }

    /// Looks up a node by id.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.nodes.get(id.0).map(|node| NodeRef {
            tree: self,
            id,
            node,
        })
    }

    /// Total number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing has been ingested yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Number of `ResourceVersion` leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.level.is_leaf()).count()
    }

    /// Follows child labels from the root, e.g. `["v1", "Pod", "default"]`.
    pub fn find(&self, labels: &[&str]) -> Option<NodeRef<'_>> {
        let mut current = self.root();
        for label in labels {
            current = current.children().find(|c| c.label() == *label)?;
        }
        Some(current)
    }

    /// Labels from the root down to `id`, root included.
    ///
    /// Returns an empty path for an unknown id.
    pub fn path_of(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            path.push(node.label().to_string());
            current = node.parent();
        }
        path.reverse();
        path
    }

    /// All leaves in depth-first, first-seen order.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            tree: self,
            stack: vec![NodeId::ROOT],
        }
    }

    /// Renders the tree as an indented outline, two spaces per level.
    pub fn render_outline(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(NodeId::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            out.push_str(&"  ".repeat(depth));
            out.push_str(&node.label);
            out.push('\n');
            stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }
}

/// Read-only view of one node, able to walk to its relatives.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a ClassificationTree,
    id: NodeId,
    node: &'a TreeNode,
}

impl<'a> NodeRef<'a> {
    /// This node's id in the arena.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display label: the attribute value, `*` for the root, `#<rv>` for leaves.
    pub fn label(&self) -> &'a str {
        &self.node.label
    }

    /// The underlying node, for callers that hold child ids.
    pub fn as_node(&self) -> &'a TreeNode {
        self.node
    }

    /// The level this node sits at, with its matched value.
    pub fn level(&self) -> &'a ClassificationLevel {
        &self.node.level
    }

    /// The parent node; `None` for the root.
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node.parent.and_then(|p| self.tree.node(p))
    }

    /// Children in first-seen order.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        let node = self.node;
        node.children.iter().filter_map(move |&c| tree.node(c))
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.node.children.len()
    }

    /// Returns `true` for resource-version leaves.
    pub fn is_leaf(&self) -> bool {
        self.node.level.is_leaf()
    }

    /// The event stored on a leaf; `None` for interior nodes.
    pub fn last_event(&self) -> Option<&'a Event> {
        self.node.level.last_event()
    }
}

/// Iterator over leaves, see [`ClassificationTree::leaves`].
#[derive(Debug)]
pub struct Leaves<'a> {
    tree: &'a ClassificationTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(node) = self.tree.node(id) else {
                continue;
            };
            if node.is_leaf() {
                return Some(node);
            }
            self.stack.extend(node.node.children.iter().rev().copied());
        }
        None
    }
}
