//! Arena storage for comparison trees.
use std::ops::Index;

use serde::Serialize;

use crate::error::DiffWarning;
use crate::record::Record;
use crate::score::ScoreTally;

/// Index of a node within its [`DiffTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root of every tree.
    pub const ROOT: Self = Self(0);

    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The nodes stored under one field key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Children {
    /// A struct or leaf field.
    Single(NodeId),
    /// An array field, items in aligned order.
    Array(Vec<NodeId>),
}

impl Children {
    /// The node ids in order.
    pub fn ids(&self) -> &[NodeId] {
        match self {
            Self::Single(id) => std::slice::from_ref(id),
            Self::Array(ids) => ids,
        }
    }
}

/// One node of a comparison tree.
///
/// Values borrow from the records passed to the comparison; scores are owned.
#[derive(Debug, Clone, Serialize)]
pub struct DiffNode<'a> {
    /// The reference value at this position.
    pub true_value: Record<'a>,
    /// The predicted value at this position.
    pub pred_value: Record<'a>,
    /// Declared type from the schema (or the type requested at the root).
    pub type_name: String,
    /// `resourceType` of the reference value when it carries one, else
    /// `type_name`. A predicted type is used only for predicted-only items
    /// whose type the schema defines.
    pub resolved_type: String,
    /// Parent node; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Child nodes keyed by field, in schema order.
    pub children: Vec<(String, Children)>,
    /// Position within the parent array, for array items.
    pub array_index: Option<usize>,
    /// Field name under which the node sits in its parent.
    pub field_key: String,
    /// Dot-joined path from the root.
    pub label: String,
    /// Distance from the root.
    pub depth: usize,
    /// `true` when the node was scored by the leaf comparator.
    pub is_leaf: bool,
    /// Tally of the node's subtree.
    pub score: ScoreTally,
}

impl DiffNode<'_> {
    /// Children stored under `key`.
    pub fn child(&self, key: &str) -> Option<&Children> {
        self.children
            .iter()
            .find_map(|(k, c)| (k == key).then_some(c))
    }

    /// All child ids, in field then item order.
    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().flat_map(|(_, c)| c.ids().iter().copied())
    }
}

/// Builds a node label from its parent label, field part and array index.
///
/// Empty parts are skipped, so the root label is just its type name.
pub fn make_label(parent_label: &str, key_part: &str, array_index: Option<usize>) -> String {
    let index = array_index.map(|i| i.to_string());
    [parent_label, key_part, index.as_deref().unwrap_or("")]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

/// Arena of diff nodes; the root is [`NodeId::ROOT`].
#[derive(Debug, Clone, Serialize)]
pub struct DiffTree<'a> {
    nodes: Vec<DiffNode<'a>>,
    /// Non-fatal conditions met while building the tree.
    pub warnings: Vec<DiffWarning>,
}

impl<'a> DiffTree<'a> {
    pub(crate) fn from_parts(nodes: Vec<DiffNode<'a>>, warnings: Vec<DiffWarning>) -> Self {
        Self { nodes, warnings }
    }

    /// The root node.
    pub fn root(&self) -> &DiffNode<'a> {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Tally of the whole comparison.
    pub fn score(&self) -> ScoreTally {
        self.root().score
    }

    /// Looks up a node.
    pub fn get(&self, id: NodeId) -> Option<&DiffNode<'a>> {
        self.nodes.get(id.0)
    }

    /// Parent of `id`, if any.
    pub fn parent(&self, id: NodeId) -> Option<&DiffNode<'a>> {
        self.get(id)?.parent.and_then(|p| self.get(p))
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in arena order, with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DiffNode<'a>)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Node ids depth-first, parent before children, children in field order
    /// and array items in aligned order.
    pub fn flatten(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            out.push(id);
            let Some(node) = self.get(id) else {
                continue;
            };
            let children: Vec<NodeId> = node.child_ids().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Nodes in [`DiffTree::flatten`] order.
    pub fn flattened(&self) -> impl Iterator<Item = &DiffNode<'a>> {
        self.flatten().into_iter().filter_map(move |id| self.get(id))
    }

    /// Finds the first node with the given label.
    pub fn find(&self, label: &str) -> Option<&DiffNode<'a>> {
        self.nodes.iter().find(|n| n.label == label)
    }
}

impl<'a> Index<NodeId> for DiffTree<'a> {
    type Output = DiffNode<'a>;

    fn index(&self, id: NodeId) -> &DiffNode<'a> {
        &self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_skip_empty_parts() {
        assert_eq!(make_label("", "Patient", None), "Patient");
        assert_eq!(make_label("Patient", "name", Some(0)), "Patient.name.0");
        assert_eq!(make_label("Patient.name.0", "family", None), "Patient.name.0.family");
        assert_eq!(make_label("Bundle.entry.1", "", None), "Bundle.entry.1");
    }

    #[test]
    fn children_ids_in_order() {
        let single = Children::Single(NodeId(3));
        assert_eq!(single.ids(), &[NodeId(3)]);
        let arr = Children::Array(vec![NodeId(1), NodeId(2)]);
        assert_eq!(arr.ids(), &[NodeId(1), NodeId(2)]);
    }
}
