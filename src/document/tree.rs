use crate::error::Result;
use std::path::Path;

/// Index of a node inside a [`ConfigTree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
struct Node {
    kind: String,
    fields: Vec<(String, String)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    fn new(kind: &str, parent: Option<NodeId>) -> Self {
        Self {
            kind: kind.to_string(),
            fields: Vec::new(),
            children: Vec::new(),
            parent,
        }
    }
}

/// Hierarchical craft/cfg document stored as an arena of nodes.
///
/// Nodes reference each other by [`NodeId`], so cloning a tree is a flat copy
/// of the arena and every clone is fully independent of its source. Searches
/// are iterative and never recurse on the call stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    nodes: Vec<Node>,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTree {
    /// Create a tree holding only the unnamed root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("", None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].fields.is_empty()
    }

    pub fn add_node(&mut self, parent: NodeId, kind: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn kind(&self, id: NodeId) -> &str {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn fields(&self, id: NodeId) -> &[(String, String)] {
        &self.nodes[id.0].fields
    }

    /// Direct children of `id` with the given type, in document order
    pub fn children_of_kind<'a>(
        &'a self,
        id: NodeId,
        kind: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.kind(*child) == kind)
    }

    pub fn has_value(&self, id: NodeId, key: &str) -> bool {
        self.get_value(id, key).is_some()
    }

    /// First value stored under `key` (exact match)
    pub fn get_value(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0]
            .fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Field parsed as a finite float
    pub fn get_f64(&self, id: NodeId, key: &str) -> Option<f64> {
        self.get_value(id, key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Replace an existing field. Returns false when the field is absent.
    pub fn set_value(&mut self, id: NodeId, key: &str, value: impl Into<String>) -> bool {
        match self.nodes[id.0].fields.iter_mut().find(|(k, _)| k == key) {
            Some(field) => {
                field.1 = value.into();
                true
            }
            None => false,
        }
    }

    pub fn add_value(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        self.nodes[id.0].fields.push((key.to_string(), value.into()));
    }

    pub fn set_or_add_value(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        let value = value.into();
        if !self.set_value(id, key, value.clone()) {
            self.add_value(id, key, value);
        }
    }

    /// Write a float using the shortest representation that reads back exactly
    pub fn set_f64(&mut self, id: NodeId, key: &str, value: f64) -> bool {
        self.set_value(id, key, format_float(value))
    }

    /// All nodes under `start` (inclusive) of type `kind` whose `identity`
    /// field starts with `prefix`, in depth-first document order.
    pub fn find_nodes(&self, start: NodeId, kind: &str, identity: &str, prefix: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.kind == kind
                && self
                    .get_value(id, identity)
                    .is_some_and(|v| v.starts_with(prefix))
            {
                found.push(id);
            }
            // Reverse push keeps preorder traversal in document order
            stack.extend(node.children.iter().rev().copied());
        }

        found
    }

    pub fn find_first(&self, start: NodeId, kind: &str, identity: &str, prefix: &str) -> Option<NodeId> {
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.kind == kind
                && self
                    .get_value(id, identity)
                    .is_some_and(|v| v.starts_with(prefix))
            {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }

        None
    }

    /// Nearest ancestor of `id` with type `kind`
    pub fn enclosing(&self, id: NodeId, kind: &str) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(candidate) = current {
            if self.kind(candidate) == kind {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    pub fn parse(text: &str) -> Result<Self> {
        super::format::parse(text)
    }

    pub fn to_text(&self) -> String {
        super::format::write(self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Save via a temporary sibling file and rename, so readers never see a
    /// half-written document.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_atomic(path.as_ref(), &self.to_text())
    }
}

pub fn format_float(value: f64) -> String {
    format!("{}", value)
}

/// Write `contents` to `path` through a temp file and rename
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
