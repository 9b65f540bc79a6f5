//! The canonical MessageML document tree.
//!
//! The tree is arena-backed: [`Document`] owns a flat `Vec` of nodes and all
//! structure is expressed through [`NodeId`] indices. Parent links are
//! non-owning back-references used for context-dependent rendering (a table
//! row needs to know whether it sits in a header or body section); ownership
//! always flows root-to-leaf through `children`.

mod kind;

pub use kind::ElementKind;

/// Unique identifier of a node within a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root node ID (always 0).
    pub const ROOT: NodeId = NodeId(0);
}

/// Input format the document was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    MessageML,
    PresentationML,
}

/// A single node of the document tree.
#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Attribute bag, insertion ordered with unique keys so re-emission is
    /// byte-stable.
    attributes: Vec<(String, String)>,
}

impl Element {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing in place to keep insertion order stable.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value.to_string();
        } else {
            self.attributes.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|(k, _)| k != name);
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Text content, for text leaves.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// An entire parsed message as a single-rooted, acyclic node arena.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    format: Format,
    version: String,
}

impl Document {
    /// Create a document containing only the root node.
    pub fn new(format: Format, version: &str) -> Self {
        Self {
            nodes: vec![Element::new(ElementKind::MessageML)],
            format,
            version: version.to_string(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Message format version, rendered into the PresentationML root.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn node(&self, id: NodeId) -> &Element {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0 as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Allocate a node and append it to `parent`'s children.
    pub fn append_node(&mut self, parent: NodeId, kind: ElementKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut node = Element::new(kind);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0 as usize].children
    }

    /// Kind of `id`'s parent, if any. Used for parent-sensitive rendering.
    pub fn parent_kind(&self, id: NodeId) -> Option<&ElementKind> {
        self.node(id).parent.map(|p| &self.node(p).kind)
    }

    /// Depth-first pre-order traversal of the whole tree.
    pub fn iter_dfs(&self) -> DfsIter<'_> {
        DfsIter {
            document: self,
            stack: vec![NodeId::ROOT],
        }
    }

    /// All nodes matching a predicate, in depth-first pre-order.
    pub fn find_elements<F>(&self, pred: F) -> Vec<NodeId>
    where
        F: Fn(&Element) -> bool,
    {
        self.iter_dfs().filter(|&id| pred(self.node(id))).collect()
    }

    /// All nodes whose MessageML tag is `tag`.
    pub fn find_elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.find_elements(|node| node.kind.tag() == tag)
    }

    /// All nodes carrying attribute `name` with value `value`.
    pub fn find_elements_by_attribute(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.find_elements(|node| node.attribute(name) == Some(value))
    }

    /// Concatenated text content of a subtree, raw and without whitespace
    /// normalization.
    pub fn subtree_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let ElementKind::Text(text) = &self.node(id).kind {
            out.push_str(text);
        }
        for &child in self.children(id) {
            self.collect_text(child, out);
        }
    }
}

/// Depth-first pre-order iterator.
pub struct DfsIter<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for DfsIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        for &child in self.document.children(current).iter().rev() {
            self.stack.push(child);
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_creation() {
        let doc = Document::new(Format::MessageML, "2.0");
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.node(doc.root()).kind, ElementKind::MessageML);
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_append_sets_parent() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        let p = doc.append_node(doc.root(), ElementKind::Paragraph);
        let t = doc.append_node(p, ElementKind::Text("hi".to_string()));

        assert_eq!(doc.node(p).parent, Some(NodeId::ROOT));
        assert_eq!(doc.node(t).parent, Some(p));
        assert_eq!(doc.children(p), &[t]);
        assert_eq!(doc.subtree_text(doc.root()), "hi");
    }

    #[test]
    fn test_attribute_order_preserved() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        let div = doc.append_node(doc.root(), ElementKind::Div);
        doc.node_mut(div).set_attribute("class", "label");
        doc.node_mut(div).set_attribute("data-entity-id", "obj123");
        doc.node_mut(div).set_attribute("class", "badge");

        let attrs: Vec<_> = doc
            .node(div)
            .attributes()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            attrs,
            vec![("class", "badge"), ("data-entity-id", "obj123")]
        );
    }

    #[test]
    fn test_find_elements_preorder() {
        let mut doc = Document::new(Format::MessageML, "2.0");
        let outer = doc.append_node(doc.root(), ElementKind::Div);
        doc.node_mut(outer).set_attribute("class", "label");
        let inner = doc.append_node(outer, ElementKind::Div);
        doc.node_mut(inner).set_attribute("class", "label");
        doc.append_node(doc.root(), ElementKind::Span);

        assert_eq!(doc.find_elements_by_tag("div"), vec![outer, inner]);
        assert_eq!(
            doc.find_elements_by_attribute("class", "label"),
            vec![outer, inner]
        );
        assert_eq!(doc.find_elements_by_tag("span").len(), 1);
    }
}
