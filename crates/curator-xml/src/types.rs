//! Core types for mutable XML trees.

/// Handle to a node inside an [`XmlDocument`] arena.
///
/// Ids are stable across mutation: inserting or re-parenting nodes never
/// invalidates an existing handle. Ids from one document must not be used
/// with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// An XML attribute name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// The local name of the attribute (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any.
    pub prefix: Option<String>,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

/// An XML element.
///
/// An element holds either text content or child elements, never both;
/// mixed content is rejected at parse time.
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// The local name of the element (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any (e.g. `ena` in `<ena:STUDY>`).
    pub prefix: Option<String>,

    /// Attributes of this element.
    pub attributes: Vec<XmlAttribute>,

    pub(crate) text: Option<String>,
    pub(crate) children: Vec<NodeId>,
}

impl XmlNode {
    pub(crate) fn new(name: String, prefix: Option<String>, attributes: Vec<XmlAttribute>) -> Self {
        Self {
            name,
            prefix,
            attributes,
            text: None,
            children: Vec::new(),
        }
    }

    /// Get an attribute value by local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Text content, if this element holds text.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Child element ids, in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether this element has neither text nor child elements.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.children.is_empty()
    }
}

/// An XML document: a flat arena of elements plus the root id.
///
/// Detached nodes (created but never attached, or replaced during editing)
/// stay allocated in the arena; they are simply unreachable from the root
/// and dropped with the document.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    root: NodeId,
}

impl XmlDocument {
    /// Create a document holding a single empty root element.
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![XmlNode::new(root_name.to_string(), None, Vec::new())],
            root: NodeId(0),
        }
    }

    pub(crate) fn from_arena(nodes: Vec<XmlNode>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    /// The root element id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0]
    }

    /// Borrow a node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> &mut XmlNode {
        &mut self.nodes[id.0]
    }

    /// Set the text content of an element, replacing any previous text.
    ///
    /// Text on an element that also has child elements is ignored during
    /// serialization; callers resolve value-bearing nodes before writing.
    pub fn set_text(&mut self, id: NodeId, value: &str) {
        self.nodes[id.0].text = Some(value.to_string());
    }

    /// Set an attribute value, overwriting an existing attribute of the
    /// same local name or appending a new one.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let node = &mut self.nodes[id.0];
        match node.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => node.attributes.push(XmlAttribute {
                name: name.to_string(),
                prefix: None,
                value: value.to_string(),
            }),
        }
    }

    /// Allocate a new detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(XmlNode::new(name.to_string(), None, Vec::new()));
        id
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` at `index` among the children of `parent`.
    ///
    /// Indexes past the end append.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Ids of the children of `id` whose local name equals `name`.
    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.nodes[c.0].name == name)
            .collect()
    }

    /// Deep-copy the subtree rooted at `id` into a fresh document.
    pub fn extract_subtree(&self, id: NodeId) -> XmlDocument {
        let mut out = XmlDocument {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = out.copy_from(self, id);
        out.root = root;
        out
    }

    fn copy_from(&mut self, src: &XmlDocument, id: NodeId) -> NodeId {
        let node = src.node(id);
        let copy = NodeId(self.nodes.len());
        self.nodes.push(XmlNode {
            name: node.name.clone(),
            prefix: node.prefix.clone(),
            attributes: node.attributes.clone(),
            text: node.text.clone(),
            children: Vec::new(),
        });
        for child in node.children.clone() {
            let child_copy = self.copy_from(src, child);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }
}
