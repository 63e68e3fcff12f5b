pub mod html;

/// The narrow set of DOM operations the mobile pipeline needs.
///
/// Reads take `&self`; anything that creates or mutates nodes takes `&mut self`.
pub trait Document {
    type Node: Clone;

    /// Lowercase tag name, or `None` for text and other non-element nodes.
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Every attribute of an element in source order; empty for text.
    fn attributes(&self, node: &Self::Node) -> Vec<(String, String)>;

    /// All child nodes (elements and text) in document order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Concatenated text of the node and all of its descendants.
    fn text_content(&self, node: &Self::Node) -> String;

    /// Deep copy of `node`. The copy is detached and shares nothing with the source.
    fn clone_subtree(&mut self, node: &Self::Node) -> Self::Node;

    fn create_element(&mut self, tag: &str) -> Self::Node;

    fn create_text(&mut self, text: &str) -> Self::Node;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);
}

/// Element children of `node`, skipping text.
pub fn element_children<D: Document>(doc: &D, node: &D::Node) -> Vec<D::Node> {
    doc.children(node)
        .into_iter()
        .filter(|child| doc.tag_name(child).is_some())
        .collect()
}

/// Whether `node` is an element with the given (lowercase) tag.
pub fn has_tag<D: Document>(doc: &D, node: &D::Node, tag: &str) -> bool {
    doc.tag_name(node).as_deref() == Some(tag)
}

/// First descendant element of `node` (pre-order, excluding `node`) matching `pred`.
pub fn find_descendant<D, F>(doc: &D, node: &D::Node, pred: F) -> Option<D::Node>
where
    D: Document,
    F: Fn(&D, &D::Node) -> bool,
{
    let mut stack: Vec<D::Node> = element_children(doc, node);
    stack.reverse();
    while let Some(current) = stack.pop() {
        if pred(doc, &current) {
            return Some(current);
        }
        let mut children = element_children(doc, &current);
        children.reverse();
        stack.extend(children);
    }
    None
}

/// First descendant element with the given tag.
pub fn find_tag<D: Document>(doc: &D, node: &D::Node, tag: &str) -> Option<D::Node> {
    find_descendant(doc, node, |d, n| has_tag(d, n, tag))
}

/// Create an element carrying a single class.
pub fn create_with_class<D: Document>(doc: &mut D, tag: &str, class: &str) -> D::Node {
    let node = doc.create_element(tag);
    doc.set_attribute(&node, "class", class);
    node
}

/// Copy a subtree of any document into `tree`, returning the detached copy.
pub fn import_subtree<D: Document>(doc: &D, node: &D::Node, tree: &mut Tree) -> NodeId {
    let Some(tag) = doc.tag_name(node) else {
        return tree.text(&doc.text_content(node));
    };
    let copy = tree.element(&tag);
    for (name, value) in doc.attributes(node) {
        tree.set_attr(copy, &name, &value);
    }
    for child in doc.children(node) {
        let child_copy = import_subtree(doc, &child, tree);
        tree.append(copy, child_copy);
    }
    copy
}

/// Identifier for a node within a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree.
///
/// Nodes are never freed; detached subtrees simply stop being reachable from
/// whatever root is serialized.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs,
            NodeKind::Text(_) => &[],
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.index()].kind {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Append `child` to `parent`, detaching it from its previous parent first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != id);
        }
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Deep copy of the subtree rooted at `id`; the copy has no parent.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let kind = self.node(id).kind.clone();
        let copy = self.alloc(kind);
        let children = self.node(id).children.clone();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.append(copy, child_copy);
        }
        copy
    }
}

impl Document for Tree {
    type Node = NodeId;

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        self.tag(*node).map(str::to_string)
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.attr(*node, name).map(str::to_string)
    }

    fn attributes(&self, node: &NodeId) -> Vec<(String, String)> {
        self.attrs(*node).to_vec()
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        Tree::children(self, *node).to_vec()
    }

    fn text_content(&self, node: &NodeId) -> String {
        Tree::text_content(self, *node)
    }

    fn clone_subtree(&mut self, node: &NodeId) -> NodeId {
        Tree::clone_subtree(self, *node)
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.element(tag)
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.text(text)
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        self.set_attr(*node, name, value);
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.append(*parent, *child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let section = tree.element("section");
        let h1 = tree.element("H1");
        let title = tree.text("Title");
        tree.append(h1, title);
        let p = tree.element("p");
        let body = tree.text("Body text");
        tree.append(p, body);
        tree.append(section, h1);
        tree.append(section, p);
        (tree, section)
    }

    #[test]
    fn test_tags_are_lowercased() {
        let (tree, section) = sample();
        let first = tree.children(section)[0];
        assert_eq!(tree.tag(first), Some("h1"));
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let (tree, section) = sample();
        assert_eq!(tree.text_content(section), "TitleBody text");
    }

    #[test]
    fn test_clone_subtree_is_independent() {
        let (mut tree, section) = sample();
        let copy = tree.clone_subtree(section);
        assert_ne!(copy, section);
        assert_eq!(tree.parent(copy), None);

        let extra = tree.element("p");
        tree.append(copy, extra);
        tree.set_attr(copy, "data-x", "1");

        assert_eq!(tree.children(section).len(), 2);
        assert_eq!(tree.children(copy).len(), 3);
        assert_eq!(tree.attr(section, "data-x"), None);
    }

    #[test]
    fn test_append_moves_node_between_parents() {
        let (mut tree, section) = sample();
        let other = tree.element("div");
        let p = tree.children(section)[1];
        tree.append(other, p);
        assert_eq!(tree.children(section).len(), 1);
        assert_eq!(tree.parent(p), Some(other));
    }

    #[test]
    fn test_set_attr_overwrites() {
        let mut tree = Tree::new();
        let el = tree.element("ol");
        tree.set_attr(el, "start", "1");
        tree.set_attr(el, "start", "6");
        assert_eq!(tree.attr(el, "start"), Some("6"));
        assert_eq!(tree.attrs(el).len(), 1);
    }

    #[test]
    fn test_import_subtree_copies_across_trees() {
        let (mut source, section) = sample();
        source.set_attr(section, "data-slide", "4");
        let mut target = Tree::new();
        target.element("body");
        let copy = import_subtree(&source, &section, &mut target);
        assert_eq!(target.attr(copy, "data-slide"), Some("4"));
        assert_eq!(target.text_content(copy), "TitleBody text");
        assert_eq!(target.len(), source.len() + 1);
    }

    #[test]
    fn test_find_descendant_is_preorder() {
        let (tree, section) = sample();
        let found = find_descendant(&tree, &section, |d, n| d.tag_name(n).is_some());
        assert_eq!(found.and_then(|n| tree.tag(n).map(str::to_string)), Some("h1".into()));
        assert!(find_tag(&tree, &section, "ul").is_none());
    }
}
