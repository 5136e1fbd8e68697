//! Arena-backed document tree.
//!
//! Nodes are never freed: a detached subtree stays in the arena until the
//! document is dropped, which matches the page-scoped lifetime of everything
//! built on top of it. All mutation goes through `&mut Document`, so the
//! tree has exactly one writer at any time.

use crate::DomError;

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Content of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

/// Tag, attributes and inline style of an element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    style: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable document tree rooted at a `body` element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root element.
    pub fn new() -> Self {
        let root = Node {
            kind: NodeKind::Element(ElementData {
                tag: "body".to_string(),
                ..Default::default()
            }),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(data) => Ok(data),
            NodeKind::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Copy a subtree. The copy is detached and shares nothing with the source.
    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let (kind, children) = {
            let node = self.node(id)?;
            (node.kind.clone(), node.children.clone())
        };
        let copy = self.push(kind);
        for child in children {
            let child_copy = self.deep_clone(child)?;
            self.node_mut(child_copy)?.parent = Some(copy);
            self.node_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Parent of a node, if attached.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    /// Direct children in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// All descendants in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// First of `id` and its ancestors matching the predicate.
    pub fn closest<F>(&self, id: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        let mut current = Some(id);
        while let Some(node) = current {
            if predicate(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Descendants of `scope` matching the predicate, in document order.
    pub fn find_all<F>(&self, scope: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| predicate(self, id))
            .collect()
    }

    /// First descendant of `scope` matching the predicate.
    pub fn find_first<F>(&self, scope: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        self.descendants(scope)
            .into_iter()
            .find(|&id| predicate(self, id))
    }

    /// First attached element with the given `id` attribute.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_first(self.root, |d, n| d.attr(n, "id") == Some(id))
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).last() == Some(&self.root)
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(parent)?;
        if self.node(child)?.parent.is_some() {
            return Err(DomError::AlreadyAttached(child));
        }
        if parent == child || self.ancestors(parent).contains(&child) {
            return Err(DomError::Cycle { parent, child });
        }
        if child == self.root {
            return Err(DomError::Cycle { parent, child });
        }
        Ok(())
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Insert a detached node before `reference`, which must be a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::Detached(reference))?;
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.insert(index, child);
        Ok(())
    }

    /// Remove a node from its parent. The subtree stays intact and detached.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.node(id)?.parent.ok_or(DomError::Detached(id))?;
        self.node_mut(parent)?.children.retain(|&c| c != id);
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    /// Swap `old` for the detached `new` in one step.
    ///
    /// `new` takes the exact position of `old`; `old` ends up detached. There is
    /// no observable state where both or neither are in the tree.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self.node(old)?.parent.ok_or(DomError::Detached(old))?;
        self.check_insertable(parent, new)?;
        let parent_node = self.node_mut(parent)?;
        let slot = parent_node
            .children
            .iter_mut()
            .find(|c| **c == old)
            .ok_or(DomError::Detached(old))?;
        *slot = new;
        self.node_mut(new)?.parent = Some(parent);
        self.node_mut(old)?.parent = None;
        Ok(())
    }

    /// Remove all children of a node.
    pub fn clear_children(&mut self, id: NodeId) -> Result<(), DomError> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Node content.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    /// Lowercase tag name, or `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    /// Whether the node is an element with the given tag.
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text(text)) = self.kind(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(NodeKind::Text(text)) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        self.clear_children(id)?;
        let node = self.create_text(text);
        self.append_child(id, node)
    }

    /// Attribute value. The inline style lives separately, see [`Document::style`].
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attributes in insertion order.
    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        self.element(id).map(|e| e.attrs.as_slice()).unwrap_or(&[])
    }

    /// Set an attribute, keeping its original position if it already exists.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        if name == "style" {
            let element = self.element_mut(id)?;
            element.style = parse_style(value);
            return Ok(());
        }
        let element = self.element_mut(id)?;
        match element.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attrs.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Remove an attribute. Missing attributes are ignored.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        if name == "style" {
            element.style.clear();
        } else {
            element.attrs.retain(|(key, _)| key != name);
        }
        Ok(())
    }

    /// Whether the `class` attribute contains the class.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Add a class if not already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        if self.has_class(id, class) {
            return Ok(());
        }
        let joined = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &joined)
    }

    /// Remove a class. The attribute is dropped when it becomes empty.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let Some(existing) = self.attr(id, "class") else {
            return Ok(());
        };
        let remaining: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attr(id, "class")
        } else {
            let joined = remaining.join(" ");
            self.set_attr(id, "class", &joined)
        }
    }

    /// Inline style property value.
    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id)?
            .style
            .iter()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value.as_str())
    }

    /// Inline style declarations in insertion order.
    pub fn styles(&self, id: NodeId) -> &[(String, String)] {
        self.element(id).map(|e| e.style.as_slice()).unwrap_or(&[])
    }

    /// Set an inline style property.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        match element.style.iter_mut().find(|(key, _)| key == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.style.push((property.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Remove an inline style property.
    pub fn remove_style(&mut self, id: NodeId, property: &str) -> Result<(), DomError> {
        self.element_mut(id)?.style.retain(|(key, _)| key != property);
        Ok(())
    }
}

impl ElementData {
    /// Lowercase tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attributes other than `style`.
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Inline style declarations.
    pub fn style(&self) -> &[(String, String)] {
        &self.style
    }
}

/// Split a `style` attribute into `(property, value)` pairs.
pub(crate) fn parse_style(value: &str) -> Vec<(String, String)> {
    value
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            if property.is_empty() {
                None
            } else {
                Some((property, value.to_string()))
            }
        })
        .collect()
}
