//! DOM Tree (arena-based allocation)
//!
//! Detaching a subtree only unlinks it; its ids stay valid and it can be
//! re-inserted. Removing children (`remove_children`, `set_text_content`,
//! `replace_children_from`) releases their slots to a free list, and later
//! allocations reuse them, so ids of removed nodes must not be kept.

use crate::{ElementData, Node, NodeData, NodeId};

/// Arena-based DOM tree for memory efficiency
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            free: Vec::new(),
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of node slots, including released ones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of slots holding a node (attached or detached)
    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = node;
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Release a detached subtree's slots for reuse
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            stack.extend(self.children(cur).map(|(c, _)| c));
            // Drop the payload now; the slot is overwritten on reuse
            self.nodes[cur.index()] = Node::with_data(NodeData::Text(String::new()));
            self.free.push(cur);
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(Node::element(name))
    }

    /// Create a detached element from prepared element data
    pub fn create_element_with(&mut self, data: ElementData) -> NodeId {
        self.push(Node::with_data(NodeData::Element(data)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(Node::comment(text))
    }

    /// Create a detached doctype node
    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.push(Node::doctype(name, public_id, system_id))
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.get(parent).is_none() || self.get(child).is_none() {
            return;
        }
        // Hierarchy request: a node cannot become its own descendant.
        // A childless node cannot be an ancestor of anything.
        if self.nodes[child.index()].first_child.is_valid() && self.ancestors(parent).any(|a| a == child) {
            return;
        }
        self.detach(child);

        let last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = last;
            node.next_sibling = NodeId::NONE;
        }
        if last.is_valid() {
            self.nodes[last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;
    }

    /// Unlink a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else if parent.is_valid() {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else if parent.is_valid() {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Remove every child of `parent`, releasing their subtrees
    pub fn remove_children(&mut self, parent: NodeId) {
        let children: Vec<NodeId> = self.children(parent).map(|(id, _)| id).collect();
        for child in children {
            self.detach(child);
            self.release(child);
        }
    }

    /// Iterate direct children
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        let next = self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        Children { tree: self, next }
    }

    /// Parent node, if attached
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Ancestors from the parent up to the document node
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Previous sibling that is an element
    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.get(id)?.prev_sibling;
        while cur.is_valid() {
            let node = &self.nodes[cur.index()];
            if node.is_element() {
                return Some(cur);
            }
            cur = node.prev_sibling;
        }
        None
    }

    /// All descendants in document (pre-)order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).map(|(c, _)| c).collect();
        stack.reverse();
        while let Some(cur) = stack.pop() {
            out.push(cur);
            let mark = stack.len();
            stack.extend(self.children(cur).map(|(c, _)| c));
            stack[mark..].reverse();
        }
        out
    }

    /// Whether the node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        if id == self.root() {
            return self.get(id).is_some();
        }
        self.ancestors(id).any(|a| a == self.root())
    }

    /// Element data for an element node
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id)?.as_element()
    }

    /// Mutable element data for an element node
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id)?.as_element_mut()
    }

    /// Lowercase tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// Attribute value of an element
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.get_attr(name)
    }

    /// Set an attribute on an element (no-op for other nodes)
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(elem) = self.element_mut(id) {
            elem.set_attr(name, value);
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.nodes[d.index()].as_text())
            .collect()
    }

    /// Replace all children with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.remove_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Deep-copy a node from another tree into this one (detached)
    pub fn import_node(&mut self, src: &DomTree, src_id: NodeId) -> Option<NodeId> {
        let data = match &src.get(src_id)?.data {
            // A document node is imported as its children only
            NodeData::Document => return None,
            other => other.clone(),
        };
        let copy = self.push(Node::with_data(data));
        self.import_children(src, src_id, copy);
        Some(copy)
    }

    /// Deep-copy the children of `src_parent` under `dest`, in order
    fn import_children(&mut self, src: &DomTree, src_parent: NodeId, dest: NodeId) {
        let mut stack: Vec<(NodeId, NodeId)> = src.children(src_parent).map(|(c, _)| (c, dest)).collect();
        stack.reverse();
        while let Some((src_id, parent)) = stack.pop() {
            let Some(node) = src.get(src_id) else { continue };
            if matches!(node.data, NodeData::Document) {
                continue;
            }
            let copy = self.push(Node::with_data(node.data.clone()));
            self.append_child(parent, copy);

            let mark = stack.len();
            stack.extend(src.children(src_id).map(|(c, _)| (c, copy)));
            stack[mark..].reverse();
        }
    }

    /// `target.innerHTML = source.innerHTML` across trees
    pub fn replace_children_from(&mut self, target: NodeId, src: &DomTree, src_parent: NodeId) {
        self.remove_children(target);
        self.import_children(src, src_parent, target);
    }

    /// Approximate heap usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node>()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.next.is_valid() {
            return None;
        }
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        tree.append_child(tree.root(), div);
        tree.append_child(div, a);
        tree.append_child(div, b);
        (tree, div, a, b)
    }

    #[test]
    fn test_append_and_children() {
        let (tree, div, a, b) = sample();
        let kids: Vec<NodeId> = tree.children(div).map(|(id, _)| id).collect();
        assert_eq!(kids, vec![a, b]);
        assert_eq!(tree.parent(a), Some(div));
        assert_eq!(tree.prev_element_sibling(b), Some(a));
    }

    #[test]
    fn test_detach_middle_child() {
        let (mut tree, div, a, b) = sample();
        let c = tree.create_element("i");
        tree.append_child(div, c);

        tree.detach(b);
        let kids: Vec<NodeId> = tree.children(div).map(|(id, _)| id).collect();
        assert_eq!(kids, vec![a, c]);
        assert!(!tree.is_connected(b));
        assert!(tree.is_connected(c));
    }

    #[test]
    fn test_reappend_moves_node() {
        let (mut tree, div, a, b) = sample();
        tree.append_child(div, a);
        let kids: Vec<NodeId> = tree.children(div).map(|(id, _)| id).collect();
        assert_eq!(kids, vec![b, a]);
    }

    #[test]
    fn test_descendants_preorder() {
        let (mut tree, div, a, b) = sample();
        let text = tree.create_text("x");
        tree.append_child(a, text);
        assert_eq!(tree.descendants(div), vec![a, text, b]);
        assert_eq!(tree.text_content(div), "x");
    }

    #[test]
    fn test_replace_children_from_other_tree() {
        let (mut live, div, _, _) = sample();

        let mut src = DomTree::new();
        let main = src.create_element("main");
        let p = src.create_element("p");
        let t = src.create_text("fresh");
        src.append_child(src.root(), main);
        src.append_child(main, p);
        src.append_child(p, t);

        live.replace_children_from(div, &src, main);
        let kids: Vec<NodeId> = live.children(div).map(|(id, _)| id).collect();
        assert_eq!(kids.len(), 1);
        assert_eq!(live.tag_name(kids[0]), Some("p"));
        assert_eq!(live.text_content(div), "fresh");
    }

    fn nested(depth: usize) -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let top = tree.create_element("main");
        tree.append_child(tree.root(), top);
        let mut cur = top;
        for _ in 0..depth {
            let div = tree.create_element("div");
            tree.append_child(cur, div);
            cur = div;
        }
        let text = tree.create_text("deep");
        tree.append_child(cur, text);
        (tree, top)
    }

    #[test]
    fn test_remove_children_reuses_slots() {
        let (mut tree, div, a, _) = sample();
        let text = tree.create_text("x");
        tree.append_child(a, text);
        let slots = tree.len();

        tree.remove_children(div);
        assert_eq!(tree.live_count(), slots - 3);

        let fresh = tree.create_element("p");
        assert!(fresh.index() < slots);
        assert_eq!(tree.len(), slots);
        assert_eq!(tree.tag_name(fresh), Some("p"));
        assert!(tree.children(fresh).next().is_none());
    }

    #[test]
    fn test_repeated_replace_keeps_arena_flat() {
        let (mut live, div, _, _) = sample();
        let mut src = DomTree::new();
        let main = src.create_element("main");
        src.append_child(src.root(), main);
        for i in 0..50 {
            let p = src.create_element("p");
            let t = src.create_text(&format!("para {i}"));
            src.append_child(main, p);
            src.append_child(p, t);
        }

        live.replace_children_from(div, &src, main);
        let slots = live.len();
        for _ in 0..20 {
            live.replace_children_from(div, &src, main);
        }
        assert_eq!(live.len(), slots);
        assert_eq!(live.children(div).count(), 50);
        assert_eq!(live.text_content(div).matches("para").count(), 50);
    }

    #[test]
    fn test_deep_subtree_import() {
        let (src, top) = nested(60_000);
        let mut live = DomTree::new();
        let host = live.create_element("section");
        live.append_child(live.root(), host);

        live.replace_children_from(host, &src, top);
        assert_eq!(live.descendants(host).len(), 60_001);
        assert_eq!(live.text_content(host), "deep");

        live.remove_children(host);
        assert_eq!(live.live_count(), 2);
    }
}
