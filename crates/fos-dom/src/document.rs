//! Document - High-level document API

use crate::{DomTree, ElementQuery, NodeId};

/// HTML Document
#[derive(Debug, Clone)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Document URL
    url: String,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
}

impl Document {
    /// Create a new document with an empty html/head/body skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        tree.append_child(tree.root(), html);
        tree.append_child(html, head);
        tree.append_child(html, body);

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
        }
    }

    /// Locate html/head/body after the tree has been built externally
    pub fn finalize(&mut self) {
        let root = self.tree.root();
        self.html_element = self
            .tree
            .children(root)
            .find(|(_, n)| n.as_element().is_some_and(|e| e.name == "html"))
            .map(|(id, _)| id)
            .unwrap_or(NodeId::NONE);

        let child_named = |tree: &DomTree, parent: NodeId, name: &str| {
            tree.children(parent)
                .find(|(_, n)| n.as_element().is_some_and(|e| e.name == name))
                .map(|(id, _)| id)
                .unwrap_or(NodeId::NONE)
        };
        self.head_element = child_named(&self.tree, self.html_element, "head");
        self.body_element = child_named(&self.tree, self.html_element, "body");
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Update the document URL (history navigation)
    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    /// Get document title
    pub fn title(&self) -> String {
        self.query_selector("title")
            .map(|id| self.tree.text_content(id).trim().to_string())
            .unwrap_or_default()
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Get element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .find(|&n| self.tree.element(n).and_then(|e| e.id()) == Some(id))
    }

    /// First element in the document matching a CSS selector
    pub fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.tree.query_selector(self.tree.root(), selector)
    }

    /// All elements in the document matching a CSS selector
    pub fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        self.tree.query_selector_all(self.tree.root(), selector)
    }

    /// `document.documentElement.innerHTML`
    pub fn document_element_inner_html(&self) -> String {
        if self.html_element.is_valid() {
            self.tree.inner_html(self.html_element)
        } else {
            self.tree.inner_html(self.tree.root())
        }
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.tree.memory_usage() + self.url.capacity()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton() {
        let doc = Document::new("https://example.com/");
        assert!(doc.document_element().is_valid());
        assert_eq!(doc.tree().parent(doc.body()), Some(doc.document_element()));
        assert_eq!(doc.title(), "");
        assert_eq!(doc.document_element_inner_html(), "<head></head><body></body>");
    }

    #[test]
    fn test_title_and_lookup() {
        let mut doc = Document::new("about:blank");
        let head = doc.head();
        let body = doc.body();
        let tree = doc.tree_mut();
        let title = tree.create_element("title");
        tree.append_child(head, title);
        tree.set_text_content(title, " Page 1 ");
        let main = tree.create_element("main");
        tree.set_attr(main, "id", "content");
        tree.append_child(body, main);

        assert_eq!(doc.title(), "Page 1");
        assert_eq!(doc.get_element_by_id("content"), Some(main));
        assert_eq!(doc.query_selector("body > main"), Some(main));
    }
}
