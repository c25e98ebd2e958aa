//! HTML5 Parser implementation
//!
//! Uses html5ever's built-in RcDom and converts to our DOM format.
//! This is simpler and more reliable than implementing TreeSink directly.

use fos_dom::{Document, DomTree, ElementData, NodeId};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

/// HTML5 parser
#[derive(Debug, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Document {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Document {
        tracing::debug!("Parsing HTML document: {}", url);

        // The HTML5 algorithm recovers from every error, so this never fails
        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut document = Document::empty(url);
        let root = document.tree().root();
        self.convert_node(&dom.document, document.tree_mut(), root);

        // Find html, head, body elements
        document.finalize();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        document
    }

    /// Convert an RcDom subtree to our DOM format.
    ///
    /// Walks an explicit stack; html5ever accepts arbitrarily deep nesting.
    fn convert_node(&self, handle: &Handle, tree: &mut DomTree, parent: NodeId) {
        let mut stack: Vec<(Handle, NodeId)> = vec![(handle.clone(), parent)];

        while let Some((handle, parent)) = stack.pop() {
            let id = match &handle.data {
                RcNodeData::Document => parent,
                RcNodeData::Doctype { name, public_id, system_id } => {
                    let id = tree.create_doctype(name, public_id, system_id);
                    tree.append_child(parent, id);
                    continue;
                }
                RcNodeData::Text { contents } => {
                    let id = tree.create_text(&contents.borrow());
                    tree.append_child(parent, id);
                    continue;
                }
                RcNodeData::Comment { contents } => {
                    let id = tree.create_comment(contents);
                    tree.append_child(parent, id);
                    continue;
                }
                RcNodeData::Element { name, attrs, .. } => {
                    let mut elem = ElementData::new(&name.local);
                    for attr in attrs.borrow().iter() {
                        elem.set_attr(&attr.name.local, attr.value.to_string());
                    }
                    let id = tree.create_element_with(elem);
                    tree.append_child(parent, id);
                    id
                }
                // Not part of the HTML DOM
                RcNodeData::ProcessingInstruction { .. } => continue,
            };

            // <template> keeps its children in a separate fragment
            let mut children: Vec<Handle> = match &handle.data {
                RcNodeData::Element { template_contents, .. } => template_contents
                    .borrow()
                    .as_ref()
                    .map(|contents| contents.children.borrow().clone())
                    .unwrap_or_default(),
                _ => Vec::new(),
            };
            children.extend(handle.children.borrow().iter().cloned());

            stack.extend(children.into_iter().rev().map(|child| (child, id)));
        }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}
