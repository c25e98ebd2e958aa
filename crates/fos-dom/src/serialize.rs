//! HTML serialization (innerHTML / outerHTML)

use crate::{DomTree, NodeData, NodeId};

/// Elements that never have an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "source", "track", "wbr",
];

/// Elements whose text children are emitted verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// Pending serialization work
enum Step {
    Node { id: NodeId, raw_text: bool },
    Close(NodeId),
}

impl DomTree {
    /// Serialize the children of a node
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag_name(id).is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
        self.write_children(id, raw, &mut out);
        out
    }

    /// Serialize a node including its own tags
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_nodes(vec![Step::Node { id, raw_text: false }], &mut out);
        out
    }

    fn write_children(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let mut steps: Vec<Step> = self
            .children(id)
            .map(|(child, _)| Step::Node { id: child, raw_text })
            .collect();
        steps.reverse();
        self.write_nodes(steps, out);
    }

    /// Depth-first writer over an explicit stack (`steps` is popped from the end)
    fn write_nodes(&self, mut steps: Vec<Step>, out: &mut String) {
        while let Some(step) = steps.pop() {
            let (id, raw_text) = match step {
                Step::Close(id) => {
                    if let Some(name) = self.tag_name(id) {
                        out.push_str("</");
                        out.push_str(name);
                        out.push('>');
                    }
                    continue;
                }
                Step::Node { id, raw_text } => (id, raw_text),
            };
            let Some(node) = self.get(id) else { continue };

            let child_raw = match &node.data {
                NodeData::Document => false,
                NodeData::Doctype { name, .. } => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(name);
                    out.push('>');
                    continue;
                }
                NodeData::Comment(text) => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                    continue;
                }
                NodeData::Text(text) => {
                    if raw_text {
                        out.push_str(text);
                    } else {
                        escape_into(text, false, out);
                    }
                    continue;
                }
                NodeData::Element(elem) => {
                    out.push('<');
                    out.push_str(&elem.name);
                    for attr in &elem.attrs {
                        out.push(' ');
                        out.push_str(&attr.name);
                        out.push_str("=\"");
                        escape_into(&attr.value, true, out);
                        out.push('"');
                    }
                    out.push('>');

                    if VOID_ELEMENTS.contains(&elem.name.as_str()) {
                        continue;
                    }
                    steps.push(Step::Close(id));
                    RAW_TEXT_ELEMENTS.contains(&elem.name.as_str())
                }
            };

            let mark = steps.len();
            steps.extend(self.children(id).map(|(child, _)| Step::Node { id: child, raw_text: child_raw }));
            steps[mark..].reverse();
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_escaping() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.set_attr(div, "title", "a \"quoted\" & <b>");
        let text = tree.create_text("1 < 2 & 3");
        let br = tree.create_element("br");
        tree.append_child(tree.root(), div);
        tree.append_child(div, text);
        tree.append_child(div, br);

        assert_eq!(tree.inner_html(div), "1 &lt; 2 &amp; 3<br>");
        assert_eq!(
            tree.outer_html(div),
            "<div title=\"a &quot;quoted&quot; &amp; <b>\">1 &lt; 2 &amp; 3<br></div>"
        );
    }

    #[test]
    fn test_script_is_raw() {
        let mut tree = DomTree::new();
        let script = tree.create_element("script");
        tree.append_child(tree.root(), script);
        tree.set_text_content(script, "if (a < b && c) {}");

        assert_eq!(tree.inner_html(script), "if (a < b && c) {}");
    }

    #[test]
    fn test_deeply_nested_serialization() {
        let mut tree = DomTree::new();
        let top = tree.create_element("main");
        tree.append_child(tree.root(), top);
        let mut cur = top;
        for _ in 0..50_000 {
            let span = tree.create_element("span");
            tree.append_child(cur, span);
            cur = span;
        }

        let html = tree.inner_html(top);
        assert_eq!(html.len(), 50_000 * "<span></span>".len());
        assert!(html.starts_with("<span><span>"));
        assert!(html.ends_with("</span></span>"));
    }
}
