//! Element Query and Methods
//!
//! querySelector, querySelectorAll, closest, matches over string selectors.
//! Invalid selectors match nothing; callers that need the parse error use
//! [`Selector::parse`] and the typed `DomTree` methods instead.

use crate::{DomTree, NodeId, Selector};

/// Element query trait
pub trait ElementQuery {
    /// Query single element by CSS selector
    fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId>;

    /// Query all elements by CSS selector
    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId>;

    /// Get elements by class name
    fn get_elements_by_class_name(&self, root: NodeId, class: &str) -> Vec<NodeId>;

    /// Get elements by tag name
    fn get_elements_by_tag_name(&self, root: NodeId, tag: &str) -> Vec<NodeId>;

    /// Find closest inclusive ancestor matching selector
    fn closest(&self, element: NodeId, selector: &str) -> Option<NodeId>;

    /// Check if element matches selector
    fn matches(&self, element: NodeId, selector: &str) -> bool;
}

impl ElementQuery for DomTree {
    fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector).ok()?;
        self.select_first(root, &selector)
    }

    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        match Selector::parse(selector) {
            Ok(selector) => self.select_all(root, &selector),
            Err(_) => Vec::new(),
        }
    }

    fn get_elements_by_class_name(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| self.element(n).is_some_and(|e| e.has_class(class)))
            .collect()
    }

    fn get_elements_by_tag_name(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| {
                self.element(n)
                    .is_some_and(|e| tag == "*" || e.name.eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    fn closest(&self, element: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector).ok()?;
        self.closest_matching(element, &selector)
    }

    fn matches(&self, element: NodeId, selector: &str) -> bool {
        Selector::parse(selector).is_ok_and(|s| self.matches_selector(element, &s))
    }
}
