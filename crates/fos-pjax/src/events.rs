//! Event interception
//!
//! Delegated trigger, keyboard and submit handlers, and the filter deciding
//! which link activations are left to the browser.

use fos_dom::{DomTree, NodeId, Selector};
use fos_net::FetchOptions;
use url::Url;

use crate::form::build_submission;
use crate::{DomEvent, Pjax, PjaxError};

/// Parsed trigger selectors, fixed at init
#[derive(Debug, Clone)]
pub(crate) struct Matchers {
    pub link: Selector,
    pub form: Selector,
}

impl Matchers {
    pub fn parse(link: &str, form: &str) -> Result<Self, PjaxError> {
        let parse = |key: &str, selector: &str| {
            Selector::parse(selector).map_err(|source| PjaxError::InvalidSelector {
                key: key.to_string(),
                selector: selector.to_string(),
                source,
            })
        };
        Ok(Self {
            link: parse("selector", link)?,
            form: parse("formSelector", form)?,
        })
    }
}

/// Destination of an activated link, or `None` to fall through to native
/// browser behavior
pub fn link_destination(tree: &DomTree, element: NodeId, event: &DomEvent, location: &Url) -> Option<Url> {
    // Primary button only, no modifier (new tab / new window / download)
    if event.button != 0 || event.modifiers.any() {
        return None;
    }
    if tree.tag_name(element) != Some("a") {
        return None;
    }
    if tree.attr(element, "target").is_some_and(|t| t.eq_ignore_ascii_case("_blank")) {
        return None;
    }

    let href = tree.attr(element, "href").map(str::trim).filter(|h| !h.is_empty())?;
    let url = location.join(href).ok()?;

    if url.scheme() != location.scheme() || url.host_str() != location.host_str() {
        return None;
    }
    if url.fragment().is_some_and(|f| !f.is_empty()) && url.path() == location.path() {
        return None;
    }

    Some(url)
}

impl Pjax {
    /// Delegated handler for the configured trigger event
    pub(crate) fn handle_trigger(&self, event: &DomEvent) {
        if let Some(element) = self.matching_link(event.target) {
            self.handle_link(element, event);
        }
    }

    /// Enter on a focused matching element behaves like a click
    pub(crate) fn handle_key_press(&self, event: &DomEvent) {
        if event.key.as_deref() != Some("Enter") {
            return;
        }
        if let Some(element) = self.matching_link(event.target) {
            self.handle_link(element, event);
        }
    }

    pub(crate) fn handle_form_submit(&self, event: &DomEvent) {
        let Some(matchers) = self.matchers() else { return };

        let submission = {
            let document = self.env().document().borrow();
            let tree = document.tree();
            if tree.tag_name(event.target) != Some("form") || !tree.matches_selector(event.target, &matchers.form) {
                return;
            }
            build_submission(&document, event.target, &self.env().location())
        };
        let Some(submission) = submission else { return };

        tracing::debug!("intercepted form submit to {}", submission.url);
        self.navigate(submission.url.as_str(), true, submission.options);
        event.prevent_default();
    }

    fn matching_link(&self, target: NodeId) -> Option<NodeId> {
        let matchers = self.matchers()?;
        let document = self.env().document().borrow();
        document.tree().closest_matching(target, &matchers.link)
    }

    fn handle_link(&self, element: NodeId, event: &DomEvent) {
        let destination = {
            let document = self.env().document().borrow();
            link_destination(document.tree(), element, event, &self.env().location())
        };
        let Some(url) = destination else {
            tracing::trace!("link {:?} left to the browser", element);
            return;
        };

        self.navigate(url.as_str(), true, FetchOptions::default());
        event.prevent_default();
    }
}
