//! Renderer
//!
//! Swaps each registered target's content for the matching region of a
//! fetched page.

use std::rc::Rc;

use anyhow::Context;

use crate::callbacks::TargetRenderData;
use crate::{CallbackData, CallbackKind, Pjax, TriggerCallback};

impl Pjax {
    /// Parse `html` and patch every registered target from it, in
    /// declaration order.
    ///
    /// A target whose live node or response content is missing is skipped.
    /// A failing custom renderer aborts the pass.
    pub fn render(&self, html: &str) -> anyhow::Result<()> {
        let parsed = Rc::new(fos_html::parse(html));
        let targets: Vec<_> = self.targets().map(|r| r.iter().collect()).unwrap_or_default();

        self.trigger_callback(CallbackKind::BeforeRender, &CallbackData::Empty);

        for target in targets {
            let live = {
                let document = self.env().document().borrow();
                let tree = document.tree();
                // Slots of removed nodes are reused, so re-check what the id now holds
                tree.is_connected(target.target_el) && tree.matches_selector(target.target_el, &target.selector)
            };
            if !live {
                tracing::warn!("target '{}' is no longer in the document", target.key);
                continue;
            }
            let Some(content_el) = parsed.tree().select_first(parsed.tree().root(), &target.selector) else {
                tracing::warn!(
                    "no content for target '{}' matching '{}'",
                    target.key,
                    target.selector
                );
                continue;
            };

            let data = CallbackData::TargetRender(TargetRenderData {
                target_key: target.key.clone(),
                target_el: target.target_el,
                content_doc: parsed.clone(),
                content_el,
                content_html: parsed.tree().inner_html(content_el),
                renderer: target.renderer.clone(),
            });
            self.trigger_callback(CallbackKind::BeforeTargetRender, &data);

            {
                let mut document = self.env().document().borrow_mut();
                let tree = document.tree_mut();
                match &target.renderer {
                    Some(renderer) => renderer(tree, target.target_el, parsed.tree(), content_el)
                        .with_context(|| format!("renderer for target '{}' failed", target.key))?,
                    None => tree.replace_children_from(target.target_el, parsed.tree(), content_el),
                }
            }

            self.trigger_callback(CallbackKind::AfterTargetRender, &data);
        }

        self.trigger_callback(CallbackKind::AfterRender, &CallbackData::Empty);
        Ok(())
    }
}
