//! Target registry
//!
//! Resolves declared render targets against the initial document once. The
//! resolved nodes are patched in place for the lifetime of the document.

use std::fmt;

use fos_dom::{Document, NodeId, Selector};

use crate::{PjaxError, TargetRenderer, TargetSpec};

/// A resolved render target
#[derive(Clone)]
pub struct RegisteredTarget {
    pub key: String,
    /// Live node in the initial document
    pub target_el: NodeId,
    pub selector: Selector,
    pub renderer: Option<TargetRenderer>,
}

impl fmt::Debug for RegisteredTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTarget")
            .field("key", &self.key)
            .field("target_el", &self.target_el)
            .field("selector", &self.selector.source())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

/// Targets in declaration order
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<RegisteredTarget>,
}

impl TargetRegistry {
    /// Resolve every target or fail on the first one that is missing
    pub fn parse(targets: &[(String, TargetSpec)], document: &Document) -> Result<Self, PjaxError> {
        let mut registry = Vec::with_capacity(targets.len());

        for (key, spec) in targets {
            let selector = Selector::parse(&spec.selector).map_err(|source| PjaxError::InvalidSelector {
                key: key.clone(),
                selector: spec.selector.clone(),
                source,
            })?;

            let Some(target_el) = document.tree().select_first(document.tree().root(), &selector) else {
                return Err(PjaxError::MissingTarget {
                    key: key.clone(),
                    selector: spec.selector.clone(),
                });
            };

            tracing::debug!("target '{}' -> {:?}", key, target_el);
            registry.push(RegisteredTarget {
                key: key.clone(),
                target_el,
                selector,
                renderer: spec.renderer.clone(),
            });
        }

        Ok(Self { targets: registry })
    }

    pub fn get(&self, key: &str) -> Option<&RegisteredTarget> {
        self.targets.iter().find(|t| t.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        fos_html::parse("<html><head><title>T</title></head><body><main id=\"m\"></main><nav></nav></body></html>")
    }

    #[test]
    fn test_resolves_in_order() {
        let targets = vec![
            ("nav".to_string(), TargetSpec::new("nav")),
            ("content".to_string(), TargetSpec::new("#m")),
        ];
        let registry = TargetRegistry::parse(&targets, &doc()).unwrap();

        let keys: Vec<_> = registry.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, ["nav", "content"]);
        assert_eq!(registry.get("content").map(|t| t.selector.source()), Some("#m"));
    }

    #[test]
    fn test_missing_target_fails_fast() {
        let targets = vec![
            ("content".to_string(), TargetSpec::new("main")),
            ("sidebar".to_string(), TargetSpec::new(".sidebar")),
            ("broken".to_string(), TargetSpec::new("main[")),
        ];
        let err = TargetRegistry::parse(&targets, &doc()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'sidebar'"));
        assert!(message.contains("'.sidebar'"));
    }

    #[test]
    fn test_invalid_selector() {
        let targets = vec![("content".to_string(), TargetSpec::new("main:hover"))];
        assert!(matches!(
            TargetRegistry::parse(&targets, &doc()),
            Err(PjaxError::InvalidSelector { .. })
        ));
    }
}
