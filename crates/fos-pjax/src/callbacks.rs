//! Lifecycle callbacks
//!
//! Named observer hooks invoked synchronously with the engine and a payload.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use fos_dom::{Document, DomTree, NodeId};
use fos_net::FetchOptions;

use crate::{NavigationError, Pjax, TargetRenderer};

/// Lifecycle points at which a callback can be registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    BeforePjax,
    SuccessPjax,
    ErrorPjax,
    CompletePjax,
    BeforeRender,
    AfterRender,
    BeforeTargetRender,
    AfterTargetRender,
}

impl CallbackKind {
    pub const ALL: [CallbackKind; 8] = [
        CallbackKind::BeforePjax,
        CallbackKind::SuccessPjax,
        CallbackKind::ErrorPjax,
        CallbackKind::CompletePjax,
        CallbackKind::BeforeRender,
        CallbackKind::AfterRender,
        CallbackKind::BeforeTargetRender,
        CallbackKind::AfterTargetRender,
    ];

    /// Option key, e.g. `onBeforePjax`
    pub fn name(&self) -> &'static str {
        match self {
            CallbackKind::BeforePjax => "onBeforePjax",
            CallbackKind::SuccessPjax => "onSuccessPjax",
            CallbackKind::ErrorPjax => "onErrorPjax",
            CallbackKind::CompletePjax => "onCompletePjax",
            CallbackKind::BeforeRender => "onBeforeRender",
            CallbackKind::AfterRender => "onAfterRender",
            CallbackKind::BeforeTargetRender => "onBeforeTargetRender",
            CallbackKind::AfterTargetRender => "onAfterTargetRender",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload handed to before/after target render callbacks
#[derive(Clone)]
pub struct TargetRenderData {
    pub target_key: String,
    /// Live node being patched
    pub target_el: NodeId,
    /// Parsed response document; kept alive by the payload so `content_el`
    /// stays addressable after the render pass
    pub content_doc: Rc<Document>,
    /// Matching node in `content_doc`
    pub content_el: NodeId,
    /// Inner HTML of `content_el`
    pub content_html: String,
    /// Custom renderer patching this target, if any
    pub renderer: Option<TargetRenderer>,
}

impl TargetRenderData {
    /// Tree holding `content_el`
    pub fn content_tree(&self) -> &DomTree {
        self.content_doc.tree()
    }
}

impl fmt::Debug for TargetRenderData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRenderData")
            .field("target_key", &self.target_key)
            .field("target_el", &self.target_el)
            .field("content_el", &self.content_el)
            .field("content_html", &self.content_html)
            .field("renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

impl PartialEq for TargetRenderData {
    fn eq(&self, other: &Self) -> bool {
        let same_renderer = match (&self.renderer, &other.renderer) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.target_key == other.target_key
            && self.target_el == other.target_el
            && Rc::ptr_eq(&self.content_doc, &other.content_doc)
            && self.content_el == other.content_el
            && self.content_html == other.content_html
            && same_renderer
    }
}

/// Callback payload
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackData {
    /// `onCompletePjax`, `onBeforeRender`, `onAfterRender`, and
    /// `onBeforePjax` for cached popstate renders
    Empty,
    BeforePjax { fetch_options: FetchOptions },
    Success { url: String, html: String },
    Error(NavigationError),
    TargetRender(TargetRenderData),
}

pub type Callback = Rc<dyn Fn(&Pjax, &CallbackData)>;

/// Registered callbacks, at most one per kind
#[derive(Clone, Default)]
pub struct Callbacks {
    map: HashMap<CallbackKind, Callback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: CallbackKind, callback: F)
    where
        F: Fn(&Pjax, &CallbackData) + 'static,
    {
        self.map.insert(kind, Rc::new(callback));
    }

    /// Explicitly disable a callback (the `false` value in option blocks)
    pub fn off(&mut self, kind: CallbackKind) {
        self.map.remove(&kind);
    }

    pub fn get(&self, kind: CallbackKind) -> Option<&Callback> {
        self.map.get(&kind)
    }

    /// Key-by-key merge; `other` wins
    pub fn merge(&mut self, other: Callbacks) {
        self.map.extend(other.map);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}

/// Capability to fire named callbacks
pub trait TriggerCallback {
    fn callbacks(&self) -> &Callbacks;

    /// Invoke the callback registered for `kind`, if any
    fn trigger_callback(&self, kind: CallbackKind, data: &CallbackData);
}

impl TriggerCallback for Pjax {
    fn callbacks(&self) -> &Callbacks {
        &self.options().callbacks
    }

    fn trigger_callback(&self, kind: CallbackKind, data: &CallbackData) {
        let Some(callback) = self.callbacks().get(kind).cloned() else {
            return;
        };
        tracing::trace!("callback {}", kind);
        callback(self, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in CallbackKind::ALL {
            assert_eq!(CallbackKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(CallbackKind::from_name("onSomething"), None);
    }

    #[test]
    fn test_merge_is_key_by_key() {
        let mut base = Callbacks::new();
        base.on(CallbackKind::BeforePjax, |_, _| {});
        base.on(CallbackKind::ErrorPjax, |_, _| {});

        let mut over = Callbacks::new();
        over.on(CallbackKind::ErrorPjax, |_, _| {});
        over.on(CallbackKind::CompletePjax, |_, _| {});

        let replaced = over.get(CallbackKind::ErrorPjax).cloned().unwrap();
        base.merge(over);

        assert_eq!(base.len(), 3);
        assert!(Rc::ptr_eq(base.get(CallbackKind::ErrorPjax).unwrap(), &replaced));
    }
}
