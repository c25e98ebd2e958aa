//! Configuration
//!
//! [`PjaxOptions`] is the resolved configuration. User input arrives as
//! [`PartialOptions`] (all fields optional, deserializable from camelCase
//! JSON) and is merged over the defaults by [`PjaxOptions::resolve`].

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use fos_dom::{DomTree, NodeId};
use fos_net::FetchOptions;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::{CallbackData, CallbackKind, Callbacks, Pjax, PjaxError};

/// Custom DOM patch for a target: `(live tree, target node, parsed tree, content node)`
pub type TargetRenderer = Rc<dyn Fn(&mut DomTree, NodeId, &DomTree, NodeId) -> anyhow::Result<()>>;

/// Per-request option override hook; its result is merged over the options
pub type ModifyFetchOptions = Rc<dyn Fn(&FetchOptions) -> FetchOptions>;

/// Render target declaration
#[derive(Clone)]
pub struct TargetSpec {
    pub selector: String,
    pub renderer: Option<TargetRenderer>,
}

impl TargetSpec {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            renderer: None,
        }
    }

    pub fn with_renderer<F>(selector: &str, renderer: F) -> Self
    where
        F: Fn(&mut DomTree, NodeId, &DomTree, NodeId) -> anyhow::Result<()> + 'static,
    {
        Self {
            selector: selector.to_string(),
            renderer: Some(Rc::new(renderer)),
        }
    }
}

impl fmt::Debug for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetSpec")
            .field("selector", &self.selector)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

/// Either `"main"` or `{"selector": "main"}`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTargetSpec {
    Selector(String),
    Object { selector: String },
}

impl<'de> Deserialize<'de> for TargetSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let selector = match RawTargetSpec::deserialize(deserializer)? {
            RawTargetSpec::Selector(s) | RawTargetSpec::Object { selector: s } => s,
        };
        Ok(TargetSpec::new(&selector))
    }
}

/// Targets in document order
fn deserialize_targets<'de, D>(deserializer: D) -> Result<Option<Vec<(String, TargetSpec)>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TargetsVisitor;

    impl<'de> Visitor<'de> for TargetsVisitor {
        type Value = Vec<(String, TargetSpec)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of target identifiers to selectors")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut targets: Vec<(String, TargetSpec)> = Vec::new();
            while let Some((key, spec)) = map.next_entry::<String, TargetSpec>()? {
                match targets.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = spec,
                    None => targets.push((key, spec)),
                }
            }
            Ok(targets)
        }
    }

    deserializer.deserialize_map(TargetsVisitor).map(Some)
}

/// User-supplied options; `None` means "use the default"
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialOptions {
    pub auto_init: Option<bool>,
    pub event_type: Option<String>,
    pub selector: Option<String>,
    pub form_selector: Option<String>,
    pub handle_forms: Option<bool>,
    #[serde(deserialize_with = "deserialize_targets")]
    pub targets: Option<Vec<(String, TargetSpec)>>,
    pub fetch_options: Option<FetchOptions>,
    /// Milliseconds
    pub pop_state_faux_load_time: Option<u64>,
    pub pop_state_use_content_cache: Option<bool>,
    pub track_initial_state: Option<bool>,
    pub dedupe_history_entries: Option<bool>,
    #[serde(skip)]
    pub modify_fetch_options: Option<ModifyFetchOptions>,
    #[serde(skip)]
    pub callbacks: Callbacks,
}

/// Resolved configuration
#[derive(Clone)]
pub struct PjaxOptions {
    /// Initialize on construction
    pub auto_init: bool,
    /// Event that triggers link navigation
    pub event_type: String,
    /// Elements that trigger navigation
    pub selector: String,
    /// Forms that are intercepted
    pub form_selector: String,
    pub handle_forms: bool,
    /// Render targets; order is render order
    pub targets: Vec<(String, TargetSpec)>,
    /// Base options for every request
    pub fetch_options: FetchOptions,
    /// Artificial delay before rendering a cached popstate entry
    pub pop_state_faux_load_time: Duration,
    pub pop_state_use_content_cache: bool,
    pub track_initial_state: bool,
    /// Skip pushing a history entry whose url equals the current entry's
    pub dedupe_history_entries: bool,
    pub modify_fetch_options: Option<ModifyFetchOptions>,
    pub callbacks: Callbacks,
}

impl Default for PjaxOptions {
    fn default() -> Self {
        Self {
            auto_init: true,
            event_type: "click".into(),
            selector: "a".into(),
            form_selector: "form".into(),
            handle_forms: true,
            targets: vec![
                ("content".into(), TargetSpec::new("main")),
                ("title".into(), TargetSpec::new("title")),
            ],
            fetch_options: FetchOptions::new().header("X-PJAX", "true"),
            pop_state_faux_load_time: Duration::from_millis(300),
            pop_state_use_content_cache: true,
            track_initial_state: true,
            dedupe_history_entries: false,
            modify_fetch_options: None,
            callbacks: Callbacks::new(),
        }
    }
}

impl PjaxOptions {
    /// Merge user options over the defaults
    pub fn resolve(partial: PartialOptions) -> Self {
        let mut options = Self::default();
        options.apply(partial);
        options
    }

    /// Parse a JSON option block and resolve it
    pub fn from_json(json: &str) -> Result<Self, PjaxError> {
        let partial: PartialOptions = serde_json::from_str(json)?;
        Ok(Self::resolve(partial))
    }

    /// Merge `partial` over these options
    pub fn apply(&mut self, partial: PartialOptions) {
        let PartialOptions {
            auto_init,
            event_type,
            selector,
            form_selector,
            handle_forms,
            targets,
            fetch_options,
            pop_state_faux_load_time,
            pop_state_use_content_cache,
            track_initial_state,
            dedupe_history_entries,
            modify_fetch_options,
            callbacks,
        } = partial;

        if let Some(v) = auto_init {
            self.auto_init = v;
        }
        if let Some(v) = event_type {
            self.event_type = v;
        }
        if let Some(v) = selector {
            self.selector = v;
        }
        if let Some(v) = form_selector {
            self.form_selector = v;
        }
        if let Some(v) = handle_forms {
            self.handle_forms = v;
        }
        if let Some(v) = targets {
            self.targets = v;
        }
        if let Some(v) = fetch_options {
            self.fetch_options.merge(v);
        }
        if let Some(ms) = pop_state_faux_load_time {
            self.pop_state_faux_load_time = Duration::from_millis(ms);
        }
        if let Some(v) = pop_state_use_content_cache {
            self.pop_state_use_content_cache = v;
        }
        if let Some(v) = track_initial_state {
            self.track_initial_state = v;
        }
        if let Some(v) = dedupe_history_entries {
            self.dedupe_history_entries = v;
        }
        if modify_fetch_options.is_some() {
            self.modify_fetch_options = modify_fetch_options;
        }
        self.callbacks.merge(callbacks);
    }

    pub fn auto_init(mut self, auto_init: bool) -> Self {
        self.auto_init = auto_init;
        self
    }

    pub fn event_type(mut self, event_type: &str) -> Self {
        self.event_type = event_type.to_string();
        self
    }

    pub fn selector(mut self, selector: &str) -> Self {
        self.selector = selector.to_string();
        self
    }

    pub fn form_selector(mut self, selector: &str) -> Self {
        self.form_selector = selector.to_string();
        self
    }

    pub fn handle_forms(mut self, handle: bool) -> Self {
        self.handle_forms = handle;
        self
    }

    /// Replace all targets
    pub fn targets<I, K, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: AsRef<str>,
    {
        self.targets = targets
            .into_iter()
            .map(|(k, s)| (k.into(), TargetSpec::new(s.as_ref())))
            .collect();
        self
    }

    /// Add a target, or replace the one with the same key in place
    pub fn target(self, key: &str, selector: &str) -> Self {
        self.target_spec(key, TargetSpec::new(selector))
    }

    pub fn target_with_renderer<F>(self, key: &str, selector: &str, renderer: F) -> Self
    where
        F: Fn(&mut DomTree, NodeId, &DomTree, NodeId) -> anyhow::Result<()> + 'static,
    {
        self.target_spec(key, TargetSpec::with_renderer(selector, renderer))
    }

    pub fn target_spec(mut self, key: &str, spec: TargetSpec) -> Self {
        match self.targets.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = spec,
            None => self.targets.push((key.to_string(), spec)),
        }
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.fetch_options.headers.set(name, value);
        self
    }

    pub fn pop_state_faux_load_time(mut self, delay: Duration) -> Self {
        self.pop_state_faux_load_time = delay;
        self
    }

    pub fn pop_state_use_content_cache(mut self, enabled: bool) -> Self {
        self.pop_state_use_content_cache = enabled;
        self
    }

    pub fn track_initial_state(mut self, enabled: bool) -> Self {
        self.track_initial_state = enabled;
        self
    }

    pub fn dedupe_history_entries(mut self, enabled: bool) -> Self {
        self.dedupe_history_entries = enabled;
        self
    }

    pub fn modify_fetch_options<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FetchOptions) -> FetchOptions + 'static,
    {
        self.modify_fetch_options = Some(Rc::new(hook));
        self
    }

    pub fn on<F>(mut self, kind: CallbackKind, callback: F) -> Self
    where
        F: Fn(&Pjax, &CallbackData) + 'static,
    {
        self.callbacks.on(kind, callback);
        self
    }
}

impl fmt::Debug for PjaxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PjaxOptions")
            .field("auto_init", &self.auto_init)
            .field("event_type", &self.event_type)
            .field("selector", &self.selector)
            .field("form_selector", &self.form_selector)
            .field("handle_forms", &self.handle_forms)
            .field("targets", &self.targets)
            .field("fetch_options", &self.fetch_options)
            .field("pop_state_faux_load_time", &self.pop_state_faux_load_time)
            .field("pop_state_use_content_cache", &self.pop_state_use_content_cache)
            .field("track_initial_state", &self.track_initial_state)
            .field("dedupe_history_entries", &self.dedupe_history_entries)
            .field("modify_fetch_options", &self.modify_fetch_options.is_some())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
