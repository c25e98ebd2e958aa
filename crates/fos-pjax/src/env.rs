//! Browser environment
//!
//! Everything the engine needs from the page it runs in: the live document,
//! location, session history, event listener registration, scrolling and a
//! local task spawner. [`crate::Window`] is the in-process implementation.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use fos_dom::{Document, NodeId};
use smol::future::BoxedLocal;
use url::Url;

use crate::HistoryEntry;

/// Listener for click/keydown/submit style events
pub type EventListener = Rc<dyn Fn(&DomEvent)>;

/// Listener for back/forward navigation
pub type PopStateListener = Rc<dyn Fn(&PopStateEvent)>;

/// Modifier keys held during an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { ctrl: false, meta: false, shift: false, alt: false };

    pub fn any(&self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }
}

/// DOM Event
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub event_type: String,
    pub target: NodeId,
    /// Mouse button, 0 is primary
    pub button: u16,
    /// Key value for keyboard events (`"Enter"`)
    pub key: Option<String>,
    pub modifiers: Modifiers,
    pub cancelable: bool,
    default_prevented: Cell<bool>,
}

impl DomEvent {
    pub fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            button: 0,
            key: None,
            modifiers: Modifiers::NONE,
            cancelable: true,
            default_prevented: Cell::new(false),
        }
    }

    pub fn click(target: NodeId) -> Self {
        Self::new("click", target)
    }

    pub fn keydown(target: NodeId, key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            ..Self::new("keydown", target)
        }
    }

    pub fn submit(target: NodeId) -> Self {
        Self::new("submit", target)
    }

    pub fn with_button(mut self, button: u16) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Cancel the browser's default action
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Fired on back/forward with the target entry's state
#[derive(Debug, Clone, PartialEq)]
pub struct PopStateEvent {
    pub state: Option<HistoryEntry>,
}

/// Host page capabilities used by the engine
pub trait BrowserEnv {
    /// Current document URL
    fn location(&self) -> Url;

    /// The live document
    fn document(&self) -> &RefCell<Document>;

    /// State of the current session history entry
    fn history_state(&self) -> Option<HistoryEntry>;

    /// Add a session history entry and move the location to `url`
    fn push_state(&self, state: &HistoryEntry, url: &str);

    /// Overwrite the current session history entry
    fn replace_state(&self, state: &HistoryEntry, url: &str);

    /// Register a listener delegated at the document
    fn add_event_listener(&self, event_type: &str, listener: EventListener);

    fn add_popstate_listener(&self, listener: PopStateListener);

    fn scroll_into_view(&self, node: NodeId);

    /// Run a task on the page's event loop
    fn spawn_local(&self, task: BoxedLocal<()>);

    /// Timer future for artificial delays
    fn sleep(&self, duration: Duration) -> BoxedLocal<()>;
}
