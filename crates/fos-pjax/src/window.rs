//! In-process browser window
//!
//! Owns a parsed document, its location and session history, document-level
//! event listeners and a single-threaded executor. Implements [`BrowserEnv`].

use std::cell::{Cell, Ref, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use fos_dom::{Document, NodeId};
use smol::LocalExecutor;
use smol::future::BoxedLocal;
use url::Url;

use crate::session::SessionHistory;
use crate::{
    BrowserEnv, Clock, DomEvent, EventListener, HistoryEntry, PopStateEvent, PopStateListener,
    SystemClock,
};

pub struct Window {
    document: RefCell<Document>,
    location: RefCell<Url>,
    history: RefCell<SessionHistory>,
    listeners: RefCell<Vec<(String, EventListener)>>,
    popstate_listeners: RefCell<Vec<PopStateListener>>,
    executor: LocalExecutor<'static>,
    clock: Rc<dyn Clock>,
    scrolled_to: Cell<Option<NodeId>>,
}

impl Window {
    /// Load `html` as the document at `url`
    pub fn new(url: &str, html: &str) -> Result<Self, url::ParseError> {
        let location = Url::parse(url)?;
        let document = fos_html::parse_with_url(html, location.as_str());
        tracing::debug!("window loaded {}", location);

        Ok(Self {
            document: RefCell::new(document),
            history: RefCell::new(SessionHistory::new(location.as_str())),
            location: RefCell::new(location),
            listeners: RefCell::new(Vec::new()),
            popstate_listeners: RefCell::new(Vec::new()),
            executor: LocalExecutor::new(),
            clock: Rc::new(SystemClock::new()),
            scrolled_to: Cell::new(None),
        })
    }

    /// Use another clock for timers
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    /// Dispatch an event to the listeners registered for its type.
    ///
    /// Returns `false` if a listener cancelled the default action.
    pub fn dispatch_event(&self, event: &DomEvent) -> bool {
        let listeners: Vec<EventListener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(ty, _)| *ty == event.event_type)
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            listener(event);
        }
        !event.default_prevented()
    }

    pub fn back(&self) -> bool {
        self.go(-1)
    }

    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Traverse session history and fire popstate
    pub fn go(&self, delta: i32) -> bool {
        let (url, state) = {
            let mut history = self.history.borrow_mut();
            match history.go(delta) {
                Some(entry) => (entry.url.clone(), entry.state.clone()),
                None => return false,
            }
        };

        match Url::parse(&url) {
            Ok(parsed) => self.set_location(parsed),
            Err(e) => tracing::warn!("history entry has invalid url {}: {}", url, e),
        }

        let state = state.and_then(|s| match serde_json::from_str::<HistoryEntry>(&s) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("ignoring foreign history state: {}", e);
                None
            }
        });
        let event = PopStateEvent { state };

        let listeners: Vec<PopStateListener> = self.popstate_listeners.borrow().clone();
        for listener in listeners {
            listener(&event);
        }
        true
    }

    /// Run spawned tasks until none can make progress
    pub fn run_until_stalled(&self) {
        while self.executor.try_tick() {}
    }

    /// Drive `future` and spawned tasks to completion of `future`
    pub fn block_on<T>(&self, future: impl Future<Output = T>) -> T {
        smol::block_on(self.executor.run(future))
    }

    /// Last node scrolled into view
    pub fn scrolled_to(&self) -> Option<NodeId> {
        self.scrolled_to.get()
    }

    pub fn history(&self) -> Ref<'_, SessionHistory> {
        self.history.borrow()
    }

    pub fn title(&self) -> String {
        self.document.borrow().title()
    }

    /// Serialized HTML of the first element matching `selector`
    pub fn inner_html(&self, selector: &str) -> Option<String> {
        let document = self.document.borrow();
        let node = document.query_selector(selector)?;
        Some(document.tree().inner_html(node))
    }

    fn set_location(&self, url: Url) {
        self.document.borrow_mut().set_url(url.as_str());
        *self.location.borrow_mut() = url;
    }

    fn write_state(&self, state: &HistoryEntry, url: &str, replace: bool) {
        let resolved = match self.location.borrow().join(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!("pushState with invalid url {}: {}", url, e);
                return;
            }
        };
        let serialized = match serde_json::to_string(state) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("unserializable history state: {}", e);
                None
            }
        };

        {
            let mut history = self.history.borrow_mut();
            if replace {
                history.replace_state(serialized, resolved.to_string());
            } else {
                history.push_state(serialized, resolved.to_string());
            }
        }
        self.set_location(resolved);
    }
}

impl BrowserEnv for Window {
    fn location(&self) -> Url {
        self.location.borrow().clone()
    }

    fn document(&self) -> &RefCell<Document> {
        &self.document
    }

    fn history_state(&self) -> Option<HistoryEntry> {
        let history = self.history.borrow();
        let state = history.current()?.state.as_deref()?;
        serde_json::from_str(state).ok()
    }

    fn push_state(&self, state: &HistoryEntry, url: &str) {
        self.write_state(state, url, false);
    }

    fn replace_state(&self, state: &HistoryEntry, url: &str) {
        self.write_state(state, url, true);
    }

    fn add_event_listener(&self, event_type: &str, listener: EventListener) {
        self.listeners.borrow_mut().push((event_type.to_string(), listener));
    }

    fn add_popstate_listener(&self, listener: PopStateListener) {
        self.popstate_listeners.borrow_mut().push(listener);
    }

    fn scroll_into_view(&self, node: NodeId) {
        tracing::debug!("scroll into view {:?}", node);
        self.scrolled_to.set(Some(node));
    }

    fn spawn_local(&self, task: BoxedLocal<()>) {
        self.executor.spawn(task).detach();
    }

    fn sleep(&self, duration: Duration) -> BoxedLocal<()> {
        self.clock.sleep(duration)
    }
}
