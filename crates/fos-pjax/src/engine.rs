//! Navigation engine
//!
//! Owns the navigation lifecycle: builds request options, dispatches the
//! fetch, classifies the response, records history and hands the HTML to the
//! renderer. At most one request is in flight; further navigations are
//! dropped until the transport settles.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use fos_net::{FetchOptions, NetError, RequestBody, Response, Transport};
use smol::future::BoxedLocal;
use url::Url;

use crate::events::Matchers;
use crate::{
    BrowserEnv, CallbackData, CallbackKind, DomEvent, HistoryEntry, HistoryMode, NavigationError,
    PjaxError, PjaxOptions, PopStateEvent, TargetRegistry, TriggerCallback,
};

/// PJAX navigation engine
pub struct Pjax {
    options: PjaxOptions,
    env: Rc<dyn BrowserEnv>,
    transport: Rc<dyn Transport>,
    targets: OnceCell<TargetRegistry>,
    matchers: OnceCell<Matchers>,
    is_pjaxing: Cell<bool>,
    current_pathname: RefCell<String>,
    this: Weak<Pjax>,
}

impl Pjax {
    /// Create an engine; initializes immediately unless `auto_init` is off
    pub fn new(
        options: PjaxOptions,
        env: Rc<dyn BrowserEnv>,
        transport: Rc<dyn Transport>,
    ) -> Result<Rc<Self>, PjaxError> {
        let auto_init = options.auto_init;
        let pjax = Rc::new_cyclic(|this| Pjax {
            options,
            env,
            transport,
            targets: OnceCell::new(),
            matchers: OnceCell::new(),
            is_pjaxing: Cell::new(false),
            current_pathname: RefCell::new(String::new()),
            this: this.clone(),
        });

        if auto_init {
            pjax.init()?;
        }
        Ok(pjax)
    }

    /// Resolve targets, record the initial state and attach listeners.
    ///
    /// Fails before any listener is attached if a target is missing.
    /// Calling it again after success is a no-op.
    pub fn init(&self) -> Result<(), PjaxError> {
        if self.is_initialized() {
            tracing::debug!("pjax already initialized");
            return Ok(());
        }

        let matchers = Matchers::parse(&self.options.selector, &self.options.form_selector)?;
        let registry = {
            let document = self.env.document().borrow();
            TargetRegistry::parse(&self.options.targets, &document)?
        };
        if self.targets.set(registry).is_err() || self.matchers.set(matchers).is_err() {
            return Ok(());
        }

        if self.options.track_initial_state {
            let url = self.env.location().to_string();
            let html = self.env.document().borrow().document_element_inner_html();
            self.update_history_state(&url, &html, true, HistoryMode::Replace);
        }

        self.update_current_pathname();
        self.add_listeners();
        tracing::info!("pjax initialized with {} targets", self.options.targets.len());
        Ok(())
    }

    fn add_listeners(&self) {
        let weak = self.this.clone();
        self.env.add_event_listener(
            &self.options.event_type,
            Rc::new(move |e: &DomEvent| {
                if let Some(pjax) = weak.upgrade() {
                    pjax.handle_trigger(e);
                }
            }),
        );

        let weak = self.this.clone();
        self.env.add_event_listener(
            "keydown",
            Rc::new(move |e: &DomEvent| {
                if let Some(pjax) = weak.upgrade() {
                    pjax.handle_key_press(e);
                }
            }),
        );

        if self.options.handle_forms {
            let weak = self.this.clone();
            self.env.add_event_listener(
                "submit",
                Rc::new(move |e: &DomEvent| {
                    if let Some(pjax) = weak.upgrade() {
                        pjax.handle_form_submit(e);
                    }
                }),
            );
        }

        let weak = self.this.clone();
        self.env.add_popstate_listener(Rc::new(move |e: &PopStateEvent| {
            if let Some(pjax) = weak.upgrade() {
                pjax.handle_pop_state(e);
            }
        }));
    }

    pub fn options(&self) -> &PjaxOptions {
        &self.options
    }

    pub fn env(&self) -> &Rc<dyn BrowserEnv> {
        &self.env
    }

    pub fn targets(&self) -> Option<&TargetRegistry> {
        self.targets.get()
    }

    pub(crate) fn matchers(&self) -> Option<&Matchers> {
        self.matchers.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.targets.get().is_some()
    }

    /// Whether a request is outstanding
    pub fn is_pjaxing(&self) -> bool {
        self.is_pjaxing.get()
    }

    /// Path of the last rendered page
    pub fn current_pathname(&self) -> String {
        self.current_pathname.borrow().clone()
    }

    fn update_current_pathname(&self) {
        *self.current_pathname.borrow_mut() = self.env.location().path().to_string();
    }

    /// Start a navigation on the environment's event loop
    pub fn navigate(&self, url: &str, should_update_state: bool, options: FetchOptions) {
        let task = self.do_pjax(url, should_update_state, options);
        self.env.spawn_local(task);
    }

    /// Dispatch a navigation request.
    ///
    /// Everything up to and including handing the request to the transport
    /// happens before this returns; the returned future completes the
    /// navigation once the response arrives. A call made while another
    /// request is in flight is dropped and yields a no-op future.
    pub fn do_pjax(&self, url: &str, should_update_state: bool, options: FetchOptions) -> BoxedLocal<()> {
        if self.is_pjaxing.get() {
            tracing::debug!("navigation to {} dropped: request in flight", url);
            return Box::pin(std::future::ready(()));
        }
        let Some(this) = self.this.upgrade() else {
            return Box::pin(std::future::ready(()));
        };
        self.is_pjaxing.set(true);

        let resolved = match self.env.location().join(url) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.is_pjaxing.set(false);
                self.handle_pjax_error(NavigationError::new(format!("Invalid URL {url}: {e}")));
                self.trigger_callback(CallbackKind::CompletePjax, &CallbackData::Empty);
                return Box::pin(std::future::ready(()));
            }
        };
        let hash = fragment_of(&resolved);
        let mut request_url = resolved.clone();
        request_url.set_fragment(None);

        let fetch_options = self.build_fetch_options(options);
        self.trigger_callback(
            CallbackKind::BeforePjax,
            &CallbackData::BeforePjax { fetch_options: fetch_options.clone() },
        );

        tracing::info!("PJAX {} {}", fetch_options.request_method(), request_url);
        let pending = self.transport.fetch(request_url.as_str(), &fetch_options);

        Box::pin(this.finish_navigation(pending, resolved, hash, should_update_state))
    }

    async fn finish_navigation(
        self: Rc<Self>,
        pending: BoxedLocal<Result<Response, NetError>>,
        url: Url,
        hash: Option<String>,
        should_update_state: bool,
    ) {
        let settled = pending.await;
        self.is_pjaxing.set(false);

        match self.handle_response(settled, &url, hash.as_deref(), should_update_state) {
            Ok(html) => self.trigger_callback(
                CallbackKind::SuccessPjax,
                &CallbackData::Success { url: url.to_string(), html },
            ),
            Err(err) => self.handle_pjax_error(err),
        }
        self.trigger_callback(CallbackKind::CompletePjax, &CallbackData::Empty);
    }

    fn handle_response(
        &self,
        settled: Result<Response, NetError>,
        url: &Url,
        hash: Option<&str>,
        should_update_state: bool,
    ) -> Result<String, NavigationError> {
        let response = settled?;
        if !response.ok() {
            return Err(NavigationError::from_status(response.status, &response.status_text));
        }
        let html = response.text()?;
        if html.is_empty() {
            return Err(NavigationError::from_status(response.status, &response.status_text));
        }

        if should_update_state {
            self.update_history_state(url.as_str(), &html, false, HistoryMode::Push);
        }
        self.update_current_pathname();

        self.render(&html)
            .map_err(|e| NavigationError::new(format!("Unable to render page at {url}: {e:#}")))?;

        if let Some(hash) = hash {
            self.scroll_to_target(hash);
        }
        Ok(html)
    }

    fn handle_pjax_error(&self, err: NavigationError) {
        tracing::warn!("navigation failed: {}", err);
        self.trigger_callback(CallbackKind::ErrorPjax, &CallbackData::Error(err));
    }

    /// Base options, then per-request options, then the modify hook's result.
    ///
    /// A form body set earlier survives a hook that returns no body.
    pub fn build_fetch_options(&self, options: FetchOptions) -> FetchOptions {
        let mut fetch_options = self.options.fetch_options.merged(options);

        if let Some(modify) = &self.options.modify_fetch_options {
            let overrides = modify(&fetch_options);
            fetch_options.merge(overrides);
        }

        if matches!(fetch_options.body, Some(RequestBody::UrlEncoded(_))) {
            fetch_options
                .headers
                .set("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8");
        }
        fetch_options
    }

    /// Write a history entry for `url` with `html` as its cached contents
    pub fn update_history_state(&self, url: &str, html: &str, force: bool, mode: HistoryMode) {
        if self.options.dedupe_history_entries
            && !force
            && self.env.history_state().is_some_and(|current| current.url == url)
        {
            tracing::debug!("history entry for {} already current", url);
            return;
        }

        let entry = HistoryEntry::new(url, html);
        match mode {
            HistoryMode::Push => self.env.push_state(&entry, url),
            HistoryMode::Replace => self.env.replace_state(&entry, url),
        }
    }

    /// Back/forward navigation
    pub fn handle_pop_state(&self, event: &PopStateEvent) {
        let location = self.env.location();
        if *self.current_pathname.borrow() == location.path() {
            tracing::trace!("popstate on same path, leaving hash change to the browser");
            return;
        }

        let Some(state) = &event.state else {
            // Untracked entry: refetch without adding another entry
            self.navigate(location.as_str(), false, FetchOptions::default());
            return;
        };

        if self.options.pop_state_use_content_cache {
            if let Some(html) = state.cached_html() {
                let task = self.restore_cached(state.url.clone(), html);
                self.env.spawn_local(task);
                return;
            }
        }
        self.navigate(&state.url, false, FetchOptions::default());
    }

    /// Render a cached history snapshot after the faux load delay
    fn restore_cached(&self, url: String, html: String) -> BoxedLocal<()> {
        let Some(this) = self.this.upgrade() else {
            return Box::pin(std::future::ready(()));
        };
        self.trigger_callback(CallbackKind::BeforePjax, &CallbackData::Empty);
        let delay = self.env.sleep(self.options.pop_state_faux_load_time);

        Box::pin(async move {
            delay.await;
            this.update_current_pathname();

            match this.render(&html) {
                Ok(()) => {
                    if let Some(hash) = Url::parse(&url).ok().as_ref().and_then(fragment_of) {
                        this.scroll_to_target(&hash);
                    }
                    this.trigger_callback(CallbackKind::SuccessPjax, &CallbackData::Success { url, html });
                }
                Err(e) => this.handle_pjax_error(NavigationError::new(format!(
                    "Unable to render page at {url}: {e:#}"
                ))),
            }
            this.trigger_callback(CallbackKind::CompletePjax, &CallbackData::Empty);
        })
    }

    fn scroll_to_target(&self, hash: &str) {
        let node = self.env.document().borrow().get_element_by_id(hash);
        match node {
            Some(node) => self.env.scroll_into_view(node),
            None => tracing::debug!("no element with id '{}' to scroll to", hash),
        }
    }
}

fn fragment_of(url: &Url) -> Option<String> {
    url.fragment().filter(|f| !f.is_empty()).map(str::to_string)
}

impl fmt::Debug for Pjax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pjax")
            .field("options", &self.options)
            .field("targets", &self.targets.get())
            .field("is_pjaxing", &self.is_pjaxing.get())
            .field("current_pathname", &self.current_pathname.borrow())
            .finish_non_exhaustive()
    }
}
