//! Shared fixtures: a recording transport, a page set and a harness wiring
//! a `Window`, a `ManualClock` and a callback log to a `Pjax` engine.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use fos_net::{FetchOptions, NetError, Response, Transport};
use fos_pjax::*;
use smol::channel::{Receiver, Sender};
use smol::future::BoxedLocal;

pub const BASE: &str = "http://site.test/";

pub const INDEX: &str = r##"<!DOCTYPE html>
<html>
<head><title>Home</title></head>
<body>
<nav>
  <a id="to-1" href="/page1.html"><span>One</span></a>
  <a id="to-2" href="/page2.html">Two</a>
  <a id="to-1-hash" href="/page1.html#section">One, section</a>
  <a id="blank" href="/page1.html" target="_blank">New tab</a>
  <a id="external" href="http://elsewhere.test/">Elsewhere</a>
</nav>
<aside><p>Home sidebar</p></aside>
<main><h1>Home</h1></main>
<form id="search" action="/search"><input name="q" value="rust lang"></form>
<form id="save" method="post" action="/save"><input name="title" value="Hi"></form>
<form id="upload" method="post" enctype="multipart/form-data" action="/upload"><input name="caption" value="cat"></form>
</body>
</html>"##;

/// A full page with a title and main region
pub fn page(title: &str, main: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body><aside><p>{title} sidebar</p></aside><main>{main}</main></body></html>"
    )
}

#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub options: FetchOptions,
}

enum Reply {
    Page(Response),
    Fail(String),
}

/// Transport returning canned replies and recording every call
pub struct StubTransport {
    calls: RefCell<Vec<Call>>,
    replies: RefCell<HashMap<String, Reply>>,
    gate: RefCell<Option<(Sender<()>, Receiver<()>)>>,
}

impl StubTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            calls: RefCell::new(Vec::new()),
            replies: RefCell::new(HashMap::new()),
            gate: RefCell::new(None),
        })
    }

    /// 200 OK with `html` for `url`
    pub fn page(&self, url: &str, html: &str) {
        self.respond(url, Response::new(200, "OK", html));
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.replies.borrow_mut().insert(url.to_string(), Reply::Page(response));
    }

    /// Network-level failure for `url`
    pub fn fail(&self, url: &str, msg: &str) {
        self.replies.borrow_mut().insert(url.to_string(), Reply::Fail(msg.to_string()));
    }

    /// Hold every response until `release` is called
    pub fn hold(&self) {
        *self.gate.borrow_mut() = Some(smol::channel::unbounded());
    }

    /// Let one held response through
    pub fn release(&self) {
        if let Some((tx, _)) = self.gate.borrow().as_ref() {
            tx.try_send(()).unwrap();
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Transport for StubTransport {
    fn fetch(&self, url: &str, options: &FetchOptions) -> BoxedLocal<Result<Response, NetError>> {
        self.calls.borrow_mut().push(Call {
            url: url.to_string(),
            options: options.clone(),
        });

        let reply = match self.replies.borrow().get(url) {
            Some(Reply::Page(response)) => Ok(response.clone()),
            Some(Reply::Fail(msg)) => Err(msg.clone()),
            None => Ok(Response::new(404, "Not Found", "")),
        };
        let gate = self.gate.borrow().as_ref().map(|(_, rx)| rx.clone());

        Box::pin(async move {
            if let Some(rx) = gate {
                let _ = rx.recv().await;
            }
            reply.map_err(NetError::Network)
        })
    }
}

pub type Log = Rc<RefCell<Vec<(CallbackKind, CallbackData)>>>;

/// Record every callback, chaining to any callback already registered
pub fn record_callbacks(mut options: PjaxOptions, log: &Log) -> PjaxOptions {
    for kind in CallbackKind::ALL {
        let log = log.clone();
        let inner = options.callbacks.get(kind).cloned();
        options = options.on(kind, move |pjax, data| {
            if let Some(inner) = &inner {
                inner(pjax, data);
            }
            log.borrow_mut().push((kind, data.clone()));
        });
    }
    options
}

pub struct Harness {
    pub window: Rc<Window>,
    pub transport: Rc<StubTransport>,
    pub clock: ManualClock,
    pub log: Log,
    pub pjax: Rc<Pjax>,
}

impl Harness {
    pub fn new(options: PjaxOptions) -> Self {
        Self::with_page(options, INDEX)
    }

    pub fn with_page(options: PjaxOptions, html: &str) -> Self {
        Self::try_with_page(options, html).unwrap()
    }

    pub fn try_with_page(options: PjaxOptions, html: &str) -> Result<Self, PjaxError> {
        let clock = ManualClock::new();
        let window = Rc::new(Window::new(BASE, html).unwrap().with_clock(clock.clone()));
        let transport = StubTransport::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));

        let options = record_callbacks(options, &log);
        let pjax = Pjax::new(options, window.clone(), transport.clone())?;

        Ok(Self { window, transport, clock, log, pjax })
    }

    pub fn node(&self, selector: &str) -> fos_dom::NodeId {
        self.window.document().borrow().query_selector(selector).unwrap()
    }

    /// Dispatch a click on the first match; returns whether the default
    /// action still applies
    pub fn click(&self, selector: &str) -> bool {
        self.window.dispatch_event(&DomEvent::click(self.node(selector)))
    }

    pub fn submit(&self, selector: &str) -> bool {
        self.window.dispatch_event(&DomEvent::submit(self.node(selector)))
    }

    pub fn settle(&self) {
        self.window.run_until_stalled();
    }

    pub fn main_html(&self) -> String {
        self.window.inner_html("main").unwrap()
    }

    pub fn kinds(&self) -> Vec<CallbackKind> {
        self.log.borrow().iter().map(|(k, _)| *k).collect()
    }

    pub fn count(&self, kind: CallbackKind) -> usize {
        self.log.borrow().iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn errors(&self) -> Vec<NavigationError> {
        self.log
            .borrow()
            .iter()
            .filter_map(|(_, d)| match d {
                CallbackData::Error(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }
}

/// Route `tracing` output to the test harness; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
