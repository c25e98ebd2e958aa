//! fOS PJAX
//!
//! Turns link activations and form submissions into asynchronous page
//! fetches, swapping named regions of the live document for the matching
//! regions of the fetched page while keeping session history in sync.
//!
//! ```no_run
//! use std::rc::Rc;
//! use fos_net::ResourceLoader;
//! use fos_pjax::{CallbackKind, Pjax, PjaxOptions, Window};
//!
//! let window = Rc::new(Window::new("http://localhost:8080/", "<title>Home</title><main></main>")?);
//! let options = PjaxOptions::default()
//!     .on(CallbackKind::CompletePjax, |_, _| println!("done"));
//! let pjax = Pjax::new(options, window.clone(), Rc::new(ResourceLoader::new()))?;
//! # drop(pjax);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod callbacks;
mod clock;
mod config;
mod engine;
mod env;
mod error;
mod events;
pub mod form;
mod history;
mod render;
pub mod session;
mod targets;
mod window;

pub use callbacks::{Callback, CallbackData, CallbackKind, Callbacks, TargetRenderData, TriggerCallback};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ModifyFetchOptions, PartialOptions, PjaxOptions, TargetRenderer, TargetSpec};
pub use engine::Pjax;
pub use env::{BrowserEnv, DomEvent, EventListener, Modifiers, PopStateEvent, PopStateListener};
pub use error::{ErrorContext, NavigationError, PjaxError};
pub use events::link_destination;
pub use history::{HistoryEntry, HistoryMode};
pub use targets::{RegisteredTarget, TargetRegistry};
pub use window::Window;
