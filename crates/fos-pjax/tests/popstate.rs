//! Back/forward navigation tests
//!
//! Cached snapshots rendered after the faux load delay, refetching on cache
//! miss or untracked entries, and same-path hash changes.

mod common;

use std::time::Duration;

use common::*;
use fos_pjax::CallbackKind::*;
use fos_pjax::*;

const PAGE_1: &str = "http://site.test/page1.html";
const PAGE_2: &str = "http://site.test/page2.html";

/// Harness that has visited page 1 then page 2
fn visited(options: PjaxOptions) -> Harness {
    let h = Harness::new(options);
    h.transport.page(PAGE_1, &page("Page 1", "one"));
    h.transport.page(PAGE_2, &page("Page 2", "two"));

    h.click("#to-1");
    h.settle();
    h.click("#to-2");
    h.settle();

    assert_eq!(h.main_html(), "two");
    assert_eq!(h.window.history().length(), 3);
    h.clear_log();
    h
}

// ============================================================================
// CACHE HIT
// ============================================================================

#[test]
fn test_back_renders_cache_after_faux_delay() {
    init_tracing();
    let h = visited(PjaxOptions::default());

    assert!(h.window.back());
    h.settle();
    assert_eq!(h.kinds(), [BeforePjax]);
    assert_eq!(h.main_html(), "two");

    h.clock.advance(Duration::from_millis(299));
    h.settle();
    assert_eq!(h.main_html(), "two", "rendered before the delay elapsed");

    h.clock.advance(Duration::from_millis(1));
    h.settle();
    assert_eq!(h.main_html(), "one");
    assert_eq!(h.window.title(), "Page 1");

    assert_eq!(h.transport.call_count(), 2, "cache hit must not refetch");
    assert_eq!(
        h.kinds(),
        [
            BeforePjax,
            BeforeRender,
            BeforeTargetRender,
            AfterTargetRender,
            BeforeTargetRender,
            AfterTargetRender,
            AfterRender,
            SuccessPjax,
            CompletePjax,
        ]
    );
    assert_eq!(h.pjax.current_pathname(), "/page1.html");
}

#[test]
fn test_back_restores_recorded_entry() {
    let h = visited(PjaxOptions::default());

    h.window.back();
    h.clock.advance(Duration::from_millis(300));
    h.settle();

    let history = h.window.history();
    assert_eq!(history.length(), 3);
    assert_eq!(history.index(), 1);
    drop(history);

    let state = h.window.history_state().unwrap();
    assert_eq!(state.url, PAGE_1);
    assert_eq!(state.html().unwrap(), page("Page 1", "one"));

    let log = h.log.borrow();
    let success = log.iter().find_map(|(_, d)| match d {
        CallbackData::Success { url, html } => Some((url.clone(), html.clone())),
        _ => None,
    });
    assert_eq!(success, Some((PAGE_1.to_string(), page("Page 1", "one"))));
}

#[test]
fn test_back_to_initial_entry_and_forward_again() {
    let h = visited(PjaxOptions::default().pop_state_faux_load_time(Duration::ZERO));

    assert!(h.window.go(-2));
    h.settle();
    assert_eq!(h.main_html(), "<h1>Home</h1>");
    assert_eq!(h.window.title(), "Home");

    assert!(h.window.forward());
    h.settle();
    assert_eq!(h.main_html(), "one");
    assert_eq!(h.transport.call_count(), 2);
}

#[test]
fn test_cached_hash_is_scrolled_to() {
    let h = Harness::new(PjaxOptions::default().pop_state_faux_load_time(Duration::ZERO));
    h.transport.page(PAGE_1, &page("Page 1", "<h2 id=\"section\">S</h2>"));
    h.transport.page(PAGE_2, &page("Page 2", "two"));

    h.click("#to-1-hash");
    h.settle();
    let first = h.node("#section");
    assert_eq!(h.window.scrolled_to(), Some(first));

    h.click("#to-2");
    h.settle();
    h.window.back();
    h.settle();

    let restored = h.node("#section");
    assert_eq!(h.window.scrolled_to(), Some(restored));
    let document = h.window.document().borrow();
    assert!(document.tree().is_connected(restored));
    assert_eq!(document.tree().text_content(restored), "S");
}

// ============================================================================
// CACHE MISS
// ============================================================================

#[test]
fn test_cache_disabled_refetches_without_new_entry() {
    let h = visited(PjaxOptions::default().pop_state_use_content_cache(false));

    h.window.back();
    h.settle();

    let calls = h.transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].url, PAGE_1);
    assert_eq!(h.main_html(), "one");
    assert_eq!(h.window.history().length(), 3);
    assert_eq!(h.window.history().index(), 1);
}

#[test]
fn test_untracked_entry_refetches_location() {
    let h = Harness::new(PjaxOptions::default().track_initial_state(false));
    h.transport.page(PAGE_1, &page("Page 1", "one"));
    h.transport.page(BASE, &page("Home again", "home"));

    h.click("#to-1");
    h.settle();
    h.window.back();
    h.settle();

    let calls = h.transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].url, BASE);
    assert_eq!(h.main_html(), "home");
    assert_eq!(h.window.history().length(), 2);
}

// ============================================================================
// HASH CHANGES
// ============================================================================

#[test]
fn test_same_path_popstate_is_ignored() {
    let h = Harness::new(PjaxOptions::default());
    h.window.push_state(&HistoryEntry::new("http://site.test/#top", "<main>x</main>"), "/#top");

    assert!(h.window.back());
    h.settle();
    assert!(h.window.forward());
    h.settle();

    assert_eq!(h.transport.call_count(), 0);
    assert!(h.log.borrow().is_empty());
    assert_eq!(h.main_html(), "<h1>Home</h1>");
}
