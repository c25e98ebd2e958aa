//! Timers
//!
//! The faux-load delay goes through a [`Clock`] so it can run on real time
//! ([`SystemClock`]) or on a virtual clock advanced by hand ([`ManualClock`]).

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use smol::Timer;
use smol::future::BoxedLocal;

pub trait Clock {
    /// Time elapsed since the clock started
    fn now(&self) -> Duration;

    /// Future that completes once `duration` has elapsed
    fn sleep(&self, duration: Duration) -> BoxedLocal<()>;
}

/// Wall-clock timers backed by `smol::Timer`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) -> BoxedLocal<()> {
        Box::pin(async move {
            Timer::after(duration).await;
        })
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Cell<Duration>,
    waiters: RefCell<Vec<Waker>>,
}

/// Virtual clock; time only moves on [`ManualClock::advance`]
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Rc<ManualState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward and wake sleepers
    pub fn advance(&self, by: Duration) {
        self.state.now.set(self.state.now.get() + by);
        let waiters = std::mem::take(&mut *self.state.waiters.borrow_mut());
        for waker in waiters {
            waker.wake();
        }
    }

    /// Number of sleepers registered since the last advance
    pub fn pending_sleepers(&self) -> usize {
        self.state.waiters.borrow().len()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.state.now.get()
    }

    fn sleep(&self, duration: Duration) -> BoxedLocal<()> {
        Box::pin(ManualSleep {
            state: self.state.clone(),
            deadline: self.state.now.get() + duration,
        })
    }
}

struct ManualSleep {
    state: Rc<ManualState>,
    deadline: Duration,
}

impl Future for ManualSleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.state.now.get() >= self.deadline {
            return Poll::Ready(());
        }
        self.state.waiters.borrow_mut().push(cx.waker().clone());
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol::LocalExecutor;

    #[test]
    fn test_manual_sleep_waits_for_advance() {
        let clock = ManualClock::new();
        let executor = LocalExecutor::new();
        let done = Rc::new(Cell::new(false));

        let flag = done.clone();
        let sleep = clock.sleep(Duration::from_millis(300));
        executor
            .spawn(async move {
                sleep.await;
                flag.set(true);
            })
            .detach();

        while executor.try_tick() {}
        assert!(!done.get());
        assert_eq!(clock.pending_sleepers(), 1);

        clock.advance(Duration::from_millis(299));
        while executor.try_tick() {}
        assert!(!done.get());

        clock.advance(Duration::from_millis(1));
        while executor.try_tick() {}
        assert!(done.get());
        assert_eq!(clock.now(), Duration::from_millis(300));
    }

    #[test]
    fn test_zero_sleep_is_ready() {
        let clock = ManualClock::new();
        smol::block_on(clock.sleep(Duration::ZERO));
    }

    #[test]
    fn test_system_clock_sleep() {
        let clock = SystemClock::new();
        smol::block_on(clock.sleep(Duration::from_millis(5)));
        assert!(clock.now() >= Duration::from_millis(5));
    }
}
