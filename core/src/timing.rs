//! Rate-limiting helpers for input-driven callbacks (search boxes, scroll,
//! typing indicators). Both run on a virtual clock the host moves with
//! `advance`.

use std::fmt;
use std::time::Duration;

type Callback<T> = Box<dyn FnMut(T) -> anyhow::Result<()>>;

fn run<T>(callback: &mut Callback<T>, value: T, kind: &str) {
    if let Err(e) = callback(value) {
        tracing::warn!(kind, "Timed callback failed: {e:#}");
    }
}

/// Fires once, with the most recent value, after `quiet` has passed without
/// another trigger.
pub struct Debounce<T> {
    quiet: Duration,
    now: Duration,
    pending: Option<(Duration, T)>,
    callback: Callback<T>,
}

impl<T> fmt::Debug for Debounce<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounce")
            .field("quiet", &self.quiet)
            .field("now", &self.now)
            .field("pending", &self.pending.as_ref().map(|(at, _)| *at))
            .finish_non_exhaustive()
    }
}

impl<T> Debounce<T> {
    pub fn new<F>(quiet: Duration, callback: F) -> Self
    where
        F: FnMut(T) -> anyhow::Result<()> + 'static,
    {
        Self {
            quiet,
            now: Duration::ZERO,
            pending: None,
            callback: Box::new(callback),
        }
    }

    /// Replace any pending value and restart the quiet period.
    pub fn trigger(&mut self, value: T) {
        self.pending = Some((self.now.saturating_add(self.quiet), value));
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns whether the callback ran.
    pub fn advance(&mut self, delta: Duration) -> bool {
        self.now = self.now.saturating_add(delta);
        match self.pending.take() {
            Some((at, value)) if at <= self.now => {
                run(&mut self.callback, value, "debounce");
                true
            }
            other => {
                self.pending = other;
                false
            }
        }
    }
}

/// Runs at most once per `interval`. The first trigger of a window runs
/// immediately; later ones inside the same window are dropped.
pub struct Throttle<T> {
    interval: Duration,
    now: Duration,
    open_at: Duration,
    callback: Callback<T>,
}

impl<T> fmt::Debug for Throttle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.interval)
            .field("now", &self.now)
            .field("open_at", &self.open_at)
            .finish_non_exhaustive()
    }
}

impl<T> Throttle<T> {
    pub fn new<F>(interval: Duration, callback: F) -> Self
    where
        F: FnMut(T) -> anyhow::Result<()> + 'static,
    {
        Self {
            interval,
            now: Duration::ZERO,
            open_at: Duration::ZERO,
            callback: Box::new(callback),
        }
    }

    /// Returns whether the callback ran.
    pub fn trigger(&mut self, value: T) -> bool {
        if self.now < self.open_at {
            return false;
        }
        self.open_at = self.now.saturating_add(self.interval);
        run(&mut self.callback, value, "throttle");
        true
    }

    pub fn advance(&mut self, delta: Duration) {
        self.now = self.now.saturating_add(delta);
    }
}
