//! Transient notifications with bounded concurrency.
//!
//! # Lifecycle
//!
//! ```text
//! show ─┬─(below cap)──► Showing ──(timer / dismiss / action)──► Leaving
//!       └─(at cap)─────► Queued ──(slot frees up)──┘                │
//!                                                           (exit transition)
//!                                                                   ▼
//!                                                                removed
//! ```
//!
//! A leaving toast still occupies its slot until it is removed; only then is
//! the oldest queued toast promoted. Timers run on a virtual clock moved
//! forward by [`ToastQueue::advance`], so ordering is deterministic and a
//! toast is removed at most once.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use courier_types::{Severity, ToastId, ToastSettings, ToastView};

use crate::presenter::ToastPresenter;

/// Auto-dismiss policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToastDuration {
    /// Per-severity default from [`ToastSettings`].
    #[default]
    Default,
    After(Duration),
    /// Only an explicit dismiss removes it.
    Sticky,
}

pub type ActionCallback = Rc<dyn Fn() -> anyhow::Result<()>>;

#[derive(Clone)]
pub struct ToastAction {
    pub label: String,
    pub callback: ActionCallback,
}

impl ToastAction {
    pub fn new<F>(label: impl Into<String>, callback: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        Self {
            label: label.into(),
            callback: Rc::new(callback),
        }
    }
}

impl fmt::Debug for ToastAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToastOptions {
    pub duration: ToastDuration,
    pub action: Option<ToastAction>,
}

impl ToastOptions {
    #[must_use]
    pub fn sticky() -> Self {
        Self {
            duration: ToastDuration::Sticky,
            action: None,
        }
    }

    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self {
            duration: ToastDuration::After(duration),
            action: None,
        }
    }

    #[must_use]
    pub fn with_action(mut self, action: ToastAction) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Queued,
    Showing { expires: Option<Duration> },
    Leaving { remove_at: Duration },
}

#[derive(Debug)]
struct ToastEntry {
    id: ToastId,
    message: String,
    severity: Severity,
    duration: ToastDuration,
    action: Option<ToastAction>,
    phase: Phase,
}

impl ToastEntry {
    fn view(&self) -> ToastView {
        ToastView {
            id: self.id,
            message: self.message.clone(),
            severity: self.severity,
            action_label: self.action.as_ref().map(|action| action.label.clone()),
        }
    }
}

/// Presenter calls collected while the queue is borrowed and replayed after
/// the borrow ends.
enum Effect {
    Show(ToastView),
    Update(ToastView),
    AnimateOut(ToastId),
    Remove(ToastId),
}

#[derive(Clone, Copy)]
enum Due {
    Expire(ToastId),
    Remove(ToastId),
}

struct QueueCore {
    settings: ToastSettings,
    now: Duration,
    next_id: u64,
    /// On screen, leaving toasts included. Never longer than `max_visible`.
    active: Vec<ToastEntry>,
    waiting: VecDeque<ToastEntry>,
}

impl QueueCore {
    /// Deadline for a toast shown now. A delay past the end of the clock
    /// means no deadline.
    fn expiry(&self, severity: Severity, duration: ToastDuration) -> Option<Duration> {
        let delay = match duration {
            ToastDuration::Default => self.settings.default_duration(severity),
            ToastDuration::After(delay) => Some(delay),
            ToastDuration::Sticky => None,
        };
        delay.and_then(|delay| self.now.checked_add(delay))
    }

    fn has_slot(&self) -> bool {
        self.active.len() < self.settings.max_visible.max(1)
    }

    fn display(&mut self, mut entry: ToastEntry, effects: &mut Vec<Effect>) {
        entry.phase = Phase::Showing {
            expires: self.expiry(entry.severity, entry.duration),
        };
        tracing::debug!(toast = %entry.id, severity = %entry.severity, "Toast shown");
        effects.push(Effect::Show(entry.view()));
        self.active.push(entry);
    }

    fn promote(&mut self, effects: &mut Vec<Effect>) {
        while self.has_slot()
            && let Some(entry) = self.waiting.pop_front()
        {
            self.display(entry, effects);
        }
    }

    fn begin_leave(&mut self, id: ToastId, effects: &mut Vec<Effect>) -> bool {
        let remove_at = self.now.saturating_add(self.settings.exit_transition);
        let Some(entry) = self.active.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        if !matches!(entry.phase, Phase::Showing { .. }) {
            return false;
        }
        entry.phase = Phase::Leaving { remove_at };
        effects.push(Effect::AnimateOut(id));
        true
    }

    fn finalize(&mut self, id: ToastId, effects: &mut Vec<Effect>) {
        let Some(position) = self.active.iter().position(|entry| entry.id == id) else {
            return;
        };
        self.active.remove(position);
        tracing::debug!(toast = %id, "Toast removed");
        effects.push(Effect::Remove(id));
        self.promote(effects);
    }

    /// Remove every leaving toast whose exit transition is over.
    fn settle(&mut self, effects: &mut Vec<Effect>) {
        loop {
            let now = self.now;
            let done = self.active.iter().find_map(|entry| match entry.phase {
                Phase::Leaving { remove_at } if remove_at <= now => Some(entry.id),
                _ => None,
            });
            let Some(id) = done else {
                break;
            };
            self.finalize(id, effects);
        }
    }

    fn dismiss(&mut self, id: ToastId, effects: &mut Vec<Effect>) -> bool {
        if let Some(position) = self.waiting.iter().position(|entry| entry.id == id) {
            self.waiting.remove(position);
            tracing::debug!(toast = %id, "Queued toast dropped");
            return true;
        }
        let started = self.begin_leave(id, effects);
        self.settle(effects);
        started
    }

    /// Earliest timer due at or before `limit`.
    fn next_due(&self, limit: Duration) -> Option<(Duration, Due)> {
        self.active
            .iter()
            .filter_map(|entry| match entry.phase {
                Phase::Showing { expires: Some(at) } => Some((at, Due::Expire(entry.id))),
                Phase::Leaving { remove_at } => Some((remove_at, Due::Remove(entry.id))),
                _ => None,
            })
            .filter(|(at, _)| *at <= limit)
            .min_by_key(|(at, _)| *at)
    }

    fn find_mut(&mut self, id: ToastId) -> Option<&mut ToastEntry> {
        self.active
            .iter_mut()
            .chain(self.waiting.iter_mut())
            .find(|entry| entry.id == id)
    }
}

struct ToastInner {
    presenter: Rc<dyn ToastPresenter>,
    core: RefCell<QueueCore>,
}

impl ToastInner {
    fn flush(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Show(view) => self.presenter.show(&view),
                Effect::Update(view) => self.presenter.update(&view),
                Effect::AnimateOut(id) => self.presenter.animate_out(id),
                Effect::Remove(id) => self.presenter.remove(id),
            }
        }
    }

    fn with_core<R>(&self, f: impl FnOnce(&mut QueueCore, &mut Vec<Effect>) -> R) -> R {
        let mut effects = Vec::new();
        let result = f(&mut self.core.borrow_mut(), &mut effects);
        self.flush(effects);
        result
    }
}

#[derive(Clone)]
pub struct ToastQueue {
    inner: Rc<ToastInner>,
}

impl fmt::Debug for ToastQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.borrow();
        f.debug_struct("ToastQueue")
            .field("now", &core.now)
            .field("active", &core.active.len())
            .field("waiting", &core.waiting.len())
            .finish_non_exhaustive()
    }
}

impl ToastQueue {
    #[must_use]
    pub fn new(settings: ToastSettings, presenter: Rc<dyn ToastPresenter>) -> Self {
        Self {
            inner: Rc::new(ToastInner {
                presenter,
                core: RefCell::new(QueueCore {
                    settings,
                    now: Duration::ZERO,
                    next_id: 0,
                    active: Vec::new(),
                    waiting: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn show(
        &self,
        message: impl Into<String>,
        severity: Severity,
        options: ToastOptions,
    ) -> ToastHandle {
        let id = self.inner.with_core(|core, effects| {
            core.next_id += 1;
            let entry = ToastEntry {
                id: ToastId::new(core.next_id),
                message: message.into(),
                severity,
                duration: options.duration,
                action: options.action,
                phase: Phase::Queued,
            };
            let id = entry.id;
            if core.has_slot() {
                core.display(entry, effects);
            } else {
                tracing::debug!(toast = %id, waiting = core.waiting.len() + 1, "Toast queued");
                core.waiting.push_back(entry);
            }
            id
        });
        ToastHandle {
            queue: self.clone(),
            id,
        }
    }

    pub fn success(&self, message: impl Into<String>) -> ToastHandle {
        self.show(message, Severity::Success, ToastOptions::default())
    }

    pub fn info(&self, message: impl Into<String>) -> ToastHandle {
        self.show(message, Severity::Info, ToastOptions::default())
    }

    pub fn warning(&self, message: impl Into<String>) -> ToastHandle {
        self.show(message, Severity::Warning, ToastOptions::default())
    }

    pub fn error(&self, message: impl Into<String>) -> ToastHandle {
        self.show(message, Severity::Error, ToastOptions::default())
    }

    /// Sticky until resolved through the returned handle.
    pub fn loading(&self, message: impl Into<String>) -> ToastHandle {
        self.show(message, Severity::Loading, ToastOptions::default())
    }

    /// Start the exit of a visible toast, or drop a queued one. Returns
    /// `false` if the toast is unknown or already leaving.
    pub fn dismiss(&self, id: ToastId) -> bool {
        self.inner.with_core(|core, effects| core.dismiss(id, effects))
    }

    /// Replace message (and optionally severity) in place and restart the
    /// auto-dismiss timer. Queue position is unchanged.
    pub fn update(
        &self,
        id: ToastId,
        message: impl Into<String>,
        severity: Option<Severity>,
    ) -> bool {
        self.inner.with_core(|core, effects| {
            let restart = {
                let Some(entry) = core.find_mut(id) else {
                    return false;
                };
                if matches!(entry.phase, Phase::Leaving { .. }) {
                    return false;
                }
                entry.message = message.into();
                if let Some(severity) = severity {
                    entry.severity = severity;
                }
                matches!(entry.phase, Phase::Showing { .. })
                    .then_some((entry.severity, entry.duration))
            };
            if let Some((severity, duration)) = restart {
                let expires = core.expiry(severity, duration);
                if let Some(entry) = core.find_mut(id) {
                    entry.phase = Phase::Showing { expires };
                    effects.push(Effect::Update(entry.view()));
                }
            }
            true
        })
    }

    /// Run the toast's action, then dismiss it. Returns `false` when the
    /// toast has no action or is no longer showing.
    pub fn trigger_action(&self, id: ToastId) -> bool {
        let callback = {
            let core = self.inner.core.borrow();
            core.active
                .iter()
                .find(|entry| entry.id == id && matches!(entry.phase, Phase::Showing { .. }))
                .and_then(|entry| entry.action.as_ref())
                .map(|action| Rc::clone(&action.callback))
        };
        let Some(callback) = callback else {
            return false;
        };
        if let Err(e) = callback() {
            tracing::warn!(toast = %id, "Toast action failed: {e:#}");
        }
        self.dismiss(id);
        true
    }

    /// Drop the queue and start the exit of everything on screen.
    pub fn dismiss_all(&self) {
        self.inner.with_core(|core, effects| {
            core.waiting.clear();
            let showing: Vec<ToastId> = core
                .active
                .iter()
                .filter(|entry| matches!(entry.phase, Phase::Showing { .. }))
                .map(|entry| entry.id)
                .collect();
            for id in showing {
                core.begin_leave(id, effects);
            }
            core.settle(effects);
        });
    }

    /// Move the clock forward, firing every timer that comes due on the way
    /// in deadline order.
    pub fn advance(&self, delta: Duration) {
        self.inner.with_core(|core, effects| {
            let target = core.now.saturating_add(delta);
            while let Some((at, due)) = core.next_due(target) {
                core.now = at;
                match due {
                    Due::Expire(id) => {
                        core.begin_leave(id, effects);
                        core.settle(effects);
                    }
                    Due::Remove(id) => core.finalize(id, effects),
                }
            }
            core.now = target;
        });
    }

    /// Toasts on screen, oldest first. Leaving toasts are included.
    #[must_use]
    pub fn visible(&self) -> Vec<ToastView> {
        self.inner.core.borrow().active.iter().map(ToastEntry::view).collect()
    }

    #[must_use]
    pub fn queued(&self) -> Vec<ToastView> {
        self.inner.core.borrow().waiting.iter().map(ToastEntry::view).collect()
    }

    #[must_use]
    pub fn contains(&self, id: ToastId) -> bool {
        let core = self.inner.core.borrow();
        core.active.iter().chain(core.waiting.iter()).any(|entry| entry.id == id)
    }

    /// Virtual time elapsed since creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.core.borrow().now
    }
}

/// Returned by [`ToastQueue::show`].
#[derive(Debug, Clone)]
pub struct ToastHandle {
    queue: ToastQueue,
    id: ToastId,
}

impl ToastHandle {
    #[must_use]
    pub fn id(&self) -> ToastId {
        self.id
    }

    pub fn dismiss(&self) -> bool {
        self.queue.dismiss(self.id)
    }

    pub fn update(&self, message: impl Into<String>, severity: Option<Severity>) -> bool {
        self.queue.update(self.id, message, severity)
    }

    /// Still visible or queued. A leaving toast counts until it is removed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.queue.contains(self.id)
    }
}
