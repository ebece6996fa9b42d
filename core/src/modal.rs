//! Stacked overlay visibility.
//!
//! Stack order is open order, top last. Opening an id that is already on the
//! stack moves it to the top instead of adding a second entry. Any entry can
//! be closed by id; Escape and backdrop clicks only ever close the top.
//! After every change the top id is mirrored into State under
//! [`ACTIVE_MODAL_KEY`] (`null` when nothing is open).

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use courier_types::{Event, EventName, FieldData, Key, ModalId, ModalOrder};

use crate::bus::{EventBus, SubscribeOptions, Subscription, handler};
use crate::presenter::ModalPresenter;
use crate::state::State;

pub const ACTIVE_MODAL_KEY: &str = "ui.active_modal";

struct ModalInner {
    state: State,
    bus: EventBus,
    presenter: Rc<dyn ModalPresenter>,
    stack: RefCell<Vec<ModalId>>,
    dismissal: RefCell<Vec<Subscription>>,
}

impl ModalInner {
    fn order(&self) -> ModalOrder {
        ModalOrder(self.stack.borrow().clone())
    }

    fn top(&self) -> Option<ModalId> {
        self.stack.borrow().last().cloned()
    }

    fn sync_active(&self) {
        let top = self.top();
        if let Err(e) = self.state.set(ACTIVE_MODAL_KEY, &top) {
            tracing::warn!("Failed to record active modal: {e}");
        }
    }

    fn close(&self, id: Option<&ModalId>) -> bool {
        let (closed, was_top) = {
            let mut stack = self.stack.borrow_mut();
            let position = match id {
                Some(id) => stack.iter().position(|open| open == id),
                None => stack.len().checked_sub(1),
            };
            let Some(position) = position else {
                return false;
            };
            let was_top = position + 1 == stack.len();
            (stack.remove(position), was_top)
        };

        self.presenter.hide(&closed);
        if !was_top {
            self.presenter.restack(&self.order());
        }
        self.sync_active();
        tracing::debug!(modal = %closed, "Modal closed");
        self.bus.emit(&Event::ModalClosed { id: closed });
        true
    }
}

#[derive(Clone)]
pub struct ModalStack {
    inner: Rc<ModalInner>,
}

impl fmt::Debug for ModalStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalStack")
            .field("stack", &self.inner.stack.borrow())
            .field("attached", &!self.inner.dismissal.borrow().is_empty())
            .finish_non_exhaustive()
    }
}

impl ModalStack {
    #[must_use]
    pub fn new(state: State, presenter: Rc<dyn ModalPresenter>) -> Self {
        Self {
            inner: Rc::new(ModalInner {
                bus: state.bus().clone(),
                state,
                presenter,
                stack: RefCell::default(),
                dismissal: RefCell::default(),
            }),
        }
    }

    /// Show `id` on top of the stack with `fields` applied.
    pub fn open(&self, id: impl Into<ModalId>, fields: &FieldData) -> ModalHandle {
        let id = id.into();
        self.inner.presenter.reveal(&id, fields);

        let moved = {
            let mut stack = self.inner.stack.borrow_mut();
            let existing = stack.iter().position(|open| *open == id);
            if let Some(position) = existing {
                stack.remove(position);
            }
            stack.push(id.clone());
            existing.is_some()
        };
        if moved {
            self.inner.presenter.restack(&self.inner.order());
        }

        self.inner.sync_active();
        tracing::debug!(modal = %id, moved, "Modal opened");
        self.inner.bus.emit(&Event::ModalOpened { id: id.clone() });
        self.inner.presenter.focus_first(&id);

        ModalHandle {
            stack: self.clone(),
            id,
        }
    }

    /// Close `id`, or the top when `None`. Returns `false` if nothing was
    /// closed.
    pub fn close(&self, id: Option<&ModalId>) -> bool {
        self.inner.close(id)
    }

    /// Close everything, top first.
    pub fn close_all(&self) -> usize {
        let mut closed = 0;
        while self.inner.close(None) {
            closed += 1;
        }
        closed
    }

    #[must_use]
    pub fn is_open(&self, id: &ModalId) -> bool {
        self.inner.stack.borrow().contains(id)
    }

    #[must_use]
    pub fn top(&self) -> Option<ModalId> {
        self.inner.top()
    }

    #[must_use]
    pub fn stack(&self) -> ModalOrder {
        self.inner.order()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.stack.borrow().is_empty()
    }

    /// Close the top modal on Escape and on backdrop clicks. Calling it again
    /// while attached does nothing.
    pub fn attach(&self) {
        if !self.inner.dismissal.borrow().is_empty() {
            return;
        }
        let on_key = Rc::downgrade(&self.inner);
        let on_click = Weak::clone(&on_key);
        let subscriptions = vec![
            self.inner.bus.on(
                EventName::KeyPress,
                handler(move |event| {
                    if let Event::KeyPressed(Key::Escape) = event
                        && let Some(inner) = on_key.upgrade()
                    {
                        inner.close(None);
                    }
                    Ok(())
                }),
                SubscribeOptions::default(),
            ),
            self.inner.bus.on(
                EventName::OverlayClick,
                handler(move |_| {
                    if let Some(inner) = on_click.upgrade() {
                        inner.close(None);
                    }
                    Ok(())
                }),
                SubscribeOptions::default(),
            ),
        ];
        *self.inner.dismissal.borrow_mut() = subscriptions;
    }

    pub fn detach(&self) {
        for subscription in self.inner.dismissal.borrow_mut().drain(..) {
            subscription.unsubscribe();
        }
    }
}

/// Returned by [`ModalStack::open`].
#[derive(Debug, Clone)]
pub struct ModalHandle {
    stack: ModalStack,
    id: ModalId,
}

impl ModalHandle {
    #[must_use]
    pub fn id(&self) -> &ModalId {
        &self.id
    }

    pub fn close(&self) -> bool {
        self.stack.close(Some(&self.id))
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.stack.is_open(&self.id)
    }
}
