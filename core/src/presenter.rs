//! Display seams for overlays.
//!
//! [`ModalStack`](crate::ModalStack) and [`ToastQueue`](crate::ToastQueue)
//! own ordering, timing and lifecycle; presenters only draw. All methods take
//! `&self` and are called with no internal borrow held, so an implementation
//! may call back into the stack or queue.

use std::cell::RefCell;

use courier_types::{FieldData, ModalId, ModalOrder, ToastId, ToastView};

pub trait ModalPresenter {
    /// Apply field data and make the overlay visible.
    fn reveal(&self, id: &ModalId, fields: &FieldData);
    fn focus_first(&self, id: &ModalId);
    fn hide(&self, id: &ModalId);
    /// New bottom-to-top order after an out-of-order close or bring-to-front.
    fn restack(&self, order: &ModalOrder);
}

pub trait ToastPresenter {
    fn show(&self, toast: &ToastView);
    fn update(&self, toast: &ToastView);
    /// Start the exit transition. `remove` follows once it has elapsed.
    fn animate_out(&self, id: ToastId);
    fn remove(&self, id: ToastId);
}

/// Draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl ModalPresenter for NullPresenter {
    fn reveal(&self, _id: &ModalId, _fields: &FieldData) {}
    fn focus_first(&self, _id: &ModalId) {}
    fn hide(&self, _id: &ModalId) {}
    fn restack(&self, _order: &ModalOrder) {}
}

impl ToastPresenter for NullPresenter {
    fn show(&self, _toast: &ToastView) {}
    fn update(&self, _toast: &ToastView) {}
    fn animate_out(&self, _id: ToastId) {}
    fn remove(&self, _id: ToastId) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterCall {
    Reveal(ModalId, FieldData),
    FocusFirst(ModalId),
    Hide(ModalId),
    Restack(ModalOrder),
    Show(ToastView),
    Update(ToastView),
    AnimateOut(ToastId),
    Remove(ToastId),
}

/// Keeps every call in order. Lets headless hosts and tests assert on what
/// would have been drawn.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    calls: RefCell<Vec<PresenterCall>>,
}

impl RecordingPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.borrow().clone()
    }

    /// Return and forget everything recorded so far.
    pub fn take(&self) -> Vec<PresenterCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    fn record(&self, call: PresenterCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl ModalPresenter for RecordingPresenter {
    fn reveal(&self, id: &ModalId, fields: &FieldData) {
        self.record(PresenterCall::Reveal(id.clone(), fields.clone()));
    }

    fn focus_first(&self, id: &ModalId) {
        self.record(PresenterCall::FocusFirst(id.clone()));
    }

    fn hide(&self, id: &ModalId) {
        self.record(PresenterCall::Hide(id.clone()));
    }

    fn restack(&self, order: &ModalOrder) {
        self.record(PresenterCall::Restack(order.clone()));
    }
}

impl ToastPresenter for RecordingPresenter {
    fn show(&self, toast: &ToastView) {
        self.record(PresenterCall::Show(toast.clone()));
    }

    fn update(&self, toast: &ToastView) {
        self.record(PresenterCall::Update(toast.clone()));
    }

    fn animate_out(&self, id: ToastId) {
        self.record(PresenterCall::AnimateOut(id));
    }

    fn remove(&self, id: ToastId) {
        self.record(PresenterCall::Remove(id));
    }
}
