//! Modal stack and toast queue driven through the runtime

use std::time::Duration;

use courier_engine::types::{FieldData, Key, ModalId, ModalOrder, Severity};
use courier_engine::{ACTIVE_MODAL_KEY, PresenterCall};

use crate::common::harness;

#[test]
fn escape_closes_only_the_topmost_modal() {
    let h = harness();
    h.runtime.modals().open("x", &FieldData::new());
    h.runtime.modals().open("y", &FieldData::new());

    h.runtime.key_press(Key::Escape);

    assert!(h.runtime.modals().is_open(&ModalId::new("x")));
    assert!(!h.runtime.modals().is_open(&ModalId::new("y")));
    assert_eq!(
        h.runtime.state().get::<String>(ACTIVE_MODAL_KEY).as_deref(),
        Some("x")
    );
}

#[test]
fn overlay_click_and_other_keys() {
    let h = harness();
    h.runtime.modals().open("settings", &FieldData::new());

    h.runtime.key_press(Key::Enter);
    assert!(h.runtime.modals().is_open(&ModalId::new("settings")));

    h.runtime.overlay_click();
    assert!(h.runtime.modals().is_empty());
    assert_eq!(h.runtime.state().get_value(ACTIVE_MODAL_KEY), Some(serde_json::Value::Null));
}

#[test]
fn modal_fields_reach_the_presenter_before_focus() {
    let h = harness();
    let mut fields = FieldData::new();
    fields.insert("title".to_string(), "Rename chat".to_string());

    h.runtime.modals().open("rename", &fields);

    let id = ModalId::new("rename");
    assert_eq!(
        h.presenter.take(),
        vec![
            PresenterCall::Reveal(id.clone(), fields),
            PresenterCall::FocusFirst(id),
        ]
    );
}

#[test]
fn closing_a_lower_modal_restacks_the_rest() {
    let h = harness();
    for id in ["a", "b", "c"] {
        h.runtime.modals().open(id, &FieldData::new());
    }
    h.presenter.take();

    assert!(h.runtime.modals().close(Some(&ModalId::new("b"))));

    let order = ModalOrder(vec![ModalId::new("a"), ModalId::new("c")]);
    assert_eq!(
        h.presenter.take(),
        vec![
            PresenterCall::Hide(ModalId::new("b")),
            PresenterCall::Restack(order.clone()),
        ]
    );
    assert_eq!(h.runtime.modals().stack(), order);
}

#[test]
fn four_toasts_show_three_and_queue_one() {
    let h = harness();
    let toasts = h.runtime.toasts();
    let first = toasts.info("one");
    toasts.info("two");
    toasts.info("three");
    let fourth = toasts.info("four");

    assert_eq!(toasts.visible().len(), 3);
    assert_eq!(toasts.queued().len(), 1);
    assert!(!h.presenter.calls().iter().any(
        |call| matches!(call, PresenterCall::Show(view) if view.id == fourth.id())
    ));

    assert!(first.dismiss());
    h.runtime.advance(toasts_exit());

    let visible: Vec<String> = toasts.visible().into_iter().map(|t| t.message).collect();
    assert_eq!(visible, vec!["two", "three", "four"]);
    assert!(toasts.queued().is_empty());
}

#[test]
fn toasts_expire_by_severity() {
    let h = harness();
    let toasts = h.runtime.toasts();
    let success = toasts.success("Saved");
    let error = toasts.error("Failed");
    let loading = toasts.loading("Uploading");

    h.runtime.advance(Duration::from_millis(3000) + toasts_exit());
    assert!(!success.is_active());
    assert!(error.is_active());

    h.runtime.advance(Duration::from_secs(60));
    assert!(!error.is_active());
    assert!(loading.is_active());

    assert!(loading.update("Uploaded", Some(Severity::Success)));
    h.runtime.advance(Duration::from_millis(3000) + toasts_exit());
    assert!(!loading.is_active());
}

fn toasts_exit() -> Duration {
    Duration::from_millis(300)
}
