//! Prints overlay changes to stdout.

use std::io::{self, Write};

use courier_engine::types::{FieldData, ModalId, ModalOrder, ToastId, ToastView};
use courier_engine::{ModalPresenter, ToastPresenter};

#[derive(Debug, Default)]
pub struct PrintingPresenter;

fn say(line: &str) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{line}");
}

impl ModalPresenter for PrintingPresenter {
    fn reveal(&self, id: &ModalId, fields: &FieldData) {
        if fields.is_empty() {
            say(&format!("[modal] {id} open"));
        } else {
            say(&format!("[modal] {id} open {fields:?}"));
        }
    }

    fn focus_first(&self, _id: &ModalId) {}

    fn hide(&self, id: &ModalId) {
        say(&format!("[modal] {id} closed"));
    }

    fn restack(&self, order: &ModalOrder) {
        let ids: Vec<&str> = order.0.iter().map(ModalId::as_str).collect();
        say(&format!("[modal] stack {}", ids.join(" > ")));
    }
}

impl ToastPresenter for PrintingPresenter {
    fn show(&self, toast: &ToastView) {
        let action = toast
            .action_label
            .as_deref()
            .map(|label| format!(" [{label}]"))
            .unwrap_or_default();
        say(&format!(
            "[toast #{}] {}: {}{action}",
            toast.id, toast.severity, toast.message
        ));
    }

    fn update(&self, toast: &ToastView) {
        say(&format!(
            "[toast #{}] {} (updated): {}",
            toast.id, toast.severity, toast.message
        ));
    }

    fn animate_out(&self, _id: ToastId) {}

    fn remove(&self, id: ToastId) {
        say(&format!("[toast #{id}] gone"));
    }
}
