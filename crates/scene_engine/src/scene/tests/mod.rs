//! Scenario tests driving the scene through whole frames

mod update_order;

use std::cell::RefCell;
use std::rc::Rc;

use crate::scene::{Component, ComponentContext};

/// Shared record of `(label, hook)` pairs
pub(super) type CallLog = Rc<RefCell<Vec<(String, &'static str)>>>;

pub(super) fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Hooks recorded for one label, in call order
pub(super) fn hooks_of(log: &CallLog, label: &str) -> Vec<&'static str> {
    log.borrow()
        .iter()
        .filter(|(who, _)| who == label)
        .map(|&(_, hook)| hook)
        .collect()
}

/// Component that records every hook it receives
pub(super) struct Probe {
    label: String,
    log: CallLog,
}

impl Probe {
    pub(super) fn new(label: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            log: Rc::clone(log),
        }
    }

    fn record(&self, hook: &'static str) {
        self.log.borrow_mut().push((self.label.clone(), hook));
    }
}

impl Component for Probe {
    fn on_create(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("create");
    }

    fn on_start(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("start");
    }

    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("enable");
    }

    fn on_update(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("update");
    }

    fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("disable");
    }

    fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("destroy");
    }
}
