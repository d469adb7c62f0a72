//! Event dispatch, focus tracking and a virtual clock over [`MemoryDom`]
//!
//! `Page` plays the part of the browser: it owns the document, keeps the
//! listener registry, bubbles events from target to root, and simulates the
//! user actions the integration tests need (typing, clearing, leaving a
//! field, clicking a submit button). Timers only run when the clock is
//! advanced explicitly.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use super::{DomError, MemoryDom, NodeId};
use crate::dom::{
    DomEvent, EventHost, EventKind, Listener, Scheduler, Subscription, TimerCallback, TimerId,
};

/// Simulated time between two typed characters
pub const KEYSTROKE_INTERVAL: Duration = Duration::from_millis(0);

/// What a click on a control led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The control does not submit a form, or is disabled
    NotSubmitted,
    /// A listener prevented the submit default action
    Prevented,
    Submitted,
}

struct Registration {
    id: u64,
    target: NodeId,
    kind: EventKind,
    listener: Listener<MemoryDom>,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    entries: Vec<Registration>,
}

impl ListenerRegistry {
    fn matching(&self, target: NodeId, kind: EventKind) -> Vec<Listener<MemoryDom>> {
        self.entries
            .iter()
            .filter(|entry| entry.target == target && entry.kind == kind)
            .map(|entry| entry.listener.clone())
            .collect()
    }
}

struct PendingTimer {
    id: u64,
    due: Duration,
    callback: TimerCallback<MemoryDom>,
}

/// Timer queue driven by a manually advanced clock
#[derive(Default)]
pub struct VirtualTimers {
    clock: Cell<Duration>,
    next_id: Cell<u64>,
    queue: RefCell<Vec<PendingTimer>>,
}

impl VirtualTimers {
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Remove the earliest timer due at or before `limit` (ties by creation order)
    fn take_due(&self, limit: Duration, only: Option<&[u64]>) -> Option<PendingTimer> {
        let mut queue = self.queue.borrow_mut();
        let index = queue
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= limit)
            .filter(|(_, timer)| only.map_or(true, |ids| ids.contains(&timer.id)))
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)?;
        Some(queue.remove(index))
    }
}

impl Scheduler<MemoryDom> for VirtualTimers {
    fn now(&self) -> Duration {
        self.clock.get()
    }

    fn set_timeout(&self, delay: Duration, callback: TimerCallback<MemoryDom>) -> TimerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.queue.borrow_mut().push(PendingTimer {
            id,
            due: self.clock.get() + delay,
            callback,
        });
        TimerId(id)
    }

    fn clear_timeout(&self, id: TimerId) {
        self.queue.borrow_mut().retain(|timer| timer.id != id.0);
    }
}

/// A document plus the browser behaviour around it
pub struct Page {
    dom: MemoryDom,
    listeners: Rc<RefCell<ListenerRegistry>>,
    timers: Rc<VirtualTimers>,
    focused: Option<NodeId>,
}

impl Page {
    pub fn new(dom: MemoryDom) -> Self {
        Self {
            dom,
            listeners: Rc::new(RefCell::new(ListenerRegistry::default())),
            timers: Rc::new(VirtualTimers::default()),
            focused: None,
        }
    }

    pub fn parse(html: &str) -> Result<Self, DomError> {
        Ok(Self::new(MemoryDom::parse(html)?))
    }

    pub fn dom(&self) -> &MemoryDom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut MemoryDom {
        &mut self.dom
    }

    /// Look up `data-testid="{id}"`
    pub fn get_by_test_id(&self, id: &str) -> Result<NodeId, DomError> {
        self.dom
            .by_test_id(id)
            .ok_or_else(|| DomError::NotFound(format!("[data-testid={}]", id)))
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    /// `listener_count` readable from callbacks that cannot borrow the page
    pub fn listener_counter(&self) -> impl Fn() -> usize + 'static {
        let registry = Rc::downgrade(&self.listeners);
        move || registry.upgrade().map_or(0, |registry| registry.borrow().entries.len())
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Dispatch a bubbling event at `target`; returns false if the default was prevented
    pub fn dispatch(&mut self, target: NodeId, kind: EventKind) -> bool {
        let event = DomEvent::new(kind, Some(target), self.now());
        let path: Vec<NodeId> = self.dom.ancestors(target).collect();

        for node in path {
            // collected up front so listeners may (un)subscribe while running
            let listeners = self.listeners.borrow().matching(node, kind);
            for listener in listeners {
                listener(&mut self.dom, &event);
            }
        }

        !event.default_prevented()
    }

    /// Move focus to `node`; the previously focused element receives `focusout`
    pub fn focus(&mut self, node: NodeId) {
        if self.focused == Some(node) {
            return;
        }
        if let Some(previous) = self.focused.take() {
            self.dispatch(previous, EventKind::FocusOut);
        }
        self.focused = Some(node);
    }

    /// Leave the focused element
    pub fn blur(&mut self) {
        if let Some(previous) = self.focused.take() {
            self.dispatch(previous, EventKind::FocusOut);
        }
    }

    /// Focus the field and type `text` one character at a time, firing `input` per character
    pub fn type_text(&mut self, field: NodeId, text: &str) {
        if self.dom.is_disabled_node(field) {
            return;
        }
        self.focus(field);

        for ch in text.chars() {
            let mut value = self.dom.value_of(field);
            value.push(ch);
            self.dom.set_value_of(field, &value);
            self.dispatch(field, EventKind::Input);
            self.advance(KEYSTROKE_INTERVAL);
        }
    }

    /// Focus the field and delete its content, firing one `input`
    pub fn clear(&mut self, field: NodeId) {
        if self.dom.is_disabled_node(field) {
            return;
        }
        self.focus(field);

        if !self.dom.value_of(field).is_empty() {
            self.dom.set_value_of(field, "");
            self.dispatch(field, EventKind::Input);
        }
    }

    /// Clear the field, then type `text`
    pub fn replace_text(&mut self, field: NodeId, text: &str) {
        self.clear(field);
        self.type_text(field, text);
    }

    /// Programmatic `field.value = ...`; fires no event
    pub fn set_value(&mut self, field: NodeId, value: &str) {
        self.dom.set_value_of(field, value);
    }

    /// Click an element; submit controls submit their form
    pub fn click(&mut self, node: NodeId) -> Submission {
        if self.dom.is_disabled_node(node) {
            return Submission::NotSubmitted;
        }
        self.focus(node);

        if !self.dom.is_submit_control(node) {
            return Submission::NotSubmitted;
        }
        let Some(form) = self.dom.form_of(node) else {
            return Submission::NotSubmitted;
        };

        if self.dispatch(form, EventKind::Submit) {
            Submission::Submitted
        } else {
            Submission::Prevented
        }
    }

    /// Move the clock forward by `by`, running every timer that falls due
    pub fn advance(&mut self, by: Duration) {
        let target = self.now() + by;
        while let Some(timer) = self.timers.take_due(target, None) {
            self.run_timer(timer);
        }
        self.timers.clock.set(target);
    }

    /// Run the timers that are queued right now, but none they schedule
    pub fn run_pending_timers(&mut self) {
        let ids: Vec<u64> = self.timers.queue.borrow().iter().map(|timer| timer.id).collect();
        while let Some(timer) = self.timers.take_due(Duration::MAX, Some(&ids)) {
            self.run_timer(timer);
        }
    }

    fn run_timer(&mut self, timer: PendingTimer) {
        if timer.due > self.timers.clock.get() {
            self.timers.clock.set(timer.due);
        }
        let now = self.timers.clock.get();
        (timer.callback)(&mut self.dom, now);
    }
}

impl EventHost<MemoryDom> for Page {
    fn listen(&mut self, target: &NodeId, kind: EventKind, listener: Listener<MemoryDom>) -> Subscription {
        let id = {
            let mut registry = self.listeners.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push(Registration {
                id,
                target: *target,
                kind,
                listener,
            });
            id
        };

        let registry: Weak<RefCell<ListenerRegistry>> = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().entries.retain(|entry| entry.id != id);
            }
        })
    }

    fn scheduler(&self) -> Rc<dyn Scheduler<MemoryDom>> {
        self.timers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <form data-testid="form">
            <div class="form-group">
                <input data-testid="field" name="field">
            </div>
            <button data-testid="submit" type="submit">Go</button>
            <button data-testid="plain" type="button">Plain</button>
        </form>
    "#;

    fn recorder(page: &mut Page, target: NodeId, kind: EventKind) -> (Rc<RefCell<Vec<String>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let listener: Listener<MemoryDom> = Rc::new(move |dom: &mut MemoryDom, event: &DomEvent<NodeId>| {
            let target = event.target().copied();
            let value = target.map(|node| dom.value_of(node)).unwrap_or_default();
            log.borrow_mut().push(format!("{}:{}", event.kind(), value));
        });
        let subscription = page.listen(&target, kind, listener);
        (seen, subscription)
    }

    #[test]
    fn test_input_bubbles_to_form() {
        let mut page = Page::parse(HTML).unwrap();
        let form = page.get_by_test_id("form").unwrap();
        let field = page.get_by_test_id("field").unwrap();
        let (seen, _subscription) = recorder(&mut page, form, EventKind::Input);

        page.type_text(field, "ab");

        assert_eq!(*seen.borrow(), vec!["input:a", "input:ab"]);
    }

    #[test]
    fn test_dropping_subscription_detaches() {
        let mut page = Page::parse(HTML).unwrap();
        let form = page.get_by_test_id("form").unwrap();
        let field = page.get_by_test_id("field").unwrap();
        let (seen, subscription) = recorder(&mut page, form, EventKind::Input);
        assert_eq!(page.listener_count(), 1);

        drop(subscription);
        page.type_text(field, "x");

        assert_eq!(page.listener_count(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_focus_change_fires_focusout() {
        let mut page = Page::parse(HTML).unwrap();
        let form = page.get_by_test_id("form").unwrap();
        let field = page.get_by_test_id("field").unwrap();
        let plain = page.get_by_test_id("plain").unwrap();
        let (seen, _subscription) = recorder(&mut page, form, EventKind::FocusOut);

        page.type_text(field, "v");
        page.click(plain);
        page.blur();

        assert_eq!(*seen.borrow(), vec!["focusout:v", "focusout:"]);
    }

    #[test]
    fn test_click_submit() {
        let mut page = Page::parse(HTML).unwrap();
        let form = page.get_by_test_id("form").unwrap();
        let submit = page.get_by_test_id("submit").unwrap();
        let plain = page.get_by_test_id("plain").unwrap();

        assert_eq!(page.click(plain), Submission::NotSubmitted);
        assert_eq!(page.click(submit), Submission::Submitted);

        let _subscription = page.listen(
            &form,
            EventKind::Submit,
            Rc::new(|_: &mut MemoryDom, event: &DomEvent<NodeId>| event.prevent_default()),
        );
        assert_eq!(page.click(submit), Submission::Prevented);

        page.dom_mut().set_attr(submit, "disabled", "");
        assert_eq!(page.click(submit), Submission::NotSubmitted);
    }

    #[test]
    fn test_timers_follow_the_virtual_clock() {
        let mut page = Page::parse(HTML).unwrap();
        let field = page.get_by_test_id("field").unwrap();
        let scheduler = page.scheduler();

        scheduler.set_timeout(
            Duration::from_millis(100),
            Box::new(move |dom: &mut MemoryDom, _: Duration| dom.set_value_of(field, "late")),
        );
        let cancelled = scheduler.set_timeout(
            Duration::from_millis(50),
            Box::new(move |dom: &mut MemoryDom, _: Duration| dom.set_value_of(field, "cancelled")),
        );
        scheduler.clear_timeout(cancelled);

        page.advance(Duration::from_millis(99));
        assert_eq!(page.dom().value_of(field), "");
        assert_eq!(page.pending_timers(), 1);

        page.advance(Duration::from_millis(1));
        assert_eq!(page.dom().value_of(field), "late");
        assert_eq!(page.now(), Duration::from_millis(100));
    }

    #[test]
    fn test_run_pending_skips_newly_scheduled() {
        let mut page = Page::parse(HTML).unwrap();
        let scheduler = page.scheduler();
        let inner = scheduler.clone();
        let ran = Rc::new(Cell::new(0));
        let counter = ran.clone();

        scheduler.set_timeout(
            Duration::from_millis(10),
            Box::new(move |_: &mut MemoryDom, _: Duration| {
                counter.set(counter.get() + 1);
                inner.set_timeout(Duration::ZERO, Box::new(|_: &mut MemoryDom, _: Duration| {}));
            }),
        );

        page.run_pending_timers();

        assert_eq!(ran.get(), 1);
        assert_eq!(page.pending_timers(), 1);
        assert_eq!(page.now(), Duration::from_millis(10));
    }
}
