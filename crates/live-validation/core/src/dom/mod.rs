//! DOM seam
//!
//! The engine talks to the page through three traits:
//! - [`Document`]: element queries and the handful of mutations the engine performs
//! - [`EventHost`]: listener registration, released through RAII [`Subscription`]s
//! - [`Scheduler`]: the clock and one-shot timeouts used by the debounce
//!
//! `memory` (behind the `memory` feature) implements all three in-process;
//! the wasm crate implements them on `web-sys`.

#[cfg(any(test, feature = "memory"))]
pub mod memory;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::validity::ValidityState;

/// Element access needed by the validation engine.
///
/// Lookups that find nothing (or use a selector the document rejects)
/// return `None`/empty; callers treat that as "nothing to update".
pub trait Document {
    /// Cheap element handle
    type Node: Clone + PartialEq + fmt::Debug + 'static;

    fn tag_name(&self, node: &Self::Node) -> String;

    /// The control's `type` property (lowercase), `None` for non-controls
    fn control_type(&self, node: &Self::Node) -> Option<String>;

    fn name(&self, node: &Self::Node) -> String;

    fn value(&self, node: &Self::Node) -> String;

    fn is_disabled(&self, node: &Self::Node) -> bool;

    /// Whether the element is a candidate for constraint validation
    fn will_validate(&self, node: &Self::Node) -> bool;

    fn validity(&self, node: &Self::Node) -> ValidityState;

    fn validation_message(&self, node: &Self::Node) -> String;

    fn set_custom_validity(&mut self, node: &Self::Node, message: &str);

    /// Nearest inclusive ancestor matching `selector`
    fn closest(&self, node: &Self::Node, selector: &str) -> Option<Self::Node>;

    /// First descendant matching `selector`
    fn query_selector(&self, node: &Self::Node, selector: &str) -> Option<Self::Node>;

    fn query_selector_all(&self, node: &Self::Node, selector: &str) -> Vec<Self::Node>;

    /// The form's control list (`form.elements`), in tree order
    fn form_controls(&self, form: &Self::Node) -> Vec<Self::Node>;

    fn toggle_class(&mut self, node: &Self::Node, class: &str, force: bool);

    fn set_text(&mut self, node: &Self::Node, text: &str);

    fn set_disabled(&mut self, node: &Self::Node, disabled: bool);
}

/// DOM events the engine listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Input,
    FocusOut,
    Submit,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Input => "input",
            EventKind::FocusOut => "focusout",
            EventKind::Submit => "submit",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as seen by a listener
#[derive(Debug)]
pub struct DomEvent<N> {
    kind: EventKind,
    target: Option<N>,
    time_stamp: Duration,
    default_prevented: Cell<bool>,
}

impl<N> DomEvent<N> {
    pub fn new(kind: EventKind, target: Option<N>, time_stamp: Duration) -> Self {
        Self {
            kind,
            target,
            time_stamp,
            default_prevented: Cell::new(false),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn target(&self) -> Option<&N> {
        self.target.as_ref()
    }

    /// Time the event was created, on the host scheduler's clock
    pub fn time_stamp(&self) -> Duration {
        self.time_stamp
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Event callback; receives the document so it can read and mutate it
pub type Listener<D> = Rc<dyn Fn(&mut D, &DomEvent<<D as Document>::Node>)>;

/// Timeout callback; receives the document and the time it ran at
pub type TimerCallback<D> = Box<dyn FnOnce(&mut D, Duration)>;

/// Handle of a scheduled timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Clock and one-shot timers
pub trait Scheduler<D: Document> {
    /// Current time, on the same clock as [`DomEvent::time_stamp`]
    fn now(&self) -> Duration;

    fn set_timeout(&self, delay: Duration, callback: TimerCallback<D>) -> TimerId;

    /// Cancel a timeout; unknown or already-run ids are ignored
    fn clear_timeout(&self, id: TimerId);
}

/// Something listeners can be attached to
pub trait EventHost<D: Document> {
    /// Attach `listener` for `kind` events reaching `target` (bubbling included).
    ///
    /// The listener stays attached until the returned subscription is dropped.
    fn listen(&mut self, target: &D::Node, kind: EventKind, listener: Listener<D>) -> Subscription;

    fn scheduler(&self) -> Rc<dyn Scheduler<D>>;
}

/// A live listener registration; dropping it detaches the listener
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Detach now
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_releases_once_on_drop() {
        let released = Rc::new(Cell::new(0));
        let counter = released.clone();

        let subscription = Subscription::new(move || counter.set(counter.get() + 1));
        drop(subscription);

        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_explicit_release() {
        let released = Rc::new(Cell::new(false));
        let flag = released.clone();

        Subscription::new(move || flag.set(true)).release();

        assert!(released.get());
    }

    #[test]
    fn test_prevent_default() {
        let event: DomEvent<u32> = DomEvent::new(EventKind::Submit, None, Duration::ZERO);
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
        assert_eq!(event.kind().as_str(), "submit");
    }
}
