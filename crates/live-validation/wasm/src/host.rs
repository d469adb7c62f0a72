//! Browser event listeners and timers

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use live_validation::{DomEvent, EventHost, EventKind, Listener, Scheduler, Subscription, TimerCallback, TimerId};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, Window};

use crate::dom::WebDom;

/// `DOMHighResTimeStamp` milliseconds as a `Duration`
fn millis(ms: f64) -> Duration {
    Duration::from_secs_f64(ms.max(0.0) / 1000.0)
}

/// A scheduled `setTimeout` and the closure it calls
struct Armed {
    handle: i32,
    _closure: Closure<dyn FnMut()>,
}

/// `window.setTimeout` with `performance.now()` as the clock.
///
/// Closures stay owned here until their timer is cleared or has fired.
/// A fired closure cannot drop itself, so it is released on the next call.
pub struct WebTimers {
    window: Window,
    next_id: Cell<u64>,
    armed: RefCell<HashMap<u64, Armed>>,
    fired: Rc<RefCell<Vec<u64>>>,
    firing: Rc<Cell<Option<u64>>>,
}

impl WebTimers {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            next_id: Cell::new(0),
            armed: RefCell::new(HashMap::new()),
            fired: Rc::new(RefCell::new(Vec::new())),
            firing: Rc::new(Cell::new(None)),
        }
    }

    /// Timers scheduled and neither fired nor cleared
    pub fn armed(&self) -> usize {
        self.release_fired();
        self.armed.borrow().len()
    }

    fn release_fired(&self) {
        let fired = std::mem::take(&mut *self.fired.borrow_mut());
        let mut armed = self.armed.borrow_mut();
        for id in fired {
            armed.remove(&id);
        }
    }
}

impl Scheduler<WebDom> for WebTimers {
    fn now(&self) -> Duration {
        self.window
            .performance()
            .map(|performance| millis(performance.now()))
            .unwrap_or_default()
    }

    fn set_timeout(&self, delay: Duration, callback: TimerCallback<WebDom>) -> TimerId {
        self.release_fired();

        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let performance = self.window.performance();
        let fired = self.fired.clone();
        let firing = self.firing.clone();
        let mut callback = Some(callback);
        let closure = Closure::<dyn FnMut()>::new(move || {
            let Some(callback) = callback.take() else {
                return;
            };
            let now = performance.as_ref().map(|p| millis(p.now())).unwrap_or_default();
            firing.set(Some(id));
            callback(&mut WebDom, now);
            firing.set(None);
            fired.borrow_mut().push(id);
        });

        let timeout = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), timeout)
        {
            Ok(handle) => {
                self.armed.borrow_mut().insert(
                    id,
                    Armed {
                        handle,
                        _closure: closure,
                    },
                );
            }
            Err(err) => warn!("setTimeout failed: {:?}", err),
        }
        TimerId(id)
    }

    fn clear_timeout(&self, id: TimerId) {
        if self.firing.get() == Some(id.0) {
            return;
        }
        self.release_fired();
        if let Some(armed) = self.armed.borrow_mut().remove(&id.0) {
            self.window.clear_timeout_with_handle(armed.handle);
        }
    }
}

/// Listener registration on real elements
pub struct WebHost {
    timers: Rc<WebTimers>,
}

impl WebHost {
    pub fn new(window: Window) -> Self {
        Self {
            timers: Rc::new(WebTimers::new(window)),
        }
    }
}

impl EventHost<WebDom> for WebHost {
    fn listen(&mut self, target: &Element, kind: EventKind, listener: Listener<WebDom>) -> Subscription {
        let callback = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let element = event.target().and_then(|target| target.dyn_into::<Element>().ok());
            let dom_event = DomEvent::new(kind, element, millis(event.time_stamp()));

            listener(&mut WebDom, &dom_event);

            if dom_event.default_prevented() {
                event.prevent_default();
            }
        });

        if let Err(err) = target.add_event_listener_with_callback(kind.as_str(), callback.as_ref().unchecked_ref()) {
            warn!("cannot listen for {}: {:?}", kind, err);
        }

        let target = target.clone();
        Subscription::new(move || {
            let _ = target.remove_event_listener_with_callback(kind.as_str(), callback.as_ref().unchecked_ref());
            drop(callback);
        })
    }

    fn scheduler(&self) -> Rc<dyn Scheduler<WebDom>> {
        self.timers.clone()
    }
}
