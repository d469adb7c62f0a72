//! Host controller integration
//!
//! `use_validation` attaches an engine to a form owned by a host
//! [`Controller`]: it subscribes the input/focusout/submit listeners on the
//! form, returns a [`ValidationHandle`] exposing the engine operations, and
//! wraps the controller's teardown so disconnecting it releases everything.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::debug;

use crate::config::ValidationOptions;
use crate::dom::{Document, DomEvent, EventHost, EventKind, Listener, Scheduler, Subscription, TimerId};
use crate::engine::{FieldReport, SubmitOutcome, Validation};
use crate::validator::Validators;

/// Composable teardown chain.
///
/// Each [`Teardown::wrap`] adds a step that runs before everything wrapped
/// earlier; [`Teardown::run`] executes the chain once.
#[derive(Default)]
pub struct Teardown {
    steps: Vec<Box<dyn FnOnce()>>,
    done: bool,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain whose innermost step is `base` (the host's own disconnect)
    pub fn from_fn(base: impl FnOnce() + 'static) -> Self {
        let mut teardown = Self::new();
        teardown.wrap(base);
        teardown
    }

    /// Add a step that runs before every previously wrapped one.
    ///
    /// Once the chain has run, the step runs immediately.
    pub fn wrap(&mut self, step: impl FnOnce() + 'static) {
        if self.done {
            debug!("teardown already ran; running wrapped step now");
            step();
            return;
        }
        self.steps.push(Box::new(step));
    }

    /// Run the chain, most recently wrapped first; later calls do nothing
    pub fn run(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        while let Some(step) = self.steps.pop() {
            step();
        }
    }

    pub fn has_run(&self) -> bool {
        self.done
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("steps", &self.steps.len())
            .field("done", &self.done)
            .finish()
    }
}

/// A host controller bound to one form element
pub struct Controller<D: Document> {
    element: D::Node,
    teardown: Teardown,
}

impl<D: Document> Controller<D> {
    pub fn new(element: D::Node) -> Self {
        Self {
            element,
            teardown: Teardown::new(),
        }
    }

    /// Controller with its own disconnect logic
    pub fn with_disconnect(element: D::Node, disconnect: impl FnOnce() + 'static) -> Self {
        Self {
            element,
            teardown: Teardown::from_fn(disconnect),
        }
    }

    pub fn element(&self) -> &D::Node {
        &self.element
    }

    /// Run `step` on disconnect, before previously wrapped steps
    pub fn wrap_disconnect(&mut self, step: impl FnOnce() + 'static) {
        self.teardown.wrap(step);
    }

    pub fn disconnect(&mut self) {
        self.teardown.run();
    }

    pub fn is_connected(&self) -> bool {
        !self.teardown.has_run()
    }
}

struct Attachment<D: Document> {
    subscriptions: Vec<Subscription>,
    scheduler: Rc<dyn Scheduler<D>>,
    timer: Rc<Cell<Option<TimerId>>>,
}

/// Last published field validity, readable while the engine is busy
type Snapshot = Rc<RefCell<BTreeMap<String, bool>>>;

fn publish<D: Document>(validation: &Validation<D>, snapshot: &Snapshot) {
    snapshot.replace(validation.fields_validity().clone());
}

/// Engine operations for callers, plus disposal.
///
/// Reads are served from a snapshot taken after every validation, so a
/// validator may query the handle. Validation requested while another one
/// is running is skipped.
pub struct ValidationHandle<D: Document> {
    engine: Rc<RefCell<Validation<D>>>,
    snapshot: Snapshot,
    options: ValidationOptions,
    attachment: Rc<RefCell<Option<Attachment<D>>>>,
}

impl<D: Document> Clone for ValidationHandle<D> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            snapshot: self.snapshot.clone(),
            options: self.options.clone(),
            attachment: self.attachment.clone(),
        }
    }
}

impl<D: Document + 'static> ValidationHandle<D> {
    pub fn validate_field(&self, dom: &mut D, field: &D::Node) -> Option<FieldReport> {
        let Ok(mut validation) = self.engine.try_borrow_mut() else {
            debug!("validate_field during validation skipped");
            return None;
        };
        let report = validation.validate_field(dom, field);
        publish(&validation, &self.snapshot);
        report
    }

    pub fn validate_form(&self, dom: &mut D) -> Vec<FieldReport> {
        let Ok(mut validation) = self.engine.try_borrow_mut() else {
            debug!("validate_form during validation skipped");
            return Vec::new();
        };
        let reports = validation.validate_form(dom);
        publish(&validation, &self.snapshot);
        reports
    }

    pub fn has_errors(&self) -> bool {
        self.snapshot.borrow().values().any(|valid| !valid)
    }

    /// Snapshot of the recorded field validity
    pub fn fields_validity(&self) -> BTreeMap<String, bool> {
        self.snapshot.borrow().clone()
    }

    pub fn field_validity(&self, name: &str) -> Option<bool> {
        self.snapshot.borrow().get(name).copied()
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.borrow().is_some()
    }

    /// Release every listener and cancel the pending debounce timer.
    ///
    /// Idempotent. Validation can still be requested explicitly afterwards.
    pub fn dispose(&self) {
        let Some(attachment) = self.attachment.borrow_mut().take() else {
            return;
        };

        if let Some(timer) = attachment.timer.take() {
            attachment.scheduler.clear_timeout(timer);
        }
        match self.engine.try_borrow_mut() {
            Ok(mut engine) => engine.cancel_pending(),
            Err(_) => debug!("dispose during validation; debounce left to expire"),
        }

        drop(attachment.subscriptions);
        debug!("validation listeners released");
    }
}

/// Attach validation to `controller`'s form.
///
/// Listeners are delegated on the form element. Disconnecting the
/// controller disposes the returned handle before running the teardown that
/// was registered earlier.
pub fn use_validation<D, H>(
    controller: &mut Controller<D>,
    host: &mut H,
    options: ValidationOptions,
    validators: Validators<D>,
) -> ValidationHandle<D>
where
    D: Document + 'static,
    H: EventHost<D>,
{
    let form = controller.element().clone();
    let engine = Rc::new(RefCell::new(Validation::new(form.clone(), options.clone(), validators)));
    let snapshot = Snapshot::default();
    let scheduler = host.scheduler();
    let timer = Rc::new(Cell::new(None));

    let subscriptions = vec![
        host.listen(
            &form,
            EventKind::Input,
            input_listener(Rc::downgrade(&engine), snapshot.clone(), scheduler.clone(), timer.clone()),
        ),
        host.listen(
            &form,
            EventKind::FocusOut,
            focus_out_listener(Rc::downgrade(&engine), snapshot.clone()),
        ),
        host.listen(&form, EventKind::Submit, submit_listener(Rc::downgrade(&engine), snapshot.clone())),
    ];

    let handle = ValidationHandle {
        engine,
        snapshot,
        options,
        attachment: Rc::new(RefCell::new(Some(Attachment {
            subscriptions,
            scheduler,
            timer,
        }))),
    };

    let on_disconnect = handle.clone();
    controller.wrap_disconnect(move || on_disconnect.dispose());

    handle
}

fn input_listener<D: Document + 'static>(
    engine: Weak<RefCell<Validation<D>>>,
    snapshot: Snapshot,
    scheduler: Rc<dyn Scheduler<D>>,
    timer: Rc<Cell<Option<TimerId>>>,
) -> Listener<D> {
    Rc::new(move |dom: &mut D, event: &DomEvent<D::Node>| {
        let Some(engine_rc) = engine.upgrade() else {
            return;
        };
        let Ok(mut validation) = engine_rc.try_borrow_mut() else {
            debug!("input event during validation ignored");
            return;
        };
        let delay = validation.handle_input(dom, event.target(), event.time_stamp());
        publish(&validation, &snapshot);
        drop(validation);
        let Some(delay) = delay else {
            return;
        };

        if let Some(previous) = timer.take() {
            scheduler.clear_timeout(previous);
        }

        let engine = engine.clone();
        let snapshot = snapshot.clone();
        let slot = timer.clone();
        let id = scheduler.set_timeout(
            delay,
            Box::new(move |dom: &mut D, now: Duration| {
                slot.set(None);
                if let Some(engine) = engine.upgrade() {
                    if let Ok(mut validation) = engine.try_borrow_mut() {
                        validation.flush_input(dom, now);
                        publish(&validation, &snapshot);
                    }
                }
            }),
        );
        timer.set(Some(id));
    })
}

fn focus_out_listener<D: Document + 'static>(engine: Weak<RefCell<Validation<D>>>, snapshot: Snapshot) -> Listener<D> {
    Rc::new(move |dom: &mut D, event: &DomEvent<D::Node>| {
        let Some(engine) = engine.upgrade() else {
            return;
        };
        let Ok(mut validation) = engine.try_borrow_mut() else {
            debug!("focusout during validation ignored");
            return;
        };
        validation.handle_focus_out(dom, event.target());
        publish(&validation, &snapshot);
    })
}

fn submit_listener<D: Document + 'static>(engine: Weak<RefCell<Validation<D>>>, snapshot: Snapshot) -> Listener<D> {
    Rc::new(move |dom: &mut D, event: &DomEvent<D::Node>| {
        let Some(engine) = engine.upgrade() else {
            return;
        };
        let Ok(mut validation) = engine.try_borrow_mut() else {
            debug!("submit during validation ignored");
            return;
        };
        let outcome = validation.handle_submit(dom);
        publish(&validation, &snapshot);
        if outcome == SubmitOutcome::Prevented {
            event.prevent_default();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::{MemoryDom, NodeId, Page};
    use crate::validator::Verdict;

    #[test]
    fn test_teardown_runs_lifo_once() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let log = |label: &'static str| {
            let order = order.clone();
            move || order.borrow_mut().push(label)
        };

        let mut teardown = Teardown::from_fn(log("original"));
        teardown.wrap(log("first wrap"));
        teardown.wrap(log("second wrap"));

        teardown.run();
        teardown.run();

        assert_eq!(*order.borrow(), vec!["second wrap", "first wrap", "original"]);
        assert!(teardown.has_run());
    }

    #[test]
    fn test_teardown_wrapped_after_run_executes_at_once() {
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();

        let mut teardown = Teardown::new();
        teardown.run();
        teardown.wrap(move || flag.set(true));

        assert!(ran.get());
        teardown.run();
    }

    #[test]
    fn test_disconnect_releases_listeners_then_calls_original() {
        let mut page = Page::parse(r#"<form data-testid="form"><input name="a" required></form>"#).unwrap();
        let form = page.get_by_test_id("form").unwrap();

        let listeners_at_original = Rc::new(Cell::new(None));
        let seen = listeners_at_original.clone();
        let count = page.listener_counter();
        let mut controller: Controller<MemoryDom> =
            Controller::with_disconnect(form, move || seen.set(Some(count())));

        let handle = use_validation(&mut controller, &mut page, ValidationOptions::default(), Validators::new());
        assert_eq!(page.listener_count(), 3);
        assert!(handle.is_attached());

        controller.disconnect();

        assert_eq!(listeners_at_original.get(), Some(0));
        assert_eq!(page.listener_count(), 0);
        assert!(!handle.is_attached());
        assert!(!controller.is_connected());
    }

    #[test]
    fn test_use_validation_on_disconnected_controller_releases_at_once() {
        let mut page = Page::parse(r#"<form data-testid="form"><input name="a" required></form>"#).unwrap();
        let form = page.get_by_test_id("form").unwrap();
        let mut controller: Controller<MemoryDom> = Controller::new(form);
        controller.disconnect();

        let handle = use_validation(&mut controller, &mut page, ValidationOptions::default(), Validators::new());

        assert_eq!(page.listener_count(), 0);
        assert!(!handle.is_attached());
    }

    #[test]
    fn test_validator_can_query_handle() {
        let mut page = Page::parse(
            r#"<form data-testid="form">
                <input data-testid="a" name="a">
                <input data-testid="b" name="b" required>
            </form>"#,
        )
        .unwrap();
        let form = page.get_by_test_id("form").unwrap();
        let a = page.get_by_test_id("a").unwrap();
        let b = page.get_by_test_id("b").unwrap();

        let slot: Rc<RefCell<Option<ValidationHandle<MemoryDom>>>> = Rc::new(RefCell::new(None));
        let observed = Rc::new(RefCell::new(Vec::new()));
        let validators = {
            let slot = slot.clone();
            let observed = observed.clone();
            Validators::new().with("a", move |_: &MemoryDom, _: &NodeId, _: &NodeId| {
                if let Some(handle) = slot.borrow().as_ref() {
                    observed
                        .borrow_mut()
                        .push((handle.has_errors(), handle.field_validity("b"), handle.fields_validity().len()));
                }
                Verdict::valid()
            })
        };

        let mut controller: Controller<MemoryDom> = Controller::new(form);
        let handle = use_validation(&mut controller, &mut page, ValidationOptions::default(), validators);
        slot.replace(Some(handle.clone()));

        let report = handle.validate_field(page.dom_mut(), &b).unwrap();
        assert!(!report.is_valid);

        let report = handle.validate_field(page.dom_mut(), &a).unwrap();
        assert!(report.is_valid);

        assert_eq!(*observed.borrow(), vec![(true, Some(false), 1)]);
        assert_eq!(handle.field_validity("a"), Some(true));
        assert!(handle.has_errors());
        slot.replace(None);
    }

    #[test]
    fn test_validation_requested_from_validator_is_skipped() {
        let mut page = Page::parse(
            r#"<form data-testid="form"><input data-testid="a" name="a"></form>"#,
        )
        .unwrap();
        let form = page.get_by_test_id("form").unwrap();
        let a = page.get_by_test_id("a").unwrap();

        let slot: Rc<RefCell<Option<ValidationHandle<MemoryDom>>>> = Rc::new(RefCell::new(None));
        let nested = Rc::new(Cell::new(None));
        let validators = {
            let slot = slot.clone();
            let nested = nested.clone();
            Validators::new().with("a", move |dom: &MemoryDom, _: &NodeId, _: &NodeId| {
                if let Some(handle) = slot.borrow().as_ref() {
                    let mut copy = dom.clone();
                    nested.set(Some(handle.validate_form(&mut copy).len()));
                }
                Verdict::valid()
            })
        };

        let mut controller: Controller<MemoryDom> = Controller::new(form);
        let handle = use_validation(&mut controller, &mut page, ValidationOptions::default(), validators);
        slot.replace(Some(handle.clone()));

        assert!(handle.validate_field(page.dom_mut(), &a).is_some());
        assert_eq!(nested.get(), Some(0));
        slot.replace(None);
    }

    #[test]
    fn test_two_engines_on_one_controller() {
        let mut page = Page::parse(r#"<form data-testid="form"><input name="a" required></form>"#).unwrap();
        let form: NodeId = page.get_by_test_id("form").unwrap();
        let mut controller: Controller<MemoryDom> = Controller::new(form);

        let first = use_validation(&mut controller, &mut page, ValidationOptions::default(), Validators::new());
        let second = use_validation(&mut controller, &mut page, ValidationOptions::default(), Validators::new());
        assert_eq!(page.listener_count(), 6);

        controller.disconnect();

        assert_eq!(page.listener_count(), 0);
        assert!(!first.is_attached());
        assert!(!second.is_attached());
    }

    #[test]
    fn test_dispose_is_idempotent_and_clears_timer() {
        let mut page = Page::parse(
            r#"<form data-testid="form"><input data-testid="a" name="a" required></form>"#,
        )
        .unwrap();
        let form = page.get_by_test_id("form").unwrap();
        let field = page.get_by_test_id("a").unwrap();
        let mut controller: Controller<MemoryDom> = Controller::new(form);
        let handle = use_validation(&mut controller, &mut page, ValidationOptions::default(), Validators::new());

        page.type_text(field, "abc");
        assert_eq!(page.pending_timers(), 1);

        handle.dispose();
        handle.dispose();

        assert_eq!(page.pending_timers(), 0);
        assert_eq!(page.listener_count(), 0);
    }
}
