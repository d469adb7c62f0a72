//! Live Validation
//!
//! Client-side form validation layered on the browser's constraint
//! validation. A [`Validation`] engine validates fields as the user types
//! (debounced) or leaves them, runs a full pass on submit, toggles error
//! classes and messages on each field's group, and keeps the submit controls
//! disabled while the form has errors.
//!
//! The engine is generic over the [`Document`] seam. `dom::memory` (feature
//! `memory`) provides an in-process document and event loop; the
//! `live-validation-wasm` crate binds the same engine to the real DOM.
//!
//! # Example
//!
//! With the `memory` feature:
//!
//! ```
//! # #[cfg(feature = "memory")] {
//! use live_validation::dom::memory::{MemoryDom, Page};
//! use live_validation::{use_validation, Controller, ValidationOptions, Validators};
//!
//! let mut page = Page::parse(r#"
//!     <form data-testid="form">
//!         <div class="form-group">
//!             <input data-testid="email" type="email" name="email" required>
//!             <p class="help-block"></p>
//!         </div>
//!         <button type="submit">Send</button>
//!     </form>
//! "#).unwrap();
//!
//! let form = page.get_by_test_id("form").unwrap();
//! let mut controller: Controller<MemoryDom> = Controller::new(form);
//! let validation = use_validation(&mut controller, &mut page, ValidationOptions::default(), Validators::new());
//!
//! validation.validate_form(page.dom_mut());
//! assert!(validation.has_errors());
//!
//! controller.disconnect();
//! assert_eq!(page.listener_count(), 0);
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod debounce;
pub mod dom;
pub mod engine;
pub mod predicates;
pub mod validator;
pub mod validity;

pub use config::ValidationOptions;
pub use controller::{use_validation, Controller, Teardown, ValidationHandle};
pub use debounce::Debounce;
pub use dom::{
    Document, DomEvent, EventHost, EventKind, Listener, Scheduler, Subscription, TimerCallback, TimerId,
};
pub use engine::{FieldReport, SubmitOutcome, Validation};
pub use predicates::is_form_control;
pub use validator::{Validator, Validators, Verdict};
pub use validity::{NativeFlag, ValidityState};
