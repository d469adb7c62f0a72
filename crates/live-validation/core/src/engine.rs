//! Validation engine
//!
//! Holds the per-field validity bookkeeping for one form and implements the
//! operations behind the DOM listeners:
//! - `validate_field`: native constraints, then the field's custom validator
//! - `validate_form`: every validatable control of the form
//! - `handle_input` / `flush_input`: debounced live validation while typing
//! - `handle_focus_out`: immediate validation when leaving a field
//! - `handle_submit`: full pass, blocking submission on errors

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::ValidationOptions;
use crate::debounce::Debounce;
use crate::dom::Document;
use crate::predicates::is_form_control;
use crate::validator::Validators;

/// Outcome of validating one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReport {
    pub name: String,
    pub is_valid: bool,
    /// Message shown for the field; empty when valid
    pub message: String,
}

/// Whether a submit may proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Allowed,
    Prevented,
}

/// Validation state of one form
pub struct Validation<D: Document> {
    form: D::Node,
    options: ValidationOptions,
    validators: Validators<D>,
    fields_validity: BTreeMap<String, bool>,
    input_debounce: Debounce<D::Node>,
}

impl<D: Document> Validation<D> {
    pub fn new(form: D::Node, options: ValidationOptions, validators: Validators<D>) -> Self {
        let input_debounce = Debounce::with_trailing(options.delay_duration());

        Self {
            form,
            options,
            validators,
            fields_validity: BTreeMap::new(),
            input_debounce,
        }
    }

    pub fn form(&self) -> &D::Node {
        &self.form
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Last recorded validity per field name
    pub fn fields_validity(&self) -> &BTreeMap<String, bool> {
        &self.fields_validity
    }

    /// True iff some validated field was invalid on its last validation
    pub fn has_errors(&self) -> bool {
        self.fields_validity.values().any(|valid| !valid)
    }

    /// Validate a single field and update its error display.
    ///
    /// Returns `None` (and changes nothing) when `field` is not a validatable
    /// form control.
    pub fn validate_field(&mut self, dom: &mut D, field: &D::Node) -> Option<FieldReport> {
        if !is_form_control(&*dom, Some(field)) {
            debug!("skipping non-control {:?}", field);
            return None;
        }

        let name = dom.name(field);
        let natively_valid = dom.validity(field).is_natively_valid();

        let is_valid = match self.validators.get(&name) {
            Some(validator) if natively_valid => {
                let verdict = validator(&*dom, field, &self.form);
                let message = if verdict.is_valid { "" } else { verdict.message.as_str() };
                dom.set_custom_validity(field, message);
                verdict.is_valid
            }
            Some(_) => {
                // native failure: drop any stale custom message so the native one shows
                dom.set_custom_validity(field, "");
                false
            }
            None => natively_valid,
        };

        self.fields_validity.insert(name.clone(), is_valid);

        let message = if is_valid {
            String::new()
        } else {
            dom.validation_message(field)
        };
        self.present(dom, field, is_valid, &message);

        debug!(field = %name, valid = is_valid, "validated field");
        Some(FieldReport {
            name,
            is_valid,
            message,
        })
    }

    /// Toggle error classes and write the message into the group's container
    fn present(&self, dom: &mut D, field: &D::Node, is_valid: bool, message: &str) {
        if let Some(class) = &self.options.field_error_class_name {
            dom.toggle_class(field, class, !is_valid);
        }

        let Some(group) = dom.closest(field, &self.options.parent_selector) else {
            debug!("no group matching {:?}", self.options.parent_selector);
            return;
        };
        dom.toggle_class(&group, self.options.group_error_class(), !is_valid);

        let Some(container) = dom.query_selector(&group, &self.options.error_selector) else {
            return;
        };
        dom.set_text(&container, message);
    }

    /// Validate every enabled control that has constraints or a custom validator
    pub fn validate_form(&mut self, dom: &mut D) -> Vec<FieldReport> {
        let mut reports = Vec::new();

        for field in dom.form_controls(&self.form) {
            if !is_form_control(&*dom, Some(&field)) || dom.is_disabled(&field) {
                continue;
            }
            if !dom.will_validate(&field) && !self.validators.contains(&dom.name(&field)) {
                continue;
            }
            reports.extend(self.validate_field(dom, &field));
        }

        if self.options.disable {
            self.refresh_submit_controls(dom);
        }
        reports
    }

    /// Set every submit control's disabled state to `has_errors()`
    pub fn refresh_submit_controls(&self, dom: &mut D) {
        let disabled = self.has_errors();
        for control in dom.query_selector_all(&self.form, &self.options.submit_selector) {
            dom.set_disabled(&control, disabled);
        }
    }

    fn revalidate(&mut self, dom: &mut D, field: &D::Node) {
        self.validate_field(dom, field);
        if self.options.disable {
            self.refresh_submit_controls(dom);
        }
    }

    /// An `input` event at `now`.
    ///
    /// Validates immediately when the event opens a new burst. Returns the
    /// delay after which [`Validation::flush_input`] must be called, or
    /// `None` when the event was ignored.
    pub fn handle_input(&mut self, dom: &mut D, target: Option<&D::Node>, now: Duration) -> Option<Duration> {
        if !is_form_control(&*dom, target) {
            return None;
        }
        let field = target?.clone();

        match self.input_debounce.call(now, field) {
            Some(field) => {
                trace!("input: leading validation");
                self.revalidate(dom, &field);
            }
            None => trace!("input: absorbed into current burst"),
        }

        Some(self.input_debounce.wait())
    }

    /// The debounce timer armed by `handle_input` elapsed at `now`
    pub fn flush_input(&mut self, dom: &mut D, now: Duration) {
        if let Some(field) = self.input_debounce.fire(now) {
            trace!("input: trailing validation");
            self.revalidate(dom, &field);
        }
    }

    /// A `focusout` event: validate the field right away
    pub fn handle_focus_out(&mut self, dom: &mut D, target: Option<&D::Node>) {
        if !is_form_control(&*dom, target) {
            return;
        }
        if let Some(field) = target {
            self.revalidate(dom, field);
        }
    }

    /// A `submit` event: full pass, then allow or block the submission
    pub fn handle_submit(&mut self, dom: &mut D) -> SubmitOutcome {
        self.validate_form(dom);

        if self.has_errors() {
            debug!("submit prevented: form has errors");
            SubmitOutcome::Prevented
        } else {
            SubmitOutcome::Allowed
        }
    }

    /// Drop the running debounce burst and its pending call
    pub fn cancel_pending(&mut self) {
        self.input_debounce.cancel();
    }
}
