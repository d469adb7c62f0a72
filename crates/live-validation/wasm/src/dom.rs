//! `Document` implementation over `web-sys`

use live_validation::{Document, ValidityState};
use tracing::warn;
use wasm_bindgen::JsCast;
use web_sys::{
    Element, HtmlButtonElement, HtmlElement, HtmlFormElement, HtmlInputElement, HtmlSelectElement,
    HtmlTextAreaElement,
};

/// The live browser document
#[derive(Debug, Clone, Copy, Default)]
pub struct WebDom;

/// Elements carrying the constraint-validation API
enum Control<'a> {
    Input(&'a HtmlInputElement),
    TextArea(&'a HtmlTextAreaElement),
    Select(&'a HtmlSelectElement),
    Button(&'a HtmlButtonElement),
}

impl<'a> Control<'a> {
    fn of(element: &'a Element) -> Option<Self> {
        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            Some(Control::Input(input))
        } else if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
            Some(Control::TextArea(textarea))
        } else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
            Some(Control::Select(select))
        } else {
            element.dyn_ref::<HtmlButtonElement>().map(Control::Button)
        }
    }

    fn type_(&self) -> String {
        match self {
            Control::Input(e) => e.type_(),
            Control::TextArea(e) => e.type_(),
            Control::Select(e) => e.type_(),
            Control::Button(e) => e.type_(),
        }
    }

    fn name(&self) -> String {
        match self {
            Control::Input(e) => e.name(),
            Control::TextArea(e) => e.name(),
            Control::Select(e) => e.name(),
            Control::Button(e) => e.name(),
        }
    }

    fn value(&self) -> String {
        match self {
            Control::Input(e) => e.value(),
            Control::TextArea(e) => e.value(),
            Control::Select(e) => e.value(),
            Control::Button(e) => e.value(),
        }
    }

    fn will_validate(&self) -> bool {
        match self {
            Control::Input(e) => e.will_validate(),
            Control::TextArea(e) => e.will_validate(),
            Control::Select(e) => e.will_validate(),
            Control::Button(e) => e.will_validate(),
        }
    }

    fn validity(&self) -> web_sys::ValidityState {
        match self {
            Control::Input(e) => e.validity(),
            Control::TextArea(e) => e.validity(),
            Control::Select(e) => e.validity(),
            Control::Button(e) => e.validity(),
        }
    }

    fn validation_message(&self) -> String {
        let message = match self {
            Control::Input(e) => e.validation_message(),
            Control::TextArea(e) => e.validation_message(),
            Control::Select(e) => e.validation_message(),
            Control::Button(e) => e.validation_message(),
        };
        message.unwrap_or_default()
    }

    fn set_custom_validity(&self, message: &str) {
        match self {
            Control::Input(e) => e.set_custom_validity(message),
            Control::TextArea(e) => e.set_custom_validity(message),
            Control::Select(e) => e.set_custom_validity(message),
            Control::Button(e) => e.set_custom_validity(message),
        }
    }

    fn set_disabled(&self, disabled: bool) {
        match self {
            Control::Input(e) => e.set_disabled(disabled),
            Control::TextArea(e) => e.set_disabled(disabled),
            Control::Select(e) => e.set_disabled(disabled),
            Control::Button(e) => e.set_disabled(disabled),
        }
    }
}

fn snapshot(state: &web_sys::ValidityState) -> ValidityState {
    ValidityState {
        bad_input: state.bad_input(),
        pattern_mismatch: state.pattern_mismatch(),
        range_overflow: state.range_overflow(),
        range_underflow: state.range_underflow(),
        step_mismatch: state.step_mismatch(),
        too_long: state.too_long(),
        too_short: state.too_short(),
        type_mismatch: state.type_mismatch(),
        value_missing: state.value_missing(),
        custom_error: state.custom_error(),
    }
}

impl Document for WebDom {
    type Node = Element;

    fn tag_name(&self, node: &Element) -> String {
        node.tag_name()
    }

    fn control_type(&self, node: &Element) -> Option<String> {
        Control::of(node).map(|control| control.type_().to_ascii_lowercase())
    }

    fn name(&self, node: &Element) -> String {
        match Control::of(node) {
            Some(control) => control.name(),
            None => node.get_attribute("name").unwrap_or_default(),
        }
    }

    fn value(&self, node: &Element) -> String {
        Control::of(node).map(|control| control.value()).unwrap_or_default()
    }

    fn is_disabled(&self, node: &Element) -> bool {
        node.matches(":disabled").unwrap_or(false)
    }

    fn will_validate(&self, node: &Element) -> bool {
        Control::of(node).map_or(false, |control| control.will_validate())
    }

    fn validity(&self, node: &Element) -> ValidityState {
        Control::of(node)
            .map(|control| snapshot(&control.validity()))
            .unwrap_or_default()
    }

    fn validation_message(&self, node: &Element) -> String {
        Control::of(node)
            .map(|control| control.validation_message())
            .unwrap_or_default()
    }

    fn set_custom_validity(&mut self, node: &Element, message: &str) {
        if let Some(control) = Control::of(node) {
            control.set_custom_validity(message);
        }
    }

    fn closest(&self, node: &Element, selector: &str) -> Option<Element> {
        node.closest(selector).unwrap_or_else(|_| {
            warn!("invalid selector {:?}", selector);
            None
        })
    }

    fn query_selector(&self, node: &Element, selector: &str) -> Option<Element> {
        node.query_selector(selector).unwrap_or_else(|_| {
            warn!("invalid selector {:?}", selector);
            None
        })
    }

    fn query_selector_all(&self, node: &Element, selector: &str) -> Vec<Element> {
        let Ok(list) = node.query_selector_all(selector) else {
            warn!("invalid selector {:?}", selector);
            return Vec::new();
        };

        (0..list.length())
            .filter_map(|index| list.get(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn form_controls(&self, form: &Element) -> Vec<Element> {
        let Some(form) = form.dyn_ref::<HtmlFormElement>() else {
            return Vec::new();
        };

        let elements = form.elements();
        (0..elements.length())
            .filter_map(|index| elements.item(index))
            .collect()
    }

    fn toggle_class(&mut self, node: &Element, class: &str, force: bool) {
        if node.class_list().toggle_with_force(class, force).is_err() {
            warn!("cannot toggle class {:?}", class);
        }
    }

    fn set_text(&mut self, node: &Element, text: &str) {
        match node.dyn_ref::<HtmlElement>() {
            Some(element) => element.set_inner_text(text),
            None => node.set_text_content(Some(text)),
        }
    }

    fn set_disabled(&mut self, node: &Element, disabled: bool) {
        if let Some(control) = Control::of(node) {
            control.set_disabled(disabled);
        } else if disabled {
            let _ = node.set_attribute("disabled", "");
        } else {
            let _ = node.remove_attribute("disabled");
        }
    }
}
