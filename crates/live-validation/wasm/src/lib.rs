//! Live Validation WASM
//!
//! WebAssembly bindings attaching the live validation engine to a real form.
//!
//! ```javascript
//! const validation = useValidation(form, {
//!     parentSelector: '.control',
//!     validators: {
//!         password: (field, form) => ({
//!             isValid: field.value !== 'password',
//!             message: "Password should not be 'password'",
//!         }),
//!     },
//! });
//!
//! validation.validateForm();
//! validation.hasErrors();
//! validation.disconnect();
//! ```

mod dom;
mod host;
mod validators;

use js_sys::{Object, Reflect};
use live_validation::{use_validation, Controller, ValidationHandle, ValidationOptions, Validators};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Element;

pub use dom::WebDom;
pub use host::{WebHost, WebTimers};

/// Set panic hook for better error messages in the browser
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Validation attached to one form
#[wasm_bindgen]
pub struct FormValidation {
    controller: Controller<WebDom>,
    handle: ValidationHandle<WebDom>,
}

#[wasm_bindgen]
impl FormValidation {
    /// Validate one field; `undefined` when it is not a validatable control
    #[wasm_bindgen(js_name = validateField)]
    pub fn validate_field(&self, field: Option<Element>) -> Result<JsValue, JsValue> {
        let Some(field) = field else {
            return Ok(JsValue::UNDEFINED);
        };

        match self.handle.validate_field(&mut WebDom, &field) {
            Some(report) => Ok(serde_wasm_bindgen::to_value(&report)?),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Validate every control of the form; returns the per-field reports
    #[wasm_bindgen(js_name = validateForm)]
    pub fn validate_form(&self) -> Result<JsValue, JsValue> {
        let reports = self.handle.validate_form(&mut WebDom);
        Ok(serde_wasm_bindgen::to_value(&reports)?)
    }

    #[wasm_bindgen(js_name = hasErrors)]
    pub fn has_errors(&self) -> bool {
        self.handle.has_errors()
    }

    /// Recorded validity as a plain `{ fieldName: boolean }` object
    #[wasm_bindgen(getter, js_name = fieldsValidity)]
    pub fn fields_validity(&self) -> Result<JsValue, JsValue> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        Ok(self.handle.fields_validity().serialize(&serializer)?)
    }

    /// Remove the listeners; calling it again does nothing
    pub fn disconnect(&mut self) {
        self.controller.disconnect();
    }
}

/// Attach live validation to `form`.
///
/// `options` is optional; its `validators` entry maps field names to
/// `(field, form) => ({ isValid, message })` functions.
#[wasm_bindgen(js_name = useValidation)]
pub fn use_validation_js(form: Element, options: JsValue) -> Result<FormValidation, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window available"))?;
    let (options, validators) = split_options(&options)?;

    let mut controller = Controller::new(form);
    let mut host = WebHost::new(window);
    let handle = use_validation(&mut controller, &mut host, options, validators);

    Ok(FormValidation { controller, handle })
}

/// Separate the `validators` functions from the serializable options
fn split_options(options: &JsValue) -> Result<(ValidationOptions, Validators<WebDom>), JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok((ValidationOptions::default(), Validators::new()));
    }
    let object = options
        .dyn_ref::<Object>()
        .ok_or_else(|| JsValue::from_str("Options must be an object"))?;

    let key = JsValue::from_str("validators");
    let validators = validators::from_object(&Reflect::get(object, &key)?);

    let plain = Object::assign(&Object::new(), object);
    Reflect::delete_property(&plain, &key)?;
    let options: ValidationOptions = serde_wasm_bindgen::from_value(plain.into())
        .map_err(|e| JsValue::from_str(&format!("Failed to parse options: {}", e)))?;

    Ok((options, validators))
}

/// Whether `node` is an element the engine validates
#[wasm_bindgen(js_name = isFormControl)]
pub fn is_form_control_js(node: JsValue) -> bool {
    live_validation::is_form_control(&WebDom, node.dyn_ref::<Element>())
}

#[wasm_bindgen(js_name = isFunction)]
pub fn is_function_js(value: JsValue) -> bool {
    validators::is_function(&value)
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn render(html: &str) -> Element {
        let document = web_sys::window().unwrap().document().unwrap();
        let body = document.body().unwrap();
        body.set_inner_html(html);
        body.query_selector("form").unwrap().unwrap()
    }

    const HTML: &str = r#"
        <form novalidate>
            <div class="form-group">
                <input id="email" type="email" name="email" required>
                <p class="help-block"></p>
            </div>
            <button type="submit">Submit</button>
        </form>
    "#;

    #[wasm_bindgen_test]
    fn test_is_form_control() {
        let form = render(HTML);
        let email = form.query_selector("#email").unwrap().unwrap();
        let button = form.query_selector("button").unwrap().unwrap();

        assert!(is_form_control_js(email.into()));
        assert!(!is_form_control_js(button.into()));
        assert!(!is_form_control_js(JsValue::NULL));
    }

    #[wasm_bindgen_test]
    fn test_validate_form_marks_group() {
        let form = render(HTML);
        let mut validation = use_validation_js(form.clone(), JsValue::UNDEFINED).unwrap();

        validation.validate_form().unwrap();

        let group = form.query_selector(".form-group").unwrap().unwrap();
        assert!(group.class_list().contains("has-error"));
        assert!(validation.has_errors());

        validation.disconnect();
        validation.disconnect();
    }

    #[wasm_bindgen_test]
    fn test_non_function_validators_are_skipped() {
        let options = Object::new();
        let validators = Object::new();
        Reflect::set(&validators, &"email".into(), &JsValue::from_f64(1.0)).unwrap();
        Reflect::set(&options, &"validators".into(), &validators).unwrap();

        let (_, validators) = split_options(&options.into()).unwrap();
        assert!(validators.is_empty());
    }
}
