//! Custom validators supplied from JavaScript

use js_sys::{Array, Function, Object};
use live_validation::{Validators, Verdict};
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Element;

use crate::dom::WebDom;

/// True if `value` is callable
pub fn is_function(value: &JsValue) -> bool {
    value.is_function()
}

/// Build the registry from a `{ fieldName: (field, form) => ({ isValid, message }) }` object.
///
/// Entries whose value is not a function are skipped.
pub fn from_object(object: &JsValue) -> Validators<WebDom> {
    let mut validators = Validators::new();
    let Some(object) = object.dyn_ref::<Object>() else {
        return validators;
    };

    for entry in Object::entries(object).iter() {
        let pair: Array = entry.unchecked_into();
        let Some(name) = pair.get(0).as_string() else {
            continue;
        };
        let value = pair.get(1);
        if !is_function(&value) {
            debug!("validator for {:?} is not a function; skipped", name);
            continue;
        }

        let function: Function = value.unchecked_into();
        validators.insert(name, move |_: &WebDom, field: &Element, form: &Element| {
            call(&function, field, form)
        });
    }

    validators
}

/// Invoke a JS validator; a throw or a malformed result counts as valid
fn call(function: &Function, field: &Element, form: &Element) -> Verdict {
    let result = match function.call2(&JsValue::NULL, field.as_ref(), form.as_ref()) {
        Ok(result) => result,
        Err(err) => {
            warn!("validator threw: {:?}", err);
            return Verdict::valid();
        }
    };

    serde_wasm_bindgen::from_value(result).unwrap_or_else(|err| {
        warn!("validator returned an unexpected value: {}", err);
        Verdict::valid()
    })
}
