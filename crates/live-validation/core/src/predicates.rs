//! Form control predicates

use crate::dom::Document;

/// Element tags that take part in field validation
pub const CONTROL_TAGS: [&str; 3] = ["input", "textarea", "select"];

/// Control types that never carry a user value
pub const EXCLUDED_TYPES: [&str; 4] = ["submit", "button", "reset", "hidden"];

/// True if `tag` names an input, textarea or select (any case)
pub fn is_control_tag(tag: &str) -> bool {
    CONTROL_TAGS.iter().any(|known| known.eq_ignore_ascii_case(tag))
}

/// True unless the control type is submit/button/reset/hidden
pub fn is_validatable_type(control_type: Option<&str>) -> bool {
    match control_type {
        Some(kind) => !EXCLUDED_TYPES
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(kind)),
        None => true,
    }
}

/// Whether `node` is a form control the engine validates.
///
/// `None` (an event without an element target) is never a control.
pub fn is_form_control<D: Document>(dom: &D, node: Option<&D::Node>) -> bool {
    let Some(node) = node else {
        return false;
    };

    is_control_tag(&dom.tag_name(node)) && is_validatable_type(dom.control_type(node).as_deref())
}
