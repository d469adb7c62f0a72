//! Constraint validation for the in-memory document

use regex::Regex;

use super::{MemoryDom, NodeId};
use crate::validity::ValidityState;

/// Input types whose value is length- and pattern-checked
const TEXT_LIKE: [&str; 6] = ["text", "search", "url", "tel", "email", "password"];

/// Input types that honour `required`
const REQUIRES_VALUE: [&str; 11] = [
    "text", "search", "url", "tel", "email", "password", "number", "date", "time",
    "datetime-local", "checkbox",
];

pub(super) fn will_validate(dom: &MemoryDom, node: NodeId) -> bool {
    if dom.is_disabled_node(node) {
        return false;
    }

    match dom.tag(node) {
        Some("input") => {
            let kind = dom.control_type_of(node).unwrap_or_default();
            !matches!(kind.as_str(), "hidden" | "reset" | "button") && !dom.has_attr(node, "readonly")
        }
        Some("textarea") => !dom.has_attr(node, "readonly"),
        Some("select") => true,
        Some("button") => dom.control_type_of(node).as_deref() == Some("submit"),
        _ => false,
    }
}

pub(super) fn compute(dom: &MemoryDom, node: NodeId) -> ValidityState {
    let mut validity = ValidityState::default();
    if !will_validate(dom, node) {
        return validity;
    }

    let value = dom.value_of(node);
    let required = dom.has_attr(node, "required");

    match dom.tag(node) {
        Some("textarea") => {
            validity.value_missing = required && value.is_empty();
            check_length(dom, node, &value, &mut validity);
        }
        Some("select") => {
            validity.value_missing = required && value.is_empty();
        }
        Some("input") => {
            let kind = dom.control_type_of(node).unwrap_or_default();
            compute_input(dom, node, &kind, &value, required, &mut validity);
        }
        _ => {}
    }

    validity.custom_error = !dom.custom_validity_message(node).is_empty();
    validity
}

fn compute_input(
    dom: &MemoryDom,
    node: NodeId,
    kind: &str,
    value: &str,
    required: bool,
    validity: &mut ValidityState,
) {
    if required && REQUIRES_VALUE.contains(&kind) {
        validity.value_missing = if kind == "checkbox" {
            !dom.has_attr(node, "checked")
        } else {
            value.is_empty()
        };
    }

    if value.is_empty() {
        return;
    }

    match kind {
        "email" => validity.type_mismatch = !is_simple_email(value),
        "url" => validity.type_mismatch = !is_absolute_url(value),
        _ => {}
    }

    if TEXT_LIKE.contains(&kind) {
        check_length(dom, node, value, validity);
        check_pattern(dom, node, value, validity);
    }

    if matches!(kind, "number" | "range") {
        check_number(dom, node, value, validity);
    }
}

/// minlength/maxlength only apply once the value has been edited
fn check_length(dom: &MemoryDom, node: NodeId, value: &str, validity: &mut ValidityState) {
    if !dom.is_dirty(node) || value.is_empty() {
        return;
    }

    let len = value.chars().count();
    if let Some(min) = parse_attr::<usize>(dom, node, "minlength") {
        validity.too_short = len < min;
    }
    if let Some(max) = parse_attr::<usize>(dom, node, "maxlength") {
        validity.too_long = len > max;
    }
}

fn check_pattern(dom: &MemoryDom, node: NodeId, value: &str, validity: &mut ValidityState) {
    let Some(pattern) = dom.attr(node, "pattern").filter(|p| !p.is_empty()) else {
        return;
    };

    match Regex::new(&format!("^(?:{})$", pattern)) {
        Ok(regex) => validity.pattern_mismatch = !regex.is_match(value),
        // browsers ignore patterns that fail to compile
        Err(err) => tracing::debug!("ignoring invalid pattern {:?}: {}", pattern, err),
    }
}

fn check_number(dom: &MemoryDom, node: NodeId, value: &str, validity: &mut ValidityState) {
    let Some(number) = value.trim().parse::<f64>().ok().filter(|n| n.is_finite()) else {
        validity.bad_input = true;
        return;
    };

    let min = parse_attr::<f64>(dom, node, "min");
    if let Some(min) = min {
        validity.range_underflow = number < min;
    }
    if let Some(max) = parse_attr::<f64>(dom, node, "max") {
        validity.range_overflow = number > max;
    }

    let step = dom.attr(node, "step").unwrap_or_default();
    if step.eq_ignore_ascii_case("any") {
        return;
    }
    let step = step.trim().parse::<f64>().ok().filter(|s| *s > 0.0).unwrap_or(1.0);
    let base = min.unwrap_or(0.0);
    let ratio = (number - base) / step;
    validity.step_mismatch = (ratio - ratio.round()).abs() > 1e-7;
}

fn parse_attr<T: std::str::FromStr>(dom: &MemoryDom, node: NodeId, name: &str) -> Option<T> {
    dom.attr(node, name)?.trim().parse().ok()
}

fn is_email_local_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(ch)
}

fn is_domain_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

/// The HTML "valid e-mail address" production
pub(crate) fn is_simple_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && local.chars().all(is_email_local_char)
        && domain.split('.').all(is_domain_label)
}

pub(crate) fn is_absolute_url(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
        && !rest.is_empty()
        && !value.contains(char::is_whitespace)
}

/// Browser-style `validationMessage`
pub(super) fn message(dom: &MemoryDom, node: NodeId) -> String {
    if !will_validate(dom, node) {
        return String::new();
    }

    let custom = dom.custom_validity_message(node);
    if !custom.is_empty() {
        return custom;
    }

    let validity = compute(dom, node);
    let kind = dom.control_type_of(node).unwrap_or_default();
    let len = dom.value_of(node).chars().count();
    let attr = |name: &str| dom.attr(node, name).unwrap_or_default();

    if validity.value_missing {
        return match kind.as_str() {
            "checkbox" => "Please check this box if you want to proceed.".to_string(),
            "select-one" | "select-multiple" => "Please select an item in the list.".to_string(),
            _ => "Please fill out this field.".to_string(),
        };
    }
    if validity.type_mismatch {
        return match kind.as_str() {
            "email" => "Please enter an email address.".to_string(),
            _ => "Please enter a URL.".to_string(),
        };
    }
    if validity.bad_input {
        return "Please enter a number.".to_string();
    }
    if validity.too_short {
        return format!(
            "Please lengthen this text to {} characters or more (you are currently using {} characters).",
            attr("minlength"),
            len
        );
    }
    if validity.too_long {
        return format!(
            "Please shorten this text to no more than {} characters (you are currently using {} characters).",
            attr("maxlength"),
            len
        );
    }
    if validity.pattern_mismatch {
        return "Please match the requested format.".to_string();
    }
    if validity.range_underflow {
        return format!("Value must be greater than or equal to {}.", attr("min"));
    }
    if validity.range_overflow {
        return format!("Value must be less than or equal to {}.", attr("max"));
    }
    if validity.step_mismatch {
        return "Please enter a valid value.".to_string();
    }

    String::new()
}
