//! Custom field validators

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::Document;

/// Result of a custom validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_valid: bool,
    #[serde(default)]
    pub message: String,
}

impl Verdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }

    /// `valid` when `ok`, otherwise invalid with `message`
    pub fn check(ok: bool, message: impl Into<String>) -> Self {
        Self {
            is_valid: ok,
            message: message.into(),
        }
    }
}

/// Validator called with (document, field, form)
pub type Validator<D> =
    Rc<dyn Fn(&D, &<D as Document>::Node, &<D as Document>::Node) -> Verdict>;

/// Validators keyed by field name; fixed once the engine is built
pub struct Validators<D: Document> {
    by_name: HashMap<String, Validator<D>>,
}

impl<D: Document> Default for Validators<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Document> Clone for Validators<D> {
    fn clone(&self) -> Self {
        Self {
            by_name: self.by_name.clone(),
        }
    }
}

impl<D: Document> fmt::Debug for Validators<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("Validators").field("fields", &names).finish()
    }
}

impl<D: Document> Validators<D> {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    /// Builder form of [`Validators::insert`]
    pub fn with<F>(mut self, field: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&D, &D::Node, &D::Node) -> Verdict + 'static,
    {
        self.insert(field, validator);
        self
    }

    /// Register `validator` for `field`, replacing any previous one
    pub fn insert<F>(&mut self, field: impl Into<String>, validator: F)
    where
        F: Fn(&D, &D::Node, &D::Node) -> Verdict + 'static,
    {
        self.by_name.insert(field.into(), Rc::new(validator));
    }

    pub fn get(&self, field: &str) -> Option<Validator<D>> {
        self.by_name.get(field).cloned()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.by_name.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::{MemoryDom, NodeId};

    #[test]
    fn test_registry() {
        let validators: Validators<MemoryDom> = Validators::new()
            .with("password", |dom: &MemoryDom, field: &NodeId, _form: &NodeId| {
                Verdict::check(dom.value_of(*field) != "password", "Password should not be 'password'")
            });

        assert!(validators.contains("password"));
        assert!(!validators.contains("email"));
        assert_eq!(validators.len(), 1);
        assert!(validators.get("email").is_none());
    }

    #[test]
    fn test_verdict_deserializes_from_camel_case() {
        let verdict: Verdict = serde_json::from_str(r#"{"isValid": false, "message": "nope"}"#).unwrap();
        assert_eq!(verdict, Verdict::invalid("nope"));

        let verdict: Verdict = serde_json::from_str(r#"{"isValid": true}"#).unwrap();
        assert_eq!(verdict, Verdict::valid());
    }
}
