// File: src/config.rs
// Purpose: Validation options with per-field defaults, loadable from JSON or TOML

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Effective engine options.
///
/// Every field defaults on its own, so a partial JSON/TOML document (or a
/// JS options object) overlays only the keys it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOptions {
    /// Debounce window in milliseconds before a typed edit re-validates
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Class toggled on the field's group while the field is invalid
    #[serde(default = "default_error_class_name")]
    pub error_class_name: String,

    /// Overrides `error_class_name` for the group when set
    #[serde(default)]
    pub parent_error_class_name: Option<String>,

    /// Class toggled on the field itself (off by default)
    #[serde(default)]
    pub field_error_class_name: Option<String>,

    /// Selector, relative to the group, of the element receiving the message
    #[serde(default = "default_error_selector", alias = "errorContainerSelector")]
    pub error_selector: String,

    /// Selector of the field's enclosing group
    #[serde(default = "default_parent_selector")]
    pub parent_selector: String,

    /// Disable submit controls while any field is invalid
    #[serde(default = "default_true")]
    pub disable: bool,

    /// Selector of the form's submit controls
    #[serde(default = "default_submit_selector")]
    pub submit_selector: String,
}

// Default values
fn default_delay() -> u64 {
    500
}

fn default_error_class_name() -> String {
    "has-error".to_string()
}

fn default_error_selector() -> String {
    ".help-block".to_string()
}

fn default_parent_selector() -> String {
    ".form-group".to_string()
}

fn default_submit_selector() -> String {
    "input[type=submit], button[type=submit]".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            error_class_name: default_error_class_name(),
            parent_error_class_name: None,
            field_error_class_name: None,
            error_selector: default_error_selector(),
            parent_selector: default_parent_selector(),
            disable: default_true(),
            submit_selector: default_submit_selector(),
        }
    }
}

impl ValidationOptions {
    /// Parse options from JSON, e.g. a `data-validation` attribute
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(json).context("Failed to parse validation options (JSON)")
    }

    /// Parse options from a TOML document
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse validation options (TOML)")
    }

    pub fn delay_duration(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    /// Class toggled on the group element
    pub fn group_error_class(&self) -> &str {
        self.parent_error_class_name
            .as_deref()
            .unwrap_or(&self.error_class_name)
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay = delay_ms;
        self
    }

    pub fn with_parent_selector(mut self, selector: impl Into<String>) -> Self {
        self.parent_selector = selector.into();
        self
    }

    pub fn with_error_selector(mut self, selector: impl Into<String>) -> Self {
        self.error_selector = selector.into();
        self
    }

    pub fn with_parent_error_class_name(mut self, class: impl Into<String>) -> Self {
        self.parent_error_class_name = Some(class.into());
        self
    }

    pub fn with_field_error_class_name(mut self, class: impl Into<String>) -> Self {
        self.field_error_class_name = Some(class.into());
        self
    }

    /// Turn submit-control disabling on or off
    pub fn with_disable(mut self, disable: bool) -> Self {
        self.disable = disable;
        self
    }
}
