//! In-memory document
//!
//! A small element tree with enough of the HTML form model to drive the
//! engine without a browser: attributes and classes, control values with a
//! dirty flag, constraint validation, custom validity messages, and a
//! [`Page`] that dispatches bubbling events and runs timers on a virtual clock.

mod constraints;
mod page;
mod parser;
mod selector;

pub use page::{Page, Submission, VirtualTimers, KEYSTROKE_INTERVAL};
pub use selector::SelectorList;

use thiserror::Error;

use super::Document;
use crate::validity::ValidityState;

/// Errors raised by the in-memory document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("HTML parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("Invalid selector: {0:?}")]
    InvalidSelector(String),

    #[error("No element matches {0:?}")]
    NotFound(String),
}

/// Node handle inside a [`MemoryDom`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    /// Value set by the user or script; `None` means the default value applies
    value: Option<String>,
    custom_validity: String,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Element tree with HTML form semantics
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Empty document with a `body` root
    pub fn new() -> Self {
        let root = Node {
            data: NodeData::Element(ElementData {
                tag: "body".to_string(),
                attrs: Vec::new(),
                value: None,
                custom_validity: String::new(),
            }),
            parent: None,
            children: Vec::new(),
        };

        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Build a document whose body holds the parsed fragment
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let mut dom = Self::new();
        let root = dom.root;
        parser::parse_into(&mut dom, root, html)?;
        Ok(dom)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_element(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs,
            value: None,
            custom_validity: String::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old_parent) = self.nodes[child.0].parent.take() {
            self.nodes[old_parent.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(node.0)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    /// Lowercase tag name; `None` for text nodes
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|child| self.element(*child).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Inclusive ancestors, nearest first
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node), move |current| self.parent(*current))
    }

    /// Element descendants in tree order, excluding `node`
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?
            .attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(node) else {
            return;
        };
        match element
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attrs.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        }
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.attr(node, "class")
            .map(|class| class.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    /// `classList.toggle(class, force)`
    pub fn toggle_class_on(&mut self, node: NodeId, class: &str, force: bool) {
        let mut classes = self.classes(node);
        let present = classes.iter().any(|c| c == class);

        match (force, present) {
            (true, false) => classes.push(class.to_string()),
            (false, true) => classes.retain(|c| c != class),
            _ => return,
        }
        self.set_attr(node, "class", &classes.join(" "));
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let Some(n) = self.nodes.get(node.0) else {
            return String::new();
        };
        match &n.data {
            NodeData::Text(text) => text.clone(),
            NodeData::Element(_) => n
                .children
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
        }
    }

    /// Replace the node's children with a single text node
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        if self.element(node).is_none() {
            return;
        }
        for child in std::mem::take(&mut self.nodes[node.0].children) {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let text = self.create_text(text);
            self.append_child(node, text);
        }
    }

    /// Current control value (`input.value`, `textarea.value`, `select.value`)
    pub fn value_of(&self, node: NodeId) -> String {
        let Some(element) = self.element(node) else {
            return String::new();
        };
        if let Some(value) = &element.value {
            return value.clone();
        }

        match element.tag.as_str() {
            "textarea" => self.text_content(node),
            "select" => self.default_select_value(node),
            _ => self.attr(node, "value").unwrap_or_default(),
        }
    }

    fn default_select_value(&self, select: NodeId) -> String {
        let options: Vec<NodeId> = self
            .descendants(select)
            .into_iter()
            .filter(|node| self.tag(*node) == Some("option"))
            .collect();

        options
            .iter()
            .find(|option| self.has_attr(**option, "selected"))
            .or_else(|| options.first())
            .map(|option| {
                self.attr(*option, "value")
                    .unwrap_or_else(|| self.text_content(*option).trim().to_string())
            })
            .unwrap_or_default()
    }

    /// Set the value as a user or script would; marks the value dirty
    pub fn set_value_of(&mut self, node: NodeId, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.value = Some(value.to_string());
        }
    }

    /// Whether the value was changed after parsing
    pub fn is_dirty(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|element| element.value.is_some())
    }

    pub fn custom_validity_message(&self, node: NodeId) -> String {
        self.element(node)
            .map(|element| element.custom_validity.clone())
            .unwrap_or_default()
    }

    pub fn set_custom_validity_message(&mut self, node: NodeId, message: &str) {
        if let Some(element) = self.element_mut(node) {
            element.custom_validity = message.to_string();
        }
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.find(|dom, node| dom.attr(node, "id").as_deref() == Some(id))
    }

    /// Element carrying `data-testid="{id}"`
    pub fn by_test_id(&self, id: &str) -> Option<NodeId> {
        self.find(|dom, node| dom.attr(node, "data-testid").as_deref() == Some(id))
    }

    fn find(&self, pred: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|node| pred(self, *node))
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError> {
        Ok(SelectorList::parse(selector)?.matches(self, node))
    }

    pub fn closest_matching(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .ancestors(node)
            .filter(|candidate| self.element(*candidate).is_some())
            .find(|candidate| selector.matches(self, *candidate)))
    }

    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect())
    }

    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all(scope, selector)?.into_iter().next())
    }

    /// Normalized control type: `input` defaults to "text", `button` to "submit"
    pub fn control_type_of(&self, node: NodeId) -> Option<String> {
        let tag = self.tag(node)?;
        let declared = self.attr(node, "type").map(|t| t.to_ascii_lowercase());
        match tag {
            "input" => Some(declared.filter(|t| !t.is_empty()).unwrap_or_else(|| "text".into())),
            "button" => Some(match declared.as_deref() {
                Some("reset") => "reset".into(),
                Some("button") => "button".into(),
                _ => "submit".into(),
            }),
            "textarea" => Some("textarea".into()),
            "select" => Some(if self.has_attr(node, "multiple") {
                "select-multiple".into()
            } else {
                "select-one".into()
            }),
            _ => None,
        }
    }

    /// Disabled by its own attribute or by an enclosing disabled fieldset
    pub fn is_disabled_node(&self, node: NodeId) -> bool {
        if self.has_attr(node, "disabled") {
            return true;
        }
        self.ancestors(node)
            .skip(1)
            .any(|ancestor| self.tag(ancestor) == Some("fieldset") && self.has_attr(ancestor, "disabled"))
    }

    /// Submit buttons are submit controls: `<button>` without type or type=submit, `<input type=submit>`
    pub fn is_submit_control(&self, node: NodeId) -> bool {
        matches!(self.tag(node), Some("button") | Some("input"))
            && matches!(self.control_type_of(node).as_deref(), Some("submit") | Some("image"))
    }

    pub fn form_of(&self, node: NodeId) -> Option<NodeId> {
        self.ancestors(node).find(|ancestor| self.tag(*ancestor) == Some("form"))
    }

    pub fn validity_of(&self, node: NodeId) -> ValidityState {
        constraints::compute(self, node)
    }

    pub fn validation_message_of(&self, node: NodeId) -> String {
        constraints::message(self, node)
    }

    fn log_selector_error<T: Default>(result: Result<T, DomError>) -> T {
        result.unwrap_or_else(|err| {
            tracing::warn!("{}", err);
            T::default()
        })
    }
}

const LISTED_ELEMENTS: [&str; 6] = ["button", "fieldset", "input", "output", "select", "textarea"];

impl Document for MemoryDom {
    type Node = NodeId;

    fn tag_name(&self, node: &NodeId) -> String {
        self.tag(*node).unwrap_or_default().to_ascii_uppercase()
    }

    fn control_type(&self, node: &NodeId) -> Option<String> {
        self.control_type_of(*node)
    }

    fn name(&self, node: &NodeId) -> String {
        self.attr(*node, "name").unwrap_or_default()
    }

    fn value(&self, node: &NodeId) -> String {
        self.value_of(*node)
    }

    fn is_disabled(&self, node: &NodeId) -> bool {
        self.is_disabled_node(*node)
    }

    fn will_validate(&self, node: &NodeId) -> bool {
        constraints::will_validate(self, *node)
    }

    fn validity(&self, node: &NodeId) -> ValidityState {
        self.validity_of(*node)
    }

    fn validation_message(&self, node: &NodeId) -> String {
        self.validation_message_of(*node)
    }

    fn set_custom_validity(&mut self, node: &NodeId, message: &str) {
        self.set_custom_validity_message(*node, message);
    }

    fn closest(&self, node: &NodeId, selector: &str) -> Option<NodeId> {
        Self::log_selector_error(self.closest_matching(*node, selector))
    }

    fn query_selector(&self, node: &NodeId, selector: &str) -> Option<NodeId> {
        Self::log_selector_error(MemoryDom::query_selector(self, *node, selector))
    }

    fn query_selector_all(&self, node: &NodeId, selector: &str) -> Vec<NodeId> {
        Self::log_selector_error(MemoryDom::query_selector_all(self, *node, selector))
    }

    fn form_controls(&self, form: &NodeId) -> Vec<NodeId> {
        self.descendants(*form)
            .into_iter()
            .filter(|node| {
                self.tag(*node)
                    .is_some_and(|tag| LISTED_ELEMENTS.contains(&tag))
                    && self.control_type_of(*node).as_deref() != Some("image")
            })
            .collect()
    }

    fn toggle_class(&mut self, node: &NodeId, class: &str, force: bool) {
        self.toggle_class_on(*node, class, force);
    }

    fn set_text(&mut self, node: &NodeId, text: &str) {
        self.set_text_content(*node, text);
    }

    fn set_disabled(&mut self, node: &NodeId, disabled: bool) {
        if disabled {
            self.set_attr(*node, "disabled", "");
        } else {
            self.remove_attr(*node, "disabled");
        }
    }
}
