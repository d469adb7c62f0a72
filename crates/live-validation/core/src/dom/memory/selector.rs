//! CSS selector subset for the in-memory document
//!
//! Supported: type (`input`, `*`), `#id`, `.class`, `[attr]`, `[attr=value]`
//! (quoted or bare), compounds of those, and comma-separated lists.
//! Combinators and pseudo-classes are rejected.

use super::{DomError, MemoryDom, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    compounds: Vec<Compound>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidSelector(input.to_string());

        let mut compounds = Vec::new();
        for part in split_list(input).ok_or_else(invalid)? {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid());
            }
            compounds.push(parse_compound(part).ok_or_else(invalid)?);
        }

        if compounds.is_empty() {
            return Err(invalid());
        }
        Ok(Self { compounds })
    }

    pub fn matches(&self, dom: &MemoryDom, node: NodeId) -> bool {
        self.compounds
            .iter()
            .any(|compound| compound_matches(compound, dom, node))
    }
}

/// Split on commas that are not inside `[...]` or quotes
fn split_list(input: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1)?,
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 || quote.is_some() {
        return None;
    }
    parts.push(&input[start..]);
    Some(parts)
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> Option<String> {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    if *pos == start {
        return None;
    }
    Some(chars[start..*pos].iter().collect())
}

fn parse_compound(part: &str) -> Option<Compound> {
    let chars: Vec<char> = part.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    if chars.first() == Some(&'*') {
        pos = 1;
    } else if chars.first().is_some_and(|c| c.is_ascii_alphabetic()) {
        compound.tag = Some(take_ident(&chars, &mut pos)?.to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                compound.id = Some(take_ident(&chars, &mut pos)?);
            }
            '.' => {
                pos += 1;
                compound.classes.push(take_ident(&chars, &mut pos)?);
            }
            '[' => {
                pos += 1;
                compound.attrs.push(parse_attr(&chars, &mut pos)?);
            }
            _ => return None,
        }
    }

    Some(compound)
}

fn parse_attr(chars: &[char], pos: &mut usize) -> Option<AttrMatch> {
    let name = take_ident(chars, pos)?.to_ascii_lowercase();

    match chars.get(*pos)? {
        ']' => {
            *pos += 1;
            Some(AttrMatch { name, value: None })
        }
        '=' => {
            *pos += 1;
            let value = match chars.get(*pos)? {
                quote @ ('"' | '\'') => {
                    let quote = *quote;
                    *pos += 1;
                    let start = *pos;
                    while *pos < chars.len() && chars[*pos] != quote {
                        *pos += 1;
                    }
                    let value: String = chars.get(start..*pos)?.iter().collect();
                    *pos += 1;
                    value
                }
                _ => take_ident(chars, pos)?,
            };
            if chars.get(*pos) != Some(&']') {
                return None;
            }
            *pos += 1;
            Some(AttrMatch {
                name,
                value: Some(value),
            })
        }
        _ => None,
    }
}

fn compound_matches(compound: &Compound, dom: &MemoryDom, node: NodeId) -> bool {
    let Some(tag) = dom.tag(node) else {
        return false;
    };

    if let Some(expected) = &compound.tag {
        if tag != expected.as_str() {
            return false;
        }
    }

    if let Some(id) = &compound.id {
        if dom.attr(node, "id").as_deref() != Some(id.as_str()) {
            return false;
        }
    }

    if !compound.classes.iter().all(|class| dom.has_class(node, class)) {
        return false;
    }

    compound.attrs.iter().all(|attr| match (&attr.value, dom.attr(node, &attr.name)) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(expected), Some(actual)) => *expected == actual,
    })
}
