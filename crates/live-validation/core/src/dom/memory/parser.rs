//! Well-formed HTML fragment parser for the in-memory document
//!
//! Handles elements, quoted/unquoted/boolean attributes, text, comments and
//! void elements. It does not try to recover from malformed markup.

use super::{DomError, MemoryDom, NodeId};

const VOID_ELEMENTS: [&str; 8] = ["area", "br", "col", "hr", "img", "input", "link", "meta"];

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn error(&self, message: impl Into<String>) -> DomError {
        DomError::Parse {
            offset: self.pos,
            message: message.into(),
        }
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.')
}

/// Parse `html` and append the resulting nodes under `parent`
pub(crate) fn parse_into(dom: &mut MemoryDom, parent: NodeId, html: &str) -> Result<(), DomError> {
    let mut cursor = Cursor { input: html, pos: 0 };
    let mut stack: Vec<NodeId> = vec![parent];

    while !cursor.at_end() {
        if cursor.eat("<!--") {
            match cursor.rest().find("-->") {
                Some(end) => cursor.pos += end + 3,
                None => return Err(cursor.error("unterminated comment")),
            }
        } else if cursor.eat("</") {
            let name = cursor.take_while(is_name_char).to_ascii_lowercase();
            cursor.skip_whitespace();
            if !cursor.eat(">") {
                return Err(cursor.error(format!("malformed closing tag </{}", name)));
            }

            let open = stack.last().copied().filter(|node| *node != parent);
            match open {
                Some(node) if dom.tag(node) == Some(name.as_str()) => {
                    stack.pop();
                }
                _ => return Err(cursor.error(format!("unexpected closing tag </{}>", name))),
            }
        } else if cursor.peek() == Some('<') {
            cursor.bump();
            let name = cursor.take_while(is_name_char).to_ascii_lowercase();
            if name.is_empty() {
                return Err(cursor.error("expected tag name"));
            }

            let (attrs, self_closing) = parse_attributes(&mut cursor)?;
            let current = stack.last().copied().unwrap_or(parent);
            let node = dom.create_element(&name, attrs);
            dom.append_child(current, node);

            if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
                stack.push(node);
            }
        } else {
            let raw = cursor.take_while(|c| c != '<');
            if !raw.trim().is_empty() {
                let current = stack.last().copied().unwrap_or(parent);
                let text = dom.create_text(&decode_entities(raw));
                dom.append_child(current, text);
            }
        }
    }

    if stack.len() > 1 {
        let unclosed = stack
            .last()
            .and_then(|node| dom.tag(*node))
            .unwrap_or_default()
            .to_string();
        return Err(cursor.error(format!("unclosed <{}>", unclosed)));
    }

    Ok(())
}

fn parse_attributes(cursor: &mut Cursor<'_>) -> Result<(Vec<(String, String)>, bool), DomError> {
    let mut attrs = Vec::new();

    loop {
        cursor.skip_whitespace();
        if cursor.eat("/>") {
            return Ok((attrs, true));
        }
        if cursor.eat(">") {
            return Ok((attrs, false));
        }
        if cursor.at_end() {
            return Err(cursor.error("unterminated tag"));
        }

        let name = cursor.take_while(is_name_char).to_ascii_lowercase();
        if name.is_empty() {
            return Err(cursor.error("expected attribute name"));
        }

        cursor.skip_whitespace();
        let value = if cursor.eat("=") {
            cursor.skip_whitespace();
            match cursor.peek() {
                Some(quote @ ('"' | '\'')) => {
                    cursor.bump();
                    let value = cursor.take_while(|c| c != quote);
                    if !cursor.eat(&quote.to_string()) {
                        return Err(cursor.error(format!("unterminated value for {}", name)));
                    }
                    decode_entities(value)
                }
                _ => decode_entities(
                    cursor.take_while(|c| !c.is_whitespace() && c != '>' && c != '/'),
                ),
            }
        } else {
            String::new()
        };

        attrs.push((name, value));
    }
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
