use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use crate::util::normalize_whitespace;

const VOID_ELEMENTS: [&str; 12] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    fn named(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(candidate, _)| {
                candidate.eq_ignore_ascii_case(key)
                    || (!key.contains(':')
                        && candidate
                            .rsplit_once(':')
                            .is_some_and(|(_, local)| local.eq_ignore_ascii_case(key)))
            })
            .map(|(_, value)| value.as_str())
    }

    pub fn class_tokens(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &MarkupElement> {
        self.children.iter().filter_map(|node| match node {
            MarkupNode::Element(element) => Some(element),
            MarkupNode::Text(_) => None,
        })
    }

    pub fn descendants(&self) -> Vec<&MarkupElement> {
        let mut found = Vec::new();
        let mut stack = self.child_elements().collect::<Vec<_>>();
        stack.reverse();

        while let Some(element) = stack.pop() {
            found.push(element);
            let mut children = element.child_elements().collect::<Vec<_>>();
            children.reverse();
            stack.extend(children);
        }

        found
    }

    pub fn find(&self, name: &str) -> Option<&MarkupElement> {
        self.descendants().into_iter().find(|element| element.is(name))
    }

    pub fn find_all(&self, name: &str) -> Vec<&MarkupElement> {
        self.descendants()
            .into_iter()
            .filter(|element| element.is(name))
            .collect()
    }

    pub fn raw_text(&self) -> String {
        let mut text = String::new();
        collect_text(&self.children, &mut text);
        text
    }

    pub fn text(&self) -> String {
        normalize_whitespace(&self.raw_text())
    }
}

fn collect_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element(element) => collect_text(&element.children, out),
        }
    }
}

pub fn parse_markup(bytes: &[u8], source_name: &str) -> MarkupElement {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().check_end_names = false;

    let mut stack = vec![MarkupElement::named("#document".to_string(), Vec::new())];

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(error) => {
                warn!(
                    source = source_name,
                    position = reader.buffer_position(),
                    error = %error,
                    "markup parse stopped early"
                );
                break;
            }
        };

        match event {
            Event::Start(start) => {
                let element = start_element(&start);
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    push_child(&mut stack, MarkupNode::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(start) => {
                push_child(&mut stack, MarkupNode::Element(start_element(&start)));
            }
            Event::End(end) => {
                let name = lossy_lowercase(end.local_name().as_ref());
                close_element(&mut stack, &name);
            }
            Event::Text(text) => {
                push_child(&mut stack, MarkupNode::Text(decode_entities(&text)));
            }
            Event::CData(cdata) => {
                push_child(
                    &mut stack,
                    MarkupNode::Text(String::from_utf8_lossy(&cdata).into_owned()),
                );
            }
            Event::Eof => break,
            _ => {}
        }
    }

    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            push_child(&mut stack, MarkupNode::Element(open));
        }
    }

    stack.pop().unwrap_or_default()
}

fn start_element(start: &BytesStart<'_>) -> MarkupElement {
    let name = lossy_lowercase(start.local_name().as_ref());
    let attributes = start
        .html_attributes()
        .flatten()
        .map(|attribute| {
            let key = String::from_utf8_lossy(attribute.key.as_ref()).to_ascii_lowercase();
            let value = decode_entities(&attribute.value);
            (key, value)
        })
        .collect();
    MarkupElement::named(name, attributes)
}

fn push_child(stack: &mut [MarkupElement], node: MarkupNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn close_element(stack: &mut Vec<MarkupElement>, name: &str) {
    let Some(depth) = stack.iter().skip(1).rposition(|open| open.name == name) else {
        return;
    };

    let target = depth + 1;
    while stack.len() > target {
        if let Some(open) = stack.pop() {
            push_child(stack, MarkupNode::Element(open));
        }
    }
}

fn lossy_lowercase(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_ascii_lowercase()
}

fn decode_entities(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    match unescape_with(&raw, resolve_html5_entity) {
        Ok(Cow::Borrowed(text)) => text.to_string(),
        Ok(Cow::Owned(text)) => text,
        Err(_) => unescape_known_entities(&raw),
    }
}

// Unknown names stay literal.
fn unescape_known_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let reference = tail.find(';').map(|end| &tail[..=end]);

        match reference.and_then(|reference| {
            unescape_with(reference, resolve_html5_entity)
                .ok()
                .map(|decoded| (reference.len(), decoded.into_owned()))
        }) {
            Some((consumed, decoded)) => {
                out.push_str(&decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
