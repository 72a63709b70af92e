use crate::model::{IndexEntry, Reference};
use crate::pages::{normalize_page_token, page_token_from_marker};
use crate::source::epub::container::file_basename;
use crate::source::markup::{MarkupElement, MarkupNode, parse_markup};
use crate::util::normalize_whitespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParagraphRole {
    Entry,
    SubEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexParagraph {
    role: ParagraphRole,
    text: String,
    refs: Vec<Reference>,
}

fn paragraph_role(paragraph: &MarkupElement) -> Option<ParagraphRole> {
    let classes = paragraph
        .class_tokens()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>();

    if classes
        .iter()
        .any(|class| class.starts_with("index-note") || class.starts_with("index-head"))
    {
        return None;
    }
    if classes.iter().any(|class| class == "index-2") {
        return Some(ParagraphRole::SubEntry);
    }
    if classes
        .iter()
        .any(|class| class == "index-1" || class == "index-alpha")
    {
        return Some(ParagraphRole::Entry);
    }
    None
}

fn is_page_anchor(anchor: &MarkupElement) -> bool {
    anchor
        .attr("href")
        .and_then(|href| href.split_once('#'))
        .is_some_and(|(_, fragment)| page_token_from_marker(fragment).is_some())
}

fn page_reference(anchor: &MarkupElement) -> Option<Reference> {
    let href = anchor.attr("href")?;
    let (path, fragment) = href.split_once('#')?;
    let token = page_token_from_marker(fragment)?;
    let file_id = file_basename(path);
    if file_id.is_empty() {
        return None;
    }
    Some(Reference::in_file(file_id, normalize_page_token(token)))
}

#[derive(Debug, Default)]
struct ParagraphScan {
    text: String,
    refs: Vec<Reference>,
    past_first_page_anchor: bool,
}

impl ParagraphScan {
    /// Text accumulates only until the first page anchor; references are
    /// collected from every page anchor in the paragraph.
    fn visit(&mut self, nodes: &[MarkupNode]) {
        for node in nodes {
            match node {
                MarkupNode::Text(fragment) => {
                    if !self.past_first_page_anchor {
                        self.text.push_str(fragment);
                    }
                }
                MarkupNode::Element(element) if element.is("a") && is_page_anchor(element) => {
                    self.past_first_page_anchor = true;
                    self.refs.extend(page_reference(element));
                }
                MarkupNode::Element(element) if element.is("br") => {
                    if !self.past_first_page_anchor {
                        self.text.push(' ');
                    }
                }
                MarkupNode::Element(element) => self.visit(&element.children),
            }
        }
    }
}

fn read_paragraph(paragraph: &MarkupElement, role: ParagraphRole) -> IndexParagraph {
    let mut scan = ParagraphScan::default();
    scan.visit(&paragraph.children);

    let text = normalize_whitespace(&scan.text);
    let text = text
        .trim_end_matches(|character: char| {
            character.is_whitespace() || matches!(character, ',' | ';' | ':')
        })
        .trim_start_matches(|character: char| character.is_whitespace() || character == ',')
        .to_string();

    IndexParagraph {
        role,
        text,
        refs: scan.refs,
    }
}

fn is_cross_reference_only(paragraph: &IndexParagraph) -> bool {
    if !paragraph.refs.is_empty() {
        return false;
    }
    let lowered = paragraph.text.to_lowercase();
    lowered.contains("see") || lowered.contains("continued")
}

#[derive(Debug, Default)]
struct IndexFold {
    current_term: String,
    entries: Vec<IndexEntry>,
}

pub fn parse_index_document(markup: &[u8], source_name: &str) -> Vec<IndexEntry> {
    let root = parse_markup(markup, source_name);

    let folded = root
        .find_all("p")
        .into_iter()
        .filter_map(|paragraph| {
            paragraph_role(paragraph).map(|role| read_paragraph(paragraph, role))
        })
        .fold(IndexFold::default(), |mut state, paragraph| {
            let (term, subentry) = match paragraph.role {
                ParagraphRole::Entry => {
                    state.current_term = paragraph.text.clone();
                    (paragraph.text.clone(), String::new())
                }
                ParagraphRole::SubEntry => (state.current_term.clone(), paragraph.text.clone()),
            };

            if is_cross_reference_only(&paragraph) || term.is_empty() {
                return state;
            }

            state.entries.push(IndexEntry {
                term,
                subentry,
                refs: paragraph.refs,
            });
            state
        });

    folded.entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Vec<IndexEntry> {
        let document = format!(
            r#"<?xml version="1.0" encoding="utf-8"?><html xmlns="http://www.w3.org/1999/xhtml"><body>{body}</body></html>"#
        );
        parse_index_document(document.as_bytes(), "Index.xhtml")
    }

    #[test]
    fn sub_entries_inherit_the_current_term() {
        let entries = parse(
            r##"<p class="Index-Head">A</p>
<p class="Index-1">closures, <a href="ch01.xhtml#page_12">12</a>, <a href="Text/ch02.xhtml#page_40">40</a></p>
<p class="Index-2">capturing environment, <a href="ch01.xhtml#page_14">14</a></p>
<p class="Index-2">move keyword, <a href="ch02.xhtml#page_xii">xii</a></p>"##,
        );

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].term, "closures");
        assert_eq!(entries[0].subentry, "");
        assert_eq!(
            entries[0].refs,
            vec![
                Reference::in_file("ch01.xhtml", 12),
                Reference::in_file("ch02.xhtml", 40),
            ]
        );
        assert_eq!(entries[1].term, "closures");
        assert_eq!(entries[1].subentry, "capturing environment");
        assert_eq!(entries[2].subentry, "move keyword");
        assert_eq!(entries[2].refs, vec![Reference::in_file("ch02.xhtml", 12)]);
    }

    #[test]
    fn cross_reference_paragraphs_without_pages_are_dropped() {
        let entries = parse(
            r##"<p class="Index-1">borrowing, <i>see</i> references</p>
<p class="Index-1">lifetimes (continued)</p>
<p class="Index-1">generics, <a href="ch03.xhtml#page_77">77</a></p>
<p class="Index-Note">Page numbers refer to the print edition</p>"##,
        );

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].term, "generics");
    }

    #[test]
    fn non_page_anchors_are_ignored_and_text_keeps_inline_markup() {
        let entries = parse(
            r##"<p class="Index-1"><code>Box&lt;T&gt;</code> type, <a href="#idx-b">see also</a> <a href="ch04.xhtml#page_90">90</a></p>"##,
        );

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].term, "Box<T> type, see also");
        assert_eq!(entries[0].refs, vec![Reference::in_file("ch04.xhtml", 90)]);
    }

    #[test]
    fn entries_without_references_and_without_cross_reference_text_are_kept() {
        let entries = parse(r#"<p class="Index-1">unsafe code</p>"#);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].refs.is_empty());
    }

    #[test]
    fn named_entities_in_terms_are_decoded() {
        let entries = parse(
            r##"<p class="Index-1">caf&eacute; r&eacute;sum&eacute;&trade;, <a href="c.xhtml#page_3">3</a></p>"##,
        );

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].term, "café résumé™");
        assert_eq!(entries[0].refs, vec![Reference::in_file("c.xhtml", 3)]);
    }
}
