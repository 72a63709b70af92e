use crate::model::SubheadingBreakpoint;
use crate::pages::{normalize_page_token, page_token_from_marker};
use crate::source::markup::{MarkupElement, MarkupNode, parse_markup};

const SUBHEADING_ELEMENTS: [&str; 2] = ["h2", "h3"];

#[derive(Debug, Default)]
struct BreakpointScan {
    current: String,
    last_recorded: Option<String>,
    breakpoints: Vec<SubheadingBreakpoint>,
}

impl BreakpointScan {
    fn record_marker(&mut self, page: u32) {
        if self.last_recorded.as_deref() == Some(self.current.as_str()) {
            return;
        }
        self.breakpoints.push(SubheadingBreakpoint {
            page,
            subheading: self.current.clone(),
        });
        self.last_recorded = Some(self.current.clone());
    }

    fn visit(&mut self, element: &MarkupElement) {
        if SUBHEADING_ELEMENTS.contains(&element.name.as_str()) {
            self.current = element.text();
            // Markers inside the heading belong to the heading they sit in.
            for marker in element.descendants() {
                if let Some(page) = marker_page(marker) {
                    self.record_marker(page);
                }
            }
            return;
        }

        if let Some(page) = marker_page(element) {
            self.record_marker(page);
        }

        for child in &element.children {
            if let MarkupNode::Element(child) = child {
                self.visit(child);
            }
        }
    }
}

fn marker_page(element: &MarkupElement) -> Option<u32> {
    element
        .attr("id")
        .and_then(page_token_from_marker)
        .map(normalize_page_token)
}

/// The first page marker is always recorded, later ones only when the active
/// subheading changed since the last recorded breakpoint.
pub fn extract_subheading_breakpoints(
    markup: &[u8],
    source_name: &str,
) -> Vec<SubheadingBreakpoint> {
    let root = parse_markup(markup, source_name);
    let mut scan = BreakpointScan::default();
    for child in root.child_elements() {
        scan.visit(child);
    }

    let mut breakpoints = scan.breakpoints;
    breakpoints.sort_by_key(|breakpoint| breakpoint.page);
    breakpoints
}
