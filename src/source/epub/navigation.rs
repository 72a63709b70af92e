use std::collections::HashSet;

use crate::source::epub::container::file_basename;
use crate::source::markup::{MarkupElement, parse_markup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavTarget {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigation {
    pub doc_title: Option<String>,
    pub targets: Vec<NavTarget>,
}

pub fn parse_ncx(ncx: &[u8], source_name: &str) -> Navigation {
    let root = parse_markup(ncx, source_name);

    let doc_title = root
        .find("doctitle")
        .and_then(|doc_title| doc_title.find("text"))
        .map(MarkupElement::text)
        .filter(|title| !title.is_empty());

    let targets = root.find_all("navpoint").into_iter().filter_map(|nav_point| {
        let src = nav_point
            .child_elements()
            .find(|child| child.is("content"))
            .and_then(|content| content.attr("src"))?;
        let label = nav_point
            .child_elements()
            .find(|child| child.is("navlabel"))
            .map(first_label_text)
            .unwrap_or_default();
        Some(NavTarget {
            label,
            href: src.trim().to_string(),
        })
    });

    Navigation {
        doc_title,
        targets: first_target_per_file(targets),
    }
}

pub fn parse_nav_document(nav: &[u8], source_name: &str) -> Navigation {
    let root = parse_markup(nav, source_name);

    let doc_title = root
        .find("head")
        .and_then(|head| head.find("title"))
        .map(MarkupElement::text)
        .filter(|title| !title.is_empty());

    let navs = root.find_all("nav");
    let toc_nav = navs
        .iter()
        .find(|nav| {
            nav.attr("epub:type")
                .is_some_and(|kind| kind.split_whitespace().any(|token| token == "toc"))
        })
        .or_else(|| navs.first());

    let targets = toc_nav
        .map(|nav| {
            nav.find_all("a")
                .into_iter()
                .filter_map(|anchor| {
                    let href = anchor.attr("href")?.trim();
                    Some(NavTarget {
                        label: anchor.text(),
                        href: href.to_string(),
                    })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Navigation {
        doc_title,
        targets: first_target_per_file(targets),
    }
}

fn first_label_text(nav_label: &MarkupElement) -> String {
    nav_label
        .find_all("text")
        .into_iter()
        .map(MarkupElement::text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn first_target_per_file(targets: impl IntoIterator<Item = NavTarget>) -> Vec<NavTarget> {
    let mut seen = HashSet::<String>::new();
    targets
        .into_iter()
        .filter_map(|target| {
            let path = target.href.split('#').next().unwrap_or_default().to_string();
            let basename = file_basename(&path).to_string();
            if basename.is_empty() || !seen.insert(basename) {
                return None;
            }
            Some(NavTarget {
                label: target.label,
                href: path,
            })
        })
        .collect()
}
