use std::collections::HashMap;

use crate::source::markup::{MarkupElement, parse_markup};

pub const CONTAINER_PATH: &str = "META-INF/container.xml";
pub const DEFAULT_PACKAGE_PATH: &str = "content.opf";
const PACKAGE_MEDIA_TYPE: &str = "application/oebps-package+xml";
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: String,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .split_whitespace()
            .any(|candidate| candidate == property)
    }

    pub fn is_markup(&self) -> bool {
        let href = self.href.to_ascii_lowercase();
        href.ends_with(".xhtml") || href.ends_with(".html") || href.ends_with(".htm")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDocument {
    pub title: Option<String>,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<String>,
    pub spine_toc_id: Option<String>,
}

impl PackageDocument {
    pub fn item_by_id(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    pub fn ncx_href(&self) -> Option<&str> {
        self.spine_toc_id
            .as_deref()
            .and_then(|id| self.item_by_id(id))
            .or_else(|| {
                self.manifest
                    .iter()
                    .find(|item| item.media_type == NCX_MEDIA_TYPE)
            })
            .map(|item| item.href.as_str())
    }

    pub fn nav_href(&self) -> Option<&str> {
        self.manifest
            .iter()
            .find(|item| item.has_property("nav"))
            .map(|item| item.href.as_str())
    }

    pub fn index_href(&self) -> Option<&str> {
        self.manifest
            .iter()
            .find(|item| item.is_markup() && item.href.to_lowercase().contains("index"))
            .map(|item| item.href.as_str())
    }
}

pub fn package_path_from_container(container_xml: &[u8]) -> Option<String> {
    let root = parse_markup(container_xml, CONTAINER_PATH);
    let rootfiles = root.find_all("rootfile");

    rootfiles
        .iter()
        .find(|rootfile| rootfile.attr("media-type") == Some(PACKAGE_MEDIA_TYPE))
        .or_else(|| rootfiles.first())
        .and_then(|rootfile| rootfile.attr("full-path"))
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(ToOwned::to_owned)
}

pub fn parse_package(opf: &[u8], source_name: &str) -> PackageDocument {
    let root = parse_markup(opf, source_name);

    let title = root
        .find("metadata")
        .and_then(|metadata| metadata.find("title"))
        .map(MarkupElement::text)
        .filter(|title| !title.is_empty());

    let manifest = root
        .find_all("item")
        .into_iter()
        .filter_map(|item| {
            let id = item.attr("id")?.trim();
            let href = item.attr("href")?.trim();
            if id.is_empty() || href.is_empty() {
                return None;
            }
            Some(ManifestItem {
                id: id.to_string(),
                href: href.to_string(),
                media_type: item.attr("media-type").unwrap_or_default().to_string(),
                properties: item.attr("properties").unwrap_or_default().to_string(),
            })
        })
        .collect::<Vec<_>>();

    let hrefs_by_id = manifest
        .iter()
        .map(|item| (item.id.as_str(), item.href.as_str()))
        .collect::<HashMap<_, _>>();

    let spine_element = root.find("spine");
    let mut spine = Vec::<String>::new();
    if let Some(spine_element) = spine_element {
        for itemref in spine_element.find_all("itemref") {
            let Some(href) = itemref.attr("idref").and_then(|id| hrefs_by_id.get(id)) else {
                continue;
            };
            if !spine.iter().any(|existing| existing == href) {
                spine.push((*href).to_string());
            }
        }
    }

    let spine_toc_id = spine_element
        .and_then(|spine| spine.attr("toc"))
        .map(ToOwned::to_owned);

    PackageDocument {
        title,
        manifest,
        spine,
        spine_toc_id,
    }
}
