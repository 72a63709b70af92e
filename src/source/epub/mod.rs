use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::model::{ChapterFile, RawExtraction, SourceKind, SubheadingIndex, TableOfContents};

mod container;
mod index_doc;
mod navigation;
mod package;
mod subheadings;
#[cfg(test)]
mod tests;

pub use container::BookContainer;

use container::{file_basename, parent_dir, resolve_href};
use index_doc::parse_index_document;
use navigation::{Navigation, parse_nav_document, parse_ncx};
use package::{
    CONTAINER_PATH, DEFAULT_PACKAGE_PATH, PackageDocument, package_path_from_container,
    parse_package,
};
use subheadings::extract_subheading_breakpoints;

pub fn extract_epub(path: &Path) -> Result<RawExtraction> {
    if !path.is_file() {
        bail!("EPUB not found: {}", path.display());
    }

    let fallback_title = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string();

    let mut container = BookContainer::open(path)?;
    extract_from_container(&mut container, &fallback_title)
        .with_context(|| format!("failed to extract EPUB {}", path.display()))
}

pub fn extract_from_container<R: Read + Seek>(
    container: &mut BookContainer<R>,
    fallback_title: &str,
) -> Result<RawExtraction> {
    let package_path = locate_package(container)?;
    let package_dir = parent_dir(&package_path).to_string();

    let package_bytes = container
        .read(&package_path)?
        .with_context(|| format!("package document missing: {package_path}"))?;
    let package = parse_package(&package_bytes, &package_path);
    debug!(
        path = %package_path,
        manifest_items = package.manifest.len(),
        spine_items = package.spine.len(),
        "parsed package document"
    );

    let navigation = read_navigation(container, &package, &package_dir)?;
    let toc = build_toc(&package, &navigation);
    if toc.is_empty() {
        warn!("navigation document yielded no chapters");
    }

    let book_title = package
        .title
        .clone()
        .or_else(|| navigation.doc_title.clone())
        .unwrap_or_else(|| fallback_title.to_string());

    let index_entries = match package.index_href() {
        Some(index_href) => {
            let index_path = resolve_href(&package_dir, index_href);
            match container.read_with_basename_fallback(&index_path)? {
                Some((entry_name, bytes)) => parse_index_document(&bytes, &entry_name),
                None => {
                    warn!(path = %index_path, "index document listed but missing from archive");
                    Vec::new()
                }
            }
        }
        None => {
            warn!("no index document found; index will be empty");
            Vec::new()
        }
    };

    let subheadings = read_subheadings(container, &navigation)?;

    info!(
        title = %book_title,
        toc_entries = toc.len(),
        index_entries = index_entries.len(),
        subheading_files = subheadings.file_count(),
        "extracted EPUB structure"
    );

    Ok(RawExtraction {
        source_kind: SourceKind::Epub,
        book_title,
        toc: TableOfContents::Files(toc),
        index_entries,
        subheadings,
    })
}

fn locate_package<R: Read + Seek>(container: &mut BookContainer<R>) -> Result<String> {
    let from_container = container
        .read(CONTAINER_PATH)?
        .and_then(|bytes| package_path_from_container(&bytes));

    Ok(match from_container {
        Some(path) => path,
        None => {
            warn!(
                fallback = DEFAULT_PACKAGE_PATH,
                "container rootfile missing; using default package path"
            );
            DEFAULT_PACKAGE_PATH.to_string()
        }
    })
}

fn read_navigation<R: Read + Seek>(
    container: &mut BookContainer<R>,
    package: &PackageDocument,
    package_dir: &str,
) -> Result<Navigation> {
    if let Some(ncx_href) = package.ncx_href() {
        let ncx_path = resolve_href(package_dir, ncx_href);
        if let Some((entry_name, bytes)) = container.read_with_basename_fallback(&ncx_path)? {
            return Ok(with_archive_paths(parse_ncx(&bytes, &entry_name), &entry_name));
        }
    }

    if let Some(nav_href) = package.nav_href() {
        let nav_path = resolve_href(package_dir, nav_href);
        if let Some((entry_name, bytes)) = container.read_with_basename_fallback(&nav_path)? {
            return Ok(with_archive_paths(
                parse_nav_document(&bytes, &entry_name),
                &entry_name,
            ));
        }
    }

    if let Some(entry_name) = container.find_entry_ending_with("toc.ncx") {
        if let Some(bytes) = container.read(&entry_name)? {
            return Ok(with_archive_paths(parse_ncx(&bytes, &entry_name), &entry_name));
        }
    }

    warn!("no navigation document found");
    Ok(Navigation::default())
}

fn with_archive_paths(mut navigation: Navigation, document_path: &str) -> Navigation {
    let document_dir = parent_dir(document_path).to_string();
    for target in &mut navigation.targets {
        target.href = resolve_href(&document_dir, &target.href);
    }
    navigation
}

fn build_toc(package: &PackageDocument, navigation: &Navigation) -> Vec<ChapterFile> {
    let mut spine_positions = HashMap::<&str, usize>::new();
    for (position, href) in package.spine.iter().enumerate() {
        spine_positions.entry(file_basename(href)).or_insert(position);
    }

    navigation
        .targets
        .iter()
        .enumerate()
        .map(|(nav_position, target)| {
            let file_id = file_basename(&target.href).to_string();
            let order = spine_positions
                .get(file_id.as_str())
                .copied()
                .unwrap_or(package.spine.len() + nav_position);
            ChapterFile {
                title: target.label.clone(),
                file_id,
                order,
            }
        })
        .collect()
}

fn read_subheadings<R: Read + Seek>(
    container: &mut BookContainer<R>,
    navigation: &Navigation,
) -> Result<SubheadingIndex> {
    let mut index = SubheadingIndex::default();

    for target in &navigation.targets {
        let file_id = file_basename(&target.href).to_string();
        match container.read_with_basename_fallback(&target.href)? {
            Some((entry_name, bytes)) => {
                index.insert(file_id, extract_subheading_breakpoints(&bytes, &entry_name));
            }
            None => {
                warn!(path = %target.href, "chapter file missing; no subheadings for it");
                index.insert(file_id, Vec::new());
            }
        }
    }

    Ok(index)
}
