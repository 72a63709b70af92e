use std::collections::HashMap;

use tracing::debug;

use crate::model::{
    ChapterFile, ChapterRange, IndexEntry, OTHER_CHAPTER, RawExtraction, ResolvedRow,
    SubheadingIndex, TableOfContents, UNMATCHED_CHAPTER_ORDER,
};
use crate::pages::PageSpan;

pub fn resolve_references(extraction: &RawExtraction) -> Vec<ResolvedRow> {
    let rows = match &extraction.toc {
        TableOfContents::Files(chapters) => resolve_by_file(
            chapters,
            &extraction.subheadings,
            &extraction.index_entries,
        ),
        TableOfContents::PageRanges(chapters) => {
            resolve_by_page_range(chapters, &extraction.index_entries)
        }
    };

    debug!(
        rows = rows.len(),
        other_rows = rows
            .iter()
            .filter(|row| row.chapter_order == UNMATCHED_CHAPTER_ORDER)
            .count(),
        "resolved references"
    );
    rows
}

fn resolve_by_file(
    chapters: &[ChapterFile],
    subheadings: &SubheadingIndex,
    entries: &[IndexEntry],
) -> Vec<ResolvedRow> {
    let mut chapter_by_file = HashMap::<&str, &ChapterFile>::new();
    for chapter in chapters {
        chapter_by_file
            .entry(chapter.file_id.as_str())
            .or_insert(chapter);
    }

    let mut rows = Vec::new();
    for entry in entries {
        for reference in &entry.refs {
            let file_id = reference.locator.as_deref().unwrap_or_default();
            let (chapter_name, chapter_order) = match chapter_by_file.get(file_id) {
                Some(chapter) => (chapter.title.as_str(), chapter.order),
                None => (OTHER_CHAPTER, UNMATCHED_CHAPTER_ORDER),
            };

            rows.push(row(
                entry,
                chapter_name,
                chapter_order,
                reference.pages,
                subheadings.lookup(file_id, reference.pages.start),
            ));
        }
    }
    rows
}

fn resolve_by_page_range(chapters: &[ChapterRange], entries: &[IndexEntry]) -> Vec<ResolvedRow> {
    let mut rows = Vec::new();
    for entry in entries {
        for reference in &entry.refs {
            let page = reference.pages.start;
            let (chapter_name, chapter_order) = chapters
                .iter()
                .find(|chapter| chapter.contains(page))
                .map(|chapter| (chapter.name.as_str(), chapter.order))
                .unwrap_or((OTHER_CHAPTER, UNMATCHED_CHAPTER_ORDER));

            rows.push(row(entry, chapter_name, chapter_order, reference.pages, ""));
        }
    }
    rows
}

fn row(
    entry: &IndexEntry,
    chapter_name: &str,
    chapter_order: usize,
    pages: PageSpan,
    subheading: &str,
) -> ResolvedRow {
    ResolvedRow {
        term: entry.term.clone(),
        subentry: entry.subentry.clone(),
        chapter_name: chapter_name.to_string(),
        chapter_order,
        pages,
        subheading: subheading.to_string(),
    }
}
