use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::llm::{RecordSchema, TextStructurer};
use crate::model::{RawExtraction, SourceKind, SubheadingIndex, TableOfContents};

mod json_extract;
mod records;
mod text_layer;

pub use text_layer::{PdfText, parse_page_range};

use json_extract::extract_json_array;
use records::{index_entries_from_records, toc_from_records};
use text_layer::read_pdf_text;

pub fn extract_pdf(
    path: &Path,
    toc_range: (u32, u32),
    index_range: (u32, u32),
    structurer: &dyn TextStructurer,
) -> Result<RawExtraction> {
    if !path.is_file() {
        bail!("PDF not found: {}", path.display());
    }

    let text = read_pdf_text(path, toc_range, index_range)?;
    info!(
        path = %path.display(),
        page_count = text.page_count,
        toc_chars = text.toc_raw.chars().count(),
        index_chars = text.index_raw.chars().count(),
        "extracted PDF text windows"
    );

    structure_pdf_text(&book_title_from_path(path), &text, structurer)
        .with_context(|| format!("failed to structure PDF {}", path.display()))
}

pub fn book_title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .replace(['_', '-'], " ")
}

pub fn structure_pdf_text(
    book_title: &str,
    text: &PdfText,
    structurer: &dyn TextStructurer,
) -> Result<RawExtraction> {
    let toc = if text.toc_raw.trim().is_empty() {
        warn!("contents page window is empty; table of contents will be empty");
        Vec::new()
    } else {
        let records =
            structured_records(structurer, &text.toc_raw, RecordSchema::TableOfContents)?;
        toc_from_records(&records, text.page_count)
    };

    let index_entries = if text.index_raw.trim().is_empty() {
        warn!("index page window is empty; index will be empty");
        Vec::new()
    } else {
        let records =
            structured_records(structurer, &text.index_raw, RecordSchema::IndexEntries)?;
        index_entries_from_records(&records)
    };

    info!(
        title = %book_title,
        toc_entries = toc.len(),
        index_entries = index_entries.len(),
        "structured PDF text"
    );

    Ok(RawExtraction {
        source_kind: SourceKind::Pdf,
        book_title: book_title.to_string(),
        toc: TableOfContents::PageRanges(toc),
        index_entries,
        subheadings: SubheadingIndex::default(),
    })
}

fn structured_records(
    structurer: &dyn TextStructurer,
    raw_text: &str,
    schema: RecordSchema,
) -> Result<Vec<serde_json::Value>> {
    let reply = structurer.structure_text(raw_text, schema)?;
    let records = extract_json_array(&reply);
    if records.is_empty() {
        warn!(
            schema = schema.as_str(),
            reply_chars = reply.chars().count(),
            "no JSON array found in structuring reply"
        );
    }
    Ok(records)
}
