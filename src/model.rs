use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pages::PageSpan;

pub const OTHER_CHAPTER: &str = "Other";

pub const UNMATCHED_CHAPTER_ORDER: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterFile {
    pub title: String,
    pub file_id: String,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    pub name: String,
    pub start_page: u32,
    pub end_page: u32,
    pub order: usize,
}

impl ChapterRange {
    pub fn contains(&self, page: u32) -> bool {
        self.start_page <= page && page <= self.end_page
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "chapters", rename_all = "snake_case")]
pub enum TableOfContents {
    Files(Vec<ChapterFile>),
    PageRanges(Vec<ChapterRange>),
}

impl TableOfContents {
    pub fn len(&self) -> usize {
        match self {
            Self::Files(chapters) => chapters.len(),
            Self::PageRanges(chapters) => chapters.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub locator: Option<String>,
    pub pages: PageSpan,
}

impl Reference {
    pub fn in_file(file_id: impl Into<String>, page: u32) -> Self {
        Self {
            locator: Some(file_id.into()),
            pages: PageSpan::single(page),
        }
    }

    pub fn unlocated(pages: PageSpan) -> Self {
        Self {
            locator: None,
            pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub term: String,
    pub subentry: String,
    pub refs: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubheadingBreakpoint {
    pub page: u32,
    pub subheading: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubheadingIndex {
    files: BTreeMap<String, Vec<SubheadingBreakpoint>>,
}

impl SubheadingIndex {
    pub fn insert(&mut self, file_id: impl Into<String>, breakpoints: Vec<SubheadingBreakpoint>) {
        self.files.insert(file_id.into(), breakpoints);
    }

    /// Latest breakpoint at or before `page`, or an empty string.
    pub fn lookup(&self, file_id: &str, page: u32) -> &str {
        let Some(breakpoints) = self.files.get(file_id) else {
            return "";
        };

        breakpoints
            .iter()
            .take_while(|breakpoint| breakpoint.page <= page)
            .last()
            .map(|breakpoint| breakpoint.subheading.as_str())
            .unwrap_or_default()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Epub,
    Pdf,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epub => "epub",
            Self::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExtraction {
    pub source_kind: SourceKind,
    pub book_title: String,
    pub toc: TableOfContents,
    pub index_entries: Vec<IndexEntry>,
    pub subheadings: SubheadingIndex,
}

impl RawExtraction {
    pub fn reference_count(&self) -> usize {
        self.index_entries.iter().map(|entry| entry.refs.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRow {
    pub term: String,
    pub subentry: String,
    pub chapter_name: String,
    pub chapter_order: usize,
    pub pages: PageSpan,
    pub subheading: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayEntry {
    pub term: String,
    pub subentry: String,
    pub page: String,
    pub subheading: String,
    #[serde(skip)]
    pub first_page: u32,
}

impl DisplayEntry {
    pub fn label(&self) -> String {
        let subentry = self.subentry.trim();
        let mut characters = subentry.chars();
        let Some(first) = characters.next() else {
            return self.term.clone();
        };

        let mut label = first.to_uppercase().collect::<String>();
        label.push_str(characters.as_str());
        label.push(' ');
        label.push_str(&self.term);
        label.trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterGroup {
    pub chapter_name: String,
    pub entries: Vec<DisplayEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedIndex {
    pub chapters: Vec<ChapterGroup>,
}

impl GroupedIndex {
    pub fn entry_count(&self) -> usize {
        self.chapters.iter().map(|chapter| chapter.entries.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunCounts {
    pub toc_entries: usize,
    pub index_entries: usize,
    pub references: usize,
    pub resolved_rows: usize,
    pub other_rows: usize,
    pub chapters: usize,
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_path: String,
    pub source_kind: SourceKind,
    pub source_sha256: String,
    pub book_title: String,
    pub output_path: String,
    pub counts: RunCounts,
}
