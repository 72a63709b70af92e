use serde_json::Value;
use tracing::debug;

use crate::model::{ChapterRange, IndexEntry, Reference};
use crate::pages::PageSpan;
use crate::util::normalize_whitespace;

pub fn index_entries_from_records(records: &[Value]) -> Vec<IndexEntry> {
    let mut entries = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in records {
        let Some(term) = text_field(record, &["term", "title"]) else {
            skipped += 1;
            continue;
        };
        let subentry = text_field(record, &["subentry"]).unwrap_or_default();

        let refs = ["pages", "page"]
            .iter()
            .find_map(|key| record.get(*key).filter(|value| !value.is_null()))
            .map(page_spans)
            .unwrap_or_default()
            .into_iter()
            .map(Reference::unlocated)
            .collect();

        entries.push(IndexEntry {
            term,
            subentry,
            refs,
        });
    }

    if skipped > 0 {
        debug!(skipped, "dropped index records without a term");
    }
    entries
}

pub fn toc_from_records(records: &[Value], page_count: u32) -> Vec<ChapterRange> {
    let named = records
        .iter()
        .filter_map(|record| {
            let name = text_field(record, &["name", "title"])?;
            let start = page_field(record, &["start_page", "start"]).unwrap_or(0);
            let end = page_field(record, &["end_page", "end"]);
            Some((name, start, end))
        })
        .collect::<Vec<_>>();

    let mut chapters = Vec::with_capacity(named.len());
    for (order, (name, start_page, end_page)) in named.iter().enumerate() {
        let end_page = end_page.unwrap_or_else(|| match named.get(order + 1) {
            Some((_, next_start, _)) => next_start.saturating_sub(1),
            None => page_count,
        });

        chapters.push(ChapterRange {
            name: name.clone(),
            start_page: *start_page,
            end_page: end_page.max(*start_page),
            order,
        });
    }
    chapters
}

fn text_field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(|value| {
            let text = match value {
                Value::String(text) => normalize_whitespace(text),
                Value::Number(number) => number.to_string(),
                _ => return None,
            };
            (!text.is_empty()).then_some(text)
        })
}

fn page_field(record: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(|value| page_spans(value).first().map(|span| span.start))
}

fn page_spans(value: &Value) -> Vec<PageSpan> {
    match value {
        Value::Array(items) => items.iter().flat_map(page_spans).collect(),
        Value::Number(number) => number
            .as_u64()
            .map(|page| u32::try_from(page).unwrap_or(u32::MAX))
            .or_else(|| number.as_i64().map(|_| 0))
            .or_else(|| number.as_f64().map(|page| page.max(0.0) as u32))
            .map(PageSpan::single)
            .into_iter()
            .collect(),
        Value::String(text) if !text.trim().is_empty() => text
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(PageSpan::parse)
            .collect(),
        _ => Vec::new(),
    }
}
