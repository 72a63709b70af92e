use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::{ChapterGroup, DisplayEntry, GroupedIndex, ResolvedRow};

pub fn reduce_by_first_appearance(mut rows: Vec<ResolvedRow>) -> GroupedIndex {
    let row_count = rows.len();
    rows.sort_by(|left, right| {
        (left.chapter_order, left.pages.start, &left.term, &left.subentry).cmp(&(
            right.chapter_order,
            right.pages.start,
            &right.term,
            &right.subentry,
        ))
    });

    let mut seen = HashSet::<(String, String)>::new();
    let mut chapters = Vec::<ChapterGroup>::new();
    let mut chapter_positions = HashMap::<String, usize>::new();

    for row in rows {
        if !seen.insert((row.term.clone(), row.subentry.clone())) {
            continue;
        }

        let position = *chapter_positions
            .entry(row.chapter_name.clone())
            .or_insert_with(|| {
                chapters.push(ChapterGroup {
                    chapter_name: row.chapter_name.clone(),
                    entries: Vec::new(),
                });
                chapters.len() - 1
            });

        chapters[position].entries.push(DisplayEntry {
            page: row.pages.to_string(),
            first_page: row.pages.start,
            term: row.term,
            subentry: row.subentry,
            subheading: row.subheading,
        });
    }

    for chapter in &mut chapters {
        chapter.entries.sort_by(|left, right| {
            (left.first_page, &left.term, &left.subentry).cmp(&(
                right.first_page,
                &right.term,
                &right.subentry,
            ))
        });
    }

    let grouped = GroupedIndex { chapters };
    debug!(
        rows = row_count,
        chapters = grouped.chapters.len(),
        entries = grouped.entry_count(),
        "reduced rows to first appearances"
    );
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OTHER_CHAPTER, UNMATCHED_CHAPTER_ORDER};
    use crate::pages::PageSpan;

    fn row(term: &str, subentry: &str, chapter: &str, order: usize, page: u32) -> ResolvedRow {
        ResolvedRow {
            term: term.to_string(),
            subentry: subentry.to_string(),
            chapter_name: chapter.to_string(),
            chapter_order: order,
            pages: PageSpan::single(page),
            subheading: String::new(),
        }
    }

    fn listing(index: &GroupedIndex) -> Vec<(String, Vec<(String, String)>)> {
        index
            .chapters
            .iter()
            .map(|chapter| {
                (
                    chapter.chapter_name.clone(),
                    chapter
                        .entries
                        .iter()
                        .map(|entry| (entry.label(), entry.page.clone()))
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn term_is_listed_in_its_earliest_chapter() {
        let grouped = reduce_by_first_appearance(vec![
            row("Foo", "", "Chapter B", 1, 3),
            row("Foo", "", "Chapter A", 0, 5),
        ]);

        assert_eq!(
            listing(&grouped),
            vec![(
                "Chapter A".to_string(),
                vec![("Foo".to_string(), "5".to_string())]
            )]
        );
    }

    #[test]
    fn each_term_and_subentry_appears_once_at_minimum_position() {
        let grouped = reduce_by_first_appearance(vec![
            row("Errors", "background", "Two", 1, 40),
            row("Errors", "", "Two", 1, 44),
            row("Errors", "background", "One", 0, 18),
            row("Errors", "background", "One", 0, 9),
            row("Closures", "", "One", 0, 9),
        ]);

        assert_eq!(
            listing(&grouped),
            vec![
                (
                    "One".to_string(),
                    vec![
                        ("Closures".to_string(), "9".to_string()),
                        ("Background Errors".to_string(), "9".to_string()),
                    ]
                ),
                (
                    "Two".to_string(),
                    vec![("Errors".to_string(), "44".to_string())]
                ),
            ]
        );
    }

    #[test]
    fn chapters_follow_first_appearance_and_empty_chapters_are_omitted() {
        let grouped = reduce_by_first_appearance(vec![
            row("late", "", "Three", 2, 90),
            row("orphan", "", OTHER_CHAPTER, UNMATCHED_CHAPTER_ORDER, 1),
            row("early", "", "One", 0, 2),
            row("early", "", "Two", 1, 50),
        ]);

        let names = grouped
            .chapters
            .iter()
            .map(|chapter| chapter.chapter_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["One", "Three", OTHER_CHAPTER]);
        assert!(grouped.chapters.iter().all(|chapter| !chapter.entries.is_empty()));
    }

    #[test]
    fn pages_are_non_decreasing_within_each_chapter() {
        let grouped = reduce_by_first_appearance(vec![
            row("zeta", "", "One", 0, 30),
            row("alpha", "", "One", 0, 12),
            row("mu", "", "One", 0, 12),
            row("beta", "", "One", 0, 3),
        ]);

        let pages = grouped.chapters[0]
            .entries
            .iter()
            .map(|entry| entry.first_page)
            .collect::<Vec<_>>();
        assert_eq!(pages, vec![3, 12, 12, 30]);
        assert_eq!(grouped.chapters[0].entries[1].term, "alpha");
        assert_eq!(grouped.chapters[0].entries[2].term, "mu");
    }

    #[test]
    fn ranges_display_as_start_dash_end() {
        let mut ranged = row("traits", "", "One", 0, 120);
        ranged.pages = PageSpan::range(120, 125);

        let grouped = reduce_by_first_appearance(vec![ranged, row("enums", "", "One", 0, 47)]);
        let pages = grouped.chapters[0]
            .entries
            .iter()
            .map(|entry| entry.page.as_str())
            .collect::<Vec<_>>();
        assert_eq!(pages, vec!["47", "120-125"]);
    }

    #[test]
    fn ties_on_start_page_keep_input_order() {
        let mut ranged = row("Foo", "", "One", 0, 10);
        ranged.pages = PageSpan::range(10, 15);

        let grouped = reduce_by_first_appearance(vec![
            ranged,
            row("Foo", "", "One", 0, 10),
            row("Bar", "", "One", 0, 10),
        ]);
        let listed = grouped.chapters[0]
            .entries
            .iter()
            .map(|entry| (entry.term.as_str(), entry.page.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(listed, vec![("Bar", "10"), ("Foo", "10-15")]);
    }

    #[test]
    fn reducing_is_idempotent() {
        let rows = vec![
            row("b", "", "Two", 1, 7),
            row("a", "x", "One", 0, 4),
            row("a", "x", "Two", 1, 2),
            row("c", "", OTHER_CHAPTER, UNMATCHED_CHAPTER_ORDER, 0),
        ];

        assert_eq!(
            reduce_by_first_appearance(rows.clone()),
            reduce_by_first_appearance(rows)
        );
    }
}
