use crate::model::{DisplayEntry, GroupedIndex};
use crate::util::sanitize_file_stem;

const INDEX_HEADING: &str = "Index (by order of appearance)";

pub fn output_file_name(book_title: &str) -> String {
    format!("{}_index.md", sanitize_file_stem(book_title))
}

pub fn render_markdown(book_title: &str, index: &GroupedIndex) -> String {
    let mut lines = vec![
        format!("# {book_title}"),
        String::new(),
        format!("## {INDEX_HEADING}"),
        String::new(),
    ];

    for chapter in &index.chapters {
        lines.push(format!("### {}", chapter.chapter_name));
        lines.push(String::new());

        for (subheading, entries) in group_by_subheading(&chapter.entries) {
            if !subheading.is_empty() {
                lines.push(format!("#### {subheading}"));
                lines.push(String::new());
            }
            for entry in entries {
                lines.push(format!("- **{}** — p. {}", entry.label(), entry.page));
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

fn group_by_subheading(entries: &[DisplayEntry]) -> Vec<(&str, Vec<&DisplayEntry>)> {
    let mut groups = Vec::<(&str, Vec<&DisplayEntry>)>::new();
    for entry in entries {
        let subheading = entry.subheading.as_str();
        match groups.iter_mut().find(|(name, _)| *name == subheading) {
            Some((_, members)) => members.push(entry),
            None => groups.push((subheading, vec![entry])),
        }
    }
    groups
}
