use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const ROMAN_PAGES: [&str; 20] = [
    "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv", "xv",
    "xvi", "xvii", "xviii", "xix", "xx",
];

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)page[_\-]?(\w+)").expect("valid page marker regex"));

/// Roman numerals `i`..`xx` map to 1..20. Anything else keeps its digits only,
/// and a token without digits is 0.
pub fn normalize_page_token(token: &str) -> u32 {
    let token = token.trim().to_lowercase();
    if let Some(position) = ROMAN_PAGES.iter().position(|roman| *roman == token) {
        return position as u32 + 1;
    }

    token
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse::<u32>()
        .unwrap_or(0)
}

pub fn page_token_from_marker(marker: &str) -> Option<&str> {
    PAGE_MARKER
        .captures(marker)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageSpan {
    pub start: u32,
    pub end: u32,
}

impl PageSpan {
    pub fn single(page: u32) -> Self {
        Self {
            start: page,
            end: page,
        }
    }

    pub fn range(start: u32, end: u32) -> Self {
        if end < start {
            return Self::single(start);
        }
        Self { start, end }
    }

    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let mut bounds = text.splitn(2, ['-', '–', '—']);
        let start = bounds.next().unwrap_or_default();
        match bounds.next() {
            Some(end) if !start.trim().is_empty() && !end.trim().is_empty() => {
                Self::range(normalize_page_token(start), normalize_page_token(end))
            }
            _ => Self::single(normalize_page_token(text)),
        }
    }
}

impl fmt::Display for PageSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
