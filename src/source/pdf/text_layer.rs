use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    pub toc_raw: String,
    pub index_raw: String,
    pub page_count: u32,
}

pub fn parse_page_range(range: &str) -> Result<(u32, u32)> {
    let range = range.trim();
    let (start, end) = range.split_once('-').unwrap_or((range, range));

    let start = start
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid page range start in {range:?}"))?;
    let end = end
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid page range end in {range:?}"))?;

    if start == 0 || end < start {
        bail!("page range must be START-END with 1 <= START <= END, got {range:?}");
    }
    Ok((start, end))
}

pub fn read_pdf_text(
    pdf_path: &Path,
    toc_range: (u32, u32),
    index_range: (u32, u32),
) -> Result<PdfText> {
    let page_count = pdf_page_count(pdf_path)?;
    debug!(path = %pdf_path.display(), page_count, "read PDF page count");

    Ok(PdfText {
        toc_raw: extract_page_window(pdf_path, toc_range, page_count)?,
        index_raw: extract_page_window(pdf_path, index_range, page_count)?,
        page_count,
    })
}

fn pdf_page_count(pdf_path: &Path) -> Result<u32> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to execute pdfinfo for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdfinfo returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    page_count_from_info(&stdout)
        .with_context(|| format!("pdfinfo reported no page count for {}", pdf_path.display()))
}

fn page_count_from_info(info: &str) -> Option<u32> {
    info.lines()
        .filter_map(|line| line.strip_prefix("Pages:"))
        .find_map(|value| value.trim().parse::<u32>().ok())
}

fn clamp_window((start, end): (u32, u32), page_count: u32) -> Option<(u32, u32)> {
    let start = start.max(1);
    let end = end.min(page_count);
    (start <= end).then_some((start, end))
}

fn extract_page_window(pdf_path: &Path, range: (u32, u32), page_count: u32) -> Result<String> {
    let Some((first, last)) = clamp_window(range, page_count) else {
        warn!(
            requested_start = range.0,
            requested_end = range.1,
            page_count,
            "page range lies outside the document; using empty text"
        );
        return Ok(String::new());
    };

    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg("-f")
        .arg(first.to_string())
        .arg("-l")
        .arg(last.to_string())
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .replace('\u{0000}', "")
        .replace('\u{000C}', "\n"))
}
