use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::BuildArgs;
use crate::model::{RunCounts, RunManifest, UNMATCHED_CHAPTER_ORDER};
use crate::reduce::reduce_by_first_appearance;
use crate::render::{output_file_name, render_markdown};
use crate::resolve::resolve_references;
use crate::source::extract_source;
use crate::util::{ensure_directory, now_utc_string, sha256_file, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: BuildArgs) -> Result<()> {
    let manifest = build_index(&args)?;

    if let Some(manifest_path) = &args.manifest_path {
        write_json_pretty(manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote run manifest");
    }

    info!(
        output = %manifest.output_path,
        chapters = manifest.counts.chapters,
        entries = manifest.counts.entries,
        "build completed"
    );
    Ok(())
}

fn build_index(args: &BuildArgs) -> Result<RunManifest> {
    let input_path = args.source.input_path.as_path();
    let extraction = extract_source(&args.source)?;

    let rows = resolve_references(&extraction);
    let other_rows = rows
        .iter()
        .filter(|row| row.chapter_order == UNMATCHED_CHAPTER_ORDER)
        .count();
    if !rows.is_empty() && other_rows == rows.len() {
        warn!(
            rows = rows.len(),
            "no reference matched a chapter; every entry is listed under Other"
        );
    }
    let resolved_rows = rows.len();

    let grouped = reduce_by_first_appearance(rows);
    let markdown = render_markdown(&extraction.book_title, &grouped);

    ensure_directory(&args.output_dir)?;
    let file_name = args
        .output_file
        .clone()
        .unwrap_or_else(|| output_file_name(&extraction.book_title));
    let output_path = args.output_dir.join(file_name);
    fs::write(&output_path, markdown)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    info!(path = %output_path.display(), "wrote master index");

    Ok(RunManifest {
        manifest_version: MANIFEST_VERSION,
        generated_at: now_utc_string(),
        source_path: display_path(input_path),
        source_kind: extraction.source_kind.clone(),
        source_sha256: sha256_file(input_path)?,
        book_title: extraction.book_title.clone(),
        output_path: display_path(&output_path),
        counts: RunCounts {
            toc_entries: extraction.toc.len(),
            index_entries: extraction.index_entries.len(),
            references: extraction.reference_count(),
            resolved_rows,
            other_rows,
            chapters: grouped.chapters.len(),
            entries: grouped.entry_count(),
        },
    })
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
