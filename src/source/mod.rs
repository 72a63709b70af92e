use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::SourceArgs;
use crate::llm::{HttpStructurer, LlmConfig};
use crate::model::{RawExtraction, SourceKind};

pub mod epub;
pub mod markup;
pub mod pdf;

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "epub" => Ok(Self::Epub),
            "pdf" => Ok(Self::Pdf),
            _ => bail!(
                "unsupported input {}: expected an .epub or .pdf file",
                path.display()
            ),
        }
    }
}

pub fn extract_source(args: &SourceArgs) -> Result<RawExtraction> {
    let path = args.input_path.as_path();
    let kind = SourceKind::from_path(path)?;
    if !path.is_file() {
        bail!("input file not found: {}", path.display());
    }

    info!(path = %path.display(), kind = kind.as_str(), "extracting source");

    match kind {
        SourceKind::Epub => epub::extract_epub(path),
        SourceKind::Pdf => {
            let index_pages = args
                .index_pages
                .as_deref()
                .context("--index-pages START-END is required for PDF input")?;
            let toc_range = pdf::parse_page_range(&args.toc_pages).context("invalid --toc-pages")?;
            let index_range = pdf::parse_page_range(index_pages).context("invalid --index-pages")?;

            info!(
                provider = args.llm.llm_provider.as_str(),
                "resolving structuring model"
            );
            let structurer = HttpStructurer::new(LlmConfig::from_args(&args.llm)?)?;
            pdf::extract_pdf(path, toc_range, index_range, &structurer)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::cli::{LlmArgs, LlmProviderChoice};

    fn source_args(input_path: &Path, index_pages: Option<&str>) -> SourceArgs {
        SourceArgs {
            input_path: input_path.to_path_buf(),
            toc_pages: "5-8".to_string(),
            index_pages: index_pages.map(ToOwned::to_owned),
            llm: LlmArgs {
                llm_provider: LlmProviderChoice::Auto,
                llm_model: None,
                llm_timeout_secs: 5,
            },
        }
    }

    #[test]
    fn source_kind_follows_extension_case_insensitively() {
        assert_eq!(
            SourceKind::from_path(Path::new("book.EPUB")).expect("epub"),
            SourceKind::Epub
        );
        assert_eq!(
            SourceKind::from_path(Path::new("/x/book.pdf")).expect("pdf"),
            SourceKind::Pdf
        );
        assert!(SourceKind::from_path(Path::new("book.mobi")).is_err());
        assert!(SourceKind::from_path(Path::new("book")).is_err());
    }

    #[test]
    fn missing_input_is_reported_before_parsing() {
        let error = extract_source(&source_args(Path::new("/nonexistent/book.epub"), None))
            .expect_err("missing input");
        assert!(error.to_string().contains("input file not found"));
    }

    #[test]
    fn pdf_input_requires_index_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf_path = dir.path().join("book.pdf");
        fs::write(&pdf_path, b"%PDF-1.4").expect("write pdf");

        let error = extract_source(&source_args(&pdf_path, None)).expect_err("no index pages");
        assert!(error.to_string().contains("--index-pages"));
    }
}
