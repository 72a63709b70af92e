use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InspectArgs;
use crate::source::extract_source;
use crate::util::{json_pretty, write_json_pretty};

pub fn run(args: InspectArgs) -> Result<()> {
    let extraction = extract_source(&args.source)?;

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &extraction)?;
            info!(path = %path.display(), "wrote extraction");
        }
        None => {
            let data = json_pretty(&extraction)?;
            std::io::stdout()
                .lock()
                .write_all(&data)
                .context("failed to write extraction to stdout")?;
        }
    }

    info!(
        kind = extraction.source_kind.as_str(),
        toc_entries = extraction.toc.len(),
        index_entries = extraction.index_entries.len(),
        references = extraction.reference_count(),
        "inspect completed"
    );
    Ok(())
}
