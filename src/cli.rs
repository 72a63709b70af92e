use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "appearance-index",
    version,
    about = "Re-organize a book index by chapter and order of first appearance"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Build(BuildArgs),
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[arg(value_name = "INPUT")]
    pub input_path: PathBuf,

    #[arg(long, value_name = "START-END", default_value = "5-8")]
    pub toc_pages: String,

    #[arg(long, value_name = "START-END")]
    pub index_pages: Option<String>,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LlmArgs {
    #[arg(long, value_enum, default_value_t = LlmProviderChoice::Auto)]
    pub llm_provider: LlmProviderChoice,

    #[arg(long)]
    pub llm_model: Option<String>,

    #[arg(long, default_value_t = 120)]
    pub llm_timeout_secs: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LlmProviderChoice {
    Auto,
    Openai,
    Gemini,
}

impl LlmProviderChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Openai => "openai",
            Self::Gemini => "gemini",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(short = 'o', long, default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub output_file: Option<String>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}
