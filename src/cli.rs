use clap::{Args, Parser, Subcommand, ValueEnum};
use dsx_lib::{FetchMode, Viewport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dsx")]
#[command(
    version,
    about = "Design System Extractor - Pull colors, fonts and branding from a page into reusable artifacts",
    long_about = "Design System Extractor (DSX)\n\nCommands:\n- extract: fetch a page once, run extractors (colors, fonts, css, structure, branding), then generators (json, css, modern-css, design-tokens, tailwind, html, brand-assets).\n- plugins: list registered extractors and generators.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) for fetch, plugin and generator settings; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract a design system from a page and generate artifacts
    Extract(ExtractArgs),

    /// List registered extractors and generators
    Plugins {
        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,
    },
}

#[derive(Args)]
pub struct ExtractArgs {
    #[arg(long, help = "Page URL to extract from")]
    pub url: String,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Extractors to run (colors,fonts,css,structure,branding); all when omitted"
    )]
    pub extractors: Option<Vec<String>>,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Generators to run (json,css,modern-css,design-tokens,tailwind,html,brand-assets); all when omitted"
    )]
    pub generators: Option<Vec<String>>,

    #[arg(
        long,
        short,
        value_name = "DIR",
        help = "Directory for generated artifacts; artifacts are returned inline when omitted"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "rendered", help = "How to load the page")]
    pub mode: FetchModeArg,

    #[arg(
        long,
        value_name = "FILE",
        help = "DOM snapshot JSON to use instead of fetching (implies --mode snapshot)"
    )]
    pub snapshot: Option<PathBuf>,

    #[arg(
        long,
        default_value = "1440x900",
        help = "Viewport dimensions (WIDTHxHEIGHT)"
    )]
    pub viewport: Viewport,

    #[arg(
        long,
        default_value = "30",
        help = "Navigation timeout (seconds); also the static fetch timeout"
    )]
    pub nav_timeout: u64,

    #[arg(
        long,
        default_value = "10",
        help = "Network idle timeout (seconds) for rendered fetches"
    )]
    pub network_idle_timeout: u64,

    #[arg(
        long,
        default_value = "45",
        help = "Process timeout (seconds) for the Playwright invocation"
    )]
    pub process_timeout: u64,

    #[arg(long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormat,

    #[arg(long, value_name = "PATH", help = "Write the run report to this file (stdout if omitted)")]
    pub report: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FetchModeArg {
    Rendered,
    Static,
    Snapshot,
}

impl From<FetchModeArg> for FetchMode {
    fn from(value: FetchModeArg) -> Self {
        match value {
            FetchModeArg::Rendered => FetchMode::Rendered,
            FetchModeArg::Static => FetchMode::Static,
            FetchModeArg::Snapshot => FetchMode::Snapshot,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
