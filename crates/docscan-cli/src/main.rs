// Handlers print through stdout/stderr and take owned clap arguments.
#![allow(
    clippy::needless_pass_by_value,    // clap requires owned paths
    clippy::unnecessary_wraps,         // consistent Result return for CLI handlers
    clippy::fn_params_excessive_bools, // CLI commands have many boolean flags
    clippy::must_use_candidate,        // CLI functions don't need must_use
)]

//! Docscan CLI - Layout analysis and table extraction over OCR token dumps
//!
//! Reads column-oriented token dumps (`text`, `conf`, `left`, `top`, `width`, `height`
//! arrays, as written by Tesseract-style engines) and optionally the page raster, and
//! prints JSON.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use docscan_layout::{
    ExtractOptions, LayoutAnalyzer, LayoutConfig, PageAnalyzer, PageInput, TableExtractor,
    TableSource,
};
use docscan_ocr::{OcrTokens, TokenDumpBackend};
use image::DynamicImage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "docscan")]
#[command(about = "Separate prose from tables in OCR output and rebuild tables as grids", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file (default: ./.docscan.toml, then ~/.docscan.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print debug logging to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one page: text blocks, tables and a layout confidence
    #[command(long_about = "Analyze one page.

Tokens are grouped into lines, tables are detected from ruled lines in the raster
(--image) and from column-aligned lines in the tokens, overlapping detections are merged,
and everything outside a table becomes a text block.

Examples:
  docscan analyze page1.json
  docscan analyze page1.json --image page1.png --pretty
  docscan analyze --image scan.png")]
    Analyze {
        /// Token dump (JSON)
        #[arg(value_name = "TOKENS")]
        tokens: Option<PathBuf>,

        /// Page raster for ruled-line table detection
        #[arg(long, value_name = "IMAGE")]
        image: Option<PathBuf>,
    },

    /// Reconstruct a single table from one token dump
    #[command(long_about = "Reconstruct a single table from one token dump.

Without --image the lenient row reconstruction runs on the tokens. With --image the
dump is treated as the output of a structured OCR engine for that raster: a strict grid
check runs first and the lenient reconstruction is the fallback.

Examples:
  docscan table receipt.json
  docscan table meds.json --no-header
  docscan table meds.json --raw -o grid.json")]
    Table {
        /// Token dump (JSON)
        #[arg(value_name = "TOKENS")]
        tokens: PathBuf,

        /// Raster the dump was recognized from
        #[arg(long, value_name = "IMAGE")]
        image: Option<PathBuf>,

        /// Key records Column_1..Column_N instead of using row 0 as the header
        #[arg(long)]
        no_header: bool,

        /// Emit only the grid, without header-keyed records
        #[arg(long)]
        raw: bool,
    },

    /// Analyze a multi-page document, one token dump per page
    #[command(long_about = "Analyze a multi-page document.

Pages are numbered from 1 in argument order and analyzed in parallel. A page that fails
is listed under failed_pages and does not stop the others.

Examples:
  docscan pages p1.json p2.json p3.json
  docscan pages scans/*.json -o document.json")]
    Pages {
        /// Token dumps in page order
        #[arg(value_name = "TOKENS", required = true)]
        tokens: Vec<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn read_dump(path: &Path) -> Result<OcrTokens> {
    OcrTokens::from_path(path)
        .with_context(|| format!("Failed to read token dump: {}", path.display()))
}

fn read_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize output")
}

/// Write to `--output` or stdout
fn emit(args: &Args, content: &str) -> Result<()> {
    match &args.output {
        Some(path) => {
            fs::write(path, format!("{content}\n"))
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            if !args.quiet {
                eprintln!("{} {}", "Wrote".green().bold(), path.display());
            }
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(1);
}

fn run_analyze(
    args: &Args,
    layout: LayoutConfig,
    tokens: Option<&Path>,
    image: Option<&Path>,
) -> Result<()> {
    let analyzer = LayoutAnalyzer::with_config(layout)?;
    let dump = tokens.map(read_dump).transpose()?;
    let raster = image.map(read_image).transpose()?;

    let result = analyzer.analyze_layout(raster.as_ref(), dump.as_ref());
    log::info!(
        "{} text blocks, {} tables, confidence {:.2}",
        result.text_blocks.len(),
        result.tables.len(),
        result.layout_confidence
    );
    emit(args, &to_json(&result, args.pretty)?)?;

    if let Some(error) = &result.error {
        fail(error);
    }
    Ok(())
}

fn run_table(
    args: &Args,
    layout: &LayoutConfig,
    tokens: &Path,
    image: Option<&Path>,
    options: ExtractOptions,
) -> Result<()> {
    let extractor = TableExtractor::with_config(layout)?;
    let dump = read_dump(tokens)?;

    let result = match image {
        Some(path) => {
            let raster = read_image(path)?;
            let backend = TokenDumpBackend::new(dump);
            extractor.extract(
                TableSource::Image {
                    image: &raster,
                    backend: &backend,
                },
                options,
            )?
        }
        None => extractor.extract(TableSource::Dump(&dump), options)?,
    };

    if !result.table_detected && !args.quiet {
        let reason = result
            .debug_info
            .as_ref()
            .map_or("unknown", |info| info.reason.as_str());
        eprintln!("{} No table detected ({reason})", "Note:".yellow().bold());
    }
    emit(args, &to_json(&result, args.pretty)?)?;

    if let Some(error) = &result.error {
        fail(error);
    }
    Ok(())
}

fn run_pages(args: &Args, layout: LayoutConfig, tokens: &[PathBuf]) -> Result<()> {
    let analyzer = PageAnalyzer::new(LayoutAnalyzer::with_config(layout)?);
    let pages = tokens
        .iter()
        .map(|path| read_dump(path).map(PageInput::from_tokens))
        .collect::<Result<Vec<_>>>()?;

    let document = analyzer.analyze_pages(&pages);
    for failure in &document.failed_pages {
        if !args.quiet {
            eprintln!(
                "{} Page {} failed: {}",
                "Warning:".yellow().bold(),
                failure.page,
                failure.error
            );
        }
    }
    emit(args, &to_json(&document, args.pretty)?)
}

fn run_config(args: &Args, layout: &LayoutConfig, source: Option<&Path>) -> Result<()> {
    let body = toml::to_string_pretty(layout).context("Failed to serialize configuration")?;
    let header = source.map_or_else(
        || "# source: built-in defaults".to_string(),
        |path| format!("# source: {}", path.display()),
    );
    emit(args, &format!("{header}\n{}", body.trim_end()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let discovered = config::discovered_paths();
    let loaded = config::resolve(args.config.as_deref(), &discovered)?;
    let layout = loaded.layout;

    match &args.command {
        Commands::Analyze { tokens, image } => {
            run_analyze(&args, layout, tokens.as_deref(), image.as_deref())
        }
        Commands::Table {
            tokens,
            image,
            no_header,
            raw,
        } => run_table(
            &args,
            &layout,
            tokens,
            image.as_deref(),
            ExtractOptions {
                as_dict: !raw,
                has_header: !no_header,
            },
        ),
        Commands::Pages { tokens } => run_pages(&args, layout, tokens),
        Commands::Config => run_config(&args, &layout, loaded.source),
    }
}
