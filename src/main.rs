use clap::{Parser, ValueEnum};
use log::{error, info};
use pagelink::engine::{self, DisplayMode, EngineOptions, XvfbMode};
use pagelink::{IndexMode, IndexOptions, PrinterBuilder, PrinterError};
use std::fs;
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum XvfbArg {
    KeepRunning,
    StartStop,
}

/// Print an HTML document to PDF with clickable cross references.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// HTML file or URI to print
    #[arg(short, long)]
    input: String,

    /// Destination PDF
    #[arg(short, long)]
    output: PathBuf,

    /// Paper size name (A4, Letter, ...)
    #[arg(short, long, default_value = "A4")]
    size: String,

    /// portrait or landscape
    #[arg(short = 'O', long, default_value = "portrait")]
    orientation: String,

    /// Link indexing: off, basic or full
    #[arg(long, default_value = "off")]
    index: IndexMode,

    /// Resolve relative references against the working directory
    #[arg(short, long, default_value_t = false)]
    relative_uri: bool,

    /// Page setup key file; overrides --size and --orientation
    #[arg(long)]
    page_setup: Option<PathBuf>,

    /// Extra CSS injected before printing
    #[arg(long)]
    stylesheet: Option<PathBuf>,

    /// Browser binary
    #[arg(long)]
    browser: Option<PathBuf>,

    /// Run the browser on an X display instead of headless
    #[arg(long, value_enum)]
    xvfb: Option<XvfbArg>,

    /// Extra browser flag (repeatable)
    #[arg(long = "browser-arg", allow_hyphen_values = true)]
    browser_args: Vec<String>,

    /// Outline every generated link
    #[arg(long, default_value_t = false)]
    debug_borders: bool,

    /// Log verbosity, 1 (errors only) to 7 (debug)
    #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(1..=7))]
    verbosity: u8,
}

fn log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0..=3 => "error",
        4 => "warn",
        5 | 6 => "info",
        _ => "debug",
    }
}

fn looks_like_uri(input: &str) -> bool {
    url::Url::parse(input).is_ok_and(|url| url.scheme().len() > 1)
}

fn run(args: Args) -> Result<(), PrinterError> {
    let mut builder = if looks_like_uri(&args.input) {
        PrinterBuilder::new().with_uri(&args.input)
    } else {
        PrinterBuilder::new().with_html(fs::read_to_string(&args.input)?)
    };

    let base_uri = if args.relative_uri {
        let cwd = std::env::current_dir()?;
        url::Url::from_directory_path(&cwd)
            .map(String::from)
            .map_err(|_| PrinterError::Config(format!("{} is not absolute", cwd.display())))?
    } else {
        "file:///".to_string()
    };

    builder = builder
        .with_base_uri(base_uri)
        .with_layout(&args.size, &args.orientation)
        .with_index_mode(args.index)
        .with_index_options(IndexOptions {
            debug_borders: args.debug_borders,
            ..Default::default()
        })
        .with_output_file(&args.output);
    if let Some(path) = &args.page_setup {
        builder = builder.with_page_setup_file(path)?;
    }
    if let Some(path) = &args.stylesheet {
        builder = builder.with_stylesheet(fs::read_to_string(path)?);
    }

    let output = builder.build()?.make_pdf()?;
    match output.summary {
        Some(summary) => info!(
            "Wrote {} with {} links and {} outline entries.",
            args.output.display(),
            summary.applied,
            summary.outline_entries
        ),
        None => info!("Wrote {}.", args.output.display()),
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(args.verbosity)))
        .init();

    let display = match args.xvfb {
        None => DisplayMode::Headless,
        Some(XvfbArg::KeepRunning) => DisplayMode::Xvfb(XvfbMode::KeepRunning),
        Some(XvfbArg::StartStop) => DisplayMode::Xvfb(XvfbMode::StartStop),
    };
    let options = EngineOptions {
        browser: args.browser.clone(),
        display,
        browser_args: args.browser_args.clone(),
    };
    if let Err(e) = engine::init(options) {
        error!("{}", e);
        std::process::exit(1);
    }

    let result = run(args);
    engine::shutdown();
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
