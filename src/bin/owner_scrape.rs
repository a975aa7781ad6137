//! owner-scrape CLI
//!
//! Attaches to (or launches) Chrome, walks the community grid of the active
//! tab and exports the collected records. Ctrl+C stops the run after the
//! current entry without exporting a partial result.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use owner_scrape::download::community_from_export;
use owner_scrape::{
    BrowserDownloadSink, BrowserSession, CancellationToken, CdpAccessor, ConnectionOptions, HttpFetcher, JsonFileSink,
    LaunchOptions, LinkScope, LogNotifier, Notifier, PageAlertNotifier, ResultCollection, ResultSink, RunContext,
    RunReport, RunStatus, ScrapeConfig, TraversalEngine, download_documents,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SinkKind {
    /// Write the JSON file into --output-dir
    File,
    /// Trigger a download in the browser
    Browser,
}

#[derive(Parser)]
#[command(name = "owner-scrape")]
#[command(version)]
#[command(about = "Extract address/owner/document records from the community grid", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an extraction against the active browser tab
    Run(RunArgs),
    /// Summarize a previously exported file
    Inspect {
        /// Exported JSON file
        file: PathBuf,
    },
    /// Fetch the document behind every record of an export
    Download(DownloadArgs),
}

#[derive(Args)]
struct DownloadArgs {
    /// Exported JSON file
    file: PathBuf,

    /// Community name for the file names (default: taken from <NAME>_data.json)
    #[arg(long, value_name = "NAME")]
    community: Option<String>,

    /// Directory the documents are written to
    #[arg(long, short = 'o', value_name = "DIR", default_value = "pdfs")]
    output_dir: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    timeout: u64,
}

#[derive(Args)]
struct RunArgs {
    /// DevTools WebSocket URL of an already running Chrome
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Timeout in milliseconds when attaching via --ws-endpoint
    #[arg(long, value_name = "MS", default_value_t = 30_000)]
    connect_timeout: u64,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Launch Chrome without its sandbox (needed in some containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<PathBuf>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Open this URL before the run
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// JSON configuration file
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Community name; the export is written as <NAME>_data.json
    #[arg(long, value_name = "NAME")]
    community: Option<String>,

    /// Directory for the JSON export
    #[arg(long, short = 'o', value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Where to deliver the export
    #[arg(long, value_enum, default_value = "file")]
    sink: SinkKind,

    /// Also show notices as alerts in the page
    #[arg(long)]
    page_alerts: bool,

    /// Where to look for the document link of an opened popup
    #[arg(long, value_enum)]
    link_scope: Option<LinkScope>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Inspect { file } => inspect(&file),
        Command::Download(args) => download(args).await,
    }
}

/// Cancels the token on the first Ctrl+C
fn cancel_on_ctrl_c(message: &'static str) -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("{}", message);
                cancel_for_signal.cancel();
            }
            Err(e) => log::error!("Failed to listen for Ctrl+C: {}", e),
        }
    });
    cancel
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ScrapeConfig::from_json_file(path)?,
        None => ScrapeConfig::default(),
    };

    if let Some(community) = &args.community {
        config.traversal = config.traversal.community(community);
    }
    if let Some(scope) = args.link_scope {
        config.traversal = config.traversal.link_scope(scope);
    }

    let cancel = cancel_on_ctrl_c("Interrupted; stopping after the current entry");

    let report = tokio::task::spawn_blocking(move || run_blocking(args, config, cancel))
        .await
        .context("Extraction task panicked")??;

    match &report.status {
        RunStatus::Exported { location } => {
            eprintln!("Exported {} record(s) to {}", report.records.len(), location)
        }
        RunStatus::Empty => eprintln!("No records extracted from {} address(es)", report.groups),
        RunStatus::Cancelled => eprintln!("Cancelled with {} record(s) collected; nothing exported", report.records.len()),
    }
    eprintln!("Entries skipped: {}", report.skipped());

    Ok(())
}

fn run_blocking(args: RunArgs, config: ScrapeConfig, cancel: CancellationToken) -> anyhow::Result<RunReport> {
    let session = match &args.ws_endpoint {
        Some(endpoint) => {
            eprintln!("Connecting to {}", endpoint);
            BrowserSession::connect(ConnectionOptions::new(endpoint.clone()).timeout(args.connect_timeout))?
        }
        None => {
            let mut options = LaunchOptions::new().headless(!args.headed).sandbox(!args.no_sandbox);
            if let Some(path) = &args.executable_path {
                options = options.chrome_path(path);
            }
            if let Some(dir) = &args.user_data_dir {
                options = options.user_data_dir(dir);
            }
            eprintln!("Browser mode: {}", if options.headless { "headless" } else { "headed" });
            BrowserSession::launch(options)?
        }
    };

    if let Some(url) = &args.url {
        let url = with_scheme(url);
        session.navigate(&url)?;
        session.wait_for_navigation()?;
    }

    let tab = session.tab()?;

    let sink: Box<dyn ResultSink> = match args.sink {
        SinkKind::File => Box::new(JsonFileSink::new(&args.output_dir)),
        SinkKind::Browser => Box::new(BrowserDownloadSink::new(tab.clone())),
    };

    let notifier: Box<dyn Notifier> =
        if args.page_alerts { Box::new(PageAlertNotifier::new(tab.clone())) } else { Box::new(LogNotifier) };

    let mut ui = CdpAccessor::new(tab, config.selectors);
    let engine = TraversalEngine::new(config.traversal, sink).with_notifier(notifier);

    let mut ctx = RunContext::with_cancellation(cancel);
    let report = engine.run_with_context(&mut ui, &mut ctx)?;

    log::debug!("Controls touched: {}", ui.registry().len());
    Ok(report)
}

fn inspect(file: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let records =
        ResultCollection::from_json_str(&json).with_context(|| format!("Not a record export: {}", file.display()))?;

    println!("{}: {} record(s)", file.display(), records.len());
    for (address, count) in records.per_address() {
        println!("  {:>3}  {}", count, address);
    }

    Ok(())
}

async fn download(args: DownloadArgs) -> anyhow::Result<()> {
    let json =
        std::fs::read_to_string(&args.file).with_context(|| format!("Failed to read {}", args.file.display()))?;
    let records = ResultCollection::from_json_str(&json)
        .with_context(|| format!("Not a record export: {}", args.file.display()))?;

    let community = match args.community.clone().or_else(|| community_from_export(&args.file)) {
        Some(community) => community,
        None => anyhow::bail!("Cannot derive a community name from {}; pass --community", args.file.display()),
    };

    eprintln!("Downloading {} document(s) for {} into {}", records.len(), community, args.output_dir.display());

    let cancel = cancel_on_ctrl_c("Interrupted; stopping after the current document");
    let report = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let fetcher = HttpFetcher::new(Duration::from_secs(args.timeout))?;
        Ok(download_documents(records.as_slice(), &args.output_dir, &community, &fetcher, &cancel)?)
    })
    .await
    .context("Download task panicked")??;

    eprintln!("Saved {} document(s), {} failed", report.saved(), report.failed());
    if report.cancelled {
        eprintln!("Cancelled before every document was tried");
    }

    Ok(())
}

/// Prefix `https://` when the operator typed a bare host
fn with_scheme(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.contains("://") || trimmed.starts_with("about:") || trimmed.starts_with("data:") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}
