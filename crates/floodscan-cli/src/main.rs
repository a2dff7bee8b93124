use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use floodscan_client::HttpSessionFactory;
#[cfg(feature = "browser")]
use floodscan_client::{BrowserOptions, BrowserSessionFactory};
use floodscan_core::dates::{parse_end_date, parse_start_date};
use floodscan_core::render::write_records;
use floodscan_core::traits::SessionFactory;
use floodscan_core::{
    AppError, FetchConfig, Pipeline, QueryParams, Record, SiteProfile, Taxonomy, TimestampFormat,
    builtin_sites, find_site, load_sites,
};

#[derive(Parser)]
#[command(
    name = "floodscan",
    version,
    about = "Search news sites for storm and flood reports about a location"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one or more sites for flood-related articles
    Search {
        /// Location to search for (e.g., "Hà Nội", "Quảng Nam")
        #[arg(short, long)]
        location: String,

        /// Site profile(s) to search; repeat for several sites
        #[arg(short, long, env = "FLOODSCAN_SITE", default_value = "vnexpress", value_delimiter = ',')]
        site: Vec<String>,

        /// Number of result pages to crawl per site
        #[arg(short, long, env = "FLOODSCAN_PAGES", default_value_t = 3)]
        pages: u32,

        /// Per-page timeout in seconds
        #[arg(short, long, env = "FLOODSCAN_TIMEOUT", default_value_t = 10)]
        timeout: u64,

        /// Earliest publish date, dd/mm/yyyy (UTC+7)
        #[arg(long, value_parser = parse_start_date_arg)]
        from: Option<DateTime<FixedOffset>>,

        /// Latest publish date, dd/mm/yyyy (UTC+7, inclusive)
        #[arg(long, value_parser = parse_end_date_arg)]
        to: Option<DateTime<FixedOffset>>,

        /// Also require the location to appear in title or summary
        #[arg(long, default_value_t = false)]
        strict_location: bool,

        /// Page provider
        #[arg(long, value_enum, default_value_t = Provider::default())]
        provider: Provider,

        /// Chrome/Chromium binary for the browser provider
        #[arg(long, env = "CHROME_BIN")]
        chrome_bin: Option<PathBuf>,

        /// JSON file with site profiles (replaces the built-in ones)
        #[arg(long, env = "FLOODSCAN_SITES_FILE")]
        sites_file: Option<PathBuf>,

        /// JSON file with a keyword taxonomy (replaces the flood taxonomy)
        #[arg(long, env = "FLOODSCAN_TAXONOMY_FILE")]
        taxonomy_file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the available site profiles
    Sites {
        /// JSON file with site profiles (replaces the built-in ones)
        #[arg(long, env = "FLOODSCAN_SITES_FILE")]
        sites_file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Provider {
    /// Headless Chromium (renders JavaScript)
    #[cfg(feature = "browser")]
    Browser,
    /// Plain HTTP + HTML parsing (server-rendered pages only)
    Http,
}

impl Default for Provider {
    #[cfg(feature = "browser")]
    fn default() -> Self {
        Provider::Browser
    }

    #[cfg(not(feature = "browser"))]
    fn default() -> Self {
        Provider::Http
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Everything one `search` invocation needs besides the provider.
struct SearchPlan {
    sites: Vec<SiteProfile>,
    taxonomy: Taxonomy,
    fetch_config: FetchConfig,
    params: QueryParams,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            location,
            site,
            pages,
            timeout,
            from,
            to,
            strict_location,
            provider,
            chrome_bin,
            sites_file,
            taxonomy_file,
            format,
            output,
        } => {
            let available = resolve_sites(sites_file.as_deref())?;
            let sites = site
                .iter()
                .map(|name| find_site(&available, name).cloned())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow::anyhow!(e))?;

            let taxonomy = match taxonomy_file {
                Some(path) => Taxonomy::from_json_file(&path).map_err(|e| anyhow::anyhow!(e))?,
                None => Taxonomy::flood(),
            };

            let params = QueryParams {
                location,
                pages,
                page_timeout: Duration::from_secs(timeout),
                start: from,
                end: to,
                require_location: strict_location,
            };
            // Reject bad input before launching anything
            params
                .clone()
                .validate()
                .map_err(|e| anyhow::anyhow!(e))?;

            let plan = SearchPlan {
                sites,
                taxonomy,
                fetch_config: FetchConfig::from_env().map_err(|e| anyhow::anyhow!(e))?,
                params,
            };

            let records = match provider {
                #[cfg(feature = "browser")]
                Provider::Browser => {
                    let factory = BrowserSessionFactory::new(BrowserOptions {
                        chrome_bin,
                        ..BrowserOptions::default()
                    })
                    .map_err(|e| anyhow::anyhow!(e))?;
                    cmd_search(factory, &plan).await?
                }
                Provider::Http => {
                    let _ = chrome_bin;
                    let factory =
                        HttpSessionFactory::new().context("Failed to create HTTP client")?;
                    cmd_search(factory, &plan).await?
                }
            };

            write_output(&records, format, output.as_deref())?;
        }
        Commands::Sites { sites_file } => {
            let sites = resolve_sites(sites_file.as_deref())?;
            cmd_sites(&sites, &mut io::stdout().lock())?;
        }
    }

    Ok(())
}

const DEFAULT_LOG_FILTER: &str = "floodscan=info,floodscan_core=info,floodscan_client=info";

fn log_filter() -> EnvFilter {
    log_filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

/// `RUST_LOG` as given when set and valid, otherwise info for the floodscan crates.
fn log_filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn parse_start_date_arg(s: &str) -> Result<DateTime<FixedOffset>, String> {
    parse_start_date(s).map_err(|e| e.to_string())
}

fn parse_end_date_arg(s: &str) -> Result<DateTime<FixedOffset>, String> {
    parse_end_date(s).map_err(|e| e.to_string())
}

fn resolve_sites(path: Option<&Path>) -> Result<Vec<SiteProfile>> {
    match path {
        Some(p) => load_sites(p).map_err(|e| anyhow::anyhow!(e)),
        None => Ok(builtin_sites()),
    }
}

/// Run one pipeline per site, each with its own session, and merge the
/// results in site order.
async fn cmd_search<F: SessionFactory>(factory: F, plan: &SearchPlan) -> Result<Vec<Record>> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current page");
            ctrl_c.cancel();
        }
    });

    let mut all = Vec::new();
    let mut failed = 0;
    for site in &plan.sites {
        if cancel.is_cancelled() {
            break;
        }
        let pipeline = Pipeline::new(factory.clone(), site.clone())
            .with_taxonomy(plan.taxonomy.clone())
            .with_fetch_config(plan.fetch_config);
        match pipeline.run(plan.params.clone(), &cancel).await {
            Ok(records) => all.extend(records),
            Err(e) => {
                skip_failed_site(site, e)?;
                failed += 1;
            }
        }
    }

    if !plan.sites.is_empty() && failed == plan.sites.len() {
        anyhow::bail!("Search failed on every site");
    }
    Ok(merge_indices(all))
}

/// Abort on configuration and query errors; log anything else so the
/// remaining sites still run.
fn skip_failed_site(site: &SiteProfile, err: AppError) -> Result<()> {
    if err.is_fatal() {
        return Err(anyhow::anyhow!(err)).with_context(|| format!("Search on {} failed", site.name));
    }
    tracing::error!(site = %site.name, error = %err, "Search failed, skipping site");
    Ok(())
}

/// Renumber records from several runs into one contiguous list.
fn merge_indices(mut records: Vec<Record>) -> Vec<Record> {
    for (i, record) in records.iter_mut().enumerate() {
        record.index = i + 1;
    }
    records
}

fn write_output(records: &[Record], format: OutputFormat, path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            let mut file = File::create(p)
                .with_context(|| format!("Failed to create output file: {}", p.display()))?;
            write_format(&mut file, records, format)?;
            tracing::info!(count = records.len(), path = %p.display(), "Results written");
        }
        None => write_format(&mut io::stdout().lock(), records, format)?,
    }
    Ok(())
}

fn write_format<W: Write>(out: &mut W, records: &[Record], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => write_records(out, records)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, records)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(out);
            if records.is_empty() {
                wtr.write_record(["index", "title", "link", "summary", "published_at", "source"])?;
            }
            for record in records {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

fn cmd_sites<W: Write>(sites: &[SiteProfile], out: &mut W) -> Result<()> {
    for site in sites {
        writeln!(out, "{}", site.name)?;
        writeln!(out, "  search: {}", site.search_url)?;
        writeln!(out, "  blocks: {}", site.selectors.block)?;
        let selectors = &site.selectors;
        match &selectors.timestamp_attribute {
            None => writeln!(out, "  publish time: (none)")?,
            Some(attr) => {
                let format = match selectors.timestamp_format {
                    TimestampFormat::EpochSeconds => "epoch seconds",
                    TimestampFormat::DateLabel => "date label",
                };
                match &selectors.timestamp_selector {
                    Some(sel) => writeln!(out, "  publish time: {sel}[{attr}] ({format})")?,
                    None => writeln!(out, "  publish time: [{attr}] ({format})")?,
                }
            }
        }
    }
    Ok(())
}
