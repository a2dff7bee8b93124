/// Smoke-test for `BrowserSessionFactory`.
///
/// Launches a headless Chromium, runs a one-page flood search on VnExpress,
/// and prints what survived the filters.
///
/// Run with:
///   cargo run -p floodscan-client --example search_smoke --features browser -- "Hà Nội"
use floodscan_client::{BrowserOptions, BrowserSessionFactory};
use floodscan_core::render::write_records;
use floodscan_core::{Pipeline, QueryParams, builtin_sites, find_site};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let location = std::env::args().nth(1).unwrap_or_else(|| "Hà Nội".to_string());

    println!("Launching headless browser…");
    let factory = BrowserSessionFactory::new(BrowserOptions::default())?;

    let sites = builtin_sites();
    let site = find_site(&sites, "vnexpress")?.clone();
    let mut params = QueryParams::new(location);
    params.pages = 1;

    let records = Pipeline::new(factory, site)
        .run(params, &CancellationToken::new())
        .await?;

    // Basic sanity checks
    assert!(
        records.iter().enumerate().all(|(i, r)| r.index == i + 1),
        "Indices are not contiguous"
    );
    assert!(
        records.iter().all(|r| !r.title.is_empty() && !r.link.is_empty()),
        "Record without title or link"
    );

    write_records(&mut std::io::stdout().lock(), &records)?;
    Ok(())
}
