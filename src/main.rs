use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{prelude::*, EnvFilter};

use court_finder::config::{load_config, load_config_from};
use court_finder::regions::region_filter;
use court_finder::storage::snapshot_filename;
use court_finder::Scraper;

#[derive(Parser, Debug)]
#[command(name = "court_finder", about = "Scrape tennis court availability for a date")]
struct Cli {
    /// Date to search, YYYY-MM-DD or DD/MM/YYYY (default: tomorrow)
    date: Option<String>,

    /// Only scrape venues in this region ("all" for every region)
    region: Option<String>,

    /// Config file (default: $ROOT/court_finder.yml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the regions that have venues and exit
    #[arg(long)]
    list_regions: bool,

    #[arg(long)]
    max_concurrency: Option<usize>,

    #[arg(long, env = "WEBDRIVER_URL")]
    webdriver_url: Option<String>,
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%d/%m/%Y"))
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD or DD/MM/YYYY", input))
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let cli = Cli::parse();
    let root = std::env::var("ROOT").unwrap_or_else(|_| ".".to_string());

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?.rooted(std::path::Path::new(&root)),
        None => load_config(&root)?,
    };
    if let Some(n) = cli.max_concurrency {
        anyhow::ensure!(n > 0, "--max-concurrency must be at least 1");
        config.max_concurrency = n;
    }
    if let Some(url) = cli.webdriver_url {
        config.webdriver_url = url;
    }
    let output_dir = config.output_dir.clone();

    let scraper = Scraper::from_config(config)?;

    if cli.list_regions {
        for region in scraper.available_regions() {
            println!("{}", region);
        }
        return Ok(());
    }

    let date = match &cli.date {
        Some(input) => parse_date(input)?,
        None => Local::now().date_naive() + Duration::days(1),
    };
    let region = region_filter(cli.region.as_deref());

    let started = Instant::now();
    let snapshot = scraper.scrape_all(date, region).await?;
    let summary = snapshot.summary();

    println!("Date:        {}", date);
    println!("Region:      {}", region.unwrap_or(court_finder::regions::ALL_REGIONS));
    println!("Venues:      {}/{} succeeded", summary.successful, summary.total_venues);
    println!("Total slots: {}", summary.total_slots);
    println!("Duration:    {:.2}s", started.elapsed().as_secs_f64());
    println!(
        "Saved:       {}",
        output_dir.join(snapshot_filename(date, snapshot.region.as_deref())).display()
    );

    for result in snapshot.results.iter().filter(|r| !r.success) {
        println!(
            "  failed: {} ({})",
            result.club,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}
