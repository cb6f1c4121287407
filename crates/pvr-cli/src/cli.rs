//! CLI for the pvr recovery tool.

use anyhow::{Context, Result};
use clap::Parser;
use pvr_core::config;
use pvr_core::fetch::CurlHttp;
use pvr_core::recover;
use pvr_core::webdriver::{self, Driver, Session, WebDriverError};
use std::fs;
use std::path::PathBuf;

/// Recover a user's plays.tv videos from the Wayback Machine.
#[derive(Debug, Parser)]
#[command(name = "pvr")]
#[command(about = "Recover plays.tv videos from the Wayback Machine", long_about = None)]
pub struct Cli {
    /// Username to recover.
    #[arg(short, long)]
    pub username: String,

    /// Output folder for the downloaded videos.
    #[arg(short, long)]
    pub output_folder: PathBuf,

    /// Download worker threads (default: one per core).
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Seconds the page height must stay unchanged before scrolling stops.
    #[arg(long, value_name = "SECS")]
    pub stability_timeout: Option<u64>,

    /// Directory holding the chromedriver executable.
    #[arg(long, value_name = "DIR")]
    pub driver_dir: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    if let Some(workers) = cli.workers {
        cfg.workers = Some(workers);
    }
    if let Some(secs) = cli.stability_timeout {
        cfg.stability_timeout_secs = secs;
    }
    if let Some(dir) = cli.driver_dir {
        cfg.driver_dir = dir;
    }

    // Missing driver is a guided exit, not an error.
    let driver_path = match webdriver::find_driver(&cfg.driver_dir) {
        Ok(path) => path,
        Err(WebDriverError::DriverMissing(dir)) => {
            println!(
                "Please download the ChromeDriver matching your OS and Chrome version and put it in {}",
                dir.display()
            );
            println!("https://chromedriver.chromium.org/downloads");
            println!("Make sure only the driver executable is in that folder.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    fs::create_dir_all(&cli.output_folder).with_context(|| {
        format!("creating output folder {}", cli.output_folder.display())
    })?;

    tracing::info!("starting scraper");
    let _driver = Driver::spawn(&driver_path, cfg.webdriver_port)?;
    let session = Session::create(cfg.webdriver_port)?;

    // Scrape with the browser, then close it before the download stage.
    let scraped = recover::scrape_profile(&cfg, &session, &cli.username);
    if let Err(err) = session.close() {
        tracing::warn!(error = %err, "session close failed");
    }
    let items = scraped?;

    let summary = recover::download_all(&cfg, &CurlHttp, items, &cli.output_folder);

    println!(
        "Successfully downloaded {}/{} videos",
        summary.succeeded, summary.total
    );
    Ok(())
}
