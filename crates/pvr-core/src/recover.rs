//! End-to-end recovery pipeline: navigate, stabilize, extract, dispatch.

use crate::config::PvrConfig;
use crate::dispatch;
use crate::extract::{self, LinkItem};
use crate::fetch::Http;
use crate::stabilize::{self, ScrollSurface};
use crate::webdriver::Session;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

/// Rendered-page surface the scrape phase drives. Production is the
/// WebDriver session; tests use canned markup.
pub trait PageSurface: ScrollSurface {
    fn navigate(&self, url: &str) -> Result<()>;
    fn page_source(&self) -> Result<String>;
}

impl PageSurface for Session {
    fn navigate(&self, url: &str) -> Result<()> {
        Ok(Session::navigate(self, url)?)
    }

    fn page_source(&self) -> Result<String> {
        Ok(Session::page_source(self)?)
    }
}

/// Aggregate outcome of a recovery run.
#[derive(Debug)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    /// Display names of the items that failed, for manual retry.
    pub failed: Vec<String>,
}

/// Loads the archived profile, scrolls until the video list stops growing,
/// and extracts every video link in document order. The browser is no longer
/// needed once this returns.
pub fn scrape_profile(
    cfg: &PvrConfig,
    surface: &impl PageSurface,
    username: &str,
) -> Result<Vec<LinkItem>> {
    let profile_url = format!(
        "{}{}{}",
        cfg.archive_base_url, cfg.profile_url_prefix, username
    );
    tracing::info!(username, url = %profile_url, "loading archived profile");
    surface
        .navigate(&profile_url)
        .context("profile navigation failed")?;

    tracing::info!("scrolling to find all videos");
    stabilize::run(
        surface,
        Duration::from_secs(cfg.stability_timeout_secs),
        Duration::from_secs(cfg.poll_interval_secs),
    )?;

    let markup = surface
        .page_source()
        .context("reading rendered profile page")?;
    let items = extract::extract_links(&markup)?;
    tracing::info!(count = items.len(), "found videos");
    Ok(items)
}

/// Downloads every extracted item in parallel and aggregates the results.
/// Per-item failures are isolated; they only show up in the summary.
pub fn download_all(
    cfg: &PvrConfig,
    http: &dyn Http,
    items: Vec<LinkItem>,
    output_folder: &Path,
) -> Summary {
    let workers = cfg.workers.unwrap_or_else(dispatch::default_workers);
    let results = dispatch::dispatch_all(
        items,
        http,
        &cfg.archive_base_url,
        &cfg.resolution,
        output_folder,
        workers,
    );

    let total = results.len();
    let failed: Vec<String> = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| r.display_name.clone())
        .collect();
    for name in &failed {
        tracing::warn!(name = %name, "was unable to download");
    }
    let succeeded = total - failed.len();
    tracing::info!(succeeded, total, "recovery finished");
    Summary {
        total,
        succeeded,
        failed,
    }
}

/// Full pipeline: scrape, then download. The CLI runs the two phases
/// separately so it can close the browser before the download stage.
pub fn run_recovery(
    cfg: &PvrConfig,
    surface: &impl PageSurface,
    http: &dyn Http,
    username: &str,
    output_folder: &Path,
) -> Result<Summary> {
    let items = scrape_profile(cfg, surface, username)?;
    Ok(download_all(cfg, http, items, output_folder))
}
