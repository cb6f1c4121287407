use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/pvr/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvrConfig {
    /// Wayback Machine snapshot prefix applied to every fetched page URL.
    pub archive_base_url: String,
    /// Profile page URL prefix; the username is appended.
    pub profile_url_prefix: String,
    /// Resolution tag of the media source to download.
    pub resolution: String,
    /// Seconds the content height must stay unchanged before scrolling stops.
    pub stability_timeout_secs: u64,
    /// Seconds between scroll height polls.
    pub poll_interval_secs: u64,
    /// Worker threads for the download stage (None = one per core).
    #[serde(default)]
    pub workers: Option<usize>,
    /// Port the spawned chromedriver listens on.
    pub webdriver_port: u16,
    /// Directory expected to hold the single chromedriver executable.
    pub driver_dir: PathBuf,
}

impl Default for PvrConfig {
    fn default() -> Self {
        Self {
            archive_base_url: "https://web.archive.org/web/999999999999999999999/".to_string(),
            profile_url_prefix: "https://plays.tv/u/".to_string(),
            resolution: "720".to_string(),
            stability_timeout_secs: 10,
            poll_interval_secs: 2,
            workers: None,
            webdriver_port: 9515,
            driver_dir: PathBuf::from("./chromedriver"),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pvr")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PvrConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PvrConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: PvrConfig = toml::from_str(&data)?;
    Ok(cfg)
}
