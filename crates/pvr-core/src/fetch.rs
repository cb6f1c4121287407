//! Per-video fetch and download.
//!
//! Resolves a video resource id to its direct media URL by fetching the
//! archived detail page and locating the quality-tagged source element, then
//! downloads the media into the output folder. Every failure is contained to
//! its own item and reported as a negative result.

use crate::extract::LinkItem;
use crate::sanitize::slugify;
use scraper::{Html, Selector};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("HTTP {code} for {url}")]
    Http { code: u32, url: String },
    #[error("no source element with res=\"{0}\" on detail page")]
    MissingSource(String),
    #[error("malformed media src: {0:?}")]
    MalformedSrc(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one item. Failures never escalate past this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub success: bool,
    pub display_name: String,
}

/// HTTP GET capability. Production uses libcurl; tests inject mocks.
pub trait Http: Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Fetches `url` into the file at `dest`. The default buffers through
    /// `get`; the curl implementation streams instead.
    fn download_to(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let bytes = self.get(url)?;
        let mut file = fs::File::create(dest)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    }
}

fn configure(easy: &mut curl::easy::Easy) -> Result<(), curl::Error> {
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(30))?;
    easy.timeout(Duration::from_secs(3600))?;
    Ok(())
}

/// libcurl-backed `Http` implementation.
pub struct CurlHttp;

impl Http for CurlHttp {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        configure(&mut easy)?;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http {
                code,
                url: url.to_string(),
            });
        }
        Ok(body)
    }

    fn download_to(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let mut file = fs::File::create(dest)?;
        let mut write_err: Option<std::io::Error> = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        configure(&mut easy)?;
        let perform_result;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match file.write_all(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    write_err = Some(e);
                    Ok(0) // aborts the transfer
                }
            })?;
            perform_result = transfer.perform();
        }
        if let Some(e) = write_err {
            return Err(FetchError::Io(e));
        }
        perform_result?;

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http {
                code,
                url: url.to_string(),
            });
        }
        file.sync_all()?;
        Ok(())
    }
}

fn source_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("source").expect("static selector"))
}

/// Locates the first `<source>` element tagged with the requested resolution
/// and returns its absolute media URL. Snapshots carry protocol-relative
/// `src` values, which get an `http:` prefix.
pub fn find_media_url(page_html: &str, resolution: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(page_html);
    let source = document
        .select(source_selector())
        .find(|el| el.value().attr("res") == Some(resolution))
        .ok_or_else(|| FetchError::MissingSource(resolution.to_string()))?;
    let src = source
        .value()
        .attr("src")
        .ok_or_else(|| FetchError::MalformedSrc(String::new()))?;

    let absolute = if src.starts_with("//") {
        format!("http:{src}")
    } else {
        src.to_string()
    };
    url::Url::parse(&absolute).map_err(|_| FetchError::MalformedSrc(absolute.clone()))?;
    Ok(absolute)
}

/// Fetches one video's detail page, resolves its media URL, and downloads the
/// media to `{output_folder}/{slug}_{ordinal}.mp4`. Any failure is converted
/// into a negative result; the underlying error is logged, not propagated.
pub fn fetch_and_download(
    http: &dyn Http,
    base_url: &str,
    resolution: &str,
    item: &LinkItem,
    output_folder: &Path,
    ordinal: usize,
) -> DownloadResult {
    tracing::info!(name = %item.display_name, page = %item.resource_id, "downloading");
    match try_fetch(http, base_url, resolution, item, output_folder, ordinal) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "downloaded");
            DownloadResult {
                success: true,
                display_name: item.display_name.clone(),
            }
        }
        Err(err) => {
            tracing::warn!(name = %item.display_name, error = %err, "download failed");
            DownloadResult {
                success: false,
                display_name: item.display_name.clone(),
            }
        }
    }
}

fn try_fetch(
    http: &dyn Http,
    base_url: &str,
    resolution: &str,
    item: &LinkItem,
    output_folder: &Path,
    ordinal: usize,
) -> Result<PathBuf, FetchError> {
    let page_url = format!("{base_url}{}", item.resource_id);
    let page = http.get(&page_url)?;
    let media_url = find_media_url(&String::from_utf8_lossy(&page), resolution)?;

    let final_path =
        output_folder.join(format!("{}_{}.mp4", slugify(&item.display_name), ordinal));
    download_atomic(http, &media_url, &final_path)?;
    Ok(final_path)
}

/// Downloads to a `.part` temp name and renames into place, so a failed
/// download never leaves a partial file behind.
fn download_atomic(http: &dyn Http, media_url: &str, final_path: &Path) -> Result<(), FetchError> {
    let mut temp = final_path.as_os_str().to_owned();
    temp.push(".part");
    let temp_path = PathBuf::from(temp);

    let result = http
        .download_to(media_url, &temp_path)
        .and_then(|()| fs::rename(&temp_path, final_path).map_err(FetchError::Io));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
