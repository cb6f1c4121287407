//! Minimal W3C WebDriver client for a locally spawned chromedriver.
//!
//! Covers only the commands the recovery pipeline needs: create a headless
//! session, navigate, run a synchronous script, read the page source, end
//! the session. Speaks JSON over HTTP via libcurl.

use crate::stabilize::ScrollSurface;
use serde_json::{json, Value};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("no driver executable in {0}")]
    DriverMissing(PathBuf),
    #[error("failed to start driver: {0}")]
    Spawn(std::io::Error),
    #[error("driver did not accept connections on port {0}")]
    NotReady(u16),
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("webdriver: {0}")]
    Protocol(String),
}

/// Locates the driver executable: the single file expected in `driver_dir`.
/// A missing or empty directory is the guided-exit case, not a hard failure.
pub fn find_driver(driver_dir: &Path) -> Result<PathBuf, WebDriverError> {
    let mut entries = std::fs::read_dir(driver_dir)
        .map_err(|_| WebDriverError::DriverMissing(driver_dir.to_path_buf()))?;
    match entries.next() {
        Some(Ok(entry)) => Ok(entry.path()),
        _ => Err(WebDriverError::DriverMissing(driver_dir.to_path_buf())),
    }
}

/// Running chromedriver process; killed when dropped.
pub struct Driver {
    child: Child,
    port: u16,
}

impl Driver {
    /// Launches the driver on `port` and waits until it accepts connections.
    pub fn spawn(executable: &Path, port: u16) -> Result<Self, WebDriverError> {
        tracing::info!(driver = %executable.display(), port, "starting webdriver");
        let child = Command::new(executable)
            .arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(WebDriverError::Spawn)?;
        let driver = Driver { child, port };
        driver.wait_ready(Duration::from_secs(10))?;
        Ok(driver)
    }

    fn wait_ready(&self, timeout: Duration) -> Result<(), WebDriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect(("127.0.0.1", self.port)).is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(WebDriverError::NotReady(self.port));
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// One JSON-over-HTTP WebDriver command.
fn request(method: &str, url: &str, body: Option<&Value>) -> Result<Value, WebDriverError> {
    let payload = match body {
        Some(v) => serde_json::to_vec(v)?,
        None => Vec::new(),
    };

    let mut response = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    // page loads through the archive can be slow; scripts are cheap but
    // navigation shares this code path
    easy.timeout(Duration::from_secs(300))?;
    match method {
        "POST" => {
            easy.post(true)?;
            easy.post_fields_copy(&payload)?;
            let mut headers = curl::easy::List::new();
            headers.append("Content-Type: application/json; charset=utf-8")?;
            easy.http_headers(headers)?;
        }
        "DELETE" => easy.custom_request("DELETE")?,
        _ => {}
    }
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            response.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let code = easy.response_code()?;

    let value: Value = if response.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&response)?
    };
    if !(200..300).contains(&code) {
        let message = value
            .pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown driver error")
            .to_string();
        return Err(WebDriverError::Protocol(message));
    }
    Ok(value)
}

/// Live browser session. `close` ends it explicitly; anything left open dies
/// with the driver process.
pub struct Session {
    base: String,
}

impl Session {
    /// Creates a headless Chrome session against the driver on `port`.
    pub fn create(port: u16) -> Result<Self, WebDriverError> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": ["--headless=new", "--log-level=3"]
                    }
                }
            }
        });
        let value = request(
            "POST",
            &format!("http://127.0.0.1:{port}/session"),
            Some(&capabilities),
        )?;
        let id = value
            .pointer("/value/sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Protocol("missing sessionId".to_string()))?;
        tracing::debug!(session = id, "webdriver session created");
        Ok(Session {
            base: format!("http://127.0.0.1:{port}/session/{id}"),
        })
    }

    pub fn navigate(&self, url: &str) -> Result<(), WebDriverError> {
        request("POST", &format!("{}/url", self.base), Some(&json!({ "url": url })))?;
        Ok(())
    }

    /// Runs a synchronous script in the page and returns its value.
    pub fn execute_script(&self, script: &str) -> Result<Value, WebDriverError> {
        let value = request(
            "POST",
            &format!("{}/execute/sync", self.base),
            Some(&json!({ "script": script, "args": [] })),
        )?;
        Ok(value.pointer("/value").cloned().unwrap_or(Value::Null))
    }

    pub fn page_source(&self) -> Result<String, WebDriverError> {
        let value = request("GET", &format!("{}/source", self.base), None)?;
        value
            .pointer("/value")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::Protocol("missing page source".to_string()))
    }

    pub fn close(self) -> Result<(), WebDriverError> {
        request("DELETE", &self.base, None)?;
        Ok(())
    }
}

impl ScrollSurface for Session {
    fn content_height(&self) -> anyhow::Result<i64> {
        let value = self.execute_script("return document.body.scrollHeight")?;
        value
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("scrollHeight is not a number: {value}"))
    }

    fn scroll_to_bottom(&self) -> anyhow::Result<()> {
        self.execute_script("window.scrollTo(0, document.body.scrollHeight);")?;
        Ok(())
    }
}
