//! Bounded-parallel download dispatch.
//!
//! Runs the per-video fetch over a fixed-size worker pool. Items are
//! independent: no shared mutable state beyond the work queue, no ordering
//! guarantee on results, no cancellation. A failed item marks its own result
//! and nothing else.

use crate::extract::LinkItem;
use crate::fetch::{self, DownloadResult, Http};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{mpsc, Mutex};
use std::thread;

/// Default worker count: one per available core.
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Runs `fetch_and_download` over every item with up to `workers` threads.
///
/// Ordinals come from the input order (document order on the profile page)
/// and are fixed before dispatch; results arrive in completion order.
pub fn dispatch_all(
    items: Vec<LinkItem>,
    http: &dyn Http,
    base_url: &str,
    resolution: &str,
    output_folder: &Path,
    workers: usize,
) -> Vec<DownloadResult> {
    if items.is_empty() {
        return Vec::new();
    }
    let workers = workers.max(1).min(items.len());
    let queue: Mutex<VecDeque<(usize, LinkItem)>> =
        Mutex::new(items.into_iter().enumerate().collect());
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            scope.spawn(move || loop {
                let next = queue
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .pop_front();
                let Some((ordinal, item)) = next else {
                    break;
                };
                let result = fetch::fetch_and_download(
                    http,
                    base_url,
                    resolution,
                    &item,
                    output_folder,
                    ordinal,
                );
                if tx.send(result).is_err() {
                    break;
                }
            });
        }
        drop(tx);
        rx.iter().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use std::fs;

    const BASE: &str = "https://archive.example/";

    /// Serves a valid detail page for every resource id except the ones in
    /// `broken`, which get a page with no 720p source. Media URLs return the
    /// resource slug as the body.
    struct ScriptedHttp {
        broken: Vec<String>,
    }

    impl Http for ScriptedHttp {
        fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            if let Some(page) = url.strip_prefix(BASE) {
                if self.broken.iter().any(|b| page.ends_with(b.as_str())) {
                    return Ok(b"<html><video></video></html>".to_vec());
                }
                let slug = page.rsplit('/').next().unwrap_or("clip");
                return Ok(format!(
                    r#"<video><source res="720" src="//media.example/{slug}.mp4"></video>"#
                )
                .into_bytes());
            }
            if let Some(name) = url.strip_prefix("http://media.example/") {
                return Ok(name.as_bytes().to_vec());
            }
            Err(FetchError::Http {
                code: 404,
                url: url.to_string(),
            })
        }
    }

    fn items(n: usize) -> Vec<LinkItem> {
        (0..n)
            .map(|i| LinkItem {
                resource_id: format!("https://plays.tv/video/{i:06x}/clip-{i}"),
                display_name: format!("Clip {i}"),
            })
            .collect()
    }

    #[test]
    fn one_failure_does_not_affect_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let http = ScriptedHttp {
            broken: vec!["clip-2".to_string()],
        };

        let results = dispatch_all(items(5), &http, BASE, "720", dir.path(), 4);
        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|r| r.success).count(), 4);

        let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].display_name, "Clip 2");

        for i in [0usize, 1, 3, 4] {
            let path = dir.path().join(format!("clip-{i}_{i}.mp4"));
            assert!(path.exists(), "missing output for item {i}");
        }
        assert!(!dir.path().join("clip-2_2.mp4").exists());
    }

    #[test]
    fn ordinals_follow_input_order_regardless_of_worker_count() {
        let dir = tempfile::tempdir().unwrap();
        let http = ScriptedHttp { broken: Vec::new() };

        let results = dispatch_all(items(6), &http, BASE, "720", dir.path(), 3);
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.success));
        for i in 0..6 {
            let body = fs::read(dir.path().join(format!("clip-{i}_{i}.mp4"))).unwrap();
            assert_eq!(body, format!("clip-{i}.mp4").into_bytes());
        }
    }

    #[test]
    fn empty_input_yields_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let http = ScriptedHttp { broken: Vec::new() };
        let results = dispatch_all(Vec::new(), &http, BASE, "720", dir.path(), 8);
        assert!(results.is_empty());
    }

    #[test]
    fn single_worker_preserves_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let http = ScriptedHttp { broken: Vec::new() };
        let results = dispatch_all(items(3), &http, BASE, "720", dir.path(), 1);
        let names: Vec<_> = results.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, ["Clip 0", "Clip 1", "Clip 2"]);
    }
}
