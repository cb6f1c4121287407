//! Infinite-scroll stabilization.
//!
//! Height-based polling is the only robust completion signal on an
//! infinite-scroll page: keep scrolling while the content height grows and
//! declare the page loaded once the height has stayed unchanged for the
//! stability timeout.

use anyhow::Result;
use std::time::{Duration, Instant};

/// What the driver loop should do after observing the current height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Height grew: scroll to the bottom to trigger the next lazy load.
    Scroll,
    /// Height unchanged but still within the stability window.
    Wait,
    /// Height unchanged for longer than the stability timeout.
    Done,
}

/// Page surface the stabilizer drives. Production is the WebDriver session;
/// tests use a scripted fake.
pub trait ScrollSurface {
    fn content_height(&self) -> Result<i64>;
    fn scroll_to_bottom(&self) -> Result<()>;
}

/// Stabilization state: the last observed height and when it last changed.
#[derive(Debug)]
pub struct ScrollState {
    last_height: i64,
    last_grow: Instant,
}

impl ScrollState {
    /// The `-1` sentinel is lower than any real document height, so the
    /// first observation always counts as growth.
    pub fn new(now: Instant) -> Self {
        Self {
            last_height: -1,
            last_grow: now,
        }
    }

    /// Feeds one height sample into the state machine.
    pub fn observe(&mut self, height: i64, now: Instant, stability_timeout: Duration) -> Action {
        if height == self.last_height {
            if now.duration_since(self.last_grow) > stability_timeout {
                Action::Done
            } else {
                Action::Wait
            }
        } else {
            self.last_height = height;
            self.last_grow = now;
            Action::Scroll
        }
    }
}

/// Scrolls `surface` until its content height has stopped growing for
/// `stability_timeout`. Blocks the calling thread; iterations are separated
/// by `poll_interval`. There is no upper bound on total wall-clock time: the
/// stability timeout is the sole terminator.
pub fn run(
    surface: &impl ScrollSurface,
    stability_timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let mut state = ScrollState::new(Instant::now());
    loop {
        let height = surface.content_height()?;
        match state.observe(height, Instant::now(), stability_timeout) {
            Action::Done => {
                tracing::info!("done scrolling");
                return Ok(());
            }
            Action::Scroll => {
                tracing::debug!(height, "scrolling");
                surface.scroll_to_bottom()?;
            }
            Action::Wait => {}
        }
        std::thread::sleep(poll_interval);
    }
}
