// credit: https://github.com/microsoft/Spartan/blob/master/src/timer.rs

use core::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use log::Level;

pub static CALL_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// Level timings are reported at. The `profile` feature promotes them so they show up without
/// turning on debug logging.
#[cfg(feature = "profile")]
const REPORT_LEVEL: Level = Level::Info;
#[cfg(not(feature = "profile"))]
const REPORT_LEVEL: Level = Level::Debug;

/// Wall clock timer for one phase of work. Only the timer of the root rank reports, nested
/// timers are indented by call depth.
pub struct Timer {
    label: String,
    start: Instant,
    is_root: bool,
}

impl Timer {
    #[inline(always)]
    pub fn new(label: &str, is_root: bool) -> Self {
        if is_root {
            let depth = CALL_DEPTH.fetch_add(1, Ordering::Relaxed) + 1;
            log::log!(REPORT_LEVEL, "{:indent$}* {}", "", label, indent = 2 * depth);
        }
        Self {
            label: label.to_string(),
            start: Instant::now(),
            is_root,
        }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the elapsed time.
    #[inline(always)]
    pub fn stop(self) -> Duration {
        // reported by `drop`
        self.start.elapsed()
    }

    #[inline(always)]
    pub fn print(&self, msg: &str) {
        if self.is_root {
            let depth = CALL_DEPTH.load(Ordering::Relaxed) + 1;
            log::log!(REPORT_LEVEL, "{:indent$}* {}", "", msg, indent = 2 * depth);
        }
    }
}

/// A timer dropped on an early return reports too, so the call depth stays balanced.
impl Drop for Timer {
    fn drop(&mut self) {
        if self.is_root {
            let depth = CALL_DEPTH.load(Ordering::Relaxed);
            log::log!(
                REPORT_LEVEL,
                "{:indent$}* {} {:?}",
                "",
                self.label,
                self.start.elapsed(),
                indent = 2 * depth
            );
            CALL_DEPTH.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
