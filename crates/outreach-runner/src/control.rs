//! Pause/resume/stop flags shared between the control surface and the loop.
//!
//! [`ControlHandle`] is held by the control surface and only ever flips
//! flags. [`ControlWatcher`] is held by the processing loop and turns those
//! flags into cancellable waits.
//!
//! # Usage
//!
//! ```rust
//! use outreach_runner::control::ControlHandle;
//!
//! let handle = ControlHandle::new();
//! handle.pause();
//! assert!(handle.flags().paused);
//! handle.stop();
//! assert!(handle.flags().stop_requested);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

// ============================================================================
// ControlFlags
// ============================================================================

/// Level-triggered control flags. Setting a flag twice is harmless.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlFlags {
    /// Halt before the next contact until resumed.
    pub paused: bool,
    /// Exit at the next iteration boundary or suspension point.
    pub stop_requested: bool,
}

// ============================================================================
// ControlHandle
// ============================================================================

/// Cheap-to-clone writer side of the control flags.
#[derive(Clone)]
pub struct ControlHandle {
    tx: Arc<watch::Sender<ControlFlags>>,
}

impl Default for ControlHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlHandle {
    /// Creates a handle with every flag cleared.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ControlFlags::default());
        Self { tx: Arc::new(tx) }
    }

    /// Current flags.
    pub fn flags(&self) -> ControlFlags {
        *self.tx.borrow()
    }

    /// Requests a pause.
    pub fn pause(&self) {
        self.tx.send_modify(|f| f.paused = true);
    }

    /// Clears the pause flag.
    pub fn resume(&self) {
        self.tx.send_modify(|f| f.paused = false);
    }

    /// Requests the loop to exit. Also wakes a paused loop.
    pub fn stop(&self) {
        self.tx.send_modify(|f| f.stop_requested = true);
    }

    /// Clears every flag before a new run.
    pub fn reset(&self) {
        self.tx.send_replace(ControlFlags::default());
    }

    /// Creates a watcher for the processing loop.
    pub fn watcher(&self) -> ControlWatcher {
        ControlWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlHandle")
            .field("flags", &self.flags())
            .finish()
    }
}

// ============================================================================
// ControlWatcher
// ============================================================================

/// Reader side of the control flags, owned by the processing loop.
#[derive(Debug)]
pub struct ControlWatcher {
    rx: watch::Receiver<ControlFlags>,
}

impl ControlWatcher {
    /// Returns `true` once `stop()` has been called.
    pub fn stop_requested(&mut self) -> bool {
        self.rx.borrow_and_update().stop_requested
    }

    /// Returns `true` while paused.
    pub fn is_paused(&mut self) -> bool {
        self.rx.borrow_and_update().paused
    }

    /// Blocks while paused. Returns `false` if a stop was requested.
    ///
    /// Wakes as soon as the flags change; there is no polling tick.
    pub async fn wait_while_paused(&mut self) -> bool {
        loop {
            let flags = *self.rx.borrow_and_update();
            if flags.stop_requested {
                return false;
            }
            if !flags.paused {
                return true;
            }
            if self.rx.changed().await.is_err() {
                // Handle dropped: nobody can resume us any more.
                return false;
            }
        }
    }

    /// Sleeps for `duration` unless a stop arrives first.
    ///
    /// Returns `false` if the sleep was cut short by `stop()`. Pausing does
    /// not shorten the sleep.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.rx.borrow_and_update().stop_requested {
                return false;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return true,
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        tokio::time::sleep_until(deadline).await;
                        return true;
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
