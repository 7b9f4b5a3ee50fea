//! Decides when a navigation has settled, from the stream of page
//! lifecycle events (`init`, `DOMContentLoaded`, `load`, `networkIdle`, ...).
//!
//! Chrome reports `networkIdle` once no request has been in flight for
//! 500 ms. Lifecycle events restart with `init` on every new document, so
//! anything seen before the navigated document's `init` belongs to the
//! previous page (usually `about:blank`) and is ignored.

use crate::config::WaitUntil;

#[derive(Debug, Clone)]
pub struct LifecycleWatch {
    target: &'static str,
    frame: Option<String>,
    armed: bool,
    settled: bool,
}

impl LifecycleWatch {
    /// Watch for `wait_until` on `frame`; `None` accepts events from any frame.
    pub fn new(wait_until: WaitUntil, frame: Option<String>) -> Self {
        Self {
            target: wait_until.lifecycle_event(),
            frame,
            armed: false,
            settled: false,
        }
    }

    /// Feed one lifecycle event. Returns `true` once the condition holds.
    pub fn observe(&mut self, frame_id: &str, name: &str) -> bool {
        if self.settled {
            return true;
        }
        if let Some(frame) = &self.frame {
            if frame != frame_id {
                return false;
            }
        }
        if name == "init" {
            self.armed = true;
        } else if self.armed && name == self.target {
            self.settled = true;
        }
        self.settled
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}
