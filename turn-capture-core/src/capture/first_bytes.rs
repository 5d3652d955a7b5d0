use std::time::Duration;

use chrono::Utc;

/// Callback fired once, on the first frame delivered after capture starts.
pub type FirstBytesCallback = Box<dyn FnOnce() + Send + 'static>;

const FIRED: i64 = -1;

/// Exactly-once "first bytes received" notification for one `record` call.
///
/// Armed with the capture start time in milliseconds (strictly positive);
/// firing swaps in a negative sentinel so later frames never fire again.
pub struct FirstBytesNotifier {
    started_at_ms: i64,
    callback: Option<FirstBytesCallback>,
}

impl FirstBytesNotifier {
    pub fn armed(callback: Option<FirstBytesCallback>) -> Self {
        Self::armed_at(Utc::now().timestamp_millis(), callback)
    }

    pub fn armed_at(started_at_ms: i64, callback: Option<FirstBytesCallback>) -> Self {
        Self {
            started_at_ms: started_at_ms.max(1),
            callback,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.started_at_ms <= 0
    }

    /// Fire if still armed. Returns the time elapsed since arming.
    pub fn fire(&mut self) -> Option<Duration> {
        if self.started_at_ms <= 0 {
            return None;
        }
        let elapsed_ms = (Utc::now().timestamp_millis() - self.started_at_ms).max(0);
        self.started_at_ms = FIRED;
        if let Some(callback) = self.callback.take() {
            callback();
        }
        Some(Duration::from_millis(elapsed_ms as u64))
    }
}
