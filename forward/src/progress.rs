//! The progress sink (§6): `notify(state, iuid, cuid, dicomStatusCode,
//! progressStatus, remaining)`, emitted once per (destination, instance).
//!
//! Grounded on `storescu/src/main.rs`'s `indicatif::ProgressBar` usage —
//! generalized from a single shared bar incremented per file into a
//! trait so the forward controller can notify an arbitrary sink (a CLI
//! progress bar, a test double, or nothing) without depending on
//! `indicatif` directly.

use indicatif::ProgressBar;

/// Outcome of one destination's handling of one instance, per §4.G's
/// state machine terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Completed,
    Failed,
}

/// `notify`'s sink interface (§6). `remaining` is the number of
/// destinations still pending for this instance, including this one's
/// sibling calls not yet made.
pub trait ProgressSink: Send + Sync {
    fn notify(
        &self,
        iuid: &str,
        cuid: &str,
        dicom_status_code: Option<u16>,
        status: ProgressStatus,
        remaining: usize,
    );
}

/// A no-op sink, used when the caller does not care to observe progress.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn notify(&self, _: &str, _: &str, _: Option<u16>, _: ProgressStatus, _: usize) {}
}

/// Reports progress through an `indicatif::ProgressBar`, matching
/// `storescu`'s bar-per-run usage: one tick per (destination, instance)
/// notification, with the message set to the instance UID and status.
pub struct BarProgressSink {
    bar: ProgressBar,
}

impl BarProgressSink {
    pub fn new(bar: ProgressBar) -> Self {
        BarProgressSink { bar }
    }
}

impl ProgressSink for BarProgressSink {
    fn notify(
        &self,
        iuid: &str,
        cuid: &str,
        dicom_status_code: Option<u16>,
        status: ProgressStatus,
        _remaining: usize,
    ) {
        match status {
            ProgressStatus::Completed => {
                self.bar.set_message(format!("{iuid} ({cuid}) stored"));
            }
            ProgressStatus::Failed => {
                let code = dicom_status_code
                    .map(|c| format!("{c:04X}H"))
                    .unwrap_or_else(|| "transport error".to_string());
                self.bar.set_message(format!("{iuid} ({cuid}) failed: {code}"));
            }
        }
        self.bar.inc(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink(Mutex<Vec<(String, ProgressStatus)>>);

    impl ProgressSink for RecordingSink {
        fn notify(
            &self,
            iuid: &str,
            _cuid: &str,
            _dicom_status_code: Option<u16>,
            status: ProgressStatus,
            _remaining: usize,
        ) {
            self.0.lock().unwrap().push((iuid.to_string(), status));
        }
    }

    #[test]
    fn null_sink_accepts_any_notification_without_panicking() {
        let sink = NullProgressSink;
        sink.notify("1.2.3", "1.2.840.10008.5.1.4.1.1.7", Some(0), ProgressStatus::Completed, 0);
        sink.notify("1.2.3", "1.2.840.10008.5.1.4.1.1.7", None, ProgressStatus::Failed, 1);
    }

    #[test]
    fn recording_sink_captures_notifications_in_order() {
        let sink = RecordingSink(Mutex::new(Vec::new()));
        sink.notify("1.2.3", "cuid", Some(0), ProgressStatus::Completed, 1);
        sink.notify("1.2.4", "cuid", None, ProgressStatus::Failed, 0);
        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ("1.2.3".to_string(), ProgressStatus::Completed));
        assert_eq!(events[1], ("1.2.4".to_string(), ProgressStatus::Failed));
    }
}
