//! Ring buffer of recent bridge events.
//!
//! Keeps the last few link and radio transitions with their timestamps so a
//! host front-end (or a debugger halted on the firmware) can see how the
//! bridge got into its current state.
//!
//! ```ignore
//! let mut log = EventLog::new();
//! log.push(1500, "link OFF");
//! for line in log.iter() {
//!     println!("{}", line);
//! }
//! ```

use core::fmt::Write;

use heapless::{Deque, String};

use crate::bridge::TickReport;
use crate::connectivity::LinkState;

/// Maximum number of lines kept.
pub const LOG_BUFFER_SIZE: usize = 8;

/// Maximum characters per line, timestamp included.
pub const LOG_LINE_LENGTH: usize = 48;

pub type LogLine = String<LOG_LINE_LENGTH>;

/// Last [`LOG_BUFFER_SIZE`] events, oldest dropped first.
pub struct EventLog {
    buffer: Deque<LogLine, LOG_BUFFER_SIZE>,
}

impl EventLog {
    pub const fn new() -> Self { Self { buffer: Deque::new() } }

    /// Append `msg` stamped with `now_ms` as `[sss.mmm] msg`, truncated to
    /// [`LOG_LINE_LENGTH`].
    pub fn push(
        &mut self,
        now_ms: u64,
        msg: &str,
    ) {
        if self.buffer.is_full() {
            self.buffer.pop_front();
        }

        let mut line = LogLine::new();
        // Stamp is at most 25 chars for u64::MAX
        let _ = write!(line, "[{}.{:03}] ", now_ms / 1000, now_ms % 1000);
        for c in msg.chars() {
            if line.push(c).is_err() {
                break;
            }
        }
        self.buffer.push_back(line).ok();
    }

    /// Log the transitions a tick reported. Returns how many lines were
    /// added.
    pub fn record(
        &mut self,
        now_ms: u64,
        report: &TickReport,
    ) -> usize {
        let mut logged = 0;
        if let Some(state) = report.link {
            self.push(
                now_ms,
                match state {
                    LinkState::Online => "link ONLINE",
                    LinkState::Offline => "link OFF",
                },
            );
            logged += 1;
        }
        if let Some(sent) = report.sent
            && sent.failed > 0
        {
            let mut msg: String<32> = String::new();
            let _ = write!(msg, "notify failed x{}", sent.failed);
            self.push(now_ms, &msg);
            logged += 1;
        }
        logged
    }

    /// Lines, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> { self.buffer.iter().map(heapless::string::StringInner::as_str) }

    #[inline]
    pub fn len(&self) -> usize { self.buffer.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.buffer.is_empty() }
}

impl Default for EventLog {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::SendReport;

    #[test]
    fn test_push_stamps_line() {
        let mut log = EventLog::new();
        assert!(log.is_empty());
        log.push(1501, "link OFF");
        assert_eq!(log.iter().next(), Some("[1.501] link OFF"));
    }

    #[test]
    fn test_ring_drops_oldest() {
        let mut log = EventLog::new();
        for i in 0..=LOG_BUFFER_SIZE as u64 {
            log.push(i, "tick");
        }
        assert_eq!(log.len(), LOG_BUFFER_SIZE);
        assert_eq!(log.iter().next(), Some("[0.001] tick"));
    }

    #[test]
    fn test_long_message_truncated() {
        let mut log = EventLog::new();
        let long = "x".repeat(100);
        log.push(0, &long);
        let line = log.iter().next().unwrap();
        assert_eq!(line.len(), LOG_LINE_LENGTH);
        assert!(line.starts_with("[0.000] xxx"));
    }

    #[test]
    fn test_record_link_transition() {
        let mut log = EventLog::new();
        let report = TickReport {
            link: Some(LinkState::Online),
            ..TickReport::default()
        };
        assert_eq!(log.record(250, &report), 1);
        assert_eq!(log.iter().next(), Some("[0.250] link ONLINE"));
    }

    #[test]
    fn test_record_quiet_tick() {
        let mut log = EventLog::new();
        let report = TickReport {
            sent: Some(SendReport { delivered: 2, failed: 0 }),
            ..TickReport::default()
        };
        assert_eq!(log.record(0, &report), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_record_failed_notify() {
        let mut log = EventLog::new();
        let report = TickReport {
            sent: Some(SendReport { delivered: 1, failed: 1 }),
            ..TickReport::default()
        };
        assert_eq!(log.record(2000, &report), 1);
        assert_eq!(log.iter().next(), Some("[2.000] notify failed x1"));
    }
}
