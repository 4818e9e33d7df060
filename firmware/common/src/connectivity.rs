//! CAN link liveness with timeout hysteresis.
//!
//! ```text
//!             frame observed
//!   OFFLINE ─────────────────▶ ONLINE
//!      ▲                          │
//!      └──────────────────────────┘
//!        no frame for > timeout
//! ```
//!
//! Going online is immediate; going offline is only evaluated when the main
//! loop calls [`ConnectivityMonitor::tick`].

/// Link state derived from frame arrivals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    #[default]
    Offline,
    Online,
}

/// Tracks the last valid frame and derives [`LinkState`].
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: LinkState,
    last_seen_ms: u64,
    timeout_ms: u64,
}

impl ConnectivityMonitor {
    /// Monitor that drops offline after more than `timeout_ms` of silence.
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            state: LinkState::Offline,
            last_seen_ms: 0,
            timeout_ms,
        }
    }

    /// Record a frame for a tracked identifier at `now_ms`.
    ///
    /// Returns the new state if this caused a transition.
    pub fn observe(
        &mut self,
        now_ms: u64,
    ) -> Option<LinkState> {
        self.last_seen_ms = now_ms;
        self.transition(LinkState::Online)
    }

    /// Evaluate the timeout at `now_ms`.
    ///
    /// Returns the new state if the link just went offline.
    pub fn tick(
        &mut self,
        now_ms: u64,
    ) -> Option<LinkState> {
        let silent_for = now_ms.saturating_sub(self.last_seen_ms);
        if self.state == LinkState::Online && silent_for > self.timeout_ms {
            return self.transition(LinkState::Offline);
        }
        None
    }

    #[inline]
    pub const fn state(&self) -> LinkState { self.state }

    #[inline]
    pub fn is_online(&self) -> bool { self.state == LinkState::Online }

    /// Timestamp of the most recent observed frame (0 before the first).
    #[inline]
    pub const fn last_seen_ms(&self) -> u64 { self.last_seen_ms }

    fn transition(
        &mut self,
        to: LinkState,
    ) -> Option<LinkState> {
        if self.state == to {
            return None;
        }
        debug!("link {} -> {}", self.state, to);
        self.state = to;
        Some(to)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: u64 = 1500;

    #[test]
    fn test_starts_offline() {
        let monitor = ConnectivityMonitor::new(TIMEOUT);
        assert_eq!(monitor.state(), LinkState::Offline);
        assert!(!monitor.is_online());
    }

    #[test]
    fn test_first_frame_goes_online_immediately() {
        let mut monitor = ConnectivityMonitor::new(TIMEOUT);
        assert_eq!(monitor.observe(10_000), Some(LinkState::Online));
        assert!(monitor.is_online());
        assert_eq!(monitor.observe(10_010), None);
    }

    #[test]
    fn test_hysteresis_boundary() {
        let mut monitor = ConnectivityMonitor::new(TIMEOUT);
        let t = 5_000;
        monitor.observe(t);
        assert_eq!(monitor.tick(t + 1499), None);
        assert!(monitor.is_online());
        assert_eq!(monitor.tick(t + 1500), None);
        assert_eq!(monitor.tick(t + 1501), Some(LinkState::Offline));
        assert!(!monitor.is_online());
        assert_eq!(monitor.tick(t + 5000), None);
    }

    #[test]
    fn test_frame_refreshes_deadline() {
        let mut monitor = ConnectivityMonitor::new(TIMEOUT);
        monitor.observe(0);
        monitor.observe(1000);
        assert_eq!(monitor.tick(2400), None);
        assert_eq!(monitor.last_seen_ms(), 1000);
        assert_eq!(monitor.tick(2501), Some(LinkState::Offline));
    }

    #[test]
    fn test_recovers_after_offline() {
        let mut monitor = ConnectivityMonitor::new(TIMEOUT);
        monitor.observe(0);
        monitor.tick(2000);
        assert_eq!(monitor.observe(2100), Some(LinkState::Online));
    }

    #[test]
    fn test_offline_tick_without_frames_is_quiet() {
        let mut monitor = ConnectivityMonitor::new(TIMEOUT);
        assert_eq!(monitor.tick(100_000), None);
    }

    #[test]
    fn test_clock_going_backwards_does_not_expire() {
        let mut monitor = ConnectivityMonitor::new(TIMEOUT);
        monitor.observe(10_000);
        assert_eq!(monitor.tick(9_000), None);
        assert!(monitor.is_online());
    }
}
