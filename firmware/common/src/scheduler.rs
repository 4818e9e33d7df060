//! Spreads the six gauge label updates across loop iterations.
//!
//! Redrawing every label on every 10 ms tick would dominate the loop, so each
//! gauge refreshes on its own phase of a repeating 10-tick cycle:
//!
//! | phase | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 |
//! |-------|---|---|---|---|---|---|---|---|---|---|
//! | IAT   | x |   | x |   | x |   | x |   | x |   |
//! | RPM   |   |   | x |   |   |   |   |   |   |   |
//! | MAP   |   |   |   |   |   |   | x |   |   |   |
//! | AFR   |   |   | x |   |   |   |   |   | x |   |
//! | VOLT  |   |   |   |   | x |   |   |   |   |   |
//! | EGT   |   |   |   |   |   |   |   |   | x |   |
//!
//! Odd phases update nothing.

use heapless::Vec;

use crate::can::store::FrameStore;
use crate::display::{Dashboard, LabelId};
use crate::telemetry::Gauge;

/// Length of one scheduling cycle in ticks.
pub const PHASE_COUNT: u8 = 10;

/// Whether `gauge` refreshes on `phase`.
pub const fn is_due(
    gauge: Gauge,
    phase: u8,
) -> bool {
    match gauge {
        Gauge::Iat => phase % 2 == 0,
        Gauge::Rpm => phase % 8 == 2,
        Gauge::Map => phase % 10 == 6,
        Gauge::Afr => phase % 6 == 2,
        Gauge::Volt => phase % 6 == 4,
        Gauge::Egt => phase % 10 == 8,
    }
}

/// Gauges refreshed in one tick.
pub type Updated = Vec<Gauge, 6>;

/// Phase counter driving the gauge labels.
#[derive(Debug, Clone, Default)]
pub struct DisplayScheduler {
    phase: u8,
}

impl DisplayScheduler {
    pub const fn new() -> Self { Self { phase: 0 } }

    #[inline]
    pub const fn phase(&self) -> u8 { self.phase }

    /// Push every gauge due on the current phase to `display`, then advance.
    ///
    /// On a display error the phase still advances so one bad label cannot
    /// stall the cycle.
    pub fn tick<D: Dashboard>(
        &mut self,
        store: &FrameStore,
        display: &mut D,
    ) -> Result<Updated, D::Error> {
        let phase = self.phase;
        self.phase = (self.phase + 1) % PHASE_COUNT;

        let mut updated = Updated::new();
        for gauge in Gauge::ALL.into_iter().filter(|&g| is_due(g, phase)) {
            display.set_text(LabelId::Gauge(gauge), &gauge.display_text(store))?;
            // At most six gauges; capacity matches
            updated.push(gauge).ok();
        }
        trace!("display phase {} updated {} labels", phase, updated.len());
        Ok(updated)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::LabelBoard;
    use crate::mocks::RecordingDashboard;

    fn due_phases(gauge: Gauge) -> std::vec::Vec<u8> { (0..PHASE_COUNT).filter(|&p| is_due(gauge, p)).collect() }

    #[test]
    fn test_phase_table() {
        assert_eq!(due_phases(Gauge::Iat), [0, 2, 4, 6, 8]);
        assert_eq!(due_phases(Gauge::Rpm), [2]);
        assert_eq!(due_phases(Gauge::Map), [6]);
        assert_eq!(due_phases(Gauge::Afr), [2, 8]);
        assert_eq!(due_phases(Gauge::Volt), [4]);
        assert_eq!(due_phases(Gauge::Egt), [8]);
    }

    #[test]
    fn test_full_cycle_updates_every_gauge_at_its_phases() {
        let store = FrameStore::new(144, 145);
        let mut scheduler = DisplayScheduler::new();
        let mut board = LabelBoard::new();

        let mut seen: std::vec::Vec<(u8, Gauge)> = std::vec::Vec::new();
        for _ in 0..PHASE_COUNT {
            let phase = scheduler.phase();
            for gauge in scheduler.tick(&store, &mut board).unwrap() {
                seen.push((phase, gauge));
            }
        }

        for gauge in Gauge::ALL {
            let phases: std::vec::Vec<u8> = seen.iter().filter(|(_, g)| *g == gauge).map(|(p, _)| *p).collect();
            assert!(!phases.is_empty(), "{gauge:?} never updated");
            assert_eq!(phases, due_phases(gauge));
        }
    }

    #[test]
    fn test_phase_wraps() {
        let store = FrameStore::new(144, 145);
        let mut scheduler = DisplayScheduler::new();
        let mut board = LabelBoard::new();
        for _ in 0..PHASE_COUNT {
            scheduler.tick(&store, &mut board).unwrap();
        }
        assert_eq!(scheduler.phase(), 0);
        scheduler.tick(&store, &mut board).unwrap();
        assert_eq!(scheduler.phase(), 1);
    }

    #[test]
    fn test_odd_phase_updates_nothing() {
        let store = FrameStore::new(144, 145);
        let mut scheduler = DisplayScheduler::new();
        let mut display = RecordingDashboard::new();
        scheduler.tick(&store, &mut display).unwrap();
        let before = display.texts.len();
        assert!(scheduler.tick(&store, &mut display).unwrap().is_empty());
        assert_eq!(display.texts.len(), before);
    }

    #[test]
    fn test_phase_two_updates_three_labels() {
        let mut store = FrameStore::new(144, 145);
        store.update(144, &[0, 20, 0x0B, 0xB8, 0, 200, 0, 0]);
        store.update(145, &[0, 147, 0, 0, 0, 0, 0, 0]);
        let mut scheduler = DisplayScheduler::new();
        let mut display = RecordingDashboard::new();
        scheduler.tick(&store, &mut display).unwrap();
        scheduler.tick(&store, &mut display).unwrap();
        display.texts.clear();

        let updated = scheduler.tick(&store, &mut display).unwrap();
        assert_eq!(updated.as_slice(), [Gauge::Iat, Gauge::Rpm, Gauge::Afr]);
        assert_eq!(display.text_of(LabelId::Gauge(Gauge::Rpm)), Some("3000"));
        assert_eq!(display.text_of(LabelId::Gauge(Gauge::Afr)), Some("14.7"));
    }

    #[test]
    fn test_display_error_propagates_and_phase_advances() {
        let store = FrameStore::new(144, 145);
        let mut scheduler = DisplayScheduler::new();
        let mut display = RecordingDashboard::new();
        display.fail = true;
        assert!(scheduler.tick(&store, &mut display).is_err());
        assert_eq!(scheduler.phase(), 1);
    }
}
