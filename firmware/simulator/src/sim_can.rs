//! Simulated SLCAN adapter.

use std::collections::VecDeque;

use canbridge_common::can::slcan::{SlcanBitrate, SlcanDecoder, open_sequence};
use canbridge_common::can::{CanFilter, CanFrame, CanPeripheral};
use canbridge_common::config::CAN_BITRATE;
use canbridge_common::error::SlcanError;

/// Decodes the SLCAN byte stream fed by the ECU script and applies the
/// acceptance filter the way the adapter hardware would.
pub struct SimCan {
    rx: VecDeque<u8>,
    decoder: SlcanDecoder,
    filter: Option<CanFilter>,
    dropped: usize,
}

impl SimCan {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            decoder: SlcanDecoder::new(),
            filter: None,
            dropped: 0,
        }
    }

    pub fn feed(
        &mut self,
        bytes: &[u8],
    ) {
        self.rx.extend(bytes);
    }

    /// Frames rejected by the acceptance filter so far.
    pub const fn dropped(&self) -> usize { self.dropped }
}

impl CanPeripheral for SimCan {
    type Error = SlcanError;

    fn receive(
        &mut self,
        _timeout_ms: u32,
    ) -> Result<Option<CanFrame>, Self::Error> {
        while let Some(byte) = self.rx.pop_front() {
            match self.decoder.push(byte) {
                Some(Ok(frame)) if self.filter.is_none_or(|f| f.accepts(frame.identifier())) => {
                    return Ok(Some(frame));
                }
                Some(Ok(_)) => self.dropped += 1,
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }
        Ok(None)
    }

    fn set_filter(
        &mut self,
        filter: &CanFilter,
    ) -> Result<(), Self::Error> {
        let bitrate = SlcanBitrate::from_bps(CAN_BITRATE).unwrap_or(SlcanBitrate::Mbps1);
        let commands: Vec<String> = open_sequence(bitrate, filter)
            .iter()
            .map(|c| c.encode().trim_end().to_string())
            .collect();
        println!("[can] adapter setup: {}", commands.join(" "));
        self.filter = Some(*filter);
        Ok(())
    }

    fn deinit(&mut self) {
        println!("[can] adapter closed, {} frames filtered", self.dropped);
        self.decoder.reset();
        self.rx.clear();
    }
}
