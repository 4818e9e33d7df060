//! Dashboard panel: static captions once, dirty labels every tick.

use canbridge_common::colors::BACKGROUND;
use canbridge_common::display::LABEL_COUNT;
use canbridge_common::layout::{GAUGE_CAPTIONS, MAX_LABEL_PIXELS, VERSION_CAPTION, label_font, label_rect};
use canbridge_common::render::{LabelCanvas, render_label};
use canbridge_common::{LabelBoard, LabelId};
use defmt::warn;
use embassy_rp::spi;
use heapless::Vec;

use crate::st7789::St7789;

pub struct Panel<'d> {
    lcd: St7789<'d>,
    scratch: [u8; MAX_LABEL_PIXELS * 2],
}

impl<'d> Panel<'d> {
    pub const fn new(lcd: St7789<'d>) -> Self {
        Self {
            lcd,
            scratch: [0; MAX_LABEL_PIXELS * 2],
        }
    }

    /// Clear the screen and draw the captions that never change.
    pub async fn draw_static(&mut self) -> Result<(), spi::Error> {
        self.lcd.clear(BACKGROUND).await?;
        for caption in GAUGE_CAPTIONS.iter().chain([&VERSION_CAPTION]) {
            let rect = caption.rect();
            let Some(mut canvas) = LabelCanvas::new(&mut self.scratch, rect.width, rect.height) else {
                warn!("caption {} does not fit the scratch window", caption.text);
                continue;
            };
            render_label(&mut canvas, caption.text, caption.font, caption.color, BACKGROUND);
            self.lcd.flush_window(&rect, canvas.as_bytes()).await?;
        }
        Ok(())
    }

    /// Repaint every dirty label. Returns how many were drawn.
    pub async fn flush(
        &mut self,
        board: &mut LabelBoard,
    ) -> Result<usize, spi::Error> {
        let dirty: Vec<LabelId, LABEL_COUNT> = board.dirty().collect();
        for &id in &dirty {
            let rect = label_rect(id);
            let label = board.label(id);
            // Every label window fits MAX_LABEL_PIXELS
            let Some(mut canvas) = LabelCanvas::new(&mut self.scratch, rect.width, rect.height) else {
                continue;
            };
            render_label(&mut canvas, &label.text, label_font(id), label.color, BACKGROUND);
            self.lcd.flush_window(&rect, canvas.as_bytes()).await?;
            board.mark_clean(id);
        }
        Ok(dirty.len())
    }
}
