//! Off-screen copy of the 320x240 panel.
//!
//! Labels go through the same [`LabelCanvas`] path as on the device: each
//! dirty label is rendered into a scratch window and copied to its rectangle.

use std::path::Path;

use canbridge_common::colors::BACKGROUND;
use canbridge_common::layout::{GAUGE_CAPTIONS, MAX_LABEL_PIXELS, SCREEN_HEIGHT, SCREEN_WIDTH, VERSION_CAPTION, label_font, label_rect};
use canbridge_common::render::{LabelCanvas, render_label};
use canbridge_common::styles::{TOP_LEFT, text_style};
use canbridge_common::{LabelBoard, LabelId};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};

pub struct SimPanel {
    display: SimulatorDisplay<Rgb565>,
    scratch: Vec<u8>,
}

impl SimPanel {
    /// Blank panel with the static captions drawn.
    pub fn new() -> Self {
        let mut display = SimulatorDisplay::new(Size::new(SCREEN_WIDTH, SCREEN_HEIGHT));
        display.clear(BACKGROUND).ok();
        for caption in GAUGE_CAPTIONS.iter().chain([&VERSION_CAPTION]) {
            let style = text_style(caption.font, caption.color, BACKGROUND);
            Text::with_text_style(caption.text, caption.origin, style, TOP_LEFT)
                .draw(&mut display)
                .ok();
        }
        Self {
            display,
            scratch: vec![0; MAX_LABEL_PIXELS * 2],
        }
    }

    /// Redraw every dirty label and print it. Returns how many were drawn.
    pub fn flush(
        &mut self,
        now_ms: u64,
        board: &mut LabelBoard,
    ) -> usize {
        let dirty: Vec<LabelId> = board.dirty().collect();
        for &id in &dirty {
            let rect = label_rect(id);
            let label = board.label(id);
            let Some(mut canvas) = LabelCanvas::new(&mut self.scratch, rect.width, rect.height) else {
                continue;
            };
            render_label(&mut canvas, &label.text, label_font(id), label.color, BACKGROUND);

            let pixels = (0..rect.height).flat_map(|y| (0..rect.width).map(move |x| (x, y)));
            let blit = pixels.filter_map(|(x, y)| {
                let color = canvas.pixel(x, y)?;
                Some(Pixel(Point::new(rect.x + x as i32, rect.y + y as i32), color))
            });
            self.display.draw_iter(blit).ok();

            println!("{:>6} ms  {:<18} {}", now_ms, label_name(id), label.text);
            board.mark_clean(id);
        }
        dirty.len()
    }

    /// Write the panel, scaled 2x, as a PNG.
    pub fn save_png(
        &self,
        path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let settings = OutputSettingsBuilder::new().scale(2).build();
        self.display.to_rgb_output_image(&settings).save_png(path)?;
        Ok(())
    }
}

fn label_name(id: LabelId) -> &'static str {
    match id {
        LabelId::LinkStatus => "link",
        LabelId::RadioStatus => "radio",
        LabelId::Gauge(gauge) => gauge.caption(),
    }
}
