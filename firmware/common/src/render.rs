//! Off-screen RGB565 canvas for one label window.
//!
//! Labels are rendered into a small scratch buffer in panel byte order
//! (big-endian RGB565) and then flushed to their window on the display. Only
//! labels that changed are rendered, so the full 150 KB framebuffer is never
//! needed.

use core::convert::Infallible;

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Text;

use crate::styles::{TOP_LEFT, text_style};

/// `DrawTarget` over a `width * height * 2` byte buffer.
pub struct LabelCanvas<'a> {
    buffer: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> LabelCanvas<'a> {
    /// Canvas over the first `width * height` pixels of `buffer`.
    ///
    /// Returns `None` if `buffer` is too small.
    pub fn new(
        buffer: &'a mut [u8],
        width: u32,
        height: u32,
    ) -> Option<Self> {
        let len = (width * height) as usize * 2;
        let buffer = buffer.get_mut(..len)?;
        Some(Self { buffer, width, height })
    }

    /// Rendered bytes, ready to stream to the panel window.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] { self.buffer }

    /// Color of the pixel at `(x, y)`, for tests and the console renderer.
    pub fn pixel(
        &self,
        x: u32,
        y: u32,
    ) -> Option<Rgb565> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) as usize * 2;
        let raw = u16::from_be_bytes([self.buffer[idx], self.buffer[idx + 1]]);
        Some(RawU16::new(raw).into())
    }

    #[inline]
    fn set_pixel(
        &mut self,
        x: i32,
        y: i32,
        color: Rgb565,
    ) {
        if x >= 0 && (x as u32) < self.width && y >= 0 && (y as u32) < self.height {
            let idx = (y as usize * self.width as usize + x as usize) * 2;
            let bytes = RawU16::from(color).into_inner().to_be_bytes();
            self.buffer[idx] = bytes[0];
            self.buffer[idx + 1] = bytes[1];
        }
    }
}

impl OriginDimensions for LabelCanvas<'_> {
    fn size(&self) -> Size { Size::new(self.width, self.height) }
}

impl DrawTarget for LabelCanvas<'_> {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(
        &mut self,
        pixels: I,
    ) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color);
        }
        Ok(())
    }

    fn fill_solid(
        &mut self,
        area: &Rectangle,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.size == Size::zero() {
            return Ok(());
        }

        let bytes = RawU16::from(color).into_inner().to_be_bytes();
        let x0 = area.top_left.x as usize;
        let w = area.size.width as usize;
        let stride = self.width as usize * 2;
        for y in area.rows() {
            let start = y as usize * stride + x0 * 2;
            for px in self.buffer[start..start + w * 2].chunks_exact_mut(2) {
                px.copy_from_slice(&bytes);
            }
        }
        Ok(())
    }

    fn clear(
        &mut self,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        let bytes = RawU16::from(color).into_inner().to_be_bytes();
        for px in self.buffer.chunks_exact_mut(2) {
            px.copy_from_slice(&bytes);
        }
        Ok(())
    }
}

/// Clear the canvas to `background` and draw `text` top-left in `color`.
pub fn render_label(
    canvas: &mut LabelCanvas<'_>,
    text: &str,
    font: &'static MonoFont<'static>,
    color: Rgb565,
    background: Rgb565,
) {
    // Infallible target
    let _ = canvas.clear(background);
    let _ = Text::with_text_style(text, Point::zero(), text_style(font, color, background), TOP_LEFT).draw(canvas);
}

// =============================================================================
// Tests
// =============================================================================
