//! Fonts and text styles shared by every renderer.
//!
//! All label text is drawn top-left anchored so a label's origin in
//! [`crate::layout`] is the top-left corner of its window.

use embedded_graphics::mono_font::{MonoFont, MonoTextStyleBuilder, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::text::{Alignment, Baseline, TextStyle, TextStyleBuilder};
use profont::{PROFONT_12_POINT, PROFONT_18_POINT};

/// Top-left anchored text.
pub const TOP_LEFT: TextStyle = TextStyleBuilder::new()
    .alignment(Alignment::Left)
    .baseline(Baseline::Top)
    .build();

/// Small text: footer, version, RPM and AFR captions.
pub const SMALL_FONT: &MonoFont<'static> = &PROFONT_12_POINT;

/// Large text: link status, gauge values, remaining captions.
pub const LARGE_FONT: &MonoFont<'static> = &PROFONT_18_POINT;

/// Text style with an opaque background so redrawn text erases the old one.
pub fn text_style(
    font: &'static MonoFont<'static>,
    color: Rgb565,
    background: Rgb565,
) -> MonoTextStyle<'static, Rgb565> {
    MonoTextStyleBuilder::new()
        .font(font)
        .text_color(color)
        .background_color(background)
        .build()
}
