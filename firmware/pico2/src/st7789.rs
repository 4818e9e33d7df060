//! Async ST7789 driver for windowed updates over SPI0.
//!
//! The bridge only repaints the labels that changed, so there is no
//! framebuffer: each label is rendered into a small scratch window and
//! streamed to its rectangle with one CASET/RASET/RAMWR sequence.
//!
//! - **Async DMA:** window data goes out via DMA without blocking the CPU
//! - **Max SPI speed:** 62.5 MHz SPI clock (ST7789 maximum)

use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{self, Async, Spi};
use embassy_time::Timer;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::prelude::*;

use canbridge_common::layout::{LabelRect, SCREEN_HEIGHT, SCREEN_WIDTH};

const SPI_FREQUENCY: u32 = 62_500_000;

// ST7789 Commands
const SWRESET: u8 = 0x01;
const SLPOUT: u8 = 0x11;
const NORON: u8 = 0x13;
const INVON: u8 = 0x21;
const DISPON: u8 = 0x29;
const CASET: u8 = 0x2A;
const RASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;
const MADCTL: u8 = 0x36;
const COLMOD: u8 = 0x3A;

// MADCTL flags
const MADCTL_MX: u8 = 0x40; // Column address order
const MADCTL_MV: u8 = 0x20; // Row/column exchange

/// SPI settings for the panel.
pub fn spi_config() -> spi::Config {
    let mut config = spi::Config::default();
    config.frequency = SPI_FREQUENCY;
    config
}

pub struct St7789<'d> {
    spi: Spi<'d, SPI0, Async>,
    dc: Output<'d>,
    cs: Output<'d>,
}

impl<'d> St7789<'d> {
    pub fn new(
        spi: Spi<'d, SPI0, Async>,
        dc: Output<'d>,
        cs: Output<'d>,
    ) -> Self {
        Self { spi, dc, cs }
    }

    /// Reset and configure the panel for landscape RGB565.
    pub async fn init(&mut self) -> Result<(), spi::Error> {
        self.write_command(SWRESET).await?;
        Timer::after_millis(150).await;

        self.write_command(SLPOUT).await?;
        Timer::after_millis(10).await;

        self.write_command(COLMOD).await?;
        self.write_data(&[0x55]).await?;

        // 90° rotation: MV=1 (row/col exchange), MX=1 (mirror X)
        self.write_command(MADCTL).await?;
        self.write_data(&[MADCTL_MV | MADCTL_MX]).await?;

        // Inversion on (required for PIM715)
        self.write_command(INVON).await?;
        Timer::after_millis(10).await;

        self.write_command(NORON).await?;
        Timer::after_millis(10).await;

        self.write_command(DISPON).await?;
        Timer::after_millis(10).await;
        Ok(())
    }

    /// Stream big-endian RGB565 `pixels` into `rect`.
    pub async fn flush_window(
        &mut self,
        rect: &LabelRect,
        pixels: &[u8],
    ) -> Result<(), spi::Error> {
        self.set_window(rect).await?;
        self.begin_ram_write()?;
        let result = self.spi.write(pixels).await;
        self.cs.set_high();
        result
    }

    /// Fill `rect` with one color, a row at a time.
    pub async fn fill_window(
        &mut self,
        rect: &LabelRect,
        color: Rgb565,
    ) -> Result<(), spi::Error> {
        let pixel = RawU16::from(color).into_inner().to_be_bytes();
        let mut row = [0u8; SCREEN_WIDTH as usize * 2];
        for chunk in row.chunks_exact_mut(2) {
            chunk.copy_from_slice(&pixel);
        }
        let row = &row[..rect.width.min(SCREEN_WIDTH) as usize * 2];

        self.set_window(rect).await?;
        self.begin_ram_write()?;
        let mut result = Ok(());
        for _ in 0..rect.height {
            result = self.spi.write(row).await;
            if result.is_err() {
                break;
            }
        }
        self.cs.set_high();
        result
    }

    /// Blank the whole panel.
    pub async fn clear(
        &mut self,
        color: Rgb565,
    ) -> Result<(), spi::Error> {
        let screen = LabelRect {
            x: 0,
            y: 0,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
        };
        self.fill_window(&screen, color).await
    }

    async fn write_command(
        &mut self,
        cmd: u8,
    ) -> Result<(), spi::Error> {
        self.cs.set_low();
        self.dc.set_low();
        let result = self.spi.write(&[cmd]).await;
        self.cs.set_high();
        result
    }

    async fn write_data(
        &mut self,
        data: &[u8],
    ) -> Result<(), spi::Error> {
        self.cs.set_low();
        self.dc.set_high();
        let result = self.spi.write(data).await;
        self.cs.set_high();
        result
    }

    async fn set_window(
        &mut self,
        rect: &LabelRect,
    ) -> Result<(), spi::Error> {
        let x = rect.x as u16;
        let y = rect.y as u16;
        let x1 = x + rect.width as u16 - 1;
        let y1 = y + rect.height as u16 - 1;

        self.write_command(CASET).await?;
        self.write_data(&[(x >> 8) as u8, x as u8, (x1 >> 8) as u8, x1 as u8]).await?;

        self.write_command(RASET).await?;
        self.write_data(&[(y >> 8) as u8, y as u8, (y1 >> 8) as u8, y1 as u8]).await
    }

    /// RAMWR with CS left low; the caller streams data and raises CS.
    fn begin_ram_write(&mut self) -> Result<(), spi::Error> {
        self.cs.set_low();
        self.dc.set_low();
        // Blocking write for the single command byte (faster than DMA setup)
        if let Err(e) = self.spi.blocking_write(&[RAMWR]) {
            self.cs.set_high();
            return Err(e);
        }
        self.dc.set_high();
        Ok(())
    }
}
