//! Waveshare 4.2" black/white e-paper output.
//!
//! Pushes a finished [`PanelCanvas`] to the panel with a full refresh and then puts
//! the controller into deep sleep, so the image persists with the Pi powered off.
//! Only built with the `hardware` feature on Linux.

use crate::canvas::PanelCanvas;
use crate::config::HardwareConfig;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use epd_waveshare::epd4in2::{Epd4in2, HEIGHT, WIDTH};
use epd_waveshare::prelude::*;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};
use thiserror::Error;
use tracing::{debug, info};

/// Consumer label reported for the requested GPIO lines
const GPIO_CONSUMER: &str = "weather-panel";

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("canvas is {width}x{height}, panel is {WIDTH}x{HEIGHT}")]
    SizeMismatch { width: u32, height: u32 },

    #[error("GPIO: {0}")]
    Gpio(String),

    #[error("SPI: {0}")]
    Spi(String),

    #[error("display: {0}")]
    Display(String),
}

/// Full refresh of `canvas` on an already wired panel, then deep sleep.
pub fn show_frame<SPI, BUSY, DC, RST, DELAY>(
    spi: &mut SPI,
    busy: BUSY,
    dc: DC,
    rst: RST,
    delay: &mut DELAY,
    canvas: &PanelCanvas,
) -> Result<(), PanelError>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    if canvas.width() != WIDTH || canvas.height() != HEIGHT {
        return Err(PanelError::SizeMismatch {
            width: canvas.width(),
            height: canvas.height(),
        });
    }

    let mut epd = Epd4in2::new(spi, busy, dc, rst, delay, None)
        .map_err(|e| PanelError::Display(format!("{e:?}")))?;
    debug!(ink = canvas.ink_count(), "sending frame");

    epd.update_and_display_frame(spi, canvas.buffer(), delay)
        .map_err(|e| PanelError::Display(format!("{e:?}")))?;
    epd.sleep(spi, delay)
        .map_err(|e| PanelError::Display(format!("{e:?}")))?;

    info!("e-paper refresh complete");
    Ok(())
}

fn output_line(chip: &mut Chip, offset: u32) -> Result<CdevPin, PanelError> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(LineRequestFlags::OUTPUT, 0, GPIO_CONSUMER))
        .map_err(|e| PanelError::Gpio(format!("line {offset}: {e}")))?;
    CdevPin::new(handle).map_err(|e| PanelError::Gpio(format!("line {offset}: {e:?}")))
}

fn input_line(chip: &mut Chip, offset: u32) -> Result<CdevPin, PanelError> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(LineRequestFlags::INPUT, 0, GPIO_CONSUMER))
        .map_err(|e| PanelError::Gpio(format!("line {offset}: {e}")))?;
    CdevPin::new(handle).map_err(|e| PanelError::Gpio(format!("line {offset}: {e:?}")))
}

/// Open the configured SPI device and GPIO lines and show `canvas`.
pub fn push_to_panel(hw: &HardwareConfig, canvas: &PanelCanvas) -> Result<(), PanelError> {
    info!(
        spi = %hw.spi_device,
        dc = hw.dc_pin,
        rst = hw.rst_pin,
        busy = hw.busy_pin,
        "opening e-paper panel"
    );

    let mut chip = Chip::new(&hw.gpio_chip).map_err(|e| PanelError::Gpio(e.to_string()))?;
    let dc = output_line(&mut chip, hw.dc_pin)?;
    let rst = output_line(&mut chip, hw.rst_pin)?;
    let busy = input_line(&mut chip, hw.busy_pin)?;

    let mut spi =
        SpidevDevice::open(&hw.spi_device).map_err(|e| PanelError::Spi(format!("{e:?}")))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(4_000_000)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options)
        .map_err(|e| PanelError::Spi(e.to_string()))?;

    let mut delay = Delay;
    show_frame(&mut spi, busy, dc, rst, &mut delay, canvas)
}
