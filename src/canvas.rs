//! Render context for one panel refresh.
//!
//! [`PanelCanvas`] is a packed 1-bit frame buffer in the byte layout Waveshare/Inky
//! black-and-white panels expect: rows of `width / 8` bytes, MSB is the leftmost
//! pixel, a set bit is white paper and a cleared bit is black ink. It implements
//! [`DrawTarget`] so every drawing call goes through an explicit `&mut` canvas
//! rather than shared global image state.

use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PointsIter, Rectangle},
};

/// 1-bit frame buffer; `BinaryColor::On` is ink, `BinaryColor::Off` is paper.
#[derive(Clone, Debug)]
pub struct PanelCanvas {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl PanelCanvas {
    /// Create a blank (all white) canvas.
    pub fn new(width: u32, height: u32) -> Self {
        // Each row has (width+7)/8 bytes
        let bytes_per_row = width.div_ceil(8);
        let buffer_size = (bytes_per_row * height) as usize;
        Self {
            width,
            height,
            buffer: vec![0xFF; buffer_size],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed frame bytes, ready for the display driver.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Set one pixel; out-of-bounds coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: BinaryColor) {
        let Some((byte_index, bit_mask)) = self.locate(x, y) else {
            return;
        };
        match color {
            BinaryColor::On => self.buffer[byte_index] &= !bit_mask,
            BinaryColor::Off => self.buffer[byte_index] |= bit_mask,
        }
    }

    /// Read one pixel back, `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        let (byte_index, bit_mask) = self.locate(x, y)?;
        Some(if self.buffer[byte_index] & bit_mask == 0 {
            BinaryColor::On
        } else {
            BinaryColor::Off
        })
    }

    /// Number of inked pixels, handy for sanity logging and tests.
    pub fn ink_count(&self) -> u32 {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.pixel(x, y) == Some(BinaryColor::On))
            .count() as u32
    }

    /// Count inked pixels inside a rectangle.
    pub fn ink_in(&self, area: Rectangle) -> u32 {
        area.points()
            .filter(|p| p.x >= 0 && p.y >= 0)
            .filter(|p| self.pixel(p.x as u32, p.y as u32) == Some(BinaryColor::On))
            .count() as u32
    }

    fn locate(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bytes_per_row = self.width.div_ceil(8);
        let byte_index = (y * bytes_per_row + x / 8) as usize;
        let bit_mask = 0x80 >> (x % 8);
        Some((byte_index, bit_mask))
    }
}

impl OriginDimensions for PanelCanvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for PanelCanvas {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            self.set_pixel(point.x as u32, point.y as u32, color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;

    #[test]
    fn test_new_canvas_is_white() {
        let canvas = PanelCanvas::new(400, 300);
        assert_eq!(canvas.buffer().len(), 50 * 300);
        assert!(canvas.buffer().iter().all(|&b| b == 0xFF));
        assert_eq!(canvas.ink_count(), 0);
    }

    #[test]
    fn test_set_pixel_bit_layout() {
        let mut canvas = PanelCanvas::new(16, 2);
        canvas.set_pixel(0, 0, BinaryColor::On);
        canvas.set_pixel(9, 1, BinaryColor::On);

        assert_eq!(canvas.buffer()[0], 0x7F);
        assert_eq!(canvas.buffer()[3], 0xBF);
        assert_eq!(canvas.pixel(9, 1), Some(BinaryColor::On));
        assert_eq!(canvas.pixel(8, 1), Some(BinaryColor::Off));

        canvas.set_pixel(0, 0, BinaryColor::Off);
        assert_eq!(canvas.buffer()[0], 0xFF);
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut canvas = PanelCanvas::new(8, 8);
        canvas.set_pixel(8, 0, BinaryColor::On);
        canvas.set_pixel(0, 8, BinaryColor::On);
        assert_eq!(canvas.ink_count(), 0);
        assert_eq!(canvas.pixel(100, 100), None);
    }

    #[test]
    fn test_draw_target_clips_negative_points() {
        let mut canvas = PanelCanvas::new(10, 10);
        Rectangle::new(Point::new(-5, -5), Size::new(10, 10))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut canvas)
            .unwrap();
        assert_eq!(canvas.ink_count(), 25);
    }

    #[test]
    fn test_clear_to_ink_and_ink_in() {
        let mut canvas = PanelCanvas::new(8, 4);
        canvas.clear(BinaryColor::On).unwrap();
        assert_eq!(canvas.ink_count(), 32);
        assert_eq!(
            canvas.ink_in(Rectangle::new(Point::new(0, 0), Size::new(2, 2))),
            4
        );
    }
}
