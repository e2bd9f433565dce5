//! 40x40 monochrome icons loaded from disk.
//!
//! Icons are raw 1-bpp bitmaps named `<name>.raw`: 40 rows of 5 bytes, MSB first,
//! a set bit is ink. Loading never falls back silently; the renderer decides what
//! to draw when an icon is missing (see [`draw_placeholder`]).

use embedded_graphics::{
    image::{Image, ImageRaw},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Icon edge length in pixels
pub const ICON_SIZE: u32 = 40;

/// Bytes in one raw icon file
pub const ICON_BYTES: usize = (ICON_SIZE as usize / 8) * ICON_SIZE as usize;

#[derive(Error, Debug)]
pub enum IconError {
    #[error("icon not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("icon {} is {actual} bytes, expected {}", .path.display(), ICON_BYTES)]
    InvalidSize { path: PathBuf, actual: usize },

    #[error("icon IO: {0}")]
    Io(#[from] io::Error),
}

/// A loaded 40x40 icon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Icon {
    data: Vec<u8>,
}

impl Icon {
    /// Wrap raw bitmap bytes, checking the size.
    pub fn from_bytes(data: Vec<u8>) -> Option<Self> {
        (data.len() == ICON_BYTES).then_some(Self { data })
    }

    pub fn draw<D>(&self, target: &mut D, top_left: Point) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let raw = ImageRaw::<BinaryColor>::new(&self.data, ICON_SIZE);
        Image::new(&raw, top_left).draw(target)
    }
}

/// Load `<dir>/<name>.raw`.
pub fn load_icon(dir: impl AsRef<Path>, name: &str) -> Result<Icon, IconError> {
    let path = dir.as_ref().join(format!("{name}.raw"));
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(IconError::NotFound(path)),
        Err(e) => return Err(IconError::Io(e)),
    };
    let actual = data.len();
    Icon::from_bytes(data).ok_or(IconError::InvalidSize { path, actual })
}

/// Outlined box with an X through it, drawn where an icon could not be loaded.
pub fn draw_placeholder<D>(target: &mut D, top_left: Point) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let size = ICON_SIZE as i32;
    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 2);

    Rectangle::new(top_left, Size::new(ICON_SIZE, ICON_SIZE))
        .into_styled(stroke)
        .draw(target)?;
    Line::new(top_left + Point::new(5, 5), top_left + Point::new(size - 5, size - 5))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 3))
        .draw(target)?;
    Line::new(top_left + Point::new(size - 5, 5), top_left + Point::new(5, size - 5))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 3))
        .draw(target)
}

/// Draw the named icon, or the placeholder if it cannot be loaded.
pub fn draw_icon_or_placeholder<D>(
    target: &mut D,
    dir: impl AsRef<Path>,
    name: &str,
    top_left: Point,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    match load_icon(dir, name) {
        Ok(icon) => icon.draw(target, top_left),
        Err(e) => {
            tracing::warn!(icon = name, "missing icon, drawing placeholder: {e}");
            draw_placeholder(target, top_left)
        }
    }
}
