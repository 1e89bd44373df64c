//! Raster surfaces
//!
//! A [`Surface`] is either an RGBA color buffer backed by a tiny-skia
//! [`Pixmap`] (layers, composed output, normal map, overlay) or a single
//! channel scalar buffer backed by an [`image::GrayImage`] (displacement).

use std::path::Path;

use image::{GrayImage, Luma, RgbaImage};
use loomkit_core::{EngineError, Error, Result};
use tiny_skia::{Color, Pixmap};

/// Bytes per pixel used for footprint estimates, whatever the format.
pub const BYTES_PER_PIXEL: usize = 4;

/// Pixel format of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceFormat {
    /// Premultiplied RGBA, 8 bits per channel
    Rgba8,
    /// Single 8-bit scalar channel
    Gray8,
}

impl std::fmt::Display for SurfaceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceFormat::Rgba8 => write!(f, "rgba8"),
            SurfaceFormat::Gray8 => write!(f, "gray8"),
        }
    }
}

#[derive(Clone)]
enum Pixels {
    Rgba(Pixmap),
    Gray(GrayImage),
}

/// A fixed-size raster buffer
#[derive(Clone)]
pub struct Surface {
    pixels: Pixels,
}

impl Surface {
    /// Allocate a cleared surface
    pub fn new(width: u32, height: u32, format: SurfaceFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions { width, height }.into());
        }
        let pixels = match format {
            SurfaceFormat::Rgba8 => Pixels::Rgba(
                Pixmap::new(width, height)
                    .ok_or(EngineError::InvalidDimensions { width, height })?,
            ),
            SurfaceFormat::Gray8 => Pixels::Gray(GrayImage::new(width, height)),
        };
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        match &self.pixels {
            Pixels::Rgba(p) => p.width(),
            Pixels::Gray(g) => g.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            Pixels::Rgba(p) => p.height(),
            Pixels::Gray(g) => g.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn format(&self) -> SurfaceFormat {
        match &self.pixels {
            Pixels::Rgba(_) => SurfaceFormat::Rgba8,
            Pixels::Gray(_) => SurfaceFormat::Gray8,
        }
    }

    /// Estimated footprint: width x height x 4.
    pub fn byte_size(&self) -> usize {
        estimate_bytes(self.width(), self.height())
    }

    /// Fully transparent (color) or zero (scalar).
    pub fn clear(&mut self) {
        match &mut self.pixels {
            Pixels::Rgba(p) => p.fill(Color::TRANSPARENT),
            Pixels::Gray(g) => g.fill(0),
        }
    }

    /// Reallocate at new dimensions. Content is always cleared, even when
    /// the dimensions are unchanged.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if (width, height) == self.dimensions() {
            self.clear();
            return Ok(());
        }
        *self = Surface::new(width, height, self.format())?;
        Ok(())
    }

    /// Copy pixel content from a surface of identical format and size.
    pub fn copy_from(&mut self, other: &Surface) -> Result<()> {
        if self.format() != other.format() || self.dimensions() != other.dimensions() {
            return Err(self.unsupported("copy_from").into());
        }
        match (&mut self.pixels, &other.pixels) {
            (Pixels::Rgba(dst), Pixels::Rgba(src)) => {
                dst.data_mut().copy_from_slice(src.data());
            }
            (Pixels::Gray(dst), Pixels::Gray(src)) => {
                dst.copy_from_slice(src.as_raw());
            }
            _ => return Err(self.unsupported("copy_from").into()),
        }
        Ok(())
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        match &self.pixels {
            Pixels::Rgba(p) => Some(p),
            Pixels::Gray(_) => None,
        }
    }

    /// Drawing target for tiny-skia operations.
    pub fn pixmap_mut(&mut self) -> std::result::Result<&mut Pixmap, EngineError> {
        let err = self.unsupported("draw");
        match &mut self.pixels {
            Pixels::Rgba(p) => Ok(p),
            Pixels::Gray(_) => Err(err),
        }
    }

    pub fn gray(&self) -> Option<&GrayImage> {
        match &self.pixels {
            Pixels::Gray(g) => Some(g),
            Pixels::Rgba(_) => None,
        }
    }

    pub fn gray_mut(&mut self) -> std::result::Result<&mut GrayImage, EngineError> {
        let err = self.unsupported("scalar write");
        match &mut self.pixels {
            Pixels::Gray(g) => Ok(g),
            Pixels::Rgba(_) => Err(err),
        }
    }

    /// Fill a scalar surface with one value.
    pub fn fill_scalar(&mut self, value: u8) -> Result<()> {
        self.gray_mut()?.fill(value);
        Ok(())
    }

    /// Straight (non-premultiplied) RGBA at `(x, y)`. Scalar surfaces
    /// report their value as an opaque gray.
    pub fn pixel_rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        match &self.pixels {
            Pixels::Rgba(p) => {
                let c = p.pixel(x, y)?.demultiply();
                Some([c.red(), c.green(), c.blue(), c.alpha()])
            }
            Pixels::Gray(g) => {
                if x >= g.width() || y >= g.height() {
                    return None;
                }
                let Luma([v]) = *g.get_pixel(x, y);
                Some([v, v, v, 255])
            }
        }
    }

    /// Scalar value at `(x, y)` for scalar surfaces.
    pub fn scalar(&self, x: u32, y: u32) -> Option<u8> {
        let g = self.gray()?;
        if x >= g.width() || y >= g.height() {
            return None;
        }
        Some(g.get_pixel(x, y).0[0])
    }

    /// Whether every pixel is fully transparent (or zero for scalar data).
    pub fn is_clear(&self) -> bool {
        match &self.pixels {
            Pixels::Rgba(p) => p.data().iter().all(|&b| b == 0),
            Pixels::Gray(g) => g.as_raw().iter().all(|&b| b == 0),
        }
    }

    /// Raw buffer bytes: premultiplied RGBA or one byte per pixel.
    pub fn data(&self) -> &[u8] {
        match &self.pixels {
            Pixels::Rgba(p) => p.data(),
            Pixels::Gray(g) => g.as_raw(),
        }
    }

    /// Straight-alpha RGBA copy, e.g. for export.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let (w, h) = self.dimensions();
        let mut out = RgbaImage::new(w, h);
        for (x, y, px) in out.enumerate_pixels_mut() {
            if let Some(rgba) = self.pixel_rgba(x, y) {
                px.0 = rgba;
            }
        }
        out
    }

    /// Write as PNG. Scalar surfaces are written as 8-bit grayscale.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let saved = match &self.pixels {
            Pixels::Gray(g) => g.save(path),
            Pixels::Rgba(_) => self.to_rgba_image().save(path),
        };
        saved.map_err(|e| Error::other(format!("failed to write {}: {}", path.display(), e)))
    }

    fn unsupported(&self, operation: &str) -> EngineError {
        EngineError::UnsupportedSurfaceFormat {
            operation: operation.to_string(),
            format: self.format().to_string(),
        }
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .finish()
    }
}

/// Footprint estimate used by the pool ceiling and statistics.
pub fn estimate_bytes(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}
