//! Decoded pixel buffers for quality analysis.

use vintry_core::{Error, Result};

/// A decoded image held as a greyscale intensity plane.
///
/// Immutable once captured; each quality evaluation owns its buffer
/// exclusively. `byte_size` is the *encoded* upload length, not the pixel
/// plane length; the file-size check is an over-compression proxy and only
/// makes sense against the bytes that came over the wire.
pub struct ImageBuffer {
    width: u32,
    height: u32,
    byte_size: u64,
    luma: Vec<u8>,
}

// ITU-R BT.601 luma weights, fixed-point over 1000.
const LUMA_R: u32 = 299;
const LUMA_G: u32 = 587;
const LUMA_B: u32 = 114;

impl ImageBuffer {
    /// Decode encoded upload bytes into a greyscale buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let dynamic =
            image::load_from_memory(bytes).map_err(|e| Error::Decode(e.to_string()))?;
        let luma = dynamic.to_luma8();
        let (width, height) = (luma.width(), luma.height());
        Self::from_luma8(width, height, luma.into_raw(), bytes.len() as u64)
    }

    /// Build from an existing greyscale plane.
    pub fn from_luma8(
        width: u32,
        height: u32,
        luma: Vec<u8>,
        encoded_byte_size: u64,
    ) -> Result<Self> {
        let expected = width as usize * height as usize;
        if luma.len() != expected {
            return Err(Error::InvalidInput(format!(
                "Greyscale plane is {} bytes, expected {} for {}x{}",
                luma.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            byte_size: encoded_byte_size,
            luma,
        })
    }

    /// Build from interleaved RGB8 pixels, converting to greyscale.
    pub fn from_rgb8(
        width: u32,
        height: u32,
        rgb: &[u8],
        encoded_byte_size: u64,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(Error::InvalidInput(format!(
                "RGB plane is {} bytes, expected {} for {}x{}",
                rgb.len(),
                expected,
                width,
                height
            )));
        }
        let luma = rgb
            .chunks_exact(3)
            .map(|px| {
                let y = LUMA_R * px[0] as u32 + LUMA_G * px[1] as u32 + LUMA_B * px[2] as u32;
                (y / 1000) as u8
            })
            .collect();
        Ok(Self {
            width,
            height,
            byte_size: encoded_byte_size,
            luma,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Encoded upload size in bytes.
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// The greyscale plane, row-major.
    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    /// Intensity at (x, y). Callers guarantee bounds.
    pub(crate) fn at(&self, x: u32, y: u32) -> u8 {
        self.luma[y as usize * self.width as usize + x as usize]
    }
}
