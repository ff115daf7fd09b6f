//! Owned RGBA8 pixel buffer.
//!
//! [`PixelBuffer`] is the raster every CPU filter operates on: 8 bits per
//! channel, four channels, row-major. It is deliberately minimal - no color
//! space tracking, no views - because tiles are small and filters either
//! mutate in place or work against a scratch copy.

use crate::{Error, Result};

/// Number of channels per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// A rectangular RGBA raster with byte-per-channel samples.
///
/// # Usage
///
/// ```rust
/// use tilefx_core::PixelBuffer;
///
/// let mut buf = PixelBuffer::new(16, 16).unwrap();
/// buf.set_pixel(3, 4, [255, 128, 0, 255]);
/// assert_eq!(buf.pixel(3, 4), [255, 128, 0, 255]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a zero-filled (transparent black) buffer.
    ///
    /// Fails if either dimension is zero or the byte size would overflow.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = Self::byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Create a buffer from raw interleaved RGBA bytes.
    ///
    /// The data length must be exactly `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height)?;
        if data.len() != expected {
            return Err(Error::size_mismatch(expected, data.len()));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a buffer with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let mut buf = Self::new(width, height)?;
        buf.fill(rgba);
        Ok(buf)
    }

    fn byte_len(width: u32, height: u32) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height, "zero dimension"));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or_else(|| Error::invalid_dimensions(width, height, "byte size overflow"))
    }

    /// Buffer width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` pair.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total pixel count.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw bytes, row-major interleaved RGBA.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer and return the raw byte vector.
    #[inline]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Byte offset of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the coordinates are out of bounds.
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Read the pixel at `(x, y)` as `[r, g, b, a]`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Write the pixel at `(x, y)`.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Checked pixel read.
    pub fn try_pixel(&self, x: u32, y: u32) -> Result<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        Ok(self.pixel(x, y))
    }

    /// Set every pixel to `rgba`.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Copy the pixel contents of `src` into this buffer.
    ///
    /// Dimensions must match; this is the blit used when a cached filter
    /// result is installed into a rendered region.
    pub fn copy_from(&mut self, src: &PixelBuffer) -> Result<()> {
        if self.dimensions() != src.dimensions() {
            return Err(Error::size_mismatch(self.data.len(), src.data.len()));
        }
        self.data.copy_from_slice(&src.data);
        Ok(())
    }

    /// Iterate rows as `&mut [u8]` slices of `width * 4` bytes.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        let stride = self.width as usize * CHANNELS;
        self.data.chunks_exact_mut(stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_zeroed() {
        let buf = PixelBuffer::new(4, 3).unwrap();
        assert_eq!(buf.dimensions(), (4, 3));
        assert_eq!(buf.as_bytes().len(), 4 * 3 * 4);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(PixelBuffer::new(0, 10).is_err());
        assert!(PixelBuffer::new(10, 0).is_err());
    }

    #[test]
    fn test_from_raw_length_check() {
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 16]).is_ok());
        let err = PixelBuffer::from_raw(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { expected: 16, got: 15 }));
    }

    #[test]
    fn test_pixel_roundtrip() {
        let mut buf = PixelBuffer::new(8, 8).unwrap();
        buf.set_pixel(7, 7, [1, 2, 3, 4]);
        assert_eq!(buf.pixel(7, 7), [1, 2, 3, 4]);
        assert_eq!(buf.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_try_pixel_bounds() {
        let buf = PixelBuffer::new(2, 2).unwrap();
        assert!(buf.try_pixel(1, 1).is_ok());
        assert!(buf.try_pixel(2, 0).is_err());
    }

    #[test]
    fn test_fill_and_copy_from() {
        let mut a = PixelBuffer::new(3, 3).unwrap();
        let b = PixelBuffer::filled(3, 3, [9, 8, 7, 6]).unwrap();
        a.copy_from(&b).unwrap();
        assert_eq!(a, b);

        let c = PixelBuffer::new(2, 3).unwrap();
        assert!(a.copy_from(&c).is_err());
    }
}
