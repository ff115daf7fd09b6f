//! Neighborhood filters: morphology and convolution.
//!
//! Both read every output sample from a scratch copy of the input, so the
//! pass order never feeds a filtered value back into a neighbor. Out-of-bounds
//! neighbors are skipped rather than substituted with a border value, and no
//! renormalization happens at the edges: full non-separable in-bounds-only
//! evaluation, exactly as documented.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tilefx_core::buffer::CHANNELS;
use tilefx_core::PixelBuffer;
use tracing::debug;

use crate::point::clamp_u8;
use crate::{CpuFilter, FilterError, FilterResult, MorphMode};

/// Morphological dilation: k x k max fold per pixel and channel.
///
/// `kernel_size` must be odd. Size 1 degenerates to the identity.
pub fn dilation(kernel_size: u32) -> FilterResult<CpuFilter> {
    morphology(MorphMode::Dilate, kernel_size)
}

/// Morphological erosion: k x k min fold per pixel and channel.
///
/// `kernel_size` must be odd. Size 1 degenerates to the identity.
pub fn erosion(kernel_size: u32) -> FilterResult<CpuFilter> {
    morphology(MorphMode::Erode, kernel_size)
}

fn morphology(mode: MorphMode, kernel_size: u32) -> FilterResult<CpuFilter> {
    if kernel_size % 2 == 0 {
        return Err(FilterError::EvenKernelSize(kernel_size));
    }
    Ok(CpuFilter::Morphology {
        mode,
        size: kernel_size,
    })
}

/// Generic convolution with an odd-sized square kernel.
///
/// `kernel` is row-major and its length must be an odd perfect square
/// (1, 9, 25, ...). The output sample is the unnormalized weighted sum of
/// in-bounds neighbors only.
pub fn convolution(kernel: &[f32]) -> FilterResult<CpuFilter> {
    let size = (kernel.len() as f64).sqrt() as usize;
    if size * size != kernel.len() || size % 2 == 0 {
        return Err(FilterError::NonSquareKernel(kernel.len()));
    }
    Ok(CpuFilter::Convolution {
        size: size as u32,
        kernel: kernel.to_vec(),
    })
}

pub(crate) fn apply_morphology(buf: &mut PixelBuffer, mode: MorphMode, size: u32) {
    if size == 1 {
        // Single-pixel window: max/min over {v} is v.
        return;
    }
    let (w, h) = buf.dimensions();
    debug!(filter = "morphology", size, width = w, height = h, "applying");
    let half = (size / 2) as i64;
    let src = buf.as_bytes().to_vec();
    let stride = w as usize * CHANNELS;

    let row = |y: usize, out: &mut [u8]| {
        for x in 0..w as usize {
            let i = x * CHANNELS;
            for c in 0..3 {
                let mut value = src[y * stride + i + c];
                for ky in -half..=half {
                    for kx in -half..=half {
                        let py = y as i64 + ky;
                        let px = x as i64 + kx;
                        if py >= 0 && py < h as i64 && px >= 0 && px < w as i64 {
                            let n = src[py as usize * stride + px as usize * CHANNELS + c];
                            value = match mode {
                                MorphMode::Dilate => value.max(n),
                                MorphMode::Erode => value.min(n),
                            };
                        }
                    }
                }
                out[i + c] = value;
            }
        }
    };

    #[cfg(feature = "parallel")]
    buf.as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, out)| row(y, out));
    #[cfg(not(feature = "parallel"))]
    buf.as_bytes_mut()
        .chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, out)| row(y, out));
}

pub(crate) fn apply_convolution(buf: &mut PixelBuffer, size: u32, kernel: &[f32]) {
    let (w, h) = buf.dimensions();
    debug!(filter = "convolution", size, width = w, height = h, "applying");
    let half = (size / 2) as i64;
    let src = buf.as_bytes().to_vec();
    let stride = w as usize * CHANNELS;

    let row = |y: usize, out: &mut [u8]| {
        for x in 0..w as usize {
            let i = x * CHANNELS;
            for c in 0..3 {
                let mut value = 0.0f32;
                for ky in -half..=half {
                    for kx in -half..=half {
                        let py = y as i64 + ky;
                        let px = x as i64 + kx;
                        if py >= 0 && py < h as i64 && px >= 0 && px < w as i64 {
                            let ki = ((ky + half) * size as i64 + (kx + half)) as usize;
                            value += src[py as usize * stride + px as usize * CHANNELS + c]
                                as f32
                                * kernel[ki];
                        }
                    }
                }
                out[i + c] = clamp_u8(value);
            }
        }
    };

    #[cfg(feature = "parallel")]
    buf.as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, out)| row(y, out));
    #[cfg(not(feature = "parallel"))]
    buf.as_bytes_mut()
        .chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, out)| row(y, out));
}
