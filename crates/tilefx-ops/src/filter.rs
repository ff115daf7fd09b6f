//! The [`CpuFilter`] type: a constructed filter with fixed parameters.

use tilefx_core::PixelBuffer;

use crate::{neighborhood, point};

/// Reducer selection for the morphological filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphMode {
    /// Fold with `max` over the window (dilation).
    Dilate,
    /// Fold with `min` over the window (erosion).
    Erode,
}

/// A CPU filter with fixed, pre-validated parameters.
///
/// Constructed through the free functions in this crate ([`crate::brightness`],
/// [`crate::convolution`], ...). Construction validates the numeric domain and
/// precomputes any lookup table, so [`apply`](CpuFilter::apply) is infallible.
#[derive(Debug, Clone)]
pub enum CpuFilter {
    /// Per-channel 256-entry lookup table (brightness, contrast, gamma,
    /// invert, threshold).
    PointLut {
        /// Stable filter name for logs.
        name: &'static str,
        /// Precomputed table, indexed by the input channel value.
        lut: Box<[u8; 256]>,
    },
    /// Un-weighted R,G,B average written to all three channels.
    Greyscale,
    /// k x k max/min fold over in-bounds neighbors.
    Morphology {
        /// Dilate or erode.
        mode: MorphMode,
        /// Odd window size.
        size: u32,
    },
    /// Odd square kernel, unnormalized in-bounds weighted sum.
    Convolution {
        /// Kernel side length (odd).
        size: u32,
        /// Row-major weights, `size * size` entries.
        kernel: Vec<f32>,
    },
    /// Grey average mapped through a precomputed 256-entry color ramp.
    Colormap {
        /// Precomputed RGB for each grey value.
        map: Box<[[u8; 3]; 256]>,
    },
}

impl CpuFilter {
    /// Stable name identifying the filter kind, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PointLut { name, .. } => name,
            Self::Greyscale => "greyscale",
            Self::Morphology {
                mode: MorphMode::Dilate,
                ..
            } => "dilation",
            Self::Morphology {
                mode: MorphMode::Erode,
                ..
            } => "erosion",
            Self::Convolution { .. } => "convolution",
            Self::Colormap { .. } => "colormap",
        }
    }

    /// Apply the filter to `buf` in place.
    ///
    /// Point filters mutate directly; the neighborhood filters read from a
    /// scratch copy of the input so every output sample sees the original
    /// neighbors.
    pub fn apply(&self, buf: &mut PixelBuffer) {
        match self {
            Self::PointLut { lut, .. } => point::apply_lut(buf, lut),
            Self::Greyscale => point::apply_greyscale(buf),
            Self::Morphology { mode, size } => neighborhood::apply_morphology(buf, *mode, *size),
            Self::Convolution { size, kernel } => {
                neighborhood::apply_convolution(buf, *size, kernel)
            }
            Self::Colormap { map } => point::apply_colormap(buf, map),
        }
    }
}
