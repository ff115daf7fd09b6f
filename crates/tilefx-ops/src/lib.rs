//! # tilefx-ops
//!
//! CPU pixel filters for tiled-viewer rendering.
//!
//! Every filter operates on an 8-bit-per-channel RGBA [`PixelBuffer`],
//! iterates row-major, and leaves alpha untouched. Intermediate arithmetic
//! happens in `f32` and is clamped to `[0, 255]` on write-back.
//!
//! # Filters
//!
//! - Point filters (brightness, contrast, gamma, invert, threshold):
//!   precompute a 256-entry lookup table once at construction and apply it
//!   per channel - O(pixels) per application.
//! - [`greyscale`]: un-weighted R,G,B average written to all three channels.
//! - [`dilation`] / [`erosion`]: full non-separable k x k max/min fold over
//!   in-bounds neighbors.
//! - [`convolution`]: odd square kernel, unnormalized weighted sum over
//!   in-bounds neighbors only. Edge pixels receive a different effective
//!   weight than interior pixels; this is a documented policy, not a bug.
//! - [`colormap`]: grey average mapped through a precomputed two-segment
//!   interpolated color ramp.
//!
//! # Example
//!
//! ```rust
//! use tilefx_core::PixelBuffer;
//! use tilefx_ops::{brightness, invert};
//!
//! let mut buf = PixelBuffer::filled(8, 8, [10, 20, 30, 255]).unwrap();
//! brightness(50).unwrap().apply(&mut buf);
//! assert_eq!(buf.pixel(0, 0), [60, 70, 80, 255]);
//!
//! // Inverting twice is the identity.
//! let inv = invert();
//! inv.apply(&mut buf);
//! inv.apply(&mut buf);
//! assert_eq!(buf.pixel(0, 0), [60, 70, 80, 255]);
//! ```
//!
//! # Feature Flags
//!
//! - `parallel` - rayon row-parallel inner loops for the O(k^2 * pixels)
//!   neighborhood filters (enabled by default)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod filter;
mod neighborhood;
mod point;

pub use error::{FilterError, FilterResult};
pub use filter::{CpuFilter, MorphMode};
pub use point::{
    brightness, colormap, contrast, gamma, greyscale, invert, threshold,
};
pub use neighborhood::{convolution, dilation, erosion};
