//! # tilefx-core
//!
//! Core types for the tilefx filtering stack.
//!
//! This crate provides the foundational types shared by every other tilefx
//! crate:
//!
//! - [`PixelBuffer`] - Owned RGBA8 raster, the unit CPU filters operate on
//! - [`Error`], [`Result`] - Shared error types for buffer operations
//!
//! ## Memory Layout
//!
//! Buffers store pixels in **row-major** order, top-to-bottom, with
//! interleaved channels:
//!
//! ```text
//! Memory: [R G B A R G B A ...]  <- Row 0
//!         [R G B A R G B A ...]  <- Row 1
//!         ...
//! ```
//!
//! ## Ownership
//!
//! A `PixelBuffer` is exclusively owned by whichever pipeline stage currently
//! holds it. The filter engine borrows a tile's decoded pixels only for the
//! duration of filter application and owns the private copies it caches.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;

pub use buffer::PixelBuffer;
pub use error::{Error, Result};
