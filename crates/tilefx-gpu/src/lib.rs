//! GPU multi-pass filter compositor.
//!
//! Renders an ordered filter chain against a composed frame using wgpu:
//! each kernel is one fullscreen pass, pass 0 samples the uploaded source
//! frame, later passes sample the previous pass's output through a
//! ping-pong texture pair, and the final pass renders straight into the
//! destination texture.
//!
//! Compiled pipelines are cached per [`KernelId`] and reused across frames;
//! only the per-frame readback staging buffer is transient. Construction
//! and kernel compilation fail fast: a missing adapter, an unavailable
//! device, or a rejected shader is surfaced immediately with the backend
//! diagnostic attached, and the caller is expected to fall back to the CPU
//! filter path.
//!
//! # Example
//!
//! ```ignore
//! use tilefx_gpu::{FilterCompositor, GpuContext, brightness_kernel, invert_kernel};
//!
//! let ctx = GpuContext::new()?;
//! let mut compositor = FilterCompositor::new(ctx);
//! compositor.set_kernels(vec![brightness_kernel(40)?, invert_kernel()])?;
//! let filtered = compositor.composite(&frame)?;
//! ```

#![warn(missing_docs)]

mod compositor;
mod context;
mod kernel;
mod processor;
mod shaders;
mod uniform;

pub use compositor::FilterCompositor;
pub use context::GpuContext;
pub use kernel::{
    brightness_kernel, colormap_kernel, contrast_kernel, convolution3x3_kernel, dilation_kernel,
    erosion_kernel, gamma_kernel, greyscale_kernel, invert_kernel, threshold_kernel, GpuKernel,
    KernelId,
};
pub use processor::GpuChainProcessor;
pub use uniform::UniformValue;

use thiserror::Error;

/// GPU backend errors. All of these are synchronous and fatal to the
/// operation that raised them; none are retried.
#[derive(Error, Debug)]
pub enum GpuError {
    /// No GPU adapter available on this machine.
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    /// Adapter found but the device could not be created.
    #[error("failed to create device: {0}")]
    DeviceCreation(String),

    /// A kernel's shader was rejected by the backend.
    #[error("kernel `{kernel}` failed to compile: {detail}")]
    KernelCompile {
        /// Stable name of the offending kernel.
        kernel: &'static str,
        /// Backend diagnostic text.
        detail: String,
    },

    /// Reading the composited result back from the GPU failed.
    #[error("readback failed: {0}")]
    Readback(String),
}

/// Convenience alias for GPU results.
pub type GpuResult<T> = Result<T, GpuError>;
