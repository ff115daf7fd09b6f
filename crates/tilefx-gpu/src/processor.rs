//! Adapter exposing a GPU kernel chain through the engine's processor seam.

use std::sync::Mutex;

use tilefx_core::PixelBuffer;
use tilefx_engine::TileProcessor;
use tracing::warn;

use crate::{FilterCompositor, GpuContext, GpuKernel, GpuResult};

/// Runs an entire kernel chain as a single engine processor step.
///
/// Construction is fail-fast: every kernel compiles up front, so by the
/// time the processor enters a configuration it cannot fail on a bad
/// shader. A runtime composite failure (lost device, readback error) is
/// logged and leaves the tile unfiltered rather than poisoning the chain.
pub struct GpuChainProcessor {
    compositor: Mutex<FilterCompositor>,
}

impl GpuChainProcessor {
    /// Compile `kernels` on `ctx` and wrap them as one processor.
    pub fn new(ctx: GpuContext, kernels: Vec<GpuKernel>) -> GpuResult<Self> {
        let mut compositor = FilterCompositor::new(ctx);
        compositor.set_kernels(kernels)?;
        Ok(Self {
            compositor: Mutex::new(compositor),
        })
    }
}

impl TileProcessor for GpuChainProcessor {
    fn name(&self) -> &str {
        "gpu-chain"
    }

    fn apply(&self, buf: &mut PixelBuffer) {
        let mut compositor = match self.compositor.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match compositor.composite(buf) {
            Ok(filtered) => *buf = filtered,
            Err(e) => warn!(error = %e, "GPU composite failed, tile left unfiltered"),
        }
    }
}
