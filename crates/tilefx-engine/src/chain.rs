//! Version-stamped continuation chains.
//!
//! The asynchronous application path runs a tile's processors one step per
//! pump, with the configuration version captured at chain start re-checked
//! before every step after the first and once more before the result is
//! installed. The stamp is an explicit field of the chain structure, not a
//! closure over shared mutable state, so cancellation is inspectable and
//! testable.

use std::sync::Arc;

use tilefx_core::PixelBuffer;
use tracing::trace;

use crate::{TileId, TileProcessor};

/// Continuation the viewer hands over at tile load; invoked exactly once,
/// after the chain finishes at a still-current version. Never invoked for
/// a stale chain.
pub type Completion = Box<dyn FnOnce()>;

/// Outcome of advancing a chain by one step.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ChainState {
    /// More steps remain.
    Running,
    /// Every step ran and the version still matches; the result is ready
    /// to install.
    Done,
    /// The live version moved past the captured one; the chain aborted
    /// silently.
    Stale,
}

/// An in-flight asynchronous filter chain for one tile.
pub(crate) struct ChainRun {
    pub tile: TileId,
    pub buffer: PixelBuffer,
    pub completion: Option<Completion>,
    steps: Vec<Arc<dyn TileProcessor>>,
    next: usize,
    /// Configuration version captured when the chain started.
    pub expected: u64,
}

impl ChainRun {
    pub fn new(
        tile: TileId,
        buffer: PixelBuffer,
        steps: Vec<Arc<dyn TileProcessor>>,
        expected: u64,
        completion: Option<Completion>,
    ) -> Self {
        debug_assert!(!steps.is_empty());
        Self {
            tile,
            buffer,
            completion,
            steps,
            next: 0,
            expected,
        }
    }

    /// Advance by one step.
    ///
    /// Step 0 runs unconditionally (the chain was stamped at the version
    /// current when it started); every later boundary, including the final
    /// install boundary, re-checks the live version.
    pub fn tick(&mut self, current_version: u64) -> ChainState {
        if self.next > 0 && current_version != self.expected {
            trace!(
                tile = self.tile.0,
                expected = self.expected,
                current = current_version,
                "stale filter chain aborted"
            );
            return ChainState::Stale;
        }
        if self.next == self.steps.len() {
            return ChainState::Done;
        }
        let step = &self.steps[self.next];
        trace!(tile = self.tile.0, step = step.name(), "chain step");
        step.apply(&mut self.buffer);
        self.next += 1;
        ChainState::Running
    }
}
