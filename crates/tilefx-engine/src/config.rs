//! Configuration types: scopes, specs, and the processor seam.

use std::sync::Arc;

use tilefx_core::PixelBuffer;
use tilefx_ops::CpuFilter;

/// Opaque handle for a tiled image (a pyramid the viewer displays).
///
/// The viewer assigns these; the engine only compares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

/// Opaque handle for a single tile of a tiled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u64);

/// Which tiled images a filter spec applies to.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Applies to every tiled image the viewer shows.
    Global,
    /// Applies only to the listed tiled images. An item may appear in at
    /// most one spec's item set across the whole configuration.
    Items(Vec<ItemId>),
}

/// A single filter operation with fixed parameters, applicable to a tile's
/// pixel buffer.
///
/// This is the seam between the engine and the two processing backends:
/// [`CpuFilter`] implements it directly, and the GPU crate adapts its
/// kernels behind the same trait.
pub trait TileProcessor: Send + Sync {
    /// Stable name for logs.
    fn name(&self) -> &str;

    /// Apply the transform to `buf` in place.
    fn apply(&self, buf: &mut PixelBuffer);
}

impl TileProcessor for CpuFilter {
    fn name(&self) -> &str {
        CpuFilter::name(self)
    }

    fn apply(&self, buf: &mut PixelBuffer) {
        CpuFilter::apply(self, buf)
    }
}

/// A scope plus the ordered processors to run for tiles in that scope.
#[derive(Clone)]
pub struct FilterSpec {
    /// Which tiled images this spec covers.
    pub scope: Scope,
    /// Ordered processors, applied first-to-last.
    pub processors: Vec<Arc<dyn TileProcessor>>,
}

impl FilterSpec {
    /// Spec applying to every tiled image.
    pub fn global(processors: Vec<Arc<dyn TileProcessor>>) -> Self {
        Self {
            scope: Scope::Global,
            processors,
        }
    }

    /// Spec applying to the given items only.
    pub fn for_items(items: Vec<ItemId>, processors: Vec<Arc<dyn TileProcessor>>) -> Self {
        Self {
            scope: Scope::Items(items),
            processors,
        }
    }
}

impl std::fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.processors.iter().map(|p| p.name()).collect();
        f.debug_struct("FilterSpec")
            .field("scope", &self.scope)
            .field("processors", &names)
            .finish()
    }
}

/// How an install propagates to already-loaded tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Trigger one unconditional full redraw; tiles re-filter at draw time.
    Sync,
    /// Reset the affected tiled images so their tiles re-decode and
    /// re-filter through the load path.
    Async,
}

/// An installed configuration snapshot.
///
/// Immutable once installed: every change produces a new snapshot with the
/// version advanced by exactly one. The version is published before any
/// reset is issued, so every continuation check observes it atomically.
#[derive(Debug, Default)]
pub(crate) struct Configuration {
    pub specs: Vec<FilterSpec>,
    pub version: u64,
}
