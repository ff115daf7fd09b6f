//! Per-tile state: the engine-owned result cache and the rendered region.

use tilefx_core::PixelBuffer;

/// A filtered result computed ahead of draw time, tagged with the
/// configuration version it was computed under.
///
/// Created when a tile finishes decoding and at least one processor applies;
/// consumed (and cleared) the first time the tile is drawn at a matching
/// version; discarded without use if the version no longer matches.
#[derive(Debug)]
pub struct TileFilterCache {
    /// The fully filtered pixel buffer.
    pub buffer: PixelBuffer,
    /// Version of the configuration the buffer was computed under.
    pub computed_at: u64,
}

/// The rendered surface region of a tile, handed in by the viewer at draw
/// time.
///
/// Tracks the `Untouched -> Pristine-Saved -> Filtered(version)` state
/// machine: before the first filtering a pristine copy is saved so
/// un-filtering is always possible, and the region is tagged with the
/// version it was last filtered under.
#[derive(Debug)]
pub struct RenderedRegion {
    /// The visible pixels of the region.
    pub buffer: PixelBuffer,
    pub(crate) pristine: Option<PixelBuffer>,
    pub(crate) filtered_at: Option<u64>,
}

impl RenderedRegion {
    /// Wrap a freshly rendered (unfiltered) region.
    pub fn new(buffer: PixelBuffer) -> Self {
        Self {
            buffer,
            pristine: None,
            filtered_at: None,
        }
    }

    /// The saved pre-filter copy, if filtering has happened.
    pub fn pristine(&self) -> Option<&PixelBuffer> {
        self.pristine.as_ref()
    }

    /// Version the region was last filtered under, if any.
    pub fn filtered_at(&self) -> Option<u64> {
        self.filtered_at
    }
}
